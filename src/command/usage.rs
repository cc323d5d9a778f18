//! Usage and help text, derived from the live tree on every call.

use super::node::{COMMAND_MARKER, CommandTree, NodeId};

/// Generic marker for "a subcommand goes here".
pub const SUBCOMMAND_USAGE: &str = "<subcommand> [...]";

fn join_nonempty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandTree {
    /// Full invocation prefix, e.g. `!karma up`.
    pub fn full_prefix(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            names.push(node.name());
            cursor = node.parent();
        }
        names.reverse();
        format!("{COMMAND_MARKER}{}", names.join(" "))
    }

    /// Argument usage: `<required> [optional]`, plus the subcommand marker
    /// when the node has children and parses its own arguments first.
    pub fn argument_usage(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut parts: Vec<String> = node.arguments().iter().map(|a| a.usage()).collect();
        if node.has_children() && node.arg_fallthrough() {
            parts.push(SUBCOMMAND_USAGE.to_string());
        }
        parts.join(" ")
    }

    /// `Usage: <prefix> <args>`; nodes that try subcommands first also show
    /// the subcommand-only form.
    pub fn usage_line(&self, id: NodeId) -> String {
        let prefix = self.full_prefix(id);
        let args = self.argument_usage(id);
        let line = join_nonempty(["Usage:", prefix.as_str(), args.as_str()]);
        if self.node(id).arg_fallthrough() {
            line
        } else {
            format!("{line} OR {SUBCOMMAND_USAGE}")
        }
    }

    /// Usage shown when argument validation fails. Lists subcommand names
    /// when there are any.
    pub fn usage(&self, id: NodeId) -> String {
        let line = self.usage_line(id);
        let node = self.node(id);
        if !node.has_children() {
            return line;
        }
        let names = node
            .children()
            .iter()
            .map(|c| self.node(*c).name())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{line}\nSubcommands: {names}")
    }

    /// One-line summary of a node as listed under its parent.
    pub fn inline_usage(&self, id: NodeId) -> String {
        let node = self.node(id);
        let name = node.name();
        let args = self.argument_usage(id);
        let head = join_nonempty(["*", name.as_str(), args.as_str()]);
        let mut line = match node.help() {
            Some(help) => format!("{head} - {help}"),
            None => head,
        };
        if !node.arg_fallthrough() && node.has_children() {
            line.push_str(&format!("\n* {name} {SUBCOMMAND_USAGE}"));
        }
        line
    }

    /// Usage line, a blank line, then one inline line per direct child.
    pub fn full_help(&self, id: NodeId) -> String {
        let children = self
            .node(id)
            .children()
            .iter()
            .map(|c| self.inline_usage(*c))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{children}", self.usage_line(id))
    }
}
