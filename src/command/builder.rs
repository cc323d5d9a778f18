//! Registration-time builders.
//!
//! A [`CommandBuilder`] collects a node's configuration, arguments and
//! subcommands; [`CommandTreeBuilder::build`] validates everything and
//! flattens it into the immutable [`CommandTree`] arena.

use super::args::Argument;
use super::node::{CommandHandler, CommandName, CommandNode, CommandTree, NameRule, NodeId};
use crate::error::BuildError;
use crate::message::EventType;
use std::collections::HashSet;
use std::sync::Arc;

/// Order in which a builder's arguments were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentOrder {
    /// Registered in the order they are matched.
    #[default]
    Declared,
    /// Registered innermost-first, the way stacked attributes apply.
    /// Reversed exactly once when the tree is built.
    Stacked,
}

enum RuleSpec {
    Exact,
    Aliases(HashSet<String>),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

/// Builder for one command node and its subtree.
pub struct CommandBuilder {
    name: CommandName,
    rule: RuleSpec,
    rule_conflict: bool,
    help: Option<String>,
    arguments: Vec<Argument>,
    order: ArgumentOrder,
    subcommands: Vec<CommandBuilder>,
    require_subcommand: bool,
    arg_fallthrough: bool,
    event_type: EventType,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandBuilder {
    fn with_name(name: CommandName) -> Self {
        Self {
            name,
            rule: RuleSpec::Exact,
            rule_conflict: false,
            help: None,
            arguments: Vec::new(),
            order: ArgumentOrder::Declared,
            subcommands: Vec::new(),
            require_subcommand: true,
            arg_fallthrough: true,
            event_type: EventType::RoomMessage,
            handler: None,
        }
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self::with_name(CommandName::Static(name.into()))
    }

    /// Command whose name is computed each time it is needed.
    pub fn dynamic<F>(name: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::with_name(CommandName::Dynamic(Arc::new(name)))
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add an alias. Mixing aliases with a predicate fails at build time.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let RuleSpec::Aliases(set) = &mut self.rule {
            set.insert(alias.into());
        } else if matches!(self.rule, RuleSpec::Predicate(_)) {
            self.rule_conflict = true;
        } else {
            self.rule = RuleSpec::Aliases(HashSet::from([alias.into()]));
        }
        self
    }

    pub fn aliases<I, S>(self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        aliases.into_iter().fold(self, |b, a| b.alias(a))
    }

    /// Match names with a predicate instead of the name and aliases.
    ///
    /// May be set once, and not together with aliases.
    pub fn matches_with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        match self.rule {
            RuleSpec::Exact => self.rule = RuleSpec::Predicate(Arc::new(predicate)),
            RuleSpec::Aliases(_) | RuleSpec::Predicate(_) => self.rule_conflict = true,
        }
        self
    }

    pub fn require_subcommand(mut self, require: bool) -> Self {
        self.require_subcommand = require;
        self
    }

    /// `true` parses local arguments before trying subcommands.
    pub fn arg_fallthrough(mut self, fallthrough: bool) -> Self {
        self.arg_fallthrough = fallthrough;
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn argument_order(mut self, order: ArgumentOrder) -> Self {
        self.order = order;
        self
    }

    pub fn subcommand(mut self, subcommand: CommandBuilder) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn handler<H: CommandHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    fn validate_name(&self) -> Result<(), BuildError> {
        if self.rule_conflict {
            return Err(BuildError::ConflictingNameRule(self.name.resolve()));
        }
        let CommandName::Static(name) = &self.name else {
            return Ok(());
        };
        if name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        if name.contains(char::is_whitespace) {
            return Err(BuildError::NameWhitespace(name.clone()));
        }
        Ok(())
    }

    /// Flatten this builder into `nodes`, returning the new node's id.
    fn flatten(
        self,
        nodes: &mut Vec<CommandNode>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        self.validate_name()?;

        let mut arguments = self
            .arguments
            .into_iter()
            .map(Argument::build)
            .collect::<Result<Vec<_>, _>>()?;
        if self.order == ArgumentOrder::Stacked {
            arguments.reverse();
        }

        let rule = match self.rule {
            RuleSpec::Exact => NameRule::Exact,
            RuleSpec::Aliases(set) => NameRule::AliasSet(set),
            RuleSpec::Predicate(pred) => NameRule::Predicate(pred),
        };

        let id = NodeId(nodes.len());
        nodes.push(CommandNode {
            name: self.name,
            rule,
            help: self.help,
            arguments,
            children: Vec::new(),
            parent,
            require_subcommand: self.require_subcommand,
            arg_fallthrough: self.arg_fallthrough,
            event_type: self.event_type,
            handler: self.handler,
        });

        let mut children = Vec::with_capacity(self.subcommands.len());
        for sub in self.subcommands {
            children.push(sub.flatten(nodes, Some(id))?);
        }
        nodes[id.0].children = children;
        Ok(id)
    }
}

/// Collects top-level commands and freezes them into a [`CommandTree`].
#[derive(Default)]
pub struct CommandTreeBuilder {
    commands: Vec<CommandBuilder>,
}

impl CommandTreeBuilder {
    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn build(self) -> Result<CommandTree, BuildError> {
        let mut nodes = Vec::new();
        let mut roots = Vec::with_capacity(self.commands.len());
        for command in self.commands {
            roots.push(command.flatten(&mut nodes, None)?);
        }
        Ok(CommandTree { nodes, roots })
    }
}
