//! Command nodes and the frozen command tree.
//!
//! Nodes live in an arena owned by [`CommandTree`]. A parent owns its
//! children through their [`NodeId`]s; each child keeps a non-owning
//! `NodeId` back-link to its parent for prefix walking. Nothing in the tree
//! changes after [`super::CommandTreeBuilder::build`].

use super::args::{ArgumentSpec, CallArgs};
use crate::error::HandlerResult;
use crate::message::{EventType, Message};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The leading character of every command invocation.
pub const COMMAND_MARKER: char = '!';

/// Index of a node inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Handler bound to a command node.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, msg: Arc<dyn Message>, args: CallArgs) -> HandlerResult;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a command handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<dyn Message>, CallArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Arc<dyn Message>, CallArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, msg: Arc<dyn Message>, args: CallArgs) -> HandlerResult {
        (self.0)(msg, args).await
    }
}

/// Source of a node's display name.
#[derive(Clone)]
pub enum CommandName {
    Static(String),
    /// Re-evaluated on every read, e.g. a name taken from plugin config.
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl CommandName {
    pub fn resolve(&self) -> String {
        match self {
            Self::Static(name) => name.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(name) => f.debug_tuple("Static").field(name).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// How a candidate name is tested against a node.
#[derive(Clone)]
pub enum NameRule {
    /// Equal to the node's name.
    Exact,
    /// Equal to the node's name or one of the aliases.
    AliasSet(HashSet<String>),
    /// Caller-supplied predicate; the node's name is not consulted.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl fmt::Debug for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("Exact"),
            Self::AliasSet(aliases) => f.debug_tuple("AliasSet").field(aliases).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A registered command or subcommand.
pub struct CommandNode {
    pub(crate) name: CommandName,
    pub(crate) rule: NameRule,
    pub(crate) help: Option<String>,
    pub(crate) arguments: Vec<ArgumentSpec>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) require_subcommand: bool,
    pub(crate) arg_fallthrough: bool,
    pub(crate) event_type: EventType,
    pub(crate) handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandNode {
    /// Current display name.
    pub fn name(&self) -> String {
        self.name.resolve()
    }

    /// Test a candidate name against this node's rule.
    pub fn matches_name(&self, candidate: &str) -> bool {
        match &self.rule {
            NameRule::Exact => candidate == self.name(),
            NameRule::AliasSet(aliases) => {
                aliases.contains(candidate) || candidate == self.name()
            }
            NameRule::Predicate(pred) => pred(candidate),
        }
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn require_subcommand(&self) -> bool {
        self.require_subcommand
    }

    pub fn arg_fallthrough(&self) -> bool {
        self.arg_fallthrough
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("arguments", &self.arguments)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("require_subcommand", &self.require_subcommand)
            .field("arg_fallthrough", &self.arg_fallthrough)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Immutable tree of registered commands.
#[derive(Debug, Default)]
pub struct CommandTree {
    pub(crate) nodes: Vec<CommandNode>,
    pub(crate) roots: Vec<NodeId>,
}

impl CommandTree {
    pub fn builder() -> super::CommandTreeBuilder {
        super::CommandTreeBuilder::default()
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this tree. The same applies to
    /// every method taking a [`NodeId`] (`dispatch_node`, `usage`,
    /// `full_help`, `full_prefix`, ...). Use [`CommandTree::get`] for ids of
    /// unknown origin.
    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    /// Node by id, or `None` if the id is out of range for this tree.
    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Top-level commands in registration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First top-level command whose name rule accepts `name`.
    pub fn find_root(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.node(*id).matches_name(name))
    }

    /// First child of `parent` whose name rule accepts `name`.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|id| self.node(*id).matches_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;

    fn tree(names: &[&str]) -> CommandTree {
        names
            .iter()
            .fold(CommandTree::builder(), |b, n| b.command(CommandBuilder::new(*n)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_rejects_foreign_id() {
        let big = tree(&["a", "b", "c"]);
        let small = tree(&["x"]);
        let foreign = big.roots()[2];
        assert!(small.get(foreign).is_none());
        assert_eq!(small.get(small.roots()[0]).map(CommandNode::name).as_deref(), Some("x"));
    }

    #[test]
    #[should_panic]
    fn test_node_panics_on_foreign_id() {
        let big = tree(&["a", "b", "c"]);
        let small = tree(&["x"]);
        small.node(big.roots()[2]);
    }
}
