//! Command tree: registration, argument matching, dispatch and usage text.
//!
//! - [`args`]: argument specifications and the plain/pattern/custom matchers
//! - [`node`]: command nodes, name rules and the frozen [`CommandTree`]
//! - [`builder`]: registration-time builders
//! - [`dispatch`]: per-message dispatch
//! - [`usage`]: usage and help rendering

pub mod args;
pub mod builder;
pub mod dispatch;
pub mod node;
pub mod usage;

pub use args::{ArgValue, Argument, ArgumentSpec, CallArgs, MatchResult, Matcher};
pub use builder::{ArgumentOrder, CommandBuilder, CommandTreeBuilder};
pub use dispatch::Dispatch;
pub use node::{
    COMMAND_MARKER, CommandHandler, CommandName, CommandNode, CommandTree, FnHandler, NameRule,
    NodeId, handler_fn,
};
pub use usage::SUBCOMMAND_USAGE;
