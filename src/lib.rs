//! slirc-dispatch - Straylight command dispatch engine.
//!
//! Matches incoming chat messages against a tree of `!`-prefixed commands
//! with nested subcommands and typed arguments, and independently runs
//! pattern-based passive watchers over every message.
//!
//! ```ignore
//! let tree = CommandTree::builder()
//!     .command(
//!         CommandBuilder::new("greet")
//!             .help("Say hello")
//!             .argument(Argument::plain("name"))
//!             .handler(handler_fn(|msg, args| async move {
//!                 let name = args.text("name").unwrap_or_default();
//!                 msg.reply(&format!("Hello, {name}!")).await?;
//!                 Ok(())
//!             })),
//!     )
//!     .build()?;
//! let router = EventRouter::new(tree);
//! ```

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod message;
pub mod passive;
pub mod router;
pub mod telemetry;

pub use command::{
    ArgValue, Argument, ArgumentOrder, CallArgs, CommandBuilder, CommandHandler, CommandTree,
    Dispatch, NodeId, handler_fn,
};
pub use error::{
    ArgumentSyntaxError, BuildError, DispatchError, HandlerError, HandlerResult, ReplyError,
};
pub use message::{ContentKind, EventType, Message};
pub use passive::{
    Combined, PassiveHandler, PassiveMatch, PassiveMatches, PassiveWatcher, Watcher, passive_fn,
};
pub use router::{EventRouter, RouteReport};
