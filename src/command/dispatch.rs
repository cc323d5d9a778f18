//! Per-message command dispatch.
//!
//! Dispatch is ordered and non-backtracking: the command name is resolved,
//! arguments are consumed strictly in registration order, and the first
//! matching subcommand (in registration order) takes over the rest of the
//! text. Matching never suspends; the only awaits are replies and the bound
//! handler itself.

use super::args::{ArgValue, CallArgs};
use super::node::{COMMAND_MARKER, CommandTree, NodeId};
use crate::error::{DispatchError, HandlerError};
use crate::message::{Message, is_self_sent, reply_logged};
use crate::telemetry::{CommandTimer, spans};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::{Instrument, debug};

/// Outcome of dispatching a message against a node or the whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Self-sent, no command marker, or a different event type.
    Ignored,
    /// The name rule did not accept the command name; try the next sibling.
    NoMatch,
    /// A handler ran to completion.
    Handled,
    /// The node had no handler; its help block was sent instead.
    HelpShown,
    /// Matched but invalid. The user has already been told why.
    Rejected(DispatchError),
}

impl Dispatch {
    /// True if some node accepted the command name.
    pub fn is_matched(&self) -> bool {
        !matches!(self, Self::Ignored | Self::NoMatch)
    }
}

/// Split at the first whitespace character, dropping that character.
#[inline]
pub(crate) fn split_in_two(text: &str) -> (&str, &str) {
    match text.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((idx, c)) => (&text[..idx], &text[idx + c.len_utf8()..]),
        None => (text, ""),
    }
}

impl CommandTree {
    /// Dispatch a message against every top-level command in registration
    /// order. The first command whose name rule matches handles it.
    pub async fn dispatch(&self, msg: &Arc<dyn Message>) -> Result<Dispatch, HandlerError> {
        if is_self_sent(msg.as_ref()) {
            return Ok(Dispatch::Ignored);
        }
        if !msg.body().starts_with(COMMAND_MARKER) {
            return Ok(Dispatch::Ignored);
        }

        let empty = CallArgs::new();
        let mut outcome = Dispatch::NoMatch;
        for root in &self.roots {
            match self.dispatch_node(*root, msg, &empty, None).await? {
                Dispatch::NoMatch => continue,
                Dispatch::Ignored => outcome = Dispatch::Ignored,
                other => return Ok(other),
            }
        }
        if outcome == Dispatch::NoMatch {
            debug!(sender = %msg.sender(), "No command matched");
        }
        Ok(outcome)
    }

    /// Dispatch a message against a single node.
    ///
    /// `remaining` is `None` for a top-level call: the body must start with
    /// the command marker and the first word must satisfy the node's name
    /// rule. Subcommand calls pass the text left after the parent consumed
    /// its name and arguments, along with the parent's accumulated arguments.
    pub fn dispatch_node<'a>(
        &'a self,
        id: NodeId,
        msg: &'a Arc<dyn Message>,
        existing: &'a CallArgs,
        remaining: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Dispatch, HandlerError>> {
        async move {
            if is_self_sent(msg.as_ref()) {
                return Ok(Dispatch::Ignored);
            }
            let node = self.node(id);

            let remaining = match remaining {
                Some(text) => text,
                None => {
                    if msg.event_type() != node.event_type() {
                        return Ok(Dispatch::Ignored);
                    }
                    let Some(rest) = msg.body().strip_prefix(COMMAND_MARKER) else {
                        return Ok(Dispatch::Ignored);
                    };
                    let (name, rest) = split_in_two(rest);
                    if !node.matches_name(name) {
                        return Ok(Dispatch::NoMatch);
                    }
                    rest
                }
            };

            let span = spans::dispatch(&node.name(), msg.sender());
            self.run_node(id, msg, existing.clone(), remaining)
                .instrument(span)
                .await
        }
        .boxed()
    }

    async fn run_node(
        &self,
        id: NodeId,
        msg: &Arc<dyn Message>,
        mut call_args: CallArgs,
        remaining: &str,
    ) -> Result<Dispatch, HandlerError> {
        let node = self.node(id);

        if !node.arg_fallthrough() && node.has_children() {
            if let Some(result) = self.try_subcommand(id, msg, &call_args, remaining).await? {
                return Ok(result);
            }
        }

        let remaining = match self.parse_arguments(id, msg, &mut call_args, remaining).await {
            Ok(rest) => rest,
            Err(e) => {
                debug!(code = e.error_code(), error = %e, "Command rejected");
                return Ok(Dispatch::Rejected(e));
            }
        };

        if node.arg_fallthrough() && node.has_children() {
            if let Some(result) = self.try_subcommand(id, msg, &call_args, &remaining).await? {
                return Ok(result);
            }
            if node.require_subcommand() {
                debug!("No subcommand matched, sending help");
                reply_logged(msg.as_ref(), &self.full_help(id)).await;
                return Ok(Dispatch::Rejected(DispatchError::SubcommandRequired));
            }
        }

        let Some(handler) = &node.handler else {
            reply_logged(msg.as_ref(), &self.full_help(id)).await;
            return Ok(Dispatch::HelpShown);
        };

        let _timer = CommandTimer::new(self.full_prefix(id));
        handler.handle(Arc::clone(msg), call_args).await?;
        Ok(Dispatch::Handled)
    }

    /// First child whose name rule accepts the next word takes the call.
    async fn try_subcommand(
        &self,
        id: NodeId,
        msg: &Arc<dyn Message>,
        call_args: &CallArgs,
        remaining: &str,
    ) -> Result<Option<Dispatch>, HandlerError> {
        let (name, rest) = split_in_two(remaining.trim());
        let Some(child) = self.find_child(id, name) else {
            return Ok(None);
        };
        debug!(subcommand = %name, "Dispatching to subcommand");
        let result = self.dispatch_node(child, msg, call_args, Some(rest)).await?;
        Ok(Some(result))
    }

    /// Apply each argument's matcher in order to the trimmed remaining text.
    ///
    /// Returns the unconsumed text. On failure the user has been replied to.
    async fn parse_arguments(
        &self,
        id: NodeId,
        msg: &Arc<dyn Message>,
        call_args: &mut CallArgs,
        remaining: &str,
    ) -> Result<String, DispatchError> {
        let mut text = remaining.to_string();
        for arg in self.node(id).arguments() {
            match arg.match_text(text.trim()) {
                Ok((rest, value)) => {
                    let missing =
                        arg.is_required() && !value.as_ref().is_some_and(ArgValue::is_truthy);
                    call_args.insert(arg.name(), value);
                    text = rest;
                    if missing {
                        reply_logged(msg.as_ref(), &self.usage(id)).await;
                        return Err(DispatchError::MissingArgument {
                            name: arg.name().to_string(),
                        });
                    }
                }
                Err(e) => {
                    let reply = if e.show_usage {
                        format!("{}\n{}", e.message, self.usage(id))
                    } else {
                        e.message.clone()
                    };
                    reply_logged(msg.as_ref(), &reply).await;
                    return Err(DispatchError::Syntax(e));
                }
            }
        }
        Ok(text)
    }
}
