//! Message routing and handler supervision.
//!
//! The router feeds each message through the command tree and every
//! registered watcher. Handler failures stop at this layer: they are logged
//! and the router moves on, so one failing command can never halt processing
//! of other messages.

use crate::command::{CommandTree, Dispatch};
use crate::error::HandlerError;
use crate::message::Message;
use crate::passive::Watcher;
use crate::telemetry::spans;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info};

/// What happened to one message.
#[derive(Debug)]
pub struct RouteReport {
    pub command: Result<Dispatch, HandlerError>,
    pub passive: Vec<Result<bool, HandlerError>>,
}

impl RouteReport {
    /// Number of watchers whose handler ran.
    pub fn passive_fired(&self) -> usize {
        self.passive
            .iter()
            .filter(|r| matches!(r, Ok(true)))
            .count()
    }
}

/// Routes incoming messages to commands and passive watchers.
#[derive(Clone)]
pub struct EventRouter {
    tree: Arc<CommandTree>,
    watchers: Vec<Arc<dyn Watcher>>,
}

impl EventRouter {
    pub fn new(tree: CommandTree) -> Self {
        Self {
            tree: Arc::new(tree),
            watchers: Vec::new(),
        }
    }

    pub fn watcher(mut self, watcher: impl Watcher + 'static) -> Self {
        self.watchers.push(Arc::new(watcher));
        self
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Run command dispatch and all watchers on one message and report the
    /// outcome without logging it.
    pub async fn route(&self, msg: Arc<dyn Message>) -> RouteReport {
        let command = self.tree.dispatch(&msg);
        let passive = join_all(self.watchers.iter().map(|w| w.watch(&msg)));
        let (command, passive) = tokio::join!(command, passive);
        RouteReport { command, passive }
    }

    /// Route one message, logging handler failures and continuing.
    pub async fn handle(&self, msg: Arc<dyn Message>) {
        let span = spans::message(msg.sender());
        let report = self.route(msg).instrument(span).await;

        match &report.command {
            Ok(outcome) if outcome.is_matched() => debug!(?outcome, "Command dispatched"),
            Ok(_) => {}
            Err(e) => error!(code = e.error_code(), error = %e, "Command handler failed"),
        }
        for result in &report.passive {
            if let Err(e) = result {
                error!(code = e.error_code(), error = %e, "Passive handler failed");
            }
        }
    }

    /// Process messages until the channel closes.
    ///
    /// Each message runs on its own task; a panicking handler is logged and
    /// does not take the loop down with it.
    pub async fn run(self, mut rx: mpsc::Receiver<Arc<dyn Message>>) {
        info!(
            commands = self.tree.roots().len(),
            watchers = self.watchers.len(),
            "Router started"
        );
        let mut tasks = tokio::task::JoinSet::new();
        loop {
            tokio::select! {
                maybe_msg = rx.recv() => {
                    let Some(msg) = maybe_msg else { break };
                    let router = self.clone();
                    tasks.spawn(async move { router.handle(msg).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Message task aborted");
                    }
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Message task aborted");
            }
        }
        info!("Router stopped");
    }
}
