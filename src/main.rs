//! slirc-dispatch - Straylight command dispatch engine, console bot.
//!
//! Reads one chat message per stdin line and prints the bot's replies on
//! stdout. Logs go to stderr.

use anyhow::Context as _;
use dashmap::DashMap;
use slirc_dispatch::config::{Config, LogFormat};
use slirc_dispatch::console::{ConsoleOutput, pump_lines};
use slirc_dispatch::{
    ArgValue, Argument, ArgumentSyntaxError, BuildError, CommandBuilder, CommandTree,
    EventRouter, HandlerError, Message, PassiveWatcher, handler_fn, passive_fn,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWrite, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Incoming message queue depth between the console and the router.
const MESSAGE_QUEUE_SIZE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("failed to load config {path}"))?
        }
        None => Config::default(),
    };

    init_tracing(&config);

    info!(
        identity = %config.bot.identity,
        sender = %config.bot.sender,
        "Starting slirc-dispatch console"
    );

    let reminders = Reminders::new();
    let router = build_router(Arc::clone(&reminders))?;
    let (tx, rx) = mpsc::channel(MESSAGE_QUEUE_SIZE);
    let router_task = tokio::spawn(router.run(rx));

    let stdout: Box<dyn AsyncWrite + Send + Unpin> = Box::new(tokio::io::stdout());
    let out: ConsoleOutput = Arc::new(Mutex::new(stdout));
    let stdin = BufReader::new(tokio::io::stdin());
    let count = pump_lines(stdin, &config.bot.sender, &config.bot.identity, out, tx).await?;
    info!(count, "Console input closed");

    if let Err(e) = router_task.await {
        error!(error = %e, "Router task failed");
    }

    let dropped = reminders.shutdown().await;
    if dropped > 0 {
        warn!(dropped, "Shutting down with undelivered reminders");
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match config.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Token parser for signed integers.
fn integer(token: &str) -> Result<Option<ArgValue>, ArgumentSyntaxError> {
    if token.is_empty() {
        return Ok(None);
    }
    token
        .parse::<i64>()
        .map(|n| Some(ArgValue::Integer(n)))
        .map_err(|_| ArgumentSyntaxError::new(format!("{token:?} is not a number")))
}

fn echo_command() -> CommandBuilder {
    CommandBuilder::new("echo")
        .alias("say")
        .help("Repeat text back")
        .argument(Argument::plain("text").raw())
        .handler(handler_fn(|msg, args| async move {
            msg.reply(args.text("text").unwrap_or_default()).await?;
            Ok(())
        }))
}

fn add_command() -> CommandBuilder {
    CommandBuilder::new("add")
        .help("Add two integers")
        .argument(Argument::parser("a", integer))
        .argument(Argument::parser("b", integer))
        .handler(handler_fn(|msg, args| async move {
            let a = args.integer("a").unwrap_or_default();
            let b = args.integer("b").unwrap_or_default();
            let sum = a
                .checked_add(b)
                .ok_or_else(|| HandlerError::Failed(format!("{a} + {b} overflows")))?;
            msg.reply(&format!("{a} + {b} = {sum}")).await?;
            Ok(())
        }))
}

fn karma_command(store: Arc<DashMap<String, i64>>) -> CommandBuilder {
    const USER_PATTERN: &str = r"@?[\w.:\-]+";

    let adjust = |delta: i64, store: Arc<DashMap<String, i64>>| {
        handler_fn(move |msg, args| {
            let store = Arc::clone(&store);
            async move {
                let user = args.text("user").unwrap_or_default().to_string();
                let total = {
                    let mut entry = store.entry(user.clone()).or_insert(0);
                    *entry += delta;
                    *entry
                };
                msg.reply(&format!("{user} now has {total} karma")).await?;
                Ok(())
            }
        })
    };

    let show_store = Arc::clone(&store);
    CommandBuilder::new("karma")
        .help("Track karma")
        .subcommand(
            CommandBuilder::new("up")
                .alias("++")
                .help("Give karma")
                .argument(Argument::pattern("user", USER_PATTERN))
                .handler(adjust(1, Arc::clone(&store))),
        )
        .subcommand(
            CommandBuilder::new("down")
                .alias("--")
                .help("Take karma")
                .argument(Argument::pattern("user", USER_PATTERN))
                .handler(adjust(-1, store)),
        )
        .subcommand(
            CommandBuilder::new("show")
                .help("Show karma")
                .argument(Argument::pattern("user", USER_PATTERN).optional())
                .handler(handler_fn(move |msg, args| {
                    let store = Arc::clone(&show_store);
                    async move {
                        let user = args
                            .text("user")
                            .map(str::to_string)
                            .unwrap_or_else(|| msg.sender().to_string());
                        let total = store.get(&user).map(|v| *v).unwrap_or_default();
                        msg.reply(&format!("{user} has {total} karma")).await?;
                        Ok(())
                    }
                })),
        )
}

struct Reminders {
    next_id: AtomicU64,
    pending: DashMap<u64, (String, String)>,
    tasks: Mutex<JoinSet<()>>,
}

impl Reminders {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    /// Record a reminder and deliver it to the sender after `delay`.
    async fn schedule(
        store: &Arc<Self>,
        msg: Arc<dyn Message>,
        text: String,
        delay: Duration,
    ) -> u64 {
        let id = store.next_id.fetch_add(1, Ordering::Relaxed);
        store
            .pending
            .insert(id, (msg.sender().to_string(), text.clone()));

        let owner = Arc::clone(store);
        let mut tasks = store.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            if owner.pending.remove(&id).is_some() {
                if let Err(e) = msg.reply(&format!("Reminder: {text}")).await {
                    error!(error = %e, id, "Failed to deliver reminder");
                }
            }
        });
        id
    }

    /// Abort every undelivered reminder. Returns how many were dropped.
    async fn shutdown(&self) -> usize {
        self.tasks.lock().await.abort_all();
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

fn remind_command(reminders: Arc<Reminders>) -> CommandBuilder {
    let list_store = Arc::clone(&reminders);
    CommandBuilder::new("remind")
        .help("Set a reminder")
        .arg_fallthrough(false)
        .argument(Argument::pattern("minutes", r"\d+"))
        .argument(Argument::plain("text").raw())
        .subcommand(
            CommandBuilder::new("list")
                .help("List pending reminders")
                .handler(handler_fn(move |msg, _args| {
                    let store = Arc::clone(&list_store);
                    async move {
                        let mut mine: Vec<String> = store
                            .pending
                            .iter()
                            .filter(|r| r.value().0 == msg.sender())
                            .map(|r| format!("#{} {}", r.key(), r.value().1))
                            .collect();
                        mine.sort();
                        if mine.is_empty() {
                            msg.reply("No pending reminders").await?;
                        } else {
                            msg.reply(&mine.join("\n")).await?;
                        }
                        Ok(())
                    }
                })),
        )
        .handler(handler_fn(move |msg, args| {
            let store = Arc::clone(&reminders);
            async move {
                let minutes: u64 = args
                    .text("minutes")
                    .and_then(|m| m.parse().ok())
                    .ok_or_else(|| HandlerError::Failed("minutes out of range".into()))?;
                let text = args.text("text").unwrap_or_default().to_string();
                let delay = Duration::from_secs(minutes.saturating_mul(60));
                let id = Reminders::schedule(&store, Arc::clone(&msg), text, delay).await;
                msg.reply(&format!("Reminder #{id} set for {minutes} minute(s)"))
                    .await?;
                Ok(())
            }
        }))
}

fn build_router(reminders: Arc<Reminders>) -> Result<EventRouter, BuildError> {
    let karma = Arc::new(DashMap::new());

    let tree = CommandTree::builder()
        .command(echo_command())
        .command(add_command())
        .command(karma_command(karma))
        .command(remind_command(reminders))
        .build()?;

    let hashtags = PassiveWatcher::builder(r"#(\w+)")
        .multiple(true)
        .handler(passive_fn(|msg, matches| async move {
            let tags: Vec<&str> = matches
                .as_slice()
                .iter()
                .filter_map(|m| m.group(1))
                .collect();
            msg.reply(&format!("Tags: {}", tags.join(", "))).await?;
            Ok(())
        }))
        .build()?;

    let links = PassiveWatcher::builder(r"https?://\S+")
        .multiple(true)
        .handler(passive_fn(|msg, matches| async move {
            if let Some(link) = matches.as_slice().first() {
                msg.reply(&format!("Link spotted: {}", link.matched)).await?;
            }
            Ok(())
        }))
        .build()?;

    Ok(EventRouter::new(tree).watcher(hashtags.combine(links)))
}
