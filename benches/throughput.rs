use async_trait::async_trait;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use slirc_dispatch::{
    Argument, CommandBuilder, CommandTree, Message, PassiveWatcher, ReplyError, Watcher,
    handler_fn, passive_fn,
};
use std::sync::Arc;

// Dispatch and passive matching against an in-memory message. Replies are
// discarded so the numbers reflect matching and argument parsing only.

struct BenchMessage {
    body: String,
}

#[async_trait]
impl Message for BenchMessage {
    fn sender(&self) -> &str {
        "@bench:local"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bot_id(&self) -> &str {
        "@bot:local"
    }

    async fn reply(&self, _text: &str) -> Result<(), ReplyError> {
        Ok(())
    }
}

fn message(body: &str) -> Arc<dyn Message> {
    Arc::new(BenchMessage {
        body: body.to_string(),
    })
}

fn tree() -> CommandTree {
    let noop = || handler_fn(|_msg, _args| async { Ok(()) });
    let mut builder = CommandTree::builder();
    for i in 0..20 {
        builder = builder.command(CommandBuilder::new(format!("cmd{i}")).handler(noop()));
    }
    builder
        .command(
            CommandBuilder::new("room")
                .argument(Argument::pattern("room", r"#\w+"))
                .subcommand(
                    CommandBuilder::new("kick")
                        .argument(Argument::plain("user"))
                        .argument(Argument::plain("reason").raw().optional())
                        .handler(noop()),
                ),
        )
        .build()
        .unwrap()
}

fn dispatch_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tree = tree();
    let nested = message("!room #lobby kick mallory being rude");
    let plain = message("just chatting, nothing to see");

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("nested_subcommand", |b| {
        b.to_async(&rt).iter(|| async { tree.dispatch(&nested).await.unwrap() })
    });
    group.bench_function("no_marker", |b| {
        b.to_async(&rt).iter(|| async { tree.dispatch(&plain).await.unwrap() })
    });

    group.finish();
}

fn passive_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let watcher = PassiveWatcher::builder(r"#(\w+)")
        .multiple(true)
        .handler(passive_fn(|_msg, _matches| async { Ok(()) }))
        .build()
        .unwrap();
    let msg = message("see #a and #b and #c in #lobby");

    let mut group = c.benchmark_group("passive");
    group.throughput(Throughput::Elements(1));
    group.bench_function("hashtags_multiple", |b| {
        b.to_async(&rt).iter(|| async { watcher.watch(&msg).await.unwrap() })
    });
    group.finish();
}

criterion_group!(benches, dispatch_benchmark, passive_benchmark);
criterion_main!(benches);
