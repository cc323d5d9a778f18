//! Passive watchers: pattern-matched handlers run on every message.
//!
//! Watchers ignore the command marker entirely. Several watchers can be
//! stacked on the same trigger with [`Combined`], which fires them
//! concurrently and only returns once every one of them has finished.

use crate::error::{BuildError, HandlerError, HandlerResult};
use crate::message::{ContentKind, EventType, Message, is_self_sent};
use crate::telemetry::spans;
use async_trait::async_trait;
use futures_util::future::join_all;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, debug};

/// One pattern match: the matched substring and its capture groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveMatch {
    pub matched: String,
    pub groups: Vec<Option<String>>,
}

impl PassiveMatch {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        Some(Self {
            matched: whole.as_str().to_string(),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }

    /// Capture group `n` (1-based, like the pattern).
    pub fn group(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(|g| g.as_deref())
    }
}

/// Matches handed to a passive handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassiveMatches {
    /// First match only.
    Single(PassiveMatch),
    /// Every non-overlapping match, left to right.
    Multiple(Vec<PassiveMatch>),
}

impl PassiveMatches {
    pub fn as_slice(&self) -> &[PassiveMatch] {
        match self {
            Self::Single(m) => std::slice::from_ref(m),
            Self::Multiple(ms) => ms,
        }
    }
}

/// Handler bound to a passive watcher.
#[async_trait]
pub trait PassiveHandler: Send + Sync {
    async fn handle(&self, msg: Arc<dyn Message>, matches: PassiveMatches) -> HandlerResult;
}

/// Adapter turning an async closure into a [`PassiveHandler`].
pub struct PassiveFn<F>(F);

pub fn passive_fn<F, Fut>(f: F) -> PassiveFn<F>
where
    F: Fn(Arc<dyn Message>, PassiveMatches) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    PassiveFn(f)
}

#[async_trait]
impl<F, Fut> PassiveHandler for PassiveFn<F>
where
    F: Fn(Arc<dyn Message>, PassiveMatches) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, msg: Arc<dyn Message>, matches: PassiveMatches) -> HandlerResult {
        (self.0)(msg, matches).await
    }
}

/// Anything that can be run against every incoming message.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Evaluate the message. Returns `true` if at least one handler ran.
    async fn watch(&self, msg: &Arc<dyn Message>) -> Result<bool, HandlerError>;
}

/// Extracts the text a watcher matches against.
pub type FieldFn = Arc<dyn Fn(&dyn Message) -> String + Send + Sync>;

/// A single pattern-matched watcher.
///
/// In single mode the pattern must match at the start of the field; in
/// `multiple` mode every match anywhere in the field is collected.
pub struct PassiveWatcher {
    source: String,
    pattern: Regex,
    kinds: HashSet<ContentKind>,
    field: FieldFn,
    event_type: EventType,
    multiple: bool,
    handler: Arc<dyn PassiveHandler>,
}

impl PassiveWatcher {
    pub fn builder(pattern: impl Into<String>) -> PassiveWatcherBuilder {
        PassiveWatcherBuilder::new(pattern)
    }

    /// The pattern as registered, without the start anchor.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Whether the message passes the self, event type and kind filters.
    pub fn accepts(&self, msg: &dyn Message) -> bool {
        !is_self_sent(msg)
            && msg.event_type() == self.event_type
            && (self.kinds.is_empty() || self.kinds.contains(&msg.kind()))
    }

    /// Match `text` against the pattern. `None` when nothing matched.
    ///
    /// Single mode only accepts a match beginning at offset 0.
    pub fn find(&self, text: &str) -> Option<PassiveMatches> {
        if self.multiple {
            let all: Vec<PassiveMatch> = self
                .pattern
                .captures_iter(text)
                .filter_map(|caps| PassiveMatch::from_captures(&caps))
                .collect();
            (!all.is_empty()).then_some(PassiveMatches::Multiple(all))
        } else {
            self.pattern
                .captures(text)
                .and_then(|caps| PassiveMatch::from_captures(&caps))
                .map(PassiveMatches::Single)
        }
    }

    /// Stack another watcher on the same trigger.
    pub fn combine(self, other: impl Watcher + 'static) -> Combined {
        Combined::new().with(self).with(other)
    }
}

#[async_trait]
impl Watcher for PassiveWatcher {
    async fn watch(&self, msg: &Arc<dyn Message>) -> Result<bool, HandlerError> {
        if !self.accepts(msg.as_ref()) {
            return Ok(false);
        }
        let data = (self.field)(msg.as_ref());
        let Some(matches) = self.find(&data) else {
            return Ok(false);
        };
        debug!(count = matches.as_slice().len(), "Passive pattern matched");
        self.handler
            .handle(Arc::clone(msg), matches)
            .instrument(spans::passive(self.pattern()))
            .await?;
        Ok(true)
    }
}

/// Builder for a [`PassiveWatcher`].
///
/// Defaults: text messages only, match against the body, single match.
pub struct PassiveWatcherBuilder {
    pattern: String,
    kinds: HashSet<ContentKind>,
    field: FieldFn,
    event_type: EventType,
    multiple: bool,
    handler: Option<Arc<dyn PassiveHandler>>,
}

impl PassiveWatcherBuilder {
    fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kinds: HashSet::from([ContentKind::Text]),
            field: Arc::new(|msg: &dyn Message| msg.body().to_string()),
            event_type: EventType::RoomMessage,
            multiple: false,
            handler: None,
        }
    }

    /// Accepted content kinds. An empty set accepts every kind.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = ContentKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn any_kind(self) -> Self {
        self.kinds([])
    }

    /// Text to match against, extracted from the message.
    pub fn field<F>(mut self, field: F) -> Self
    where
        F: Fn(&dyn Message) -> String + Send + Sync + 'static,
    {
        self.field = Arc::new(field);
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// Collect every match instead of just the first.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn handler<H: PassiveHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<PassiveWatcher, BuildError> {
        let handler = self.handler.ok_or(BuildError::MissingHandler)?;
        let compiled = if self.multiple {
            Regex::new(&self.pattern)
        } else {
            Regex::new(&format!("^(?:{})", self.pattern))
        };
        let pattern = compiled.map_err(|source| BuildError::Pattern {
            name: self.pattern.clone(),
            source,
        })?;
        Ok(PassiveWatcher {
            source: self.pattern,
            pattern,
            kinds: self.kinds,
            field: self.field,
            event_type: self.event_type,
            multiple: self.multiple,
            handler,
        })
    }
}

/// Watchers stacked on one trigger and fired together.
#[derive(Default)]
pub struct Combined {
    watchers: Vec<Arc<dyn Watcher>>,
}

impl Combined {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, watcher: impl Watcher + 'static) -> Self {
        self.watchers.push(Arc::new(watcher));
        self
    }

    pub fn with_shared(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watchers.push(watcher);
        self
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

#[async_trait]
impl Watcher for Combined {
    /// Runs every stacked watcher concurrently and waits for all of them.
    /// One failure does not stop the others; failures are aggregated.
    async fn watch(&self, msg: &Arc<dyn Message>) -> Result<bool, HandlerError> {
        let results = join_all(self.watchers.iter().map(|w| w.watch(msg))).await;

        let mut fired = false;
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(f) => fired |= f,
                Err(e) => errors.push(e),
            }
        }

        match errors.len() {
            0 => Ok(fired),
            1 => Err(errors.remove(0)),
            _ => Err(HandlerError::Multiple(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl PassiveHandler {
        passive_fn(|_msg, _matches| async { Ok(()) })
    }

    #[test]
    fn test_multiple_matches_in_order() {
        let watcher = PassiveWatcher::builder(r"#(\w+)")
            .multiple(true)
            .handler(noop())
            .build()
            .unwrap();
        let matches = watcher.find("see #a and #b").unwrap();
        assert_eq!(
            matches,
            PassiveMatches::Multiple(vec![
                PassiveMatch {
                    matched: "#a".into(),
                    groups: vec![Some("a".into())],
                },
                PassiveMatch {
                    matched: "#b".into(),
                    groups: vec![Some("b".into())],
                },
            ])
        );
    }

    #[test]
    fn test_single_match_takes_first() {
        let watcher = PassiveWatcher::builder(r"(\d+)%")
            .handler(noop())
            .build()
            .unwrap();
        let matches = watcher.find("10% then 20%").unwrap();
        let PassiveMatches::Single(m) = matches else {
            panic!("expected a single match");
        };
        assert_eq!(m.matched, "10%");
        assert_eq!(m.group(1), Some("10"));
        assert_eq!(m.group(0), None);
    }

    #[test]
    fn test_single_match_is_anchored_at_start() {
        let watcher = PassiveWatcher::builder(r"(\d+)%")
            .handler(noop())
            .build()
            .unwrap();
        assert_eq!(watcher.pattern(), r"(\d+)%");
        assert!(watcher.find("now 10% then 20%").is_none());
        assert!(watcher.find("10%").is_some());
    }

    #[test]
    fn test_multiple_is_not_anchored() {
        let watcher = PassiveWatcher::builder(r"(\d+)%")
            .multiple(true)
            .handler(noop())
            .build()
            .unwrap();
        let matches = watcher.find("now 10% then 20%").unwrap();
        assert_eq!(matches.as_slice().len(), 2);
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let watcher = PassiveWatcher::builder("a|b")
            .handler(noop())
            .build()
            .unwrap();
        assert!(watcher.find("xb").is_none());
        assert!(watcher.find("bx").is_some());
    }

    #[test]
    fn test_no_match_is_none() {
        let watcher = PassiveWatcher::builder(r"#(\w+)")
            .multiple(true)
            .handler(noop())
            .build()
            .unwrap();
        assert!(watcher.find("nothing here").is_none());
    }

    #[test]
    fn test_optional_groups_preserved() {
        let watcher = PassiveWatcher::builder(r"(a)?(b)")
            .handler(noop())
            .build()
            .unwrap();
        let matches = watcher.find("b").unwrap();
        assert_eq!(matches.as_slice()[0].groups, vec![None, Some("b".to_string())]);
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(
            PassiveWatcher::builder("x").build(),
            Err(BuildError::MissingHandler)
        ));
        assert!(matches!(
            PassiveWatcher::builder("(").handler(noop()).build(),
            Err(BuildError::Pattern { .. })
        ));
    }
}
