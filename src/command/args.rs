//! Argument specifications and the three matcher variants.
//!
//! Every matcher shares one contract: given the remaining text, return the
//! new remaining text and either a value or "absent". Matchers never look at
//! anything but their input, and may reject it with an
//! [`ArgumentSyntaxError`] that aborts the whole dispatch.

use crate::error::{ArgumentSyntaxError, BuildError};
use regex::Regex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Value extracted by a matcher.
#[derive(Clone)]
pub enum ArgValue {
    Text(String),
    /// Capture groups of a pattern, in group order.
    Groups(Vec<Option<String>>),
    Integer(i64),
    /// Arbitrary value produced by a custom parser.
    Any(Arc<dyn Any + Send + Sync>),
}

impl ArgValue {
    /// Whether the value satisfies a `required` argument.
    ///
    /// Empty text and an empty group list count as missing. Typed values
    /// are always present, so `Integer(0)` is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Groups(g) => !g.is_empty(),
            Self::Integer(_) | Self::Any(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Groups(g) => f.debug_tuple("Groups").field(g).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Groups(a), Self::Groups(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Any(a), Self::Any(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

/// Arguments accumulated from the root down to the invoked node.
///
/// An entry whose value is `None` was matched as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    values: HashMap<String, Option<ArgValue>>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: Option<ArgValue>) {
        self.values.insert(name.to_string(), value);
    }

    /// Value bound to `name`, if present and not absent.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// True if `name` was matched by some node.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// True if `name` was matched and came back absent.
    pub fn is_absent(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(None))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_text)
    }

    pub fn groups(&self, name: &str) -> Option<&[Option<String>]> {
        match self.get(name) {
            Some(ArgValue::Groups(g)) => Some(g),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ArgValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Downcast a custom parser's [`ArgValue::Any`] value.
    pub fn downcast<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        match self.get(name) {
            Some(ArgValue::Any(v)) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of a single match attempt: `(remaining_text, value_or_absent)`.
pub type MatchResult = (String, Option<ArgValue>);

/// Parser given only the first token. A falsy or `None` result is absent.
pub type TokenParser =
    Arc<dyn Fn(&str) -> Result<Option<ArgValue>, ArgumentSyntaxError> + Send + Sync>;

/// Parser that owns the full remaining text and returns its own remainder.
pub type RawParser = Arc<dyn Fn(&str) -> Result<MatchResult, ArgumentSyntaxError> + Send + Sync>;

/// Closed set of matcher kinds.
#[derive(Clone)]
pub enum Matcher {
    Plain,
    /// Anchored at both ends for a token, only at the start for raw capture.
    Pattern(Regex),
    Token(TokenParser),
    Raw(RawParser),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Token(_) => f.write_str("Token(..)"),
            Self::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

/// Split off the first whitespace-delimited token.
///
/// The remainder keeps its leading whitespace.
#[inline]
pub(crate) fn first_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => text.split_at(idx),
        None => (text, ""),
    }
}

/// A registered argument of a command node.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) required: bool,
    pub(crate) raw: bool,
    pub(crate) matcher: Matcher,
}

impl ArgumentSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// `<label>` when required, `[label]` otherwise.
    pub fn usage(&self) -> String {
        if self.required {
            format!("<{}>", self.label)
        } else {
            format!("[{}]", self.label)
        }
    }

    /// Match this argument against the (already trimmed) remaining text.
    pub fn match_text(&self, text: &str) -> Result<MatchResult, ArgumentSyntaxError> {
        match &self.matcher {
            Matcher::Plain => Ok(self.match_plain(text)),
            Matcher::Pattern(re) => Ok(self.match_pattern(re, text)),
            Matcher::Token(parser) => {
                let (token, rest) = first_token(text);
                match parser(token)? {
                    Some(value) if value.is_truthy() => Ok((rest.to_string(), Some(value))),
                    _ => Ok((text.to_string(), None)),
                }
            }
            Matcher::Raw(parser) => parser(text),
        }
    }

    fn match_plain(&self, text: &str) -> MatchResult {
        if self.raw {
            return (String::new(), Some(ArgValue::Text(text.to_string())));
        }
        let (token, rest) = first_token(text);
        (rest.to_string(), Some(ArgValue::Text(token.to_string())))
    }

    fn match_pattern(&self, re: &Regex, text: &str) -> MatchResult {
        let subject = if self.raw { text } else { first_token(text).0 };
        let Some(caps) = re.captures(subject) else {
            return (text.to_string(), None);
        };
        let Some(whole) = caps.get(0) else {
            return (text.to_string(), None);
        };

        let value = if caps.len() > 1 {
            ArgValue::Groups(
                caps.iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect(),
            )
        } else {
            ArgValue::Text(whole.as_str().to_string())
        };

        let mut remaining = String::with_capacity(text.len());
        remaining.push_str(&text[..whole.start()]);
        remaining.push_str(&text[whole.end()..]);
        (remaining, Some(value))
    }
}

/// Builder for an [`ArgumentSpec`].
///
/// Arguments are required by default.
pub struct Argument {
    name: String,
    label: Option<String>,
    required: bool,
    raw: bool,
    kind: ArgumentKind,
}

enum ArgumentKind {
    Plain,
    Pattern(String),
    Token(TokenParser),
    Raw(RawParser),
}

impl Argument {
    fn with_kind(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: true,
            raw: false,
            kind,
        }
    }

    /// Takes the first token, or everything with [`Argument::raw`].
    pub fn plain(name: impl Into<String>) -> Self {
        Self::with_kind(name, ArgumentKind::Plain)
    }

    /// Matches a regular expression against the first token (or the text
    /// start with [`Argument::raw`]).
    pub fn pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_kind(name, ArgumentKind::Pattern(pattern.into()))
    }

    /// Custom parser applied to the first token.
    pub fn parser<F>(name: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Result<Option<ArgValue>, ArgumentSyntaxError> + Send + Sync + 'static,
    {
        Self::with_kind(name, ArgumentKind::Token(Arc::new(parser)))
    }

    /// Custom parser that consumes the remaining text itself. Implies raw capture.
    pub fn raw_parser<F>(name: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Result<MatchResult, ArgumentSyntaxError> + Send + Sync + 'static,
    {
        let mut arg = Self::with_kind(name, ArgumentKind::Raw(Arc::new(parser)));
        arg.raw = true;
        arg
    }

    /// Display label for usage text. Defaults to the name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// Capture the entire remaining text instead of a single token.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub(crate) fn build(self) -> Result<ArgumentSpec, BuildError> {
        if self.name.is_empty() {
            return Err(BuildError::EmptyArgumentName);
        }
        let matcher = match self.kind {
            ArgumentKind::Plain => Matcher::Plain,
            ArgumentKind::Pattern(pattern) => {
                let anchored = if self.raw {
                    format!("^(?:{pattern})")
                } else {
                    format!("^(?:{pattern})$")
                };
                let re = Regex::new(&anchored).map_err(|source| BuildError::Pattern {
                    name: self.name.clone(),
                    source,
                })?;
                Matcher::Pattern(re)
            }
            ArgumentKind::Token(parser) => Matcher::Token(parser),
            ArgumentKind::Raw(parser) => Matcher::Raw(parser),
        };
        let label = self.label.unwrap_or_else(|| self.name.clone());
        Ok(ArgumentSpec {
            name: self.name,
            label,
            required: self.required,
            raw: self.raw,
            matcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(arg: Argument) -> ArgumentSpec {
        arg.build().unwrap()
    }

    #[test]
    fn test_plain_takes_first_token() {
        let arg = spec(Argument::plain("name"));
        let (rest, value) = arg.match_text("alice bob").unwrap();
        assert_eq!(rest, " bob");
        assert_eq!(value, Some(ArgValue::from("alice")));
    }

    #[test]
    fn test_plain_empty_input_yields_empty_text() {
        let arg = spec(Argument::plain("name"));
        let (rest, value) = arg.match_text("").unwrap();
        assert_eq!(rest, "");
        assert_eq!(value, Some(ArgValue::from("")));
        assert!(!value.unwrap().is_truthy());
    }

    #[test]
    fn test_plain_raw_takes_everything() {
        let arg = spec(Argument::plain("text").raw());
        let (rest, value) = arg.match_text("hello there world").unwrap();
        assert_eq!(rest, "");
        assert_eq!(value, Some(ArgValue::from("hello there world")));
    }

    #[test]
    fn test_pattern_token_match() {
        let arg = spec(Argument::pattern("count", r"\d+"));
        let (rest, value) = arg.match_text("42 rest").unwrap();
        assert_eq!(rest, " rest");
        assert_eq!(value, Some(ArgValue::from("42")));
    }

    #[test]
    fn test_pattern_token_is_anchored_at_both_ends() {
        let arg = spec(Argument::pattern("count", r"\d+"));
        let (rest, value) = arg.match_text("42abc rest").unwrap();
        assert_eq!(rest, "42abc rest");
        assert_eq!(value, None);
    }

    #[test]
    fn test_pattern_groups() {
        let arg = spec(Argument::pattern("dice", r"(\d+)d(\d+)"));
        let (rest, value) = arg.match_text("2d6 for damage").unwrap();
        assert_eq!(rest, " for damage");
        assert_eq!(
            value,
            Some(ArgValue::Groups(vec![Some("2".into()), Some("6".into())]))
        );
    }

    #[test]
    fn test_pattern_raw_anchored_at_start_only() {
        let arg = spec(Argument::pattern("greeting", r"hello \w+").raw());
        let (rest, value) = arg.match_text("hello big world").unwrap();
        assert_eq!(rest, " world");
        assert_eq!(value, Some(ArgValue::from("hello big")));

        let (rest, value) = arg.match_text("oh hello big").unwrap();
        assert_eq!(rest, "oh hello big");
        assert_eq!(value, None);
    }

    #[test]
    fn test_invalid_pattern_is_build_error() {
        let err = Argument::pattern("bad", "(").build().unwrap_err();
        assert!(matches!(err, BuildError::Pattern { .. }));
    }

    #[test]
    fn test_token_parser_trims_token() {
        let arg = spec(Argument::parser("n", |tok| Ok(tok.parse::<i64>().ok().map(ArgValue::from))));
        let (rest, value) = arg.match_text("17 more").unwrap();
        assert_eq!(rest, " more");
        assert_eq!(value, Some(ArgValue::Integer(17)));

        let (rest, value) = arg.match_text("x more").unwrap();
        assert_eq!(rest, "x more");
        assert_eq!(value, None);
    }

    #[test]
    fn test_token_parser_zero_is_present() {
        let arg = spec(Argument::parser("n", |tok| Ok(tok.parse::<i64>().ok().map(ArgValue::from))));
        let (rest, value) = arg.match_text("0 more").unwrap();
        assert_eq!(rest, " more");
        assert_eq!(value, Some(ArgValue::Integer(0)));
        assert!(ArgValue::Integer(0).is_truthy());
    }

    #[test]
    fn test_token_parser_falsy_result_is_absent() {
        let arg = spec(Argument::parser("n", |_| Ok(Some(ArgValue::from("")))));
        let (rest, value) = arg.match_text("tok").unwrap();
        assert_eq!(rest, "tok");
        assert_eq!(value, None);
    }

    #[test]
    fn test_raw_parser_owns_remainder() {
        let arg = spec(Argument::raw_parser("quoted", |text| {
            let inner = text
                .strip_prefix('"')
                .ok_or_else(|| ArgumentSyntaxError::new("expected a quote"))?;
            let end = inner
                .find('"')
                .ok_or_else(|| ArgumentSyntaxError::without_usage("unterminated quote"))?;
            Ok((inner[end + 1..].to_string(), Some(ArgValue::from(&inner[..end]))))
        }));
        assert!(arg.is_raw());

        let (rest, value) = arg.match_text("\"a b\" c").unwrap();
        assert_eq!(rest, " c");
        assert_eq!(value, Some(ArgValue::from("a b")));

        let err = arg.match_text("\"open").unwrap_err();
        assert_eq!(err.message, "unterminated quote");
        assert!(!err.show_usage);
    }

    #[test]
    fn test_usage_brackets() {
        assert_eq!(spec(Argument::plain("name")).usage(), "<name>");
        assert_eq!(spec(Argument::plain("name").optional()).usage(), "[name]");
        assert_eq!(
            spec(Argument::plain("name").label("who").optional()).usage(),
            "[who]"
        );
    }

    #[test]
    fn test_call_args_accessors() {
        let mut args = CallArgs::new();
        args.insert("a", Some(ArgValue::from("x")));
        args.insert("b", None);
        args.insert("c", Some(ArgValue::Any(Arc::new(5u8))));
        assert_eq!(args.text("a"), Some("x"));
        assert!(args.is_absent("b"));
        assert!(!args.is_absent("a"));
        assert!(!args.contains("d"));
        assert_eq!(args.downcast::<u8>("c"), Some(&5));
        assert_eq!(args.len(), 3);
    }
}
