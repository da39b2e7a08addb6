//! Route pattern compilation and matching.
//!
//! A pattern is a `/`-separated template. Each segment is one of:
//!
//! - a literal, compared case-insensitively: `users`
//! - a single capture: `{id}` or `{int:id}`
//! - a double capture joined by `-` or `.`: `{from}-{to}`, `{name}.{ext}`
//! - a wildcard `*`, which must be last and swallows the rest of the path
//!
//! The final capture segment may carry a `?` to make it optional.
//!
//! Patterns are validated when they are built, so a [`Pattern`] that exists
//! can always be matched. Matching is purely structural: captures accept any
//! non-slash text and the [`param`](crate::param) coercion rules decide what
//! the value becomes.

use std::collections::HashSet;
use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::Error;
use crate::param::{self, Param, Params};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Literal(String),
    Capture(Param),
    Double(Param, char, Param),
    Wildcard,
}

/// How much of a path a pattern must account for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Anchor {
    /// The whole path (routes).
    Exact,
    /// A leading run of whole segments (middleware bindings).
    Prefix,
}

/// A compiled route pattern.
///
/// ```rust
/// use tsuji::Pattern;
/// use tsuji::param::Value;
///
/// let pattern = Pattern::parse("users/{int:id}").unwrap();
/// assert!(pattern.matches("Users/42"));
/// assert!(pattern.matches("users/42/"));
/// assert!(!pattern.matches("users/42/posts"));
///
/// let params = pattern.capture("users/42");
/// assert_eq!(params[0], Value::Int(42));
/// ```
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
    anchor: Anchor,
    regex: Regex,
}

impl Pattern {
    /// Compiles a route pattern that must match the whole path.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Self::compile(raw, Anchor::Exact)
    }

    /// Compiles a pattern that matches any path starting with it on a
    /// segment boundary. The empty pattern matches every path.
    pub fn prefix(raw: &str) -> Result<Self, Error> {
        Self::compile(raw, Anchor::Prefix)
    }

    fn compile(raw: &str, anchor: Anchor) -> Result<Self, Error> {
        let source = normalize(raw);
        let segments: Vec<&str> = if source.is_empty() {
            Vec::new()
        } else {
            source.split('/').collect()
        };
        let last = segments.len().saturating_sub(1);

        let mut tokens = Vec::with_capacity(segments.len());
        let mut optional_tail = false;
        let mut names = HashSet::new();

        for (i, segment) in segments.iter().enumerate() {
            let (segment, optional) = match segment.strip_suffix('?') {
                Some(inner) if inner.ends_with('}') => (inner, true),
                _ => (*segment, false),
            };
            if optional && i != last {
                return Err(Error::invalid_pattern(&source, "only the final segment can be optional"));
            }

            let token = parse_token(&source, segment)?;
            if token == Token::Wildcard && i != last {
                return Err(Error::invalid_pattern(&source, "`*` must be the final segment"));
            }

            let declared = match &token {
                Token::Capture(p) => vec![p],
                Token::Double(a, _, b) => vec![a, b],
                _ => Vec::new(),
            };
            for p in declared {
                if !names.insert(p.name.clone()) {
                    return Err(Error::DuplicateCapture { pattern: source.clone(), name: p.name.clone() });
                }
            }

            optional_tail |= optional;
            tokens.push(token);
        }

        let regex = build_regex(&tokens, optional_tail, anchor)
            .map_err(|e| Error::invalid_pattern(&source, e.to_string()))?;

        Ok(Self { source, tokens, anchor, regex })
    }

    /// The normalized pattern text (no leading or trailing `/`).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Whether `path` has the shape of this pattern. Also accepts the path
    /// with one trailing `/`.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        self.regex.is_match(path) || self.regex.is_match(&format!("{path}/"))
    }

    /// Decodes every capture in `path`, left to right.
    ///
    /// Call this after [`matches`](Self::matches) succeeded. Missing trailing
    /// segments decode from the empty string.
    pub fn capture(&self, path: &str) -> Params {
        let path = path.trim_matches('/');
        let mut parts: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };
        if parts.len() < self.tokens.len() {
            parts.resize(self.tokens.len(), "");
        }

        let mut params = Params::new();
        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                Token::Literal(_) => {}
                Token::Capture(p) => params.push(p.decode(parts[i])),
                Token::Double(a, sep, b) => {
                    let (first, second) = parts[i].split_once(*sep).unwrap_or((parts[i], ""));
                    params.push(a.decode(first));
                    params.push(b.decode(second));
                }
                Token::Wildcard => {
                    params.push(param::wildcard(parts[i..].join("/")));
                    break;
                }
            }
        }
        params
    }

    /// Recompiles this pattern under `prefix`.
    pub fn rebase(&self, prefix: &str) -> Result<Self, Error> {
        Self::compile(&join(prefix, &self.source), self.anchor)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.source)
    }
}

/// Compiles `pattern` and tests `path` against it.
pub fn matches(pattern: &str, path: &str) -> Result<bool, Error> {
    Ok(Pattern::parse(pattern)?.matches(path))
}

/// Compiles `pattern` and decodes the captures of `path`.
pub fn capture(pattern: &str, path: &str) -> Result<Params, Error> {
    Ok(Pattern::parse(pattern)?.capture(path))
}

/// Joins two path fragments, collapsing repeated and edge slashes.
pub fn join(base: &str, path: &str) -> String {
    normalize(&format!("{base}/{path}"))
}

/// Drops empty segments: `//a//b/` becomes `a/b`.
pub fn normalize(path: &str) -> String {
    path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

fn parse_token(source: &str, segment: &str) -> Result<Token, Error> {
    if segment == "*" {
        return Ok(Token::Wildcard);
    }

    if segment.starts_with('{') {
        let close = segment
            .find('}')
            .ok_or_else(|| Error::invalid_pattern(source, format!("unclosed capture in `{segment}`")))?;
        let (first, rest) = segment.split_at(close + 1);
        let first = capture_param(source, first)?;

        let mut rest_chars = rest.chars();
        return match rest_chars.next() {
            None => Ok(Token::Capture(first)),
            Some(sep @ ('-' | '.')) => {
                let second = rest_chars.as_str();
                let well_formed = second.starts_with('{') && second.find('}') == Some(second.len() - 1);
                if !well_formed {
                    return Err(Error::invalid_pattern(source, format!("malformed double capture `{segment}`")));
                }
                Ok(Token::Double(first, sep, capture_param(source, second)?))
            }
            Some(_) => Err(Error::invalid_pattern(
                source,
                format!("captures in `{segment}` must be joined by `-` or `.`"),
            )),
        };
    }

    if segment.contains(['{', '}', '*', '?']) {
        return Err(Error::invalid_pattern(source, format!("unexpected character in literal `{segment}`")));
    }
    Ok(Token::Literal(segment.to_owned()))
}

fn capture_param(source: &str, token: &str) -> Result<Param, Error> {
    Param::parse(token).map_err(|e| match e {
        Error::InvalidPattern { reason, .. } => Error::invalid_pattern(source, reason),
        other => other,
    })
}

fn build_regex(tokens: &[Token], optional_tail: bool, anchor: Anchor) -> Result<Regex, regex::Error> {
    let last = tokens.len().saturating_sub(1);
    let mut expr = String::from("^");

    for (i, token) in tokens.iter().enumerate() {
        let piece = match token {
            Token::Literal(lit) => regex::escape(lit),
            Token::Capture(_) => "[^/]+".to_owned(),
            Token::Double(_, sep, _) => format!("[^/]+{}[^/]+", regex::escape(&sep.to_string())),
            Token::Wildcard => ".*".to_owned(),
        };
        let slash = if i == 0 { "" } else { "/" };

        if optional_tail && i == last {
            expr.push_str(&format!("(?:{slash}{piece})?"));
        } else {
            expr.push_str(slash);
            expr.push_str(&piece);
        }
    }

    match anchor {
        Anchor::Exact => expr.push_str("/?$"),
        Anchor::Prefix if tokens.is_empty() => expr.push_str(".*$"),
        Anchor::Prefix => expr.push_str("(?:/.*)?$"),
    }

    RegexBuilder::new(&expr).case_insensitive(true).build()
}
