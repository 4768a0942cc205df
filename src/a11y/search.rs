//! Name based lookups over an accessibility tree.

use super::{require, Accessible, MaybeAccessible, State};
use crate::{Error, Result};
use log::debug;
use regex::Regex;
use std::fmt;

/// How a node's name is compared during a lookup
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// Whole-name equality
    Exact(String),
    /// Unanchored regular expression search
    Pattern(Regex),
}

impl NameMatcher {
    /// Compile a pattern matcher.
    pub fn pattern(re: &str) -> Result<Self> {
        Regex::new(re)
            .map(NameMatcher::Pattern)
            .map_err(|e| Error::ConfigError(format!("bad name pattern {:?}: {}", re, e)))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Exact(expected) => name == expected,
            NameMatcher::Pattern(re) => re.is_match(name),
        }
    }
}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatcher::Exact(name) => f.write_str(name),
            NameMatcher::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for NameMatcher {
    fn from(name: &str) -> Self {
        NameMatcher::Exact(name.to_string())
    }
}

impl From<String> for NameMatcher {
    fn from(name: String) -> Self {
        NameMatcher::Exact(name)
    }
}

impl From<Regex> for NameMatcher {
    fn from(re: Regex) -> Self {
        NameMatcher::Pattern(re)
    }
}

impl From<&NameMatcher> for NameMatcher {
    fn from(m: &NameMatcher) -> Self {
        m.clone()
    }
}

// Depth first; a child's own subtree is collected before the child itself.
// The parent is never a candidate, and hidden containers are still descended.
fn collect_matches<A: Accessible>(parent: &A, matcher: &NameMatcher, out: &mut Vec<A>) -> Result<()> {
    for child in parent.children()? {
        collect_matches(&child, matcher, out)?;
        if child.has_state(State::Showing)? && matcher.matches(&child.name()?) && !out.contains(&child) {
            out.push(child);
        }
    }
    Ok(())
}

/// Find the one showing descendant of `parent` whose name matches.
///
/// Zero matches is [`Error::NotFound`], more than one is
/// [`Error::AmbiguousMatch`]; there is no tie-break.
pub fn find_in<'a, P: MaybeAccessible<'a>>(parent: P, matcher: impl Into<NameMatcher>) -> Result<P::Node> {
    let parent = require(parent)?;
    let matcher = matcher.into();

    let mut found = Vec::new();
    collect_matches(parent, &matcher, &mut found)?;
    debug!("find_in({}) => {} match(es)", matcher, found.len());

    if found.len() > 1 {
        let names = found
            .iter()
            .map(|n| n.name().unwrap_or_else(|_| "<unnamed>".to_string()))
            .collect();
        return Err(Error::AmbiguousMatch {
            target: matcher.to_string(),
            found: names,
        });
    }
    found.pop().ok_or_else(|| Error::NotFound(matcher.to_string()))
}

/// [`find_in`], then hand the resolved node to `scope`.
///
/// Used for "within this window" sequences of sub-lookups.
pub fn find_in_with<'a, P, R, F>(parent: P, matcher: impl Into<NameMatcher>, scope: F) -> Result<R>
where
    P: MaybeAccessible<'a>,
    F: FnOnce(&P::Node) -> Result<R>,
{
    let node = find_in(parent, matcher)?;
    scope(&node)
}

/// The `index`-th child of `node`, or [`Error::NullAccessible`] when there is none.
pub fn child_at<'a, P: MaybeAccessible<'a>>(node: P, index: usize) -> Result<P::Node> {
    let node = require(node)?;
    node.children()?.into_iter().nth(index).ok_or(Error::NullAccessible)
}
