//! Invoking actions on resolved nodes, and waiting for the UI to catch up.

use super::search::{find_in, NameMatcher};
use super::{
    require, Accessible, Desktop, MaybeAccessible, State, ACTION_PRESS, ACTION_SET_FOCUS, ACTION_TOGGLE,
};
use crate::{Error, Result};
use log::{debug, warn};
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

/// Pauses inserted after each action before the next query may be issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub press: Duration,
    pub focus: Duration,
    pub toggle: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            press: Duration::from_millis(250),
            focus: Duration::from_millis(100),
            toggle: Duration::from_millis(100),
        }
    }
}

impl SettleDelays {
    /// No settling at all, for synchronous backends.
    pub fn none() -> Self {
        Self {
            press: Duration::ZERO,
            focus: Duration::ZERO,
            toggle: Duration::ZERO,
        }
    }
}

/// Issues actions against an accessibility tree, one at a time.
#[derive(Debug, Clone)]
pub struct Driver {
    pub settle: SettleDelays,
    /// Interval between attempts of the polling waits
    pub poll_interval: Duration,
}

impl Default for Driver {
    fn default() -> Self {
        Self {
            settle: SettleDelays::default(),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl Driver {
    pub fn new(settle: SettleDelays, poll_interval: Duration) -> Self {
        Self { settle, poll_interval }
    }

    /// A driver that never sleeps between steps and polls tightly.
    pub fn immediate() -> Self {
        Self::new(SettleDelays::none(), Duration::from_millis(5))
    }

    pub fn press<'a, T: MaybeAccessible<'a>>(&self, node: T) -> Result<()> {
        self.invoke(require(node)?, ACTION_PRESS, Error::NotPressable, self.settle.press)
    }

    pub fn focus<'a, T: MaybeAccessible<'a>>(&self, node: T) -> Result<()> {
        self.invoke(require(node)?, ACTION_SET_FOCUS, Error::NotFocusable, self.settle.focus)
    }

    pub fn toggle<'a, T: MaybeAccessible<'a>>(&self, node: T) -> Result<()> {
        self.invoke(require(node)?, ACTION_TOGGLE, Error::NotToggleable, self.settle.toggle)
    }

    /// Toggle unless the node is already checked or selected.
    pub fn toggle_on<'a, T: MaybeAccessible<'a>>(&self, node: T) -> Result<()> {
        let node = require(node)?;
        let states = node.states()?;
        if states.contains(&State::Checked) || states.contains(&State::Selected) {
            debug!("toggle_on({}): already on", node.name()?);
            return Ok(());
        }
        self.toggle(node)
    }

    /// Set the text only when the node currently holds none.
    pub fn fill_if_empty<'a, T: MaybeAccessible<'a>>(&self, node: T, text: &str) -> Result<()> {
        let node = require(node)?;
        let current = node.text()?.ok_or_else(|| Error::NotEditable(name_of(node)))?;
        if current.is_empty() {
            debug!("fill_if_empty({}): setting text", name_of(node));
            node.set_text(text)?;
        }
        Ok(())
    }

    pub fn append_text<'a, T: MaybeAccessible<'a>>(&self, node: T, suffix: &str) -> Result<()> {
        let node = require(node)?;
        let current = node.text()?.ok_or_else(|| Error::NotEditable(name_of(node)))?;
        node.set_text(&format!("{}{}", current, suffix))
    }

    /// Fixed pause, for steps that have nothing to poll on.
    pub fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    /// Poll [`find_in`] until the lookup resolves to exactly one node.
    ///
    /// Only a missing match is retried; an ambiguous match fails at once.
    pub fn wait_for<'a, P>(&self, parent: P, matcher: impl Into<NameMatcher>, timeout: Duration) -> Result<P::Node>
    where
        P: MaybeAccessible<'a>,
    {
        let parent = require(parent)?;
        let matcher = matcher.into();
        self.poll(&format!("accessible({})", matcher), timeout, || {
            match find_in(parent, &matcher) {
                Ok(node) => Ok(ControlFlow::Break(node)),
                Err(e) if e.is_lookup_miss() => Ok(ControlFlow::Continue(e.to_string())),
                Err(e) => Err(e),
            }
        })
    }

    /// Poll until the unique match carries `state`, and return it.
    pub fn wait_for_state<'a, P>(
        &self,
        parent: P,
        matcher: impl Into<NameMatcher>,
        state: State,
        timeout: Duration,
    ) -> Result<P::Node>
    where
        P: MaybeAccessible<'a>,
    {
        let parent = require(parent)?;
        let matcher = matcher.into();
        let what = format!("accessible({}) to be {:?}", matcher, state);
        self.poll(&what, timeout, || {
            // The node must stay resolvable the whole time; losing it is not a reason to keep waiting.
            let node = find_in(parent, &matcher)?;
            let states = node.states()?;
            if states.contains(&state) {
                return Ok(ControlFlow::Break(node));
            }
            warn!("{} is {:?}, waiting", matcher, states);
            Ok(ControlFlow::Continue(format!("{:?}", states)))
        })
    }

    /// Look for a registered application by exact name, `attempts` times.
    pub fn find_application<D: Desktop>(
        &self,
        desktop: &D,
        name: &str,
        attempts: u32,
        interval: Duration,
    ) -> Result<D::Node> {
        let start = Instant::now();
        let mut seen = Vec::new();
        for attempt in 1..=attempts {
            seen.clear();
            for app in desktop.applications()? {
                let app_name = app.name()?;
                if app_name == name {
                    debug!("found application {} on attempt {}", name, attempt);
                    return Ok(app);
                }
                seen.push(app_name);
            }
            if attempt < attempts {
                self.pause(interval);
            }
        }
        Err(Error::Timeout {
            what: format!("application {} on the accessibility bus", name),
            waited_ms: start.elapsed().as_millis() as u64,
            last: Some(format!("registered: [{}]", seen.join(", "))),
        })
    }

    fn invoke<A: Accessible>(
        &self,
        node: &A,
        action: &str,
        missing: fn(String) -> Error,
        settle: Duration,
    ) -> Result<()> {
        if !node.has_action(action)? {
            return Err(missing(name_of(node)));
        }
        debug!("{} -> {}", name_of(node), action);
        node.do_action(action)?;
        self.pause(settle);
        Ok(())
    }

    /// Run `attempt` until it breaks with a value; `Continue` carries what it saw.
    fn poll<T>(
        &self,
        what: &str,
        timeout: Duration,
        mut attempt: impl FnMut() -> Result<ControlFlow<T, String>>,
    ) -> Result<T> {
        let start = Instant::now();
        loop {
            let last = match attempt()? {
                ControlFlow::Break(found) => return Ok(found),
                ControlFlow::Continue(last) => last,
            };
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(Error::Timeout {
                    what: what.to_string(),
                    waited_ms: elapsed.as_millis() as u64,
                    last: Some(last),
                });
            }
            self.pause(self.poll_interval.min(timeout - elapsed));
        }
    }
}

fn name_of<A: Accessible>(node: &A) -> String {
    node.name().unwrap_or_else(|_| "<unnamed>".to_string())
}
