//! Accessibility surface: the tree the harness drives, and how it drives it.
//!
//! The harness never owns the tree. An application exposes its widgets
//! through some accessibility backend (AT-SPI on a live desktop, the
//! [`memory`] backend in tests) and the harness only reads names, states
//! and text, and invokes advertised actions.

#[cfg(feature = "atspi")]
pub mod atspi;
pub mod driver;
pub mod memory;
pub mod search;
pub mod snapshot;

#[cfg(feature = "atspi")]
pub use atspi::{AtspiDesktop, AtspiNode};
pub use driver::{Driver, SettleDelays};
pub use memory::{MemoryDesktop, MemoryNode};
pub use search::{child_at, find_in, find_in_with, NameMatcher};
pub use snapshot::{snapshot, AccessibleSnapshot};

use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Action name for activating buttons and similar widgets
pub const ACTION_PRESS: &str = "Press";
/// Action name for moving keyboard focus onto a widget
pub const ACTION_SET_FOCUS: &str = "SetFocus";
/// Action name for flipping check boxes and radio buttons
pub const ACTION_TOGGLE: &str = "Toggle";

/// Symbolic state flags a node may carry.
///
/// Only the subset the harness inspects is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Showing,
    Visible,
    Sensitive,
    Enabled,
    Focusable,
    Focused,
    Checked,
    Selected,
    Editable,
}

pub type StateSet = BTreeSet<State>;

/// One element of an accessibility tree.
///
/// Implementations are cheap handles onto a node that lives elsewhere;
/// cloning must not copy the subtree. Equality is node identity.
pub trait Accessible: Clone + PartialEq {
    /// Display label
    fn name(&self) -> Result<String>;

    /// Children in the order the provider reports them
    fn children(&self) -> Result<Vec<Self>>;

    /// Current state flags
    fn states(&self) -> Result<StateSet>;

    /// Names of the actions this node advertises
    fn action_names(&self) -> Result<Vec<String>>;

    /// Invoke a named action
    fn do_action(&self, action: &str) -> Result<()>;

    /// Text content, `None` when the node has no text interface
    fn text(&self) -> Result<Option<String>>;

    /// Replace the text content
    fn set_text(&self, text: &str) -> Result<()>;

    fn has_state(&self, state: State) -> Result<bool> {
        Ok(self.states()?.contains(&state))
    }

    fn has_action(&self, action: &str) -> Result<bool> {
        Ok(self.action_names()?.iter().any(|a| a == action))
    }
}

/// The set of applications registered on an accessibility bus.
pub trait Desktop {
    type Node: Accessible;

    /// Currently registered application roots
    fn applications(&self) -> Result<Vec<Self::Node>>;
}

/// Something that may or may not resolve to an accessible.
///
/// Lets driver operations take either a node or the result of an optional
/// lookup, and report [`Error::NullAccessible`] for the latter when empty.
pub trait MaybeAccessible<'a> {
    type Node: Accessible + 'a;

    fn into_accessible(self) -> Option<&'a Self::Node>;
}

impl<'a, A: Accessible + 'a> MaybeAccessible<'a> for &'a A {
    type Node = A;

    fn into_accessible(self) -> Option<&'a A> {
        Some(self)
    }
}

impl<'a, A: Accessible + 'a> MaybeAccessible<'a> for Option<&'a A> {
    type Node = A;

    fn into_accessible(self) -> Option<&'a A> {
        self
    }
}

pub(crate) fn require<'a, T: MaybeAccessible<'a>>(node: T) -> Result<&'a T::Node> {
    node.into_accessible().ok_or(Error::NullAccessible)
}
