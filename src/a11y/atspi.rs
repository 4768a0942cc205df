//! Live AT-SPI backend over D-Bus.
//!
//! Talks to the accessibility bus the session advertises through
//! `org.a11y.Bus` and reads the registry's application list. Every call is a
//! blocking round trip; nothing is cached, so each query sees the UI as it is
//! right now.

use super::{Accessible, Desktop, State, StateSet};
use crate::{Error, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zbus::blocking::Connection;
use zbus::zvariant::{DynamicType, OwnedObjectPath, OwnedValue};

const REGISTRY: &str = "org.a11y.atspi.Registry";
const ROOT_PATH: &str = "/org/a11y/atspi/accessible/root";
const NULL_PATH: &str = "/org/a11y/atspi/null";

const ACCESSIBLE: &str = "org.a11y.atspi.Accessible";
const ACTION: &str = "org.a11y.atspi.Action";
const TEXT: &str = "org.a11y.atspi.Text";
const EDITABLE_TEXT: &str = "org.a11y.atspi.EditableText";
const PROPERTIES: &str = "org.freedesktop.DBus.Properties";

// Bit positions in the two-word state set returned by GetState
const STATE_BITS: [(u32, State); 9] = [
    (4, State::Checked),
    (7, State::Editable),
    (8, State::Enabled),
    (11, State::Focusable),
    (12, State::Focused),
    (23, State::Selected),
    (24, State::Sensitive),
    (25, State::Showing),
    (30, State::Visible),
];

fn backend(e: zbus::Error) -> Error {
    Error::Backend(e.to_string())
}

/// Decode the `au` state words into the states the harness models.
pub fn decode_states(words: &[u32]) -> StateSet {
    STATE_BITS
        .iter()
        .filter(|(bit, _)| {
            let word = (bit / 32) as usize;
            words.get(word).is_some_and(|w| w & (1 << (bit % 32)) != 0)
        })
        .map(|(_, state)| *state)
        .collect()
}

/// One object on the accessibility bus
#[derive(Clone)]
pub struct AtspiNode {
    conn: Connection,
    bus_name: String,
    path: OwnedObjectPath,
}

impl PartialEq for AtspiNode {
    fn eq(&self, other: &Self) -> bool {
        self.bus_name == other.bus_name && self.path == other.path
    }
}

impl std::fmt::Debug for AtspiNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtspiNode({}:{})", self.bus_name, self.path.as_str())
    }
}

impl AtspiNode {
    fn call<B, R>(&self, interface: &str, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + DynamicType,
        R: DeserializeOwned + zbus::zvariant::Type,
    {
        let reply = self
            .conn
            .call_method(
                Some(self.bus_name.as_str()),
                self.path.as_str(),
                Some(interface),
                method,
                body,
            )
            .map_err(backend)?;
        reply.body().deserialize::<R>().map_err(backend)
    }

    fn property(&self, interface: &str, name: &str) -> Result<OwnedValue> {
        self.call(PROPERTIES, "Get", &(interface, name))
    }

    fn interfaces(&self) -> Result<Vec<String>> {
        self.call(ACCESSIBLE, "GetInterfaces", &())
    }

    fn implements(&self, interface: &str) -> Result<bool> {
        Ok(self.interfaces()?.iter().any(|i| i == interface))
    }

    fn actions(&self) -> Result<Vec<(String, String, String)>> {
        if !self.implements(ACTION)? {
            return Ok(Vec::new());
        }
        self.call(ACTION, "GetActions", &())
    }
}

impl Accessible for AtspiNode {
    fn name(&self) -> Result<String> {
        let value = self.property(ACCESSIBLE, "Name")?;
        String::try_from(value).map_err(|e| Error::Backend(e.to_string()))
    }

    fn children(&self) -> Result<Vec<Self>> {
        let refs: Vec<(String, OwnedObjectPath)> = self.call(ACCESSIBLE, "GetChildren", &())?;
        Ok(refs
            .into_iter()
            .filter(|(_, path)| path.as_str() != NULL_PATH)
            .map(|(bus_name, path)| AtspiNode {
                conn: self.conn.clone(),
                bus_name,
                path,
            })
            .collect())
    }

    fn states(&self) -> Result<StateSet> {
        let words: Vec<u32> = self.call(ACCESSIBLE, "GetState", &())?;
        Ok(decode_states(&words))
    }

    fn action_names(&self) -> Result<Vec<String>> {
        Ok(self.actions()?.into_iter().map(|(name, _, _)| name).collect())
    }

    fn do_action(&self, action: &str) -> Result<()> {
        let index = self
            .actions()?
            .iter()
            .position(|(name, _, _)| name == action)
            .ok_or_else(|| Error::Backend(format!("{:?} has no action named {}", self, action)))?;
        let done: bool = self.call(ACTION, "DoAction", &(index as i32,))?;
        if !done {
            return Err(Error::Backend(format!("{} on {:?} was refused", action, self)));
        }
        Ok(())
    }

    fn text(&self) -> Result<Option<String>> {
        if !self.implements(TEXT)? {
            return Ok(None);
        }
        let text: String = self.call(TEXT, "GetText", &(0i32, -1i32))?;
        Ok(Some(text))
    }

    fn set_text(&self, text: &str) -> Result<()> {
        if !self.implements(EDITABLE_TEXT)? {
            return Err(Error::NotEditable(self.name()?));
        }
        let done: bool = self.call(EDITABLE_TEXT, "SetTextContents", &(text,))?;
        if !done {
            return Err(Error::Backend(format!("setting text on {:?} was refused", self)));
        }
        Ok(())
    }
}

/// The accessibility bus of the current session
pub struct AtspiDesktop {
    root: AtspiNode,
}

impl AtspiDesktop {
    /// Ask the session bus for the accessibility bus address and connect to it.
    pub fn connect() -> Result<Self> {
        let session = Connection::session().map_err(backend)?;
        let reply = session
            .call_method(Some("org.a11y.Bus"), "/org/a11y/bus", Some("org.a11y.Bus"), "GetAddress", &())
            .map_err(backend)?;
        let address: String = reply.body().deserialize().map_err(backend)?;
        debug!("accessibility bus at {}", address);

        let conn = zbus::blocking::connection::Builder::address(address.as_str())
            .map_err(backend)?
            .build()
            .map_err(backend)?;
        let path = OwnedObjectPath::try_from(ROOT_PATH).map_err(|e| Error::Backend(e.to_string()))?;
        Ok(Self {
            root: AtspiNode {
                conn,
                bus_name: REGISTRY.to_string(),
                path,
            },
        })
    }
}

impl Desktop for AtspiDesktop {
    type Node = AtspiNode;

    fn applications(&self) -> Result<Vec<AtspiNode>> {
        self.root.children()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_state_words() {
        // showing | sensitive | enabled in word 0, nothing in word 1
        let states = decode_states(&[(1 << 25) | (1 << 24) | (1 << 8), 0]);
        assert_eq!(
            states,
            [State::Showing, State::Sensitive, State::Enabled].into_iter().collect()
        );
        assert!(decode_states(&[]).is_empty());
        assert!(decode_states(&[1 << 4]).contains(&State::Checked));
    }
}
