//! Serialisable dumps of an accessibility subtree, logged when a lookup fails

use super::{Accessible, State};
use crate::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibleSnapshot {
    pub name: String,
    pub states: Vec<State>,
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AccessibleSnapshot>,
}

impl AccessibleSnapshot {
    /// Pretty JSON for logs
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unserialisable snapshot: {}>", e))
    }

    /// Names of the showing nodes in this subtree, depth first
    pub fn showing_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_showing(&mut names);
        names
    }

    fn collect_showing(&self, names: &mut Vec<String>) {
        if self.states.contains(&State::Showing) {
            names.push(self.name.clone());
        }
        for child in &self.children {
            child.collect_showing(names);
        }
    }
}

/// Capture `node` and everything below it.
pub fn snapshot<A: Accessible>(node: &A) -> Result<AccessibleSnapshot> {
    let children = node
        .children()?
        .iter()
        .map(snapshot)
        .collect::<Result<Vec<_>>>()?;
    Ok(AccessibleSnapshot {
        name: node.name()?,
        states: node.states()?.into_iter().collect(),
        actions: node.action_names()?,
        text: node.text()?,
        children,
    })
}
