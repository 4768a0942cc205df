//! In-memory accessibility backend.
//!
//! Nodes are shared handles, so an action handler can reach into other
//! parts of the tree (show the next page, flip a state) the way a real
//! application would react to input. Used by the crate's tests and to build
//! simulated applications.

use super::{Accessible, Desktop, State, StateSet, ACTION_SET_FOCUS, ACTION_TOGGLE};
use crate::{Error, Result};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type ActionHandler = Rc<dyn Fn(&MemoryNode) -> Result<()>>;

struct NodeData {
    name: String,
    states: StateSet,
    actions: Vec<(String, Option<ActionHandler>)>,
    text: Option<String>,
    children: Vec<MemoryNode>,
    invocations: Vec<String>,
}

/// A node of an in-memory accessibility tree
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

impl MemoryNode {
    /// A showing, sensitive node without actions or text.
    pub fn new(name: impl Into<String>) -> Self {
        let states = [State::Showing, State::Visible, State::Sensitive, State::Enabled]
            .into_iter()
            .collect();
        MemoryNode(Rc::new(RefCell::new(NodeData {
            name: name.into(),
            states,
            actions: Vec::new(),
            text: None,
            children: Vec::new(),
            invocations: Vec::new(),
        })))
    }

    pub fn hidden(self) -> Self {
        self.remove_state(State::Showing);
        self
    }

    pub fn insensitive(self) -> Self {
        self.remove_state(State::Sensitive);
        self
    }

    pub fn with_state(self, state: State) -> Self {
        self.insert_state(state);
        self
    }

    pub fn with_child(self, child: MemoryNode) -> Self {
        self.push_child(child);
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        for child in children {
            self.push_child(child);
        }
        self
    }

    /// Advertise an action with the built-in behaviour: `Toggle` flips
    /// `checked`, `SetFocus` adds `focused`, anything else only records the
    /// invocation.
    pub fn with_action(self, action: &str) -> Self {
        self.0.borrow_mut().actions.push((action.to_string(), None));
        self
    }

    /// Advertise an action that runs `handler` instead of the built-in behaviour.
    pub fn on_action<F>(self, action: &str, handler: F) -> Self
    where
        F: Fn(&MemoryNode) -> Result<()> + 'static,
    {
        self.set_action(action, handler);
        self
    }

    /// Add or replace the handler of `action` on an existing node.
    pub fn set_action<F>(&self, action: &str, handler: F)
    where
        F: Fn(&MemoryNode) -> Result<()> + 'static,
    {
        let handler: ActionHandler = Rc::new(handler);
        let mut data = self.0.borrow_mut();
        match data.actions.iter_mut().find(|(n, _)| n == action) {
            Some(entry) => entry.1 = Some(handler),
            None => data.actions.push((action.to_string(), Some(handler))),
        }
    }

    /// Give the node a text interface with initial content.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        {
            let mut data = self.0.borrow_mut();
            data.text = Some(text.into());
            data.states.insert(State::Editable);
        }
        self
    }

    pub fn insert_state(&self, state: State) {
        self.0.borrow_mut().states.insert(state);
    }

    pub fn remove_state(&self, state: State) {
        self.0.borrow_mut().states.remove(&state);
    }

    pub fn set_showing(&self, showing: bool) {
        if showing {
            self.insert_state(State::Showing);
        } else {
            self.remove_state(State::Showing);
        }
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    pub fn push_child(&self, child: MemoryNode) {
        self.0.borrow_mut().children.push(child);
    }

    pub fn clear_children(&self) {
        self.0.borrow_mut().children.clear();
    }

    /// Actions invoked on this node so far, oldest first
    pub fn invocations(&self) -> Vec<String> {
        self.0.borrow().invocations.clone()
    }

    /// Current text without going through the fallible trait surface
    pub fn text_content(&self) -> Option<String> {
        self.0.borrow().text.clone()
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("MemoryNode")
            .field("name", &data.name)
            .field("states", &data.states)
            .field("children", &data.children.len())
            .finish()
    }
}

impl Accessible for MemoryNode {
    fn name(&self) -> Result<String> {
        Ok(self.0.borrow().name.clone())
    }

    fn children(&self) -> Result<Vec<Self>> {
        Ok(self.0.borrow().children.clone())
    }

    fn states(&self) -> Result<StateSet> {
        Ok(self.0.borrow().states.clone())
    }

    fn action_names(&self) -> Result<Vec<String>> {
        Ok(self.0.borrow().actions.iter().map(|(n, _)| n.clone()).collect())
    }

    fn do_action(&self, action: &str) -> Result<()> {
        // The handler may touch this node again, so no borrow is held while it runs.
        let handler = {
            let mut data = self.0.borrow_mut();
            let handler = match data.actions.iter().find(|(n, _)| n == action) {
                Some((_, handler)) => handler.clone(),
                None => {
                    return Err(Error::Backend(format!(
                        "'{}' has no action named {}",
                        data.name, action
                    )))
                }
            };
            data.invocations.push(action.to_string());
            handler
        };

        match handler {
            Some(handler) => handler(self),
            None => {
                match action {
                    ACTION_TOGGLE => {
                        let mut data = self.0.borrow_mut();
                        if !data.states.remove(&State::Checked) {
                            data.states.insert(State::Checked);
                        }
                    }
                    ACTION_SET_FOCUS => self.insert_state(State::Focused),
                    _ => {}
                }
                Ok(())
            }
        }
    }

    fn text(&self) -> Result<Option<String>> {
        Ok(self.text_content())
    }

    fn set_text(&self, text: &str) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.text.is_none() {
            return Err(Error::NotEditable(data.name.clone()));
        }
        data.text = Some(text.to_string());
        Ok(())
    }
}

/// A bus with a mutable list of in-memory applications
#[derive(Default)]
pub struct MemoryDesktop {
    applications: RefCell<Vec<MemoryNode>>,
}

impl MemoryDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, application: MemoryNode) {
        self.applications.borrow_mut().push(application);
    }

    pub fn unregister(&self, application: &MemoryNode) {
        self.applications.borrow_mut().retain(|a| a != application);
    }
}

impl Desktop for MemoryDesktop {
    type Node = MemoryNode;

    fn applications(&self) -> Result<Vec<MemoryNode>> {
        Ok(self.applications.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toggle_flips_checked() {
        let node = MemoryNode::new("Yes").with_action(ACTION_TOGGLE);
        node.do_action(ACTION_TOGGLE).unwrap();
        assert!(node.has_state(State::Checked).unwrap());
        node.do_action(ACTION_TOGGLE).unwrap();
        assert!(!node.has_state(State::Checked).unwrap());
        assert_eq!(node.invocations(), vec!["Toggle", "Toggle"]);
    }

    #[test]
    fn handlers_may_mutate_their_own_node() {
        let node = MemoryNode::new("Login").on_action("Press", |n| {
            n.set_name("Logged in");
            Ok(())
        });
        node.do_action("Press").unwrap();
        assert_eq!(node.name().unwrap(), "Logged in");
    }

    #[test]
    fn set_action_replaces_the_builtin_behaviour() {
        let node = MemoryNode::new("Yes").with_action(ACTION_TOGGLE);
        node.set_action(ACTION_TOGGLE, |n| {
            n.insert_state(State::Selected);
            Ok(())
        });
        node.do_action(ACTION_TOGGLE).unwrap();
        assert!(node.has_state(State::Selected).unwrap());
        assert!(!node.has_state(State::Checked).unwrap());
        assert_eq!(node.action_names().unwrap(), vec!["Toggle"]);
    }

    #[test]
    fn unknown_action_is_a_backend_error() {
        let node = MemoryNode::new("label");
        assert!(matches!(node.do_action("Press"), Err(Error::Backend(_))));
        assert!(node.invocations().is_empty());
    }

    #[test]
    fn text_requires_a_text_interface() {
        let label = MemoryNode::new("label");
        assert!(matches!(label.set_text("x"), Err(Error::NotEditable(_))));

        let input = MemoryNode::new("Username input").with_text("");
        input.set_text("xxx").unwrap();
        assert_eq!(input.text().unwrap().as_deref(), Some("xxx"));
    }

    #[test]
    fn identity_equality() {
        let a = MemoryNode::new("same");
        let b = MemoryNode::new("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn desktop_lists_registered_applications() {
        let desktop = MemoryDesktop::new();
        let app = MemoryNode::new("drkonqi");
        desktop.register(app.clone());
        assert_eq!(desktop.applications().unwrap(), vec![app.clone()]);
        desktop.unregister(&app);
        assert!(desktop.applications().unwrap().is_empty());
    }
}
