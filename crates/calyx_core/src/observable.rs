//! View-models and change notification
//!
//! The binding engine only talks to view-models through the [`ViewModel`]
//! trait: look up a property by name, look up a command or method by name,
//! and optionally subscribe to "property changed" notifications. An empty
//! property name in a notification means every property changed.
//!
//! [`ObservableObject`] is a ready-made implementation backed by a name →
//! value map, for view-models that don't need hand-written accessors.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use std::cell::RefCell;
//! use calyx_core::observable::{ObservableObject, ViewModel};
//! use calyx_core::value::Value;
//!
//! let vm = ObservableObject::new();
//! vm.set_property("Title", "Hello");
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = Rc::clone(&seen);
//! let _handle = vm.subscribe(Rc::new(move |name: &str| seen_clone.borrow_mut().push(name.to_string())));
//!
//! vm.set_property("Title", "World");
//! assert_eq!(vm.property("Title"), Some(Value::from("World")));
//! assert_eq!(*seen.borrow(), vec!["Title".to_string()]);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::command::{Command, MethodShape};
use crate::value::Value;

/// Callback invoked with the name of the property that changed
pub type ChangeHandler = Rc<dyn Fn(&str)>;

/// Handle returned by [`ViewModel::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Binding-facing view of a view-model
pub trait ViewModel {
    /// Current value of a named property
    fn property(&self, name: &str) -> Option<Value>;

    /// A command object exposed under `name`
    fn command(&self, _name: &str) -> Option<Rc<dyn Command>> {
        None
    }

    /// A method exposed under `name`, with its call shape
    fn method(&self, _name: &str) -> Option<MethodShape> {
        None
    }

    /// Subscribe to change notifications
    ///
    /// Returns `None` when the view-model doesn't support notification;
    /// bindings against it are then initial-value only.
    fn subscribe(&self, _handler: ChangeHandler) -> Option<SubscriptionHandle> {
        None
    }

    fn unsubscribe(&self, _handle: SubscriptionHandle) {}
}

/// Map-backed view-model with change notification
#[derive(Default)]
pub struct ObservableObject {
    properties: RefCell<IndexMap<String, Value>>,
    commands: RefCell<FxHashMap<String, Rc<dyn Command>>>,
    methods: RefCell<FxHashMap<String, MethodShape>>,
    subscribers: RefCell<Vec<(SubscriptionHandle, ChangeHandler)>>,
    next_handle: Cell<u64>,
}

impl ObservableObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, notifying subscribers if the value changed
    ///
    /// Returns `true` when a notification was raised.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        {
            let mut properties = self.properties.borrow_mut();
            if properties.get(name) == Some(&value) {
                return false;
            }
            properties.insert(name.to_string(), value);
        }
        self.notify(name);
        true
    }

    /// Expose a command object under `name`
    pub fn set_command(&self, name: &str, command: Rc<dyn Command>) {
        self.commands.borrow_mut().insert(name.to_string(), command);
    }

    /// Expose a method under `name`
    pub fn set_method(&self, name: &str, method: MethodShape) {
        self.methods.borrow_mut().insert(name.to_string(), method);
    }

    /// Raise a change notification meaning "every property changed"
    pub fn notify_all(&self) {
        self.notify("");
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.borrow().keys().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self, name: &str) {
        // Handlers may touch the view-model again, so release the borrow first
        let handlers: Vec<ChangeHandler> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        trace!(property = name, subscribers = handlers.len(), "property changed");
        for handler in handlers {
            handler(name);
        }
    }
}

impl ViewModel for ObservableObject {
    fn property(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    fn command(&self, name: &str) -> Option<Rc<dyn Command>> {
        self.commands.borrow().get(name).cloned()
    }

    fn method(&self, name: &str) -> Option<MethodShape> {
        self.methods.borrow().get(name).cloned()
    }

    fn subscribe(&self, handler: ChangeHandler) -> Option<SubscriptionHandle> {
        let handle = SubscriptionHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.subscribers.borrow_mut().push((handle, handler));
        Some(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscribers.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableObject")
            .field("properties", &self.properties.borrow())
            .field("commands", &self.commands.borrow().len())
            .field("methods", &self.methods.borrow().len())
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}
