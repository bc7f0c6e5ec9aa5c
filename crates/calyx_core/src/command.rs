//! Commands invoked by element interactions
//!
//! A [`Command`] is the view-model side of an interaction: elements hold
//! `Rc<dyn Command>` in named slots (`OnClick`, `OnMouseEnter`, ...) and run
//! it only when [`Command::can_execute`] agrees.
//!
//! View-model methods become commands through [`MethodCommand`], which picks
//! one of three call shapes when it is created rather than inspecting the
//! method on every call.

use std::fmt;
use std::rc::Rc;

use crate::geometry::Point;
use crate::input::UiInputData;

/// The element that triggered a command
///
/// `raw` is the element's arena key in its type-erased form; `name` is the
/// element's markup id, if it has one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sender {
    pub raw: u64,
    pub name: Option<String>,
}

impl Sender {
    pub fn new(raw: u64, name: Option<String>) -> Self {
        Self { raw, name }
    }
}

/// Arguments passed along with a command invocation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandArgs {
    /// Pointer position when the interaction happened
    pub position: Point,
    /// The frame's input snapshot, when the trigger was pointer input
    pub input: Option<UiInputData>,
}

impl CommandArgs {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            input: None,
        }
    }

    pub fn from_input(input: &UiInputData) -> Self {
        Self {
            position: input.mouse_position,
            input: Some(input.clone()),
        }
    }
}

/// An invocable action with an execution guard
pub trait Command {
    fn can_execute(&self, sender: &Sender, args: &CommandArgs) -> bool;

    fn execute(&self, sender: &Sender, args: &CommandArgs);
}

/// Run `command` if its guard allows it; returns whether it ran
pub fn try_execute(command: &dyn Command, sender: &Sender, args: &CommandArgs) -> bool {
    if command.can_execute(sender, args) {
        command.execute(sender, args);
        true
    } else {
        false
    }
}

type ExecuteFn = Box<dyn Fn(&Sender, &CommandArgs)>;
type CanExecuteFn = Box<dyn Fn(&Sender, &CommandArgs) -> bool>;

/// A command backed by closures
pub struct RelayCommand {
    execute: ExecuteFn,
    can_execute: Option<CanExecuteFn>,
}

impl RelayCommand {
    pub fn new<F>(execute: F) -> Self
    where
        F: Fn(&Sender, &CommandArgs) + 'static,
    {
        Self {
            execute: Box::new(execute),
            can_execute: None,
        }
    }

    /// Attach a guard; without one the command can always execute
    pub fn with_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Sender, &CommandArgs) -> bool + 'static,
    {
        self.can_execute = Some(Box::new(guard));
        self
    }

    pub fn into_rc(self) -> Rc<dyn Command> {
        Rc::new(self)
    }
}

impl Command for RelayCommand {
    fn can_execute(&self, sender: &Sender, args: &CommandArgs) -> bool {
        self.can_execute
            .as_ref()
            .map_or(true, |guard| guard(sender, args))
    }

    fn execute(&self, sender: &Sender, args: &CommandArgs) {
        (self.execute)(sender, args);
    }
}

impl fmt::Debug for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayCommand")
            .field("guarded", &self.can_execute.is_some())
            .finish()
    }
}

/// Supported view-model method signatures
#[derive(Clone)]
pub enum MethodShape {
    /// `fn()`
    NoArgs(Rc<dyn Fn()>),
    /// `fn(sender)`
    Sender(Rc<dyn Fn(&Sender)>),
    /// `fn(sender, args)`
    SenderArgs(Rc<dyn Fn(&Sender, &CommandArgs)>),
}

impl MethodShape {
    pub fn arity(&self) -> usize {
        match self {
            MethodShape::NoArgs(_) => 0,
            MethodShape::Sender(_) => 1,
            MethodShape::SenderArgs(_) => 2,
        }
    }
}

impl fmt::Debug for MethodShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodShape(arity = {})", self.arity())
    }
}

/// A view-model method wrapped as a command; it can always execute
#[derive(Debug, Clone)]
pub struct MethodCommand {
    name: String,
    shape: MethodShape,
}

impl MethodCommand {
    pub fn new(name: impl Into<String>, shape: MethodShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &MethodShape {
        &self.shape
    }
}

impl Command for MethodCommand {
    fn can_execute(&self, _sender: &Sender, _args: &CommandArgs) -> bool {
        true
    }

    fn execute(&self, sender: &Sender, args: &CommandArgs) {
        match &self.shape {
            MethodShape::NoArgs(f) => f(),
            MethodShape::Sender(f) => f(sender),
            MethodShape::SenderArgs(f) => f(sender, args),
        }
    }
}
