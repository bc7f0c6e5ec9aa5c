//! Data and command binding
//!
//! Markup can bind an element property to a view-model property or an
//! interaction slot to a view-model command:
//!
//! ```text
//! <TextBlock Text="{Binding Title}" />
//! <TextBlock Text="{Binding Path=Subtitle}" />
//! <Button OnClick="{Command Save}" />
//! ```
//!
//! Property bindings are one-way. The initial value is pulled when the tree
//! is wired up; after that every change notification from the view-model
//! queues an update, and [`BindingEngine::apply_pending`] pulls the queued
//! values into the tree. Queuing keeps a view-model change made inside a
//! command from re-entering the tree while it is being updated.
//!
//! Nothing here fails loudly: an unknown property, a missing view-model
//! member or a value of the wrong kind is logged at DEBUG and skipped.

use std::cell::RefCell;
use std::rc::Rc;

use calyx_core::{Command, MethodCommand, SubscriptionHandle, ViewModel};
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use tracing::{debug, trace};

use crate::error::Result;
use crate::interaction::ElementEvent;
use crate::style::StyleContext;
use crate::tree::{ElementId, ElementTree};

/// A parsed `{Binding ...}` or `{Command ...}` expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupExpression {
    Binding { path: String },
    Command { name: String },
}

fn member_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.')(input)
}

fn binding(input: &str) -> IResult<&str, MarkupExpression> {
    let path = preceded(
        opt(tuple((tag_no_case("Path"), multispace0, char('='), multispace0))),
        member_name,
    );
    map(
        preceded(terminated(tag_no_case("Binding"), multispace1), path),
        |path: &str| MarkupExpression::Binding {
            path: path.to_string(),
        },
    )(input)
}

fn command(input: &str) -> IResult<&str, MarkupExpression> {
    map(
        preceded(terminated(tag_no_case("Command"), multispace1), member_name),
        |name: &str| MarkupExpression::Command {
            name: name.to_string(),
        },
    )(input)
}

impl MarkupExpression {
    /// Parse an attribute value; `None` if it isn't an expression
    pub fn parse(text: &str) -> Option<Self> {
        let expression = delimited(
            tuple((multispace0, tag("{"), multispace0)),
            alt((binding, command)),
            tuple((multispace0, tag("}"), multispace0)),
        );
        all_consuming(expression)(text).ok().map(|(_, e)| e)
    }
}

/// A queued property refresh
#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingUpdate {
    element: ElementId,
    property: String,
    path: String,
}

struct ActiveBinding {
    element: ElementId,
    view_model: Rc<dyn ViewModel>,
    subscription: Option<SubscriptionHandle>,
}

/// Wires markup expressions to view-models and applies change notifications
#[derive(Default)]
pub struct BindingEngine {
    pending: Rc<RefCell<Vec<PendingUpdate>>>,
    bindings: Vec<ActiveBinding>,
}

impl BindingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live property bindings
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of queued, not yet applied updates
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Resolve every markup expression in the subtree at `root`
    ///
    /// Returns the number of expressions that were bound.
    pub fn wire_up(&mut self, tree: &mut ElementTree, root: ElementId, ctx: &StyleContext) -> Result<usize> {
        tree.element(root)?;
        let mut bound = 0;

        for id in std::iter::once(root).chain(tree.descendants(root)) {
            let Some(element) = tree.get(id) else { continue };
            if element.markup_expressions.is_empty() {
                continue;
            }
            let expressions: Vec<(String, String)> = element
                .markup_expressions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let Some(view_model) = data_context_of(tree, id) else {
                debug!(element = ?id, "markup expressions without a data context, skipped");
                continue;
            };

            for (property, text) in expressions {
                let bound_one = match MarkupExpression::parse(&text) {
                    Some(MarkupExpression::Binding { path }) => {
                        self.bind_property(tree, ctx, id, &view_model, &property, &path)
                    }
                    Some(MarkupExpression::Command { name }) => {
                        bind_command(tree, id, view_model.as_ref(), &property, &name)
                    }
                    None => {
                        debug!(element = ?id, property = %property, expression = %text, "not a binding expression");
                        false
                    }
                };
                bound += bound_one as usize;
            }
        }

        debug!(root = ?root, bound, "wired up bindings");
        Ok(bound)
    }

    fn bind_property(
        &mut self,
        tree: &mut ElementTree,
        ctx: &StyleContext,
        id: ElementId,
        view_model: &Rc<dyn ViewModel>,
        property: &str,
        path: &str,
    ) -> bool {
        let Some(kind) = tree.get(id).map(|e| e.kind()) else {
            return false;
        };
        if ctx.properties.lookup(kind, property).is_none() {
            debug!(element = ?id, property, "binding target property not found");
            return false;
        }
        let Some(value) = view_model.property(path) else {
            debug!(element = ?id, property, path, "view-model has no such property");
            return false;
        };

        if let Err(err) = tree.set_property(id, ctx, property, value) {
            debug!(element = ?id, property, path, error = %err, "initial binding value rejected");
        }
        tree.invalidate_measure(id);
        tree.invalidate_visual(id);

        let pending = Rc::clone(&self.pending);
        let (property, path) = (property.to_string(), path.to_string());
        let subscription = view_model.subscribe(Rc::new(move |changed: &str| {
            if changed.is_empty() || changed == path {
                pending.borrow_mut().push(PendingUpdate {
                    element: id,
                    property: property.clone(),
                    path: path.clone(),
                });
            }
        }));

        self.bindings.push(ActiveBinding {
            element: id,
            view_model: Rc::clone(view_model),
            subscription,
        });
        true
    }

    /// Pull queued view-model changes into the tree
    ///
    /// Returns the number of properties that changed.
    pub fn apply_pending(&mut self, tree: &mut ElementTree, ctx: &StyleContext) -> usize {
        let queued = std::mem::take(&mut *self.pending.borrow_mut());
        let mut applied = 0;

        for (index, update) in queued.iter().enumerate() {
            // Only the latest notification for a binding matters
            if queued[index + 1..].contains(update) {
                continue;
            }
            if !tree.contains(update.element) {
                trace!(element = ?update.element, "binding target was removed");
                continue;
            }
            let Some(value) = data_context_of(tree, update.element).and_then(|vm| vm.property(&update.path)) else {
                debug!(element = ?update.element, path = %update.path, "bound view-model property disappeared");
                continue;
            };
            match tree.set_property(update.element, ctx, &update.property, value) {
                Ok(true) => {
                    tree.invalidate_measure(update.element);
                    tree.invalidate_visual(update.element);
                    applied += 1;
                }
                Ok(false) => {}
                Err(err) => debug!(
                    element = ?update.element,
                    property = %update.property,
                    error = %err,
                    "binding value rejected"
                ),
            }
        }
        applied
    }

    /// Drop the bindings targeting `id`
    pub fn unbind_element(&mut self, id: ElementId) {
        self.bindings.retain(|b| {
            if b.element != id {
                return true;
            }
            if let Some(handle) = b.subscription {
                b.view_model.unsubscribe(handle);
            }
            false
        });
        self.pending.borrow_mut().retain(|u| u.element != id);
    }

    /// Drop every binding and queued update
    pub fn clear(&mut self) {
        for binding in self.bindings.drain(..) {
            if let Some(handle) = binding.subscription {
                binding.view_model.unsubscribe(handle);
            }
        }
        self.pending.borrow_mut().clear();
    }
}

impl Drop for BindingEngine {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Bind a view-model command, or a method wrapped as one, to a slot
fn bind_command(tree: &mut ElementTree, id: ElementId, view_model: &dyn ViewModel, slot: &str, name: &str) -> bool {
    let Some(event) = ElementEvent::from_command_name(slot)
        .or_else(|| ElementEvent::from_command_name(&format!("On{}", slot)))
    else {
        debug!(element = ?id, slot, "unknown command slot");
        return false;
    };

    let command: Rc<dyn Command> = if let Some(command) = view_model.command(name) {
        command
    } else if let Some(shape) = view_model.method(name) {
        Rc::new(MethodCommand::new(name, shape))
    } else {
        debug!(element = ?id, command = name, "view-model has no such command or method");
        return false;
    };

    match tree.get_mut(id) {
        Some(element) => {
            element.set_command(event, command);
            true
        }
        None => false,
    }
}

/// The data context of `id` or its nearest ancestor that has one
fn data_context_of(tree: &ElementTree, id: ElementId) -> Option<Rc<dyn ViewModel>> {
    let mut current = Some(id);
    while let Some(c) = current {
        let element = tree.get(c)?;
        if let Some(vm) = &element.data_context {
            return Some(Rc::clone(vm));
        }
        current = element.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Widget};
    use calyx_core::{CommandArgs, MethodShape, ObservableObject, RelayCommand, Value};
    use std::cell::Cell;

    fn bound_text(tree: &mut ElementTree, vm: &Rc<ObservableObject>, expression: &str) -> ElementId {
        let mut element = Element::new(Widget::text_block(""));
        element.data_context = Some(Rc::clone(vm) as Rc<dyn ViewModel>);
        element
            .markup_expressions
            .insert("Text".to_string(), expression.to_string());
        tree.insert(element)
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(
            MarkupExpression::parse("{Binding Name}"),
            Some(MarkupExpression::Binding { path: "Name".into() })
        );
        assert_eq!(
            MarkupExpression::parse(" { Binding Path = User.Name } "),
            Some(MarkupExpression::Binding { path: "User.Name".into() })
        );
        assert_eq!(
            MarkupExpression::parse("{Command Save}"),
            Some(MarkupExpression::Command { name: "Save".into() })
        );
        assert_eq!(MarkupExpression::parse("Binding Name"), None);
        assert_eq!(MarkupExpression::parse("{Binding}"), None);
        assert_eq!(MarkupExpression::parse("{Binding Name} trailing"), None);
    }

    #[test]
    fn test_binding_round_trip() {
        let ctx = StyleContext::default();
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        vm.set_property("Name", "X");
        let text = bound_text(&mut tree, &vm, "{Binding Name}");

        let mut engine = BindingEngine::new();
        assert_eq!(engine.wire_up(&mut tree, text, &ctx).unwrap(), 1);
        assert_eq!(tree.get(text).unwrap().text(), Some("X"));

        vm.set_property("Name", "Y");
        assert_eq!(engine.pending_count(), 1);
        assert_eq!(tree.get(text).unwrap().text(), Some("X"));

        assert_eq!(engine.apply_pending(&mut tree, &ctx), 1);
        assert_eq!(tree.get(text).unwrap().text(), Some("Y"));
    }

    #[test]
    fn test_unrelated_changes_ignored_and_notify_all_refreshes() {
        let ctx = StyleContext::default();
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        vm.set_property("Name", "X");
        let text = bound_text(&mut tree, &vm, "{Binding Path=Name}");
        let mut engine = BindingEngine::new();
        engine.wire_up(&mut tree, text, &ctx).unwrap();

        vm.set_property("Other", 1);
        assert_eq!(engine.pending_count(), 0);

        vm.notify_all();
        assert_eq!(engine.pending_count(), 1);
        assert_eq!(engine.apply_pending(&mut tree, &ctx), 0);
    }

    #[test]
    fn test_binding_failures_are_silent() {
        let ctx = StyleContext::default();
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        vm.set_property("Flag", true);

        let missing_member = bound_text(&mut tree, &vm, "{Binding Nope}");
        let mut panel = Element::new(Widget::Panel);
        panel.data_context = Some(Rc::clone(&vm) as Rc<dyn ViewModel>);
        panel.markup_expressions.insert("Text".into(), "{Binding Flag}".into());
        let missing_target = tree.insert(panel);

        let mut engine = BindingEngine::new();
        assert_eq!(engine.wire_up(&mut tree, missing_member, &ctx).unwrap(), 0);
        assert_eq!(engine.wire_up(&mut tree, missing_target, &ctx).unwrap(), 0);
        assert_eq!(tree.get(missing_member).unwrap().text(), Some(""));
        assert_eq!(vm.subscriber_count(), 0);
    }

    #[test]
    fn test_command_binding_prefers_command_object() {
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        let ran = Rc::new(Cell::new(0));
        let ran_clone = Rc::clone(&ran);
        vm.set_command("Save", RelayCommand::new(move |_, _| ran_clone.set(ran_clone.get() + 1)).into_rc());
        let method_ran = Rc::new(Cell::new(false));
        let method_clone = Rc::clone(&method_ran);
        vm.set_method("Reset", MethodShape::NoArgs(Rc::new(move || method_clone.set(true))));

        let mut element = Element::new(Widget::button());
        element.data_context = Some(Rc::clone(&vm) as Rc<dyn ViewModel>);
        element.markup_expressions.insert("OnClick".into(), "{Command Save}".into());
        element.markup_expressions.insert("MouseDown".into(), "{Command Reset}".into());
        let button = tree.insert(element);

        let mut engine = BindingEngine::new();
        assert_eq!(engine.wire_up(&mut tree, button, &StyleContext::default()).unwrap(), 2);

        let sender = tree.sender(button);
        let args = CommandArgs::default();
        let element = tree.get(button).unwrap();
        element.command(ElementEvent::Click).unwrap().execute(&sender, &args);
        assert_eq!(ran.get(), 1);

        let reset = element.command(ElementEvent::MouseDown).unwrap();
        assert!(reset.can_execute(&sender, &args));
        reset.execute(&sender, &args);
        assert!(method_ran.get());
    }

    #[test]
    fn test_data_context_inherited_from_ancestor() {
        let ctx = StyleContext::default();
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        vm.set_property("Width", 120);

        let mut panel = Element::new(Widget::Panel);
        panel.data_context = Some(Rc::clone(&vm) as Rc<dyn ViewModel>);
        let panel = tree.insert(panel);
        let mut text = Element::new(Widget::text_block("t"));
        text.markup_expressions.insert("Width".into(), "{Binding Width}".into());
        let text = tree.insert(text);
        tree.add_child(panel, text).unwrap();

        let mut engine = BindingEngine::new();
        engine.wire_up(&mut tree, panel, &ctx).unwrap();
        assert_eq!(tree.get(text).unwrap().width, Some(120));
        assert_eq!(
            tree.get_property(text, &ctx.properties, "Width"),
            Some(Value::OptionalInt(Some(120)))
        );
    }

    #[test]
    fn test_dropping_engine_unsubscribes() {
        let ctx = StyleContext::default();
        let mut tree = ElementTree::new();
        let vm = Rc::new(ObservableObject::new());
        vm.set_property("Name", "X");
        let text = bound_text(&mut tree, &vm, "{Binding Name}");

        let mut engine = BindingEngine::new();
        engine.wire_up(&mut tree, text, &ctx).unwrap();
        assert_eq!(vm.subscriber_count(), 1);
        drop(engine);
        assert_eq!(vm.subscriber_count(), 0);
    }
}
