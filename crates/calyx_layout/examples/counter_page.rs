//! Counter Page Demo
//!
//! Builds a page with a bound counter label, a button wired to a view-model
//! method and a text field, then drives a few headless frames:
//! hover, click, type. Draw calls are recorded instead of rendered.
//!
//! Run with:
//! ```sh
//! RUST_LOG=calyx_layout=debug cargo run -p calyx_layout --example counter_page
//! ```

use std::rc::Rc;

use anyhow::Result;
use calyx_core::MethodShape;
use calyx_layout::prelude::*;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);

const STYLESHEET: &str = r#"
/* Counter page */
Page { BackgroundColor: #F4F4F4 }
Button { BackgroundColor: #3B82F6; Padding: 8, 4 }
Button:hover { BackgroundColor: #2563EB }
Button:active { BackgroundColor: #1D4ED8 }
#count { Font: Inter 24 }
LineEdit:focus { BorderColor: #3B82F6 }
.line-edit { Foreground: gray }
"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let view_model = Rc::new(ObservableObject::new());
    view_model.set_property("Count", "0");
    let counter = Rc::clone(&view_model);
    view_model.set_method(
        "Increment",
        MethodShape::NoArgs(Rc::new(move || {
            let next = counter
                .property("Count")
                .and_then(|v| v.as_str().and_then(|s| s.parse::<i32>().ok()))
                .unwrap_or(0)
                + 1;
            counter.set_property("Count", next.to_string());
        })),
    );

    let page = UiNode::new("Page").child(
        UiNode::new("StackPanel")
            .attr("Margin", "20")
            .child(UiNode::new("TextBlock").attr("Id", "count").attr("Text", "{Binding Count}"))
            .child(
                UiNode::new("Button")
                    .attr("Id", "increment")
                    .attr("OnClick", "{Command Increment}")
                    .text("Increment"),
            )
            .child(UiNode::new("LineEdit").attr("Id", "name").attr("Placeholder", "Your name")),
    );

    let mut ui = UiSystem::default().with_stylesheet(Stylesheet::parse(STYLESHEET)?);
    let vm: Rc<dyn ViewModel> = view_model.clone();
    let root = ui.load(&page, Some(vm))?;

    let mut draw = RecordingContext::new();
    ui.frame(&UiInputData::default(), FRAME, &mut draw);

    let button = ui
        .tree()
        .find_by_name(root, "increment")
        .ok_or_else(|| anyhow::anyhow!("button not built"))?;
    let bounds = ui.tree().element(button)?.bounds();
    let up = MouseState {
        position: Point::new(bounds.x + bounds.width / 2, bounds.y + bounds.height / 2),
        ..Default::default()
    };
    let down = MouseState { left: true, ..up };

    for _ in 0..3 {
        ui.frame(&UiInputData::from_states(&up, &up), FRAME, &mut draw);
        ui.frame(&UiInputData::from_states(&up, &down), FRAME, &mut draw);
        let events = ui.frame(&UiInputData::from_states(&down, &up), FRAME, &mut draw);
        tracing::info!(?events, "clicked");
    }
    ui.frame(&UiInputData::default(), FRAME, &mut draw);

    let label = ui
        .tree()
        .find_by_name(root, "count")
        .ok_or_else(|| anyhow::anyhow!("label not built"))?;
    tracing::info!(count = ?ui.tree().element(label)?.text(), "counter");

    let name = ui
        .tree()
        .find_by_name(root, "name")
        .ok_or_else(|| anyhow::anyhow!("line edit not built"))?;
    ui.tree_mut().request_focus(name);
    for c in "calyx".chars() {
        ui.handle_text_input(TextInput::char(c));
    }
    draw.clear();
    ui.frame(&UiInputData::default(), FRAME, &mut draw);
    tracing::info!(text = ?ui.tree().line_edit_text(name), "typed");

    for command in draw.commands() {
        println!("{command:?}");
    }
    Ok(())
}
