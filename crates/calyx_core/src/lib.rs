//! Calyx Core
//!
//! Foundation types shared by the Calyx UI crates:
//!
//! - **Geometry**: integer points, sizes, rectangles and box-model thickness
//! - **Input**: immutable per-frame input snapshots and text-entry events
//! - **Values**: the dynamically typed property value used by styles and bindings
//! - **Commands**: guarded actions and method-to-command adapters
//! - **View-models**: named-property lookup with change notification
//!
//! # Example
//!
//! ```rust
//! use calyx_core::geometry::{Rect, Thickness};
//!
//! let outer = Rect::new(0, 0, 100, 40);
//! let inner = outer.deflate(Thickness::uniform(4));
//!
//! assert_eq!(inner, Rect::new(4, 4, 92, 32));
//! assert_eq!(inner.inflate(Thickness::uniform(4)), outer);
//! ```

pub mod color;
pub mod command;
pub mod error;
pub mod geometry;
pub mod input;
pub mod observable;
pub mod registry;
pub mod value;

pub use color::Color;
pub use command::{try_execute, Command, CommandArgs, MethodCommand, MethodShape, RelayCommand, Sender};
pub use error::{CoreError, Result};
pub use geometry::{Point, Rect, Size, Thickness};
pub use input::{ButtonState, Key, KeyboardState, MouseState, TextInput, UiInputData};
pub use observable::{ChangeHandler, ObservableObject, SubscriptionHandle, ViewModel};
pub use registry::UniqueRegistry;
pub use value::{FontRef, HorizontalAlignment, Orientation, Value, ValueKind, VerticalAlignment};
