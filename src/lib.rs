//! A text-mode window tree with validated focus transfer and clipped,
//! incremental repainting.

pub mod color;
pub mod event;
pub mod tui;

pub use color::{ColorPair, ColorSet};
pub use event::{CancelArgs, DrawArgs, KeyArgs, KeyBindings, KeyChord};
pub use tui::{
    Point, Rect, ScrollBounds, Size, Surface, TreeError, Window, WindowHandler, WindowId, WindowTree,
};
