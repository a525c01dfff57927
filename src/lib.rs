//! Flowchart editing engine: shapes, connectors, labels and images on an
//! infinite canvas, with alignment guides and bounded undo history.

pub mod anchoring;
pub mod command;
pub mod control_point;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod model;
pub mod routing;
pub mod scene;
pub mod settings;
pub mod view;

pub use editor::{Editor, PointerButton};
pub use error::{EditorError, Result};
