//! Headless pixel-art editing engine: a bounded colour grid with undo/redo,
//! pencil / eraser / fill / picker tools, marquee and lasso selection with
//! lift-and-move, image rasterization, and JSON / binary / PNG file output.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{CanvasRect, Cell, Color, GridError, PixelGrid, Point, Viewport};
pub use components::tools::{PointerEvent, PointerKind, Tool};
pub use io::ProjectError;
pub use project::{ConfirmPrompt, FixedAnswer, Project};
