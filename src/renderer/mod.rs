//! SVG rendering of compiled layouts

pub mod config;
pub mod shapes;
pub mod svg;

pub use config::RenderConfig;
pub use svg::{render_document, RenderContext};
