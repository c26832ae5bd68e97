//! The grid layout engine
//!
//! A layout section turns into layers of typed grids: columns are discovered
//! from character positions, tracks are sized by fixed sizes and fill
//! targets, and the placer resolves every cell into absolute coordinates
//! and transform chains. `engine` ties the passes together and recurses
//! into nested shapes.

pub mod columns;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod grid;
pub mod placer;
pub mod size;
pub mod transform;
pub mod types;

pub use config::{Margin, Settings, SettingsProfile};
pub use engine::layout_diagram;
pub use types::{Layer, PositionLedger, ResolvedPosition, ShapeLayout};
