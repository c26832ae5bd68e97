//! Line-oriented pre-processing of diagram source
//!
//! Diagrams are positional: column offsets and blank rows carry meaning, and
//! every error must point at a line of the original file. This module keeps
//! source lines paired with their 1-based numbers through comment stripping,
//! section splitting, and block reordering.

pub mod lines;
pub mod sections;

pub use lines::{Lines, NumberedLine};
pub use sections::{split_sections, FileSections};
