//! Error type shared by parsing, layout, and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Classification of a diagram error, mirroring the failure points of the
/// pipeline: unknown names, malformed grids, bad layer descriptors, and
/// unresolvable references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramErrorKind {
    UnknownElement,
    MultipleObjectsInColumn,
    ContinuationWithoutElement,
    InvalidLayerDefinition,
    ReferenceNotFound,
    AlignNotSupported,
    UnknownLayerZIndex,
    DuplicateZIndex,
    InvalidCoordinate,
    InvalidFillDirective,
    UnsupportedFill,
    ZeroDimensionLayer,
    UnknownDirective,
    InvalidSpec,
    InvalidElement,
}

/// An error anchored to a 1-based line of the diagram source.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct DiagramError {
    pub kind: DiagramErrorKind,
    pub message: String,
    pub line: usize,
}

impl DiagramError {
    pub fn new(kind: DiagramErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }

    pub fn unknown_element(name: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::UnknownElement,
            format!("Unknown element: {name}"),
            line,
        )
    }

    pub fn multiple_objects(line: usize) -> Self {
        Self::new(
            DiagramErrorKind::MultipleObjectsInColumn,
            "May not have more than one object per row in a column",
            line,
        )
    }

    pub fn continuation_without_element(line: usize) -> Self {
        Self::new(
            DiagramErrorKind::ContinuationWithoutElement,
            "Continuation must follow an element",
            line,
        )
    }

    pub fn invalid_layer_definition(line: usize) -> Self {
        Self::new(
            DiagramErrorKind::InvalidLayerDefinition,
            "Invalid layer definition",
            line,
        )
    }

    pub fn reference_not_found(anchor: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::ReferenceNotFound,
            format!("Reference not found: {anchor}"),
            line,
        )
    }

    pub fn align_not_supported(axis: &str, anchor: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::AlignNotSupported,
            format!("{axis} alignment not supported on anchor: {anchor}"),
            line,
        )
    }

    pub fn unknown_layer_z_index(z: u32, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::UnknownLayerZIndex,
            format!("Unknown layer z-index: {z}"),
            line,
        )
    }

    pub fn duplicate_z_index(z: u32, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::DuplicateZIndex,
            format!("Layer at z-index {z} already exists"),
            line,
        )
    }

    pub fn invalid_coordinate(raw: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::InvalidCoordinate,
            format!("Invalid coords: {raw}"),
            line,
        )
    }

    pub fn invalid_fill_directive(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagramErrorKind::InvalidFillDirective, message, line)
    }

    pub fn unsupported_fill(line: usize) -> Self {
        Self::new(
            DiagramErrorKind::UnsupportedFill,
            "Fill is not supported on this element",
            line,
        )
    }

    pub fn zero_dimension(axis: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::ZeroDimensionLayer,
            format!("Layer {axis} must be > 0"),
            line,
        )
    }

    pub fn unknown_directive(name: &str, line: usize) -> Self {
        Self::new(
            DiagramErrorKind::UnknownDirective,
            format!("Unknown type: {name}"),
            line,
        )
    }

    pub fn invalid_spec(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagramErrorKind::InvalidSpec, message, line)
    }

    pub fn invalid_element(message: impl Into<String>, line: usize) -> Self {
        Self::new(DiagramErrorKind::InvalidElement, message, line)
    }

    /// Format the error against its source with ariadne, labelling the
    /// offending line so surrounding context is shown in the report.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = line_span(source, self.line);
        let mut buf = Vec::new();
        let report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, span))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            )
            .finish();
        if report
            .write((filename, Source::from(source)), &mut buf)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8(buf).unwrap_or_else(|_| self.to_string())
    }
}

/// Byte range of a 1-based line within `source`. Falls back to the final
/// line when `line` runs past the end of the text.
fn line_span(source: &str, line: usize) -> std::ops::Range<usize> {
    let mut start = 0usize;
    let mut current = 1usize;
    for (i, c) in source.char_indices() {
        if current == line {
            let end = source[i..]
                .find('\n')
                .map(|off| i + off)
                .unwrap_or(source.len());
            return start..end.max(start);
        }
        if c == '\n' {
            current += 1;
            start = i + 1;
        }
    }
    if current == line {
        return start..source.len();
    }
    let last = source.rfind('\n').map(|i| i + 1).unwrap_or(0);
    last..source.len()
}

pub type Result<T> = std::result::Result<T, DiagramError>;
