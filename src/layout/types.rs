//! Core data types for the grid layout engine

use std::collections::BTreeMap;

use crate::layout::transform::Transform;
use crate::parser::elements::{Element, SizeSpec};

/// Horizontal alignment within a grid cell or against an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl HAlign {
    /// Pick the first horizontal keyword out of a dash-separated align
    /// group, defaulting to center.
    pub fn from_words(words: &[&str]) -> Self {
        for w in words {
            match *w {
                "left" => return HAlign::Left,
                "center" => return HAlign::Center,
                "right" => return HAlign::Right,
                _ => {}
            }
        }
        HAlign::Center
    }
}

/// Vertical alignment within a grid cell or against an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl VAlign {
    pub fn from_words(words: &[&str]) -> Self {
        for w in words {
            match *w {
                "top" => return VAlign::Top,
                "middle" => return VAlign::Middle,
                "bottom" => return VAlign::Bottom,
                _ => {}
            }
        }
        VAlign::Middle
    }
}

/// How an object sits inside its (possibly spanned) grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridAlign {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

/// One cell of a layer grid.
#[derive(Debug, Clone, Default)]
pub enum GridCell {
    /// Nothing at this position.
    #[default]
    Empty,
    /// Horizontal continuation (`-`), extends the colspan of the object to
    /// the left.
    Dash,
    /// Vertical continuation (`|`, `[`, `]`, `(`, `)`), extends the rowspan
    /// of the object above.
    Pipe,
    /// A blank row's placeholder. Contributes a fixed height.
    Spacer { height: f64 },
    /// An element occurrence.
    Object(ObjectCell),
}

impl GridCell {
    pub fn as_object(&self) -> Option<&ObjectCell> {
        match self {
            GridCell::Object(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectCell> {
        match self {
            GridCell::Object(cell) => Some(cell),
            _ => None,
        }
    }
}

/// An element occurrence placed in the grid. Owns its own copy of the
/// element so fill resolution never mutates the spec-level template.
#[derive(Debug, Clone)]
pub struct ObjectCell {
    pub element: Element,
    pub width: Option<SizeSpec>,
    pub height: Option<SizeSpec>,
    pub colspan: usize,
    pub rowspan: usize,
    pub grid_align: GridAlign,
    /// Nested layout, present once a `shape` element has been instantiated.
    pub layout: Option<Box<ShapeLayout>>,
}

impl ObjectCell {
    pub fn width_abs(&self) -> Option<f64> {
        match self.width {
            Some(SizeSpec::Abs(v)) => Some(v),
            _ => None,
        }
    }

    pub fn height_abs(&self) -> Option<f64> {
        match self.height {
            Some(SizeSpec::Abs(v)) => Some(v),
            _ => None,
        }
    }

    pub fn width_is_fill(&self) -> bool {
        matches!(self.width, Some(SizeSpec::Fill))
    }

    pub fn height_is_fill(&self) -> bool {
        matches!(self.height, Some(SizeSpec::Fill))
    }
}

/// A reference to an element occurrence, `[l:<z>:]key[[index]][:next...]`.
/// `index` is already 0-based; the file syntax is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRef {
    pub layer_z: Option<u32>,
    pub key: String,
    pub index: usize,
    pub next: Option<Box<AnchorRef>>,
}

impl AnchorRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            layer_z: None,
            key: key.into(),
            index: 0,
            next: None,
        }
    }

    /// The reference as written, for error messages.
    pub fn display(&self) -> String {
        let mut out = String::new();
        if let Some(z) = self.layer_z {
            out.push_str(&format!("l:{z}:"));
        }
        out.push_str(&self.key);
        if self.index > 0 {
            out.push_str(&format!("[{}]", self.index + 1));
        }
        if let Some(next) = &self.next {
            out.push(':');
            out.push_str(&next.display());
        }
        out
    }
}

/// An anchor reference plus the alignment and offset applied to the point
/// taken from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorUse {
    pub anchor: AnchorRef,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub offset: (f64, f64),
}

/// Which point of a `from ... to ...` path the layer is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPoint {
    #[default]
    Start,
    Center,
    End,
}

/// Path interpretation: `path` rotates the layer along the from-to line;
/// `box` keeps it axis-aligned and exposes the bounding box as fill targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathMode {
    #[default]
    Path,
    Box,
}

/// Where a layer is positioned, from its descriptor line.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerLocation {
    At {
        at: AnchorUse,
        h_align: HAlign,
        v_align: VAlign,
        offset: (f64, f64),
    },
    Path {
        mode: PathMode,
        from: AnchorUse,
        to: AnchorUse,
        path_point: PathPoint,
        point_offset: (f64, f64),
        h_align: HAlign,
        v_align: VAlign,
        offset: (f64, f64),
    },
}

/// A `fillWidth:` / `fillHeight:` directive value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillSource {
    /// Explicit size.
    Abs(f64),
    /// `$width` / `$height`: the default layer's size.
    DefaultLayer,
    /// `$l:<z>:width` / `$l:<z>:height`: another layer's size.
    Layer(u32),
    /// `$path`: the from-to distance.
    Path,
    /// `$colspan` / `$rowspan`: no outer target, spans resolve on their own.
    Span,
}

/// Fill targets parsed off a layer descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FillTo {
    pub width: Option<FillSource>,
    pub height: Option<FillSource>,
}

/// Everything parsed from one `*` descriptor line.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub location: Option<LayerLocation>,
    pub fill: FillTo,
    pub rotate_to: Option<f64>,
    pub svg: Option<String>,
    pub line: usize,
}

impl LayerInfo {
    /// The implicit descriptor of the default layer.
    pub fn default_layer(line: usize) -> Self {
        Self {
            location: None,
            fill: FillTo::default(),
            rotate_to: None,
            svg: None,
            line,
        }
    }
}

/// A fully sized and placed layer.
#[derive(Debug, Clone)]
pub struct Layer {
    pub index: usize,
    pub z_index: u32,
    pub grid: Vec<Vec<GridCell>>,
    pub col_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
    /// Element key to its (row, column) occurrences, in discovery order.
    pub object_map: BTreeMap<String, Vec<(usize, usize)>>,
    pub location: Option<LayerLocation>,
    pub rotate_to: Option<f64>,
    pub svg: Option<String>,
    pub transforms: Vec<Transform>,
    pub col_start: f64,
    pub row_start: f64,
    /// Line of the descriptor (or first layout line for the default layer).
    pub line: usize,
}

impl Layer {
    pub fn rows(&self) -> usize {
        self.grid.len()
    }

    pub fn cols(&self) -> usize {
        self.col_widths.len()
    }
}

/// Extra geometry carried by some element kinds through to rendering.
#[derive(Debug, Clone, Default)]
pub enum PositionDetail {
    #[default]
    None,
    Line {
        stroke_width: f64,
        vertical: bool,
    },
    Shape {
        scale_x: f64,
        scale_y: f64,
        /// The nested layout, rendered recursively inside the cell.
        layout: Box<ShapeLayout>,
    },
}

/// The placement record for one element occurrence. Appended to the ledger
/// in discovery order and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedPosition {
    pub cx: f64,
    pub cy: f64,
    /// None when a producer declined to report a size; edge alignment
    /// against such an anchor is an error.
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub grid_align: GridAlign,
    pub transforms: Vec<Transform>,
    pub detail: PositionDetail,
}

/// Append-only ledger of resolved positions, keyed by layer z-index and
/// element key. Occurrence order matches grid discovery order.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    entries: BTreeMap<u32, BTreeMap<String, Vec<ResolvedPosition>>>,
}

impl PositionLedger {
    pub fn push(&mut self, z_index: u32, key: &str, position: ResolvedPosition) {
        self.entries
            .entry(z_index)
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(position);
    }

    pub fn get(&self, z_index: u32, key: &str, index: usize) -> Option<&ResolvedPosition> {
        self.entries.get(&z_index)?.get(key)?.get(index)
    }

    pub fn occurrences(&self, z_index: u32, key: &str) -> Option<&[ResolvedPosition]> {
        Some(self.entries.get(&z_index)?.get(key)?.as_slice())
    }
}

/// The result of laying out one shape (the whole diagram is the outermost
/// shape): its layers, position ledger, and outer size.
#[derive(Debug, Clone)]
pub struct ShapeLayout {
    pub layers: Vec<Layer>,
    pub positions: PositionLedger,
    pub neg_space_x: f64,
    pub neg_space_y: f64,
    pub width: f64,
    pub height: f64,
    pub default_layer_z: u32,
}

impl ShapeLayout {
    pub fn layer_by_z(&self, z_index: u32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.z_index == z_index)
    }

    pub fn default_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.index == 0)
    }
}

/// The grid cell frame handed to a layout producer: the spanned cell's
/// top-left corner and extent.
#[derive(Debug, Clone, Copy)]
pub struct CellFrame {
    pub col_x: f64,
    pub row_y: f64,
    pub col_width: f64,
    pub row_height: f64,
}

/// A producer's partial answer; unset fields fall back to cell-centered
/// defaults with the element's own size.
#[derive(Debug, Clone, Default)]
pub struct Produced {
    pub cx: Option<f64>,
    pub cy: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub transforms: Vec<Transform>,
    pub detail: PositionDetail,
}
