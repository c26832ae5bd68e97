//! Placing sized layers and their grid cells into absolute coordinates
//!
//! One [`Placer`] serves one shape layout. Layers are placed in file order
//! so a layer's anchors always refer to positions already in the ledger.
//! Cell positions are captured without the layer transform applied; anchor
//! users inherit rotation separately through the layer rotation table.

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::layout::config::Margin;
use crate::layout::geometry::{angle_deg, distance, project_rotated};
use crate::layout::transform::Transform;
use crate::layout::types::{
    AnchorRef, AnchorUse, CellFrame, GridAlign, HAlign, Layer, LayerLocation, ObjectCell,
    PathMode, PathPoint, PositionDetail, PositionLedger, Produced, ResolvedPosition, VAlign,
};
use crate::parser::registry::Registry;

/// Produces the position and size details of one element occurrence within
/// its (possibly spanned) grid cell. Elements without a producer take the
/// cell-centered defaults.
pub type ProducerFn = fn(&ObjectCell, &CellFrame) -> Produced;

/// Lines collapse to a stroke along the longer cell axis.
pub fn produce_line(obj: &ObjectCell, _frame: &CellFrame) -> Produced {
    let width = obj.width_abs().unwrap_or(0.0);
    let height = obj.height_abs().unwrap_or(0.0);
    let vertical = height >= width;
    let stroke_width = if vertical { width } else { height };
    Produced {
        detail: PositionDetail::Line {
            stroke_width,
            vertical,
        },
        ..Produced::default()
    }
}

/// Text takes the whole spanned cell, so alignment happens in rendering.
pub fn produce_text(_obj: &ObjectCell, frame: &CellFrame) -> Produced {
    Produced {
        width: Some(frame.col_width),
        height: Some(frame.row_height),
        ..Produced::default()
    }
}

pub fn produce_polygon(_obj: &ObjectCell, frame: &CellFrame) -> Produced {
    Produced {
        width: Some(frame.col_width),
        height: Some(frame.row_height),
        ..Produced::default()
    }
}

/// A nested shape reports its natural size and carries the transform chain
/// that moves and scales its coordinate space into the cell. The placement
/// translate comes first so it applies after scaling.
pub fn produce_shape(obj: &ObjectCell, frame: &CellFrame) -> Produced {
    let Some(layout) = &obj.layout else {
        return Produced::default();
    };
    let width = layout.width;
    let height = layout.height;
    let scale_x = scale_factor(obj.width_abs(), width);
    let scale_y = scale_factor(obj.height_abs(), height);

    let mut transforms = Vec::new();
    transforms.push(Transform::translate_alignable(
        frame.col_x + frame.col_width / 2.0 - width / 2.0,
        frame.row_y + frame.row_height / 2.0 - height / 2.0,
    ));
    if scale_x != 1.0 || scale_y != 1.0 {
        // Scale around the shape center: move it to the origin, scale, and
        // move it back.
        let dx = width / 2.0;
        let dy = height / 2.0;
        transforms.push(Transform::translate(dx, dy));
        transforms.push(Transform::scale(scale_x, scale_y));
        transforms.push(Transform::translate(-dx, -dy));
    }

    Produced {
        width: Some(width),
        height: Some(height),
        transforms,
        detail: PositionDetail::Shape {
            scale_x,
            scale_y,
            layout: layout.clone(),
        },
        ..Produced::default()
    }
}

fn scale_factor(target: Option<f64>, natural: f64) -> f64 {
    match target {
        Some(t) if natural != 0.0 => t / natural,
        _ => 1.0,
    }
}

/// The rotation a layer carries, also inherited by anchors into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRotate {
    pub degrees: f64,
    pub x: f64,
    pub y: f64,
}

/// The projected footprint of a layer in image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct LayerExtent {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// The outer size of a finished shape layout.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSize {
    pub neg_space_x: f64,
    pub neg_space_y: f64,
    pub width: f64,
    pub height: f64,
    pub default_layer_z: u32,
}

struct LocationAndSize {
    x: f64,
    y: f64,
    rotate: Option<LayerRotate>,
}

struct AnchorLoc {
    cx: f64,
    cy: f64,
    width: Option<f64>,
    height: Option<f64>,
}

pub struct Placer<'a> {
    registry: &'a Registry,
    positions: PositionLedger,
    layer_rotations: BTreeMap<u32, Option<LayerRotate>>,
    default_layer_z: u32,
}

impl<'a> Placer<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            positions: PositionLedger::default(),
            layer_rotations: BTreeMap::new(),
            default_layer_z: 0,
        }
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    pub fn into_positions(self) -> PositionLedger {
        self.positions
    }

    pub fn default_layer_z(&self) -> u32 {
        self.default_layer_z
    }

    /// The fill targets a `from ... to ...` location contributes: in path
    /// mode the Euclidean distance fills the width; in box mode the path's
    /// bounding box fills both axes.
    pub fn path_targets(
        &self,
        layers: &[Layer],
        location: Option<&LayerLocation>,
        line: usize,
    ) -> Result<(f64, f64)> {
        let Some(LayerLocation::Path { mode, from, to, .. }) = location else {
            return Ok((0.0, 0.0));
        };
        let (fx, fy, _) = self.anchor_position(layers, from, line)?;
        let (tx, ty, _) = self.anchor_position(layers, to, line)?;
        match mode {
            PathMode::Path => Ok((distance(fx, fy, tx, ty), 0.0)),
            PathMode::Box => Ok(((tx - fx).abs(), (ty - fy).abs())),
        }
    }

    /// The angle a path-mode layer is rotated to. Box mode stays axis
    /// aligned and contributes no angle.
    pub fn path_angle(
        &self,
        layers: &[Layer],
        location: Option<&LayerLocation>,
        line: usize,
    ) -> Result<f64> {
        let Some(LayerLocation::Path {
            mode: PathMode::Path,
            from,
            to,
            ..
        }) = location
        else {
            return Ok(0.0);
        };
        let (fx, fy, _) = self.anchor_position(layers, from, line)?;
        let (tx, ty, _) = self.anchor_position(layers, to, line)?;
        Ok(angle_deg(fx, fy, tx, ty))
    }

    /// Place one layer: resolve its origin and rotation, build the transform
    /// chain, and capture the position of every object cell in the ledger.
    pub fn layout_layer(
        &mut self,
        layer: &mut Layer,
        placed: &[Layer],
        margin: &Margin,
        path_angle: f64,
    ) -> Result<()> {
        if layer.index == 0 {
            self.default_layer_z = layer.z_index;
        }

        let loc = self.location_and_size(layer, placed, margin)?;
        self.layer_rotations.insert(layer.z_index, loc.rotate);

        let mut transforms = Vec::new();
        if let Some(r) = loc.rotate {
            transforms.push(Transform::rotate(r.degrees, r.x, r.y));
        }
        if let Some(rotate_to) = layer.rotate_to {
            // Counter-rotate from the accumulated path angle around the
            // layer center; the outer translates are invisible to sizing.
            let (width, height) = layer_size(layer);
            let dx = width / 2.0;
            let dy = height / 2.0;
            transforms.push(Transform::translate_unsized(dx, dy));
            transforms.push(Transform::rotate(rotate_to - path_angle, loc.x, loc.y));
            transforms.push(Transform::translate_unsized(-dx, -dy));
        }

        layer.col_start = loc.x;
        layer.row_start = loc.y;
        layer.transforms = transforms;

        let z = layer.z_index;
        let mut row_y = loc.y;
        for y in 0..layer.grid.len() {
            let mut col_x = loc.x;
            for x in 0..layer.col_widths.len() {
                if let Some(obj) = layer.grid[y][x].as_object() {
                    let col_width: f64 = layer.col_widths[x..]
                        .iter()
                        .take(obj.colspan)
                        .sum();
                    let row_height: f64 = layer.row_heights[y..]
                        .iter()
                        .take(obj.rowspan)
                        .sum();
                    let frame = CellFrame {
                        col_x,
                        row_y,
                        col_width,
                        row_height,
                    };
                    let position = self.resolve_object(obj, &frame);
                    self.positions.push(z, &obj.element.key, position);
                }
                col_x += layer.col_widths[x];
            }
            row_y += layer.row_heights[y];
        }

        Ok(())
    }

    fn resolve_object(&self, obj: &ObjectCell, frame: &CellFrame) -> ResolvedPosition {
        let mut produced = match self.registry.producer(obj.element.kind.tag()) {
            Some(producer) => producer(obj, frame),
            None => Produced::default(),
        };

        let mut cx = produced
            .cx
            .unwrap_or(frame.col_x + frame.col_width / 2.0);
        let mut cy = produced
            .cy
            .unwrap_or(frame.row_y + frame.row_height / 2.0);
        let width = produced.width.or(obj.width_abs());
        let height = produced.height.or(obj.height_abs());

        let (nudge_x, nudge_y) = grid_nudge(obj.grid_align, frame, width, height);
        cx += nudge_x;
        cy += nudge_y;
        for t in &mut produced.transforms {
            if let Transform::Translate {
                dx,
                dy,
                grid_alignable: true,
                ..
            } = t
            {
                *dx += nudge_x;
                *dy += nudge_y;
            }
        }

        ResolvedPosition {
            cx,
            cy,
            width,
            height,
            grid_align: obj.grid_align,
            transforms: produced.transforms,
            detail: produced.detail,
        }
    }

    fn location_and_size(
        &self,
        layer: &Layer,
        placed: &[Layer],
        margin: &Margin,
    ) -> Result<LocationAndSize> {
        match &layer.location {
            None => Ok(LocationAndSize {
                x: margin.left,
                y: margin.top,
                rotate: None,
            }),
            Some(LayerLocation::At {
                at,
                h_align,
                v_align,
                offset,
            }) => {
                let (ax, ay, rotate) = self.anchor_position(placed, at, layer.line)?;
                let (width, height) = layer_size(layer);
                let (x, y) =
                    apply_layer_alignment(ax, ay, width, height, *h_align, *v_align, *offset);
                Ok(LocationAndSize { x, y, rotate })
            }
            Some(LayerLocation::Path {
                mode,
                from,
                to,
                path_point,
                point_offset,
                h_align,
                v_align,
                offset,
            }) => {
                let (fx, fy, _) = self.anchor_position(placed, from, layer.line)?;
                let (tx, ty, _) = self.anchor_position(placed, to, layer.line)?;
                let rotate_angle = angle_deg(fx, fy, tx, ty);
                let (width, height) = layer_size(layer);
                let (layer_x, layer_y) =
                    apply_layer_alignment(fx, fy, width, height, *h_align, *v_align, *offset);
                let (path_x, path_y) = position_on_path(*path_point, *point_offset, (fx, fy), (tx, ty));
                let dx = path_x - fx;
                let dy = path_y - fy;
                let rotate = (*mode == PathMode::Path && rotate_angle != 0.0).then(|| LayerRotate {
                    degrees: rotate_angle,
                    x: fx + dx,
                    y: fy + dy,
                });
                Ok(LocationAndSize {
                    x: layer_x + dx,
                    y: layer_y + dy,
                    rotate,
                })
            }
        }
    }

    /// Resolve an anchor use to a point, applying the anchor-side alignment
    /// and offset. The rotation of an explicitly-referenced layer travels
    /// with the point.
    pub fn anchor_position(
        &self,
        layers: &[Layer],
        anchor_use: &AnchorUse,
        line: usize,
    ) -> Result<(f64, f64, Option<LayerRotate>)> {
        let loc = locate_in(
            &self.positions,
            layers,
            self.default_layer_z,
            &anchor_use.anchor,
            line,
        )?;
        let rotate = anchor_use
            .anchor
            .layer_z
            .and_then(|z| self.layer_rotations.get(&z).copied().flatten())
            .filter(|r| r.degrees != 0.0);

        if anchor_use.h_align != HAlign::Center && loc.width.is_none() {
            return Err(DiagramError::align_not_supported(
                "Horizontal",
                &anchor_use.anchor.display(),
                line,
            ));
        }
        if anchor_use.v_align != VAlign::Middle && loc.height.is_none() {
            return Err(DiagramError::align_not_supported(
                "Vertical",
                &anchor_use.anchor.display(),
                line,
            ));
        }

        let mut x = loc.cx;
        let mut y = loc.cy;
        match anchor_use.h_align {
            HAlign::Right => x += loc.width.unwrap_or(0.0) / 2.0,
            HAlign::Left => x -= loc.width.unwrap_or(0.0) / 2.0,
            HAlign::Center => {}
        }
        match anchor_use.v_align {
            VAlign::Top => y -= loc.height.unwrap_or(0.0) / 2.0,
            VAlign::Bottom => y += loc.height.unwrap_or(0.0) / 2.0,
            VAlign::Middle => {}
        }
        x += anchor_use.offset.0;
        y += anchor_use.offset.1;
        Ok((x, y, rotate))
    }

    /// The footprint of a placed layer after its transform chain, walked in
    /// reverse because SVG applies chains right to left.
    pub fn projected_extent(&self, layer: &Layer) -> LayerExtent {
        projected_extent(layer)
    }

    /// Outer size of the whole shape: the union of the projected layers plus
    /// the right/bottom margin, and how far it runs past the left/top margin.
    pub fn shape_size(&self, layers: &[Layer], margin: &Margin) -> ShapeSize {
        let mut max_x2 = 0.0f64;
        let mut max_y2 = 0.0f64;
        let mut min_x = margin.left;
        let mut min_y = margin.top;
        for layer in layers {
            let e = projected_extent(layer);
            max_x2 = max_x2.max(e.x2);
            max_y2 = max_y2.max(e.y2);
            min_x = min_x.min(e.x1);
            min_y = min_y.min(e.y1);
        }

        ShapeSize {
            neg_space_x: (margin.left - min_x).max(0.0),
            neg_space_y: (margin.top - min_y).max(0.0),
            width: max_x2 + margin.right,
            height: max_y2 + margin.bottom,
            default_layer_z: self.default_layer_z,
        }
    }
}

fn locate_in(
    positions: &PositionLedger,
    layers: &[Layer],
    default_z: u32,
    anchor: &AnchorRef,
    line: usize,
) -> Result<AnchorLoc> {
    let z = match anchor.layer_z {
        Some(z) => {
            if !layers.iter().any(|l| l.z_index == z) {
                return Err(DiagramError::unknown_layer_z_index(z, line));
            }
            z
        }
        None => default_z,
    };
    let base = positions
        .get(z, &anchor.key, anchor.index)
        .ok_or_else(|| DiagramError::reference_not_found(&anchor.display(), line))?;

    let Some(next) = &anchor.next else {
        return Ok(AnchorLoc {
            cx: base.cx,
            cy: base.cy,
            width: base.width,
            height: base.height,
        });
    };

    // The chain continues inside the nested shape at this occurrence.
    let layer = match anchor.layer_z {
        Some(z) => layers.iter().find(|l| l.z_index == z),
        None => layers.iter().find(|l| l.index == 0),
    }
    .ok_or_else(|| DiagramError::reference_not_found(&anchor.display(), line))?;
    let (row, col) = layer
        .object_map
        .get(&anchor.key)
        .and_then(|v| v.get(anchor.index))
        .copied()
        .ok_or_else(|| DiagramError::reference_not_found(&anchor.display(), line))?;
    let layout = layer.grid[row][col]
        .as_object()
        .and_then(|o| o.layout.as_deref())
        .ok_or_else(|| DiagramError::reference_not_found(&anchor.display(), line))?;

    let inner = locate_in(
        &layout.positions,
        &layout.layers,
        layout.default_layer_z,
        next,
        line,
    )?;
    Ok(AnchorLoc {
        cx: base.cx - base.width.unwrap_or(0.0) / 2.0 + inner.cx,
        cy: base.cy - base.height.unwrap_or(0.0) / 2.0 + inner.cy,
        width: inner.width,
        height: inner.height,
    })
}

fn grid_nudge(
    align: GridAlign,
    frame: &CellFrame,
    width: Option<f64>,
    height: Option<f64>,
) -> (f64, f64) {
    let w = width.unwrap_or(0.0);
    let h = height.unwrap_or(0.0);
    let nudge_x = match align.horizontal {
        HAlign::Left => -frame.col_width / 2.0 + w / 2.0,
        HAlign::Right => frame.col_width / 2.0 - w / 2.0,
        HAlign::Center => 0.0,
    };
    let nudge_y = match align.vertical {
        VAlign::Top => -frame.row_height / 2.0 + h / 2.0,
        VAlign::Bottom => frame.row_height / 2.0 - h / 2.0,
        VAlign::Middle => 0.0,
    };
    (nudge_x, nudge_y)
}

fn apply_layer_alignment(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    h_align: HAlign,
    v_align: VAlign,
    offset: (f64, f64),
) -> (f64, f64) {
    let mut x = x - width / 2.0;
    let mut y = y - height / 2.0;
    match h_align {
        HAlign::Left => x += width / 2.0,
        HAlign::Right => x -= width / 2.0,
        HAlign::Center => {}
    }
    match v_align {
        VAlign::Top => y += height / 2.0,
        VAlign::Bottom => y -= height / 2.0,
        VAlign::Middle => {}
    }
    (x + offset.0, y + offset.1)
}

fn position_on_path(
    point: PathPoint,
    offset: (f64, f64),
    from: (f64, f64),
    to: (f64, f64),
) -> (f64, f64) {
    let (mut x, mut y) = match point {
        PathPoint::Start => from,
        PathPoint::End => to,
        PathPoint::Center => (
            (to.0 - from.0) / 2.0 + from.0,
            (to.1 - from.1) / 2.0 + from.1,
        ),
    };
    x += offset.0;
    y += offset.1;
    (x, y)
}

fn layer_size(layer: &Layer) -> (f64, f64) {
    (
        layer.col_widths.iter().sum(),
        layer.row_heights.iter().sum(),
    )
}

fn projected_extent(layer: &Layer) -> LayerExtent {
    let (mut width, mut height) = layer_size(layer);
    let mut x1 = layer.col_start;
    let mut y1 = layer.row_start;
    for t in layer.transforms.iter().rev() {
        match t {
            Transform::Rotate { degrees, x, y } => {
                let e = project_rotated(x1, y1, width, height, *x, *y, *degrees);
                x1 = e.x1;
                y1 = e.y1;
                width = e.width;
                height = e.height;
            }
            Transform::Translate {
                dx,
                dy,
                ignore_for_sizing,
                ..
            } => {
                if !ignore_for_sizing {
                    x1 += dx;
                    y1 += dy;
                }
            }
            Transform::Scale { .. } => {}
        }
    }
    LayerExtent {
        x1,
        y1,
        x2: x1 + width,
        y2: y1 + height,
    }
}
