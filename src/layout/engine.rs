//! Layer-by-layer layout of one shape
//!
//! The layout section splits into layers at `*` descriptor lines. Layers
//! are built in file order so anchors always point backwards, then the
//! placer turns sized grids into absolute positions. Nested shapes recurse
//! through the same entry point with their fill sizes forced.

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::input::{Lines, NumberedLine};
use crate::layout::columns;
use crate::layout::config::Margin;
use crate::layout::grid::{self, ShapeLayouter};
use crate::layout::placer::Placer;
use crate::layout::types::{FillSource, Layer, LayerInfo, ShapeLayout};
use crate::parser::descriptor::{parse_layer_info, split_layer_prefix};
use crate::parser::elements::{Element, ElementKind, PARAM_SHAPE_ARGS};
use crate::parser::registry::Registry;
use crate::parser::spec::{resolve_shape_args, shape_arg_variables, SpecState};

/// One layer's raw material: its descriptor line (None for the default
/// layer) and its layout lines.
struct LayerSource {
    descriptor: Option<NumberedLine>,
    lines: Vec<NumberedLine>,
}

/// Lay out the top-level diagram from its layout section.
pub fn layout_diagram(
    state: &SpecState,
    registry: &Registry,
    layout: &mut Lines,
) -> Result<ShapeLayout> {
    let margin = state.margin;
    parse_layout(
        state,
        registry,
        layout,
        &BTreeMap::new(),
        &margin,
        None,
        None,
        0.0,
    )
}

/// Lay out one shape (the diagram itself, or a nested shape occurrence).
/// `fill_width`/`fill_height` force the default layer's fill targets when a
/// host cell supplies the space to fill.
#[allow(clippy::too_many_arguments)]
pub fn parse_layout(
    state: &SpecState,
    registry: &Registry,
    layout: &mut Lines,
    params: &BTreeMap<String, String>,
    margin: &Margin,
    fill_width: Option<f64>,
    fill_height: Option<f64>,
    parent_path_angle: f64,
) -> Result<ShapeLayout> {
    let sources = parse_layout_lines(layout);
    let z_map = make_layer_z_map(&sources)?;

    let mut placer = Placer::new(registry);
    let mut layers: Vec<Layer> = Vec::new();

    for (i, source) in sources.iter().enumerate() {
        let info = layer_info(source, params)?;
        let z_index = z_map[i];

        let path_targets = placer.path_targets(&layers, info.location.as_ref(), info.line)?;
        let path_angle =
            placer.path_angle(&layers, info.location.as_ref(), info.line)? + parent_path_angle;

        // Forced targets only apply to the default layer of a nested shape.
        let (forced_w, forced_h) = if i == 0 {
            (fill_width, fill_height)
        } else {
            (None, None)
        };
        let fill_to = (
            resolve_fill_target(forced_w, info.fill.width, path_targets.0, &layers, true, info.line)?,
            resolve_fill_target(forced_h, info.fill.height, path_targets.1, &layers, false, info.line)?,
        );

        let mut lines = source.lines.clone();
        if lines.last().is_some_and(|l| l.text.trim().is_empty()) {
            // Drop the final blank row only; extra blank rows are spacing.
            lines.pop();
        }
        columns::trim_preceding_whitespace(&mut lines);
        let spans = columns::column_graph(&lines);

        let mut layouter = |element: &Element, w: Option<f64>, h: Option<f64>| {
            layout_shape_element(state, registry, element, w, h, path_angle)
        };
        let built = grid::make_layer_grid(
            &lines,
            &spans,
            state,
            &state.settings,
            params,
            fill_to,
            &mut layouter as &mut ShapeLayouter<'_>,
        )?;

        if i == 0 {
            let first_line = lines.first().map(|l| l.number).unwrap_or(info.line);
            grid::assert_non_zero_size(&built.col_widths, &built.row_heights, first_line)?;
        }

        let mut layer = Layer {
            index: i,
            z_index,
            grid: built.grid,
            col_widths: built.col_widths,
            row_heights: built.row_heights,
            object_map: built.object_map,
            location: info.location,
            rotate_to: info.rotate_to,
            svg: info.svg,
            transforms: Vec::new(),
            col_start: 0.0,
            row_start: 0.0,
            line: info.line,
        };

        let layer_margin = if i == 0 { *margin } else { Margin::zero() };
        placer.layout_layer(&mut layer, &layers, &layer_margin, path_angle)?;
        layers.push(layer);
    }

    let size = placer.shape_size(&layers, margin);
    Ok(ShapeLayout {
        layers,
        positions: placer.into_positions(),
        neg_space_x: size.neg_space_x,
        neg_space_y: size.neg_space_y,
        width: size.width,
        height: size.height,
        default_layer_z: size.default_layer_z,
    })
}

/// Lay out a nested shape occurrence, mapping its arguments to parameter
/// names and threading through the accumulated path angle.
pub fn layout_shape_element(
    state: &SpecState,
    registry: &Registry,
    element: &Element,
    fill_width: Option<f64>,
    fill_height: Option<f64>,
    path_angle: f64,
) -> Result<ShapeLayout> {
    let ElementKind::Shape { shape } = &element.kind else {
        return Err(DiagramError::invalid_element(
            format!("Element is not a shape: {}", element.key),
            element.line,
        ));
    };
    let def = state
        .shapes
        .get(shape)
        .ok_or_else(|| DiagramError::unknown_element(shape, element.line))?;

    let raw_args = element
        .params
        .get(PARAM_SHAPE_ARGS)
        .cloned()
        .unwrap_or_default();
    let args = resolve_shape_args(&raw_args, &state.variables);
    let shape_params = shape_arg_variables(def, &args);
    let shape_state = def.state.as_deref().unwrap_or(state);

    let mut lines = def.layout.clone();
    lines.reset();
    parse_layout(
        shape_state,
        registry,
        &mut lines,
        &shape_params,
        &Margin::zero(),
        fill_width,
        fill_height,
        path_angle,
    )
}

fn layer_info(source: &LayerSource, params: &BTreeMap<String, String>) -> Result<LayerInfo> {
    let Some(descriptor) = &source.descriptor else {
        let line = source.lines.first().map(|l| l.number).unwrap_or(0);
        return Ok(LayerInfo::default_layer(line));
    };
    let Some((_, rest)) = split_layer_prefix(&descriptor.text) else {
        return Err(DiagramError::invalid_layer_definition(descriptor.number));
    };
    parse_layer_info(rest, descriptor.number, params)
}

/// Split the layout section at `*` descriptor lines. One blank line right
/// after a descriptor is swallowed; further blanks are spacer rows.
fn parse_layout_lines(layout: &mut Lines) -> Vec<LayerSource> {
    let mut sources = Vec::new();
    let mut descriptor: Option<NumberedLine> = None;
    let mut lines: Vec<NumberedLine> = Vec::new();
    let mut new_layer = true;

    while let Some(line) = layout.pop() {
        if new_layer && line.text.trim().is_empty() {
            new_layer = false;
            continue;
        }
        new_layer = false;

        if line.text.trim().starts_with('*') {
            sources.push(LayerSource {
                descriptor: descriptor.take(),
                lines: std::mem::take(&mut lines),
            });
            descriptor = Some(line);
            new_layer = true;
        } else {
            lines.push(line);
        }
    }
    if !lines.is_empty() {
        sources.push(LayerSource { descriptor, lines });
    }

    sources
}

/// File z-indexes are 1-based; the default layer and any undescribed layer
/// take the lowest free slot in file order.
fn make_layer_z_map(sources: &[LayerSource]) -> Result<Vec<u32>> {
    let mut z_map = vec![0u32; sources.len()];
    let mut taken: BTreeMap<u32, usize> = BTreeMap::new();
    let mut unindexed = Vec::new();

    for (i, source) in sources.iter().enumerate() {
        if i == 0 {
            unindexed.push(i);
            continue;
        }
        let explicit = source
            .descriptor
            .as_ref()
            .and_then(|d| split_layer_prefix(&d.text))
            .and_then(|(z, _)| z);
        match explicit {
            Some(z) => {
                if taken.contains_key(&z) {
                    let line = source.descriptor.as_ref().map(|d| d.number).unwrap_or(0);
                    return Err(DiagramError::duplicate_z_index(z, line));
                }
                taken.insert(z, i);
                z_map[i] = z;
            }
            None => unindexed.push(i),
        }
    }

    let mut z = 1u32;
    for i in unindexed {
        while taken.contains_key(&z) {
            z += 1;
        }
        z_map[i] = z;
        z += 1;
    }

    Ok(z_map)
}

fn resolve_fill_target(
    forced: Option<f64>,
    user: Option<FillSource>,
    path_target: f64,
    layers: &[Layer],
    width_axis: bool,
    line: usize,
) -> Result<f64> {
    if let Some(forced) = forced {
        return Ok(forced);
    }

    let mut fill = 0.0;
    if path_target > 0.0 && user.is_none() {
        fill = path_target;
    }
    match user {
        Some(FillSource::Abs(v)) => fill = v,
        Some(FillSource::DefaultLayer) => {
            if let Some(layer) = layers.iter().find(|l| l.index == 0) {
                fill = layer_axis_size(layer, width_axis);
            }
        }
        Some(FillSource::Layer(z)) => {
            let layer = layers
                .iter()
                .find(|l| l.z_index == z)
                .ok_or_else(|| DiagramError::unknown_layer_z_index(z, line))?;
            fill = layer_axis_size(layer, width_axis);
        }
        Some(FillSource::Path) => fill = path_target,
        Some(FillSource::Span) => fill = 0.0,
        None => {}
    }
    Ok(fill)
}

fn layer_axis_size(layer: &Layer, width_axis: bool) -> f64 {
    if width_axis {
        layer.col_widths.iter().sum()
    } else {
        layer.row_heights.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagramErrorKind;
    use crate::layout::config::Settings;
    use crate::parser::spec::parse_spec;
    use pretty_assertions::assert_eq;

    fn layout(source: &str) -> Result<ShapeLayout> {
        let registry = Registry::with_builtins();
        let sections = crate::input::split_sections(source)?;
        let mut spec_lines = sections.spec;
        let mut state = parse_spec(
            &mut spec_lines,
            &registry,
            Settings::default(),
            Margin::default(),
        )?;
        for block in sections.shapes {
            let def = crate::parser::spec::parse_shape(block, &registry, &state.settings)?;
            state.shapes.insert(def.name.clone(), def);
        }
        let mut layout_lines = sections.layout;
        layout_diagram(&state, &registry, &mut layout_lines)
    }

    #[test]
    fn test_single_layer_diagram() {
        let shape = layout("rect:\n  a: 100 50\n  b: 60 40\nlayout:\n\na b\n").unwrap();
        assert_eq!(shape.layers.len(), 1);
        let layer = &shape.layers[0];
        assert_eq!(layer.z_index, 1);
        assert_eq!(layer.col_start, 30.0);
        // 100 + 20 spacer + 60 wide, plus both margins.
        assert_eq!(shape.width, 240.0);
        assert_eq!(shape.height, 110.0);
        let a = shape.positions.get(1, "a", 0).unwrap();
        assert_eq!((a.cx, a.cy), (80.0, 55.0));
        let b = shape.positions.get(1, "b", 0).unwrap();
        assert_eq!(b.cx, 30.0 + 100.0 + 20.0 + 30.0);
    }

    #[test]
    fn test_layer_anchored_at_element() {
        let shape = layout(
            "rect:\n  a: 100 50\n  dot: 10 10\nlayout:\n\na\n* at a\ndot\n",
        )
        .unwrap();
        assert_eq!(shape.layers.len(), 2);
        // The overlay centers its 10x10 grid on a's center.
        let dot = shape.positions.get(2, "dot", 0).unwrap();
        let a = shape.positions.get(1, "a", 0).unwrap();
        assert_eq!(dot.cx, a.cx);
        assert_eq!(dot.cy, a.cy);
    }

    #[test]
    fn test_explicit_z_and_free_slot_assignment() {
        let shape = layout(
            "rect:\n  a: 30 30\nlayout:\n\na\n*:1 at a\na\n* at a\na\n",
        )
        .unwrap();
        let zs: Vec<u32> = shape.layers.iter().map(|l| l.z_index).collect();
        // Default layer skips the taken z 1 and lands on 2; the unindexed
        // overlay takes 3.
        assert_eq!(zs, vec![2, 1, 3]);
        assert_eq!(shape.default_layer_z, 2);
    }

    #[test]
    fn test_duplicate_z_index() {
        let err = layout(
            "rect:\n  a: 30 30\nlayout:\n\na\n*:2 at a\na\n*:2 at a\na\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::DuplicateZIndex);
    }

    #[test]
    fn test_zero_size_default_layer() {
        let err = layout("rect:\n  a: 0 0\nlayout:\n\na\n").unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::ZeroDimensionLayer);
    }

    #[test]
    fn test_layer_offset_plus() {
        let shape = layout(
            "rect:\n  a: 100 50\n  dot: 10 10\nlayout:\n\na\n* at a plus 5,-5\ndot\n",
        )
        .unwrap();
        let dot = shape.positions.get(2, "dot", 0).unwrap();
        let a = shape.positions.get(1, "a", 0).unwrap();
        assert_eq!(dot.cx, a.cx + 5.0);
        assert_eq!(dot.cy, a.cy - 5.0);
    }

    #[test]
    fn test_nested_shape_takes_natural_size() {
        let shape = layout(
            "rect:\n  r: 40 20\nshape:\n  box: inner\nlayout:\n\nbox\nshape: inner\n\nr\n",
        )
        .unwrap();
        let b = shape.positions.get(1, "box", 0).unwrap();
        // Natural size of the nested layout is the bare rect.
        assert_eq!(b.width, Some(40.0));
        assert_eq!(b.height, Some(20.0));
    }

    #[test]
    fn test_unknown_fill_layer_reference() {
        let err = layout(
            "rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na\n* at a fillWidth:$l:7:width\nb\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::UnknownLayerZIndex);
    }

    #[test]
    fn test_fill_to_other_layer_width() {
        let shape = layout(
            "rect:\n  a: 100 30\n  b: fill 10\nlayout:\n\na\n* at a fillWidth:$width\nb\n",
        )
        .unwrap();
        let b = shape.positions.get(2, "b", 0).unwrap();
        assert_eq!(b.width, Some(100.0));
    }

    #[test]
    fn test_reference_to_later_layer_fails() {
        let err = layout(
            "rect:\n  a: 30 30\n  b: 30 30\nlayout:\n\na\n* at missing\nb\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::ReferenceNotFound);
        // The descriptor sits on line 7 of the source.
        assert_eq!(err.line, 7);
    }
}
