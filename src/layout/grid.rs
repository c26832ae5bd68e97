//! Building a layer grid from ASCII layout lines
//!
//! Each layout line is split against the column graph. A token names an
//! element occurrence; `|` and the bracket characters continue the object
//! above; dashes continue the object to the left; a blank line inserts a
//! vertical spacer and stops the row.

use std::collections::BTreeMap;

use crate::error::{DiagramError, Result};
use crate::input::NumberedLine;
use crate::layout::columns::{char_slice, ColumnKind, ColumnSpan};
use crate::layout::config::Settings;
use crate::layout::size::{self, Track};
use crate::layout::types::{GridAlign, GridCell, ObjectCell, ShapeLayout};
use crate::parser::elements::{Element, ElementKind};
use crate::parser::spec::SpecState;

/// Lays out a nested shape occurrence: the element (a `shape` reference)
/// plus the width and height to fill to, when known.
pub type ShapeLayouter<'a> =
    dyn FnMut(&Element, Option<f64>, Option<f64>) -> Result<ShapeLayout> + 'a;

/// A shape cell whose layout is deferred until its fill sizes resolve.
#[derive(Debug, Clone, Copy)]
struct FillableShape {
    row: usize,
    col: usize,
    laid_out: bool,
}

/// A fully sized grid, ready for placement.
#[derive(Debug, Clone)]
pub struct LayerGrid {
    pub grid: Vec<Vec<GridCell>>,
    pub col_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
    pub object_map: BTreeMap<String, Vec<(usize, usize)>>,
}

/// Build and size the grid of one layer. `fill_to` carries the resolved
/// width and height targets (zero when the layer just takes its natural
/// size).
pub fn make_layer_grid(
    lines: &[NumberedLine],
    spans: &[ColumnSpan],
    state: &SpecState,
    settings: &Settings,
    vars: &BTreeMap<String, String>,
    fill_to: (f64, f64),
    layout_shape: &mut ShapeLayouter<'_>,
) -> Result<LayerGrid> {
    let mut object_map = BTreeMap::new();
    let mut shapes_to_fill = Vec::new();
    let mut grid = Vec::with_capacity(lines.len());

    for (y, line) in lines.iter().enumerate() {
        grid.push(fill_grid_row(
            line,
            spans,
            state,
            settings,
            vars,
            y,
            &mut object_map,
            &mut shapes_to_fill,
            layout_shape,
        )?);
    }

    set_col_spans(&mut grid);
    set_row_spans(&mut grid);

    let mut col_tracks = size::column_tracks(spans, settings.horizontal_spacer);
    let mut row_tracks = size::row_tracks(lines.len());
    size::mark_spacer_rows(&grid, &mut row_tracks, settings.vertical_spacer);

    let col_widths = size::distribute_widths(&mut grid, &mut col_tracks, fill_to.0);
    // Shapes without a fill height can be laid out now that widths are
    // known; their natural heights feed the height pass.
    layout_fillable_shapes(&mut grid, &mut shapes_to_fill, false, layout_shape)?;
    let row_heights = size::distribute_heights(&mut grid, &mut row_tracks, fill_to.1);
    layout_fillable_shapes(&mut grid, &mut shapes_to_fill, true, layout_shape)?;

    Ok(LayerGrid {
        grid,
        col_widths,
        row_heights,
        object_map,
    })
}

#[allow(clippy::too_many_arguments)]
fn fill_grid_row(
    line: &NumberedLine,
    spans: &[ColumnSpan],
    state: &SpecState,
    settings: &Settings,
    vars: &BTreeMap<String, String>,
    y: usize,
    object_map: &mut BTreeMap<String, Vec<(usize, usize)>>,
    shapes_to_fill: &mut Vec<FillableShape>,
    layout_shape: &mut ShapeLayouter<'_>,
) -> Result<Vec<GridCell>> {
    let mut row = vec![GridCell::Empty; spans.len()];

    // A detached dash has no element to continue; colspans are written
    // attached, `el---- b`.
    if line.text.contains(" -") {
        return Err(DiagramError::continuation_without_element(line.number));
    }

    for (x, span) in spans.iter().enumerate() {
        if span.kind == ColumnKind::Occupied {
            if line.text.trim().is_empty() {
                row[x] = GridCell::Spacer {
                    height: settings.vertical_spacer,
                };
                break;
            }
            let slice = char_slice(&line.text, span.start, span.end);
            let trimmed = slice.trim();
            if trimmed.split(' ').count() > 1 {
                return Err(DiagramError::multiple_objects(line.number));
            }
            let token = normalize_token(trimmed);
            match token.as_str() {
                "|" | "[" | "]" | "(" | ")" => row[x] = GridCell::Pipe,
                "-" => row[x] = GridCell::Dash,
                "" => {}
                name => {
                    let resolved = resolve_element_name(name, vars);
                    let element = state.elements.get(&resolved).ok_or_else(|| {
                        DiagramError::unknown_element(&resolved, line.number)
                    })?;
                    let cell =
                        make_object_cell(element, state, settings, layout_shape, x, y, shapes_to_fill)?;
                    row[x] = GridCell::Object(cell);
                    object_map.entry(resolved).or_default().push((y, x));
                }
            }
        } else {
            // Spacer and dot columns only ever hold colspan dashes.
            let slice = char_slice(&line.text, span.start, span.end);
            if slice.trim().split(' ').next().unwrap_or("").contains('-') {
                row[x] = GridCell::Dash;
            }
        }
    }

    Ok(row)
}

/// A token of dashes and spaces is a pure continuation; otherwise dashes
/// are attached colspan markers and are stripped.
fn normalize_token(token: &str) -> String {
    if !token.is_empty() && token.chars().all(|c| c == '-' || c == ' ') {
        "-".to_string()
    } else {
        token.chars().filter(|c| *c != '-').collect()
    }
}

fn resolve_element_name(name: &str, vars: &BTreeMap<String, String>) -> String {
    match name.strip_prefix('$') {
        Some(param) => vars.get(param).cloned().unwrap_or_else(|| name.to_string()),
        None => name.to_string(),
    }
}

fn make_object_cell(
    element: &Element,
    state: &SpecState,
    settings: &Settings,
    layout_shape: &mut ShapeLayouter<'_>,
    x: usize,
    y: usize,
    shapes_to_fill: &mut Vec<FillableShape>,
) -> Result<ObjectCell> {
    let mut cell = ObjectCell {
        element: element.clone(),
        width: element.width,
        height: element.height,
        colspan: 1,
        rowspan: 1,
        grid_align: grid_align_for(element, state, settings),
        layout: None,
    };

    if matches!(element.kind, ElementKind::Shape { .. }) {
        if cell.width_is_fill() || cell.height_is_fill() {
            // Deferred until the available space is known.
            shapes_to_fill.push(FillableShape {
                row: y,
                col: x,
                laid_out: false,
            });
        } else {
            let layout = layout_shape(element, cell.width_abs(), cell.height_abs())?;
            if cell.width.is_none() {
                cell.width = Some(crate::parser::elements::SizeSpec::Abs(layout.width));
            }
            if cell.height.is_none() {
                cell.height = Some(crate::parser::elements::SizeSpec::Abs(layout.height));
            }
            cell.layout = Some(Box::new(layout));
        }
    }

    Ok(cell)
}

fn grid_align_for(element: &Element, state: &SpecState, settings: &Settings) -> GridAlign {
    state
        .grid_align
        .get(&element.key)
        .copied()
        .unwrap_or(GridAlign {
            horizontal: settings.grid_align,
            vertical: settings.grid_valign,
        })
}

fn set_col_spans(grid: &mut [Vec<GridCell>]) {
    for y in 0..grid.len() {
        for x in 0..grid[y].len() {
            let mut colspan = 1;
            if grid[y][x].as_object().is_none() {
                continue;
            }
            for x2 in x + 1..grid[y].len() {
                if matches!(grid[y][x2], GridCell::Dash) {
                    colspan += 1;
                } else {
                    break;
                }
            }
            if let Some(obj) = grid[y][x].as_object_mut() {
                obj.colspan = colspan;
            }
        }
    }
}

fn set_row_spans(grid: &mut [Vec<GridCell>]) {
    for y in 0..grid.len() {
        for x in 0..grid[y].len() {
            let mut rowspan = 1;
            if grid[y][x].as_object().is_none() {
                continue;
            }
            for row in grid.iter().skip(y + 1) {
                if matches!(row.get(x), Some(GridCell::Pipe)) {
                    rowspan += 1;
                } else {
                    break;
                }
            }
            if let Some(obj) = grid[y][x].as_object_mut() {
                obj.rowspan = rowspan;
            }
        }
    }
}

fn layout_fillable_shapes(
    grid: &mut [Vec<GridCell>],
    shapes_to_fill: &mut [FillableShape],
    ready_for_height: bool,
    layout_shape: &mut ShapeLayouter<'_>,
) -> Result<()> {
    for pending in shapes_to_fill.iter_mut() {
        if pending.laid_out {
            continue;
        }
        let Some(obj) = grid[pending.row][pending.col].as_object_mut() else {
            continue;
        };
        if obj.height_is_fill() && !ready_for_height {
            continue;
        }
        pending.laid_out = true;

        let layout = layout_shape(&obj.element, obj.width_abs(), obj.height_abs())?;
        if obj.height.is_none() {
            obj.height = Some(crate::parser::elements::SizeSpec::Abs(layout.height));
        }
        obj.layout = Some(Box::new(layout));
    }
    Ok(())
}

/// The default layer of a diagram may not collapse to nothing.
pub fn assert_non_zero_size(
    col_widths: &[f64],
    row_heights: &[f64],
    first_line: usize,
) -> Result<()> {
    if col_widths.iter().sum::<f64>() == 0.0 {
        return Err(DiagramError::zero_dimension("width", first_line));
    }
    if row_heights.iter().sum::<f64>() == 0.0 {
        return Err(DiagramError::zero_dimension("height", first_line));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagramErrorKind;
    use crate::input::Lines;
    use crate::layout::columns;
    use crate::parser::registry::Registry;
    use crate::parser::spec::parse_spec;
    use pretty_assertions::assert_eq;

    fn state_with(spec: &str) -> SpecState {
        let mut lines = Lines::from_text(spec, 1);
        parse_spec(
            &mut lines,
            &Registry::with_builtins(),
            Settings::default(),
            Default::default(),
        )
        .unwrap()
    }

    fn no_shapes() -> impl FnMut(&Element, Option<f64>, Option<f64>) -> Result<ShapeLayout> {
        |element: &Element, _, _| {
            panic!("unexpected shape layout for {}", element.key)
        }
    }

    fn build(spec: &str, layout: &[&str]) -> Result<LayerGrid> {
        let state = state_with(spec);
        let mut lines: Vec<NumberedLine> = layout
            .iter()
            .enumerate()
            .map(|(i, t)| NumberedLine::new(i + 10, *t))
            .collect();
        columns::trim_preceding_whitespace(&mut lines);
        let spans = columns::column_graph(&lines);
        let mut layouter = no_shapes();
        make_layer_grid(
            &lines,
            &spans,
            &state,
            &Settings::default(),
            &BTreeMap::new(),
            (0.0, 0.0),
            &mut layouter,
        )
    }

    #[test]
    fn test_two_columns_sized_by_elements() {
        let lg = build("rect:\n  a: 100 50\n  b: 60 40\n", &["a b"]).unwrap();
        assert_eq!(lg.col_widths, vec![100.0, 20.0, 60.0]);
        assert_eq!(lg.row_heights, vec![50.0]);
        assert_eq!(lg.object_map.get("a"), Some(&vec![(0, 0)]));
        assert_eq!(lg.object_map.get("b"), Some(&vec![(0, 2)]));
    }

    #[test]
    fn test_colspan_via_attached_dashes() {
        let lg = build(
            "rect:\n  a: 100 50\n  b: 40 40\n  c: 40 40\n",
            &["b c", "a--"],
        )
        .unwrap();
        let obj = lg.grid[1][0].as_object().unwrap();
        assert!(obj.colspan > 1);
        // The 100-wide span forces the gap between b and c to widen.
        assert_eq!(lg.col_widths.iter().sum::<f64>(), 100.0);
    }

    #[test]
    fn test_rowspan_via_pipes() {
        let lg = build(
            "rect:\n  a: 30 100\n  b: 30 20\n",
            &["a b", "| b"],
        )
        .unwrap();
        let obj = lg.grid[0][0].as_object().unwrap();
        assert_eq!(obj.rowspan, 2);
        assert_eq!(lg.row_heights.iter().sum::<f64>(), 100.0);
    }

    #[test]
    fn test_blank_line_becomes_spacer_row() {
        let lg = build("rect:\n  a: 30 30\n", &["a", "", "a"]).unwrap();
        assert!(matches!(lg.grid[1][0], GridCell::Spacer { .. }));
        assert_eq!(lg.row_heights, vec![30.0, 20.0, 30.0]);
    }

    #[test]
    fn test_unknown_element() {
        let err = build("rect:\n  a: 30 30\n", &["a x"]).unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::UnknownElement);
        assert_eq!(err.line, 10);
    }

    #[test]
    fn test_detached_dash_is_an_error() {
        let err = build("rect:\n  a: 30 30\n  b: 30 30\n", &["a - b"]).unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::ContinuationWithoutElement);
    }

    #[test]
    fn test_two_tokens_in_one_column() {
        let err = build("rect:\n  ab: 30 30\n  cd: 30 30\n", &["ab cd", "ab...cd"]).unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::MultipleObjectsInColumn);
    }

    #[test]
    fn test_param_element_resolution() {
        let state = state_with("rect:\n  a: 30 30\n");
        let lines = vec![NumberedLine::new(1, "$inner")];
        let spans = columns::column_graph(&lines);
        let mut vars = BTreeMap::new();
        vars.insert("inner".to_string(), "a".to_string());
        let mut layouter = no_shapes();
        let lg = make_layer_grid(
            &lines,
            &spans,
            &state,
            &Settings::default(),
            &vars,
            (0.0, 0.0),
            &mut layouter,
        )
        .unwrap();
        assert!(lg.object_map.contains_key("a"));
    }

    #[test]
    fn test_dot_column_keeps_elements_apart_without_gap() {
        let lg = build("rect:\n  a: 30 30\n  b: 40 40\n", &["a.b"]).unwrap();
        assert_eq!(lg.col_widths, vec![30.0, 0.0, 40.0]);
    }

    #[test]
    fn test_zero_size_assertion() {
        assert!(assert_non_zero_size(&[1.0], &[1.0], 1).is_ok());
        let err = assert_non_zero_size(&[0.0, 0.0], &[1.0], 3).unwrap_err();
        assert_eq!(err.kind, DiagramErrorKind::ZeroDimensionLayer);
        assert_eq!(err.line, 3);
    }
}
