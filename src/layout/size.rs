//! Track sizing: distributing element sizes over grid columns and rows
//!
//! Tracks start as either flexible (zero), spacers (a fixed gap that can be
//! consumed by spans and fills), or no-space (dot columns). Sizing runs in
//! passes: fixed single-span sizes first, then a cell-by-cell distribution
//! that resolves `fill` sizes against the layer's fill target and spreads
//! spanned sizes over flexible tracks. Order matters: a spread from an
//! earlier cell is visible to every later one.

use crate::layout::columns::{ColumnKind, ColumnSpan};
use crate::layout::types::GridCell;
use crate::parser::elements::{SizeSpec, PARAM_FILL_HEIGHT, PARAM_FILL_WIDTH};

/// The sizing state of one column or row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track {
    /// A known size. Zero means the track is still flexible.
    Size(f64),
    /// A spacer gap, not yet claimed by any span.
    Spacer(f64),
    /// A collapsed dot column. Always zero, never claimed.
    NoSpace,
}

impl Track {
    fn current(&self) -> f64 {
        match self {
            Track::Size(v) | Track::Spacer(v) => *v,
            Track::NoSpace => 0.0,
        }
    }

    fn is_flexible(&self) -> bool {
        matches!(self, Track::Spacer(_)) || matches!(self, Track::Size(v) if *v == 0.0)
    }
}

/// Seed column tracks from the column graph.
pub fn column_tracks(spans: &[ColumnSpan], horizontal_spacer: f64) -> Vec<Track> {
    spans
        .iter()
        .map(|span| match span.kind {
            ColumnKind::Occupied => Track::Size(0.0),
            ColumnKind::EmptySpace => Track::Spacer(horizontal_spacer * span.chars() as f64),
            ColumnKind::ZeroWidth => Track::NoSpace,
        })
        .collect()
}

/// Seed row tracks; all rows start flexible.
pub fn row_tracks(rows: usize) -> Vec<Track> {
    vec![Track::Size(0.0); rows]
}

/// Mark rows that hold nothing but pipes and fill-height objects as spacer
/// rows. Runs after the grid is filled and before sizing.
pub fn mark_spacer_rows(grid: &[Vec<GridCell>], tracks: &mut [Track], vertical_spacer: f64) {
    for (y, row) in grid.iter().enumerate() {
        let empty = row.iter().all(|cell| match cell {
            GridCell::Empty | GridCell::Pipe => true,
            GridCell::Object(obj) => obj.height_is_fill(),
            GridCell::Dash | GridCell::Spacer { .. } => false,
        });
        if empty {
            tracks[y] = Track::Spacer(vertical_spacer);
        }
    }
}

fn fill_adjusted(mut fill: f64, params: Option<&Vec<String>>) -> f64 {
    if let Some(adjust) = params {
        if let Some(add) = adjust.first().and_then(|p| p.parse::<f64>().ok()) {
            fill += add;
        }
        if let Some(min) = adjust.get(1).and_then(|p| p.parse::<f64>().ok()) {
            fill = fill.max(min);
        }
    }
    fill.max(0.0)
}

/// The unclaimed remainder of the fill target: the target minus every track
/// already carrying a size or spacer gap.
fn fill_remaining(tracks: &[Track], fill_to: f64) -> f64 {
    if fill_to <= 0.0 {
        return fill_to;
    }
    let mut remaining = fill_to;
    for track in tracks {
        match track {
            Track::Size(v) | Track::Spacer(v) => remaining -= v,
            Track::NoSpace => {}
        }
    }
    remaining
}

/// What a span covers so far: flexible track count, claimed size, and
/// spacer gap inside the span.
fn survey_span(tracks: &[Track], start: usize, span: usize) -> (usize, f64, f64) {
    let mut flexible = 0usize;
    let mut taken = 0.0;
    let mut taken_spacer = 0.0;
    for track in tracks.iter().skip(start).take(span) {
        match track {
            Track::Spacer(v) => {
                flexible += 1;
                taken_spacer += v;
            }
            Track::Size(v) if *v == 0.0 => flexible += 1,
            Track::Size(v) => taken += v,
            Track::NoSpace => {}
        }
    }
    (flexible, taken, taken_spacer)
}

/// Spread a cell's size over its span. Flexible tracks (and spacers) share
/// what the claimed tracks don't cover. A fully-claimed span that is still
/// too small is redistributed equally, which may squish some tracks.
fn spread_span(tracks: &mut [Track], start: usize, span: usize, size: f64) {
    let (flexible, taken, taken_spacer) = survey_span(tracks, start, span);
    if flexible == 0 {
        if taken + taken_spacer < size {
            let per = size / span as f64;
            for track in tracks.iter_mut().skip(start).take(span) {
                if !matches!(track, Track::NoSpace) {
                    *track = Track::Size(per);
                }
            }
        }
    } else {
        let per = (size - taken) / flexible as f64;
        for track in tracks.iter_mut().skip(start).take(span) {
            if track.is_flexible() {
                *track = Track::Size(per);
            }
        }
    }
}

/// Resolve the final width of every column.
pub fn distribute_widths(
    grid: &mut [Vec<GridCell>],
    tracks: &mut [Track],
    fill_to: f64,
) -> Vec<f64> {
    // Fixed sizes of unspanned cells set the track floors.
    for row in grid.iter() {
        for (x, cell) in row.iter().enumerate() {
            if let GridCell::Object(obj) = cell {
                if obj.colspan == 1 {
                    if let Some(width) = obj.width_abs() {
                        if width > tracks[x].current() {
                            tracks[x] = Track::Size(width);
                        }
                    }
                }
            }
        }
    }

    let remaining = fill_remaining(tracks, fill_to);

    for row in grid.iter_mut() {
        for (x, cell) in row.iter_mut().enumerate() {
            let GridCell::Object(obj) = cell else {
                continue;
            };
            if obj.width_is_fill() {
                let (_, taken, taken_spacer) = survey_span(tracks, x, obj.colspan);
                let fill = fill_adjusted(
                    taken + taken_spacer + remaining,
                    obj.element.params.get(PARAM_FILL_WIDTH),
                );
                obj.width = Some(SizeSpec::Abs(fill));
            }
            let size = obj.width_abs().unwrap_or(0.0);
            spread_span(tracks, x, obj.colspan, size);
        }
    }

    sweep(tracks)
}

/// Resolve the final height of every row.
pub fn distribute_heights(
    grid: &mut [Vec<GridCell>],
    tracks: &mut [Track],
    fill_to: f64,
) -> Vec<f64> {
    for (y, row) in grid.iter().enumerate() {
        for cell in row.iter() {
            match cell {
                GridCell::Object(obj) => {
                    if obj.rowspan == 1 {
                        if let Some(height) = obj.height_abs() {
                            if height > tracks[y].current() {
                                tracks[y] = Track::Size(height);
                            }
                        }
                    }
                }
                // A blank row's placeholder cell keeps the row at least one
                // vertical spacer tall.
                GridCell::Spacer { height } => {
                    if *height > tracks[y].current() {
                        tracks[y] = Track::Size(*height);
                    }
                }
                _ => {}
            }
        }
    }

    let remaining = fill_remaining(tracks, fill_to);

    for y in 0..grid.len() {
        for x in 0..grid[y].len() {
            let GridCell::Object(obj) = &mut grid[y][x] else {
                continue;
            };
            if obj.height_is_fill() {
                let (_, taken, taken_spacer) = survey_span(tracks, y, obj.rowspan);
                let fill = fill_adjusted(
                    taken + taken_spacer + remaining,
                    obj.element.params.get(PARAM_FILL_HEIGHT),
                );
                obj.height = Some(SizeSpec::Abs(fill));
            }
            let size = obj.height_abs().unwrap_or(0.0);
            let rowspan = obj.rowspan;
            spread_span(tracks, y, rowspan, size);
        }
    }

    sweep(tracks)
}

/// Untouched spacers keep their gap; dot columns collapse to zero.
fn sweep(tracks: &[Track]) -> Vec<f64> {
    tracks
        .iter()
        .map(|track| match track {
            Track::Size(v) | Track::Spacer(v) => *v,
            Track::NoSpace => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::{GridAlign, ObjectCell};
    use crate::parser::elements::{Element, ElementKind};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn element(key: &str, width: Option<SizeSpec>, height: Option<SizeSpec>) -> Element {
        Element {
            key: key.to_string(),
            kind: ElementKind::Rect,
            width,
            height,
            params: BTreeMap::new(),
            line: 1,
        }
    }

    fn object(width: Option<SizeSpec>, height: Option<SizeSpec>, colspan: usize) -> GridCell {
        GridCell::Object(ObjectCell {
            element: element("e", width, height),
            width,
            height,
            colspan,
            rowspan: 1,
            grid_align: GridAlign::default(),
            layout: None,
        })
    }

    #[test]
    fn test_fixed_width_raises_track() {
        let mut grid = vec![vec![object(
            Some(SizeSpec::Abs(100.0)),
            Some(SizeSpec::Abs(50.0)),
            1,
        )]];
        let mut tracks = vec![Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![100.0]);
    }

    #[test]
    fn test_untouched_spacer_keeps_gap() {
        let mut grid = vec![vec![
            object(Some(SizeSpec::Abs(40.0)), Some(SizeSpec::Abs(10.0)), 1),
            GridCell::Empty,
            object(Some(SizeSpec::Abs(60.0)), Some(SizeSpec::Abs(10.0)), 1),
        ]];
        let mut tracks = vec![Track::Size(0.0), Track::Spacer(20.0), Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![40.0, 20.0, 60.0]);
    }

    #[test]
    fn test_fill_takes_remaining_space() {
        // Target 200: fixed 50 and one spacer of 20 leave 130 for the fill.
        let mut grid = vec![vec![
            object(Some(SizeSpec::Abs(50.0)), Some(SizeSpec::Abs(10.0)), 1),
            GridCell::Empty,
            object(Some(SizeSpec::Fill), Some(SizeSpec::Abs(10.0)), 1),
        ]];
        let mut tracks = vec![Track::Size(0.0), Track::Spacer(20.0), Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 200.0);
        assert_eq!(widths, vec![50.0, 20.0, 130.0]);
        assert_eq!(widths.iter().sum::<f64>(), 200.0);
    }

    #[test]
    fn test_fill_adjustments_add_and_min() {
        let mut cell = object(Some(SizeSpec::Fill), Some(SizeSpec::Abs(10.0)), 1);
        if let GridCell::Object(obj) = &mut cell {
            obj.element
                .params
                .insert(PARAM_FILL_WIDTH.to_string(), vec!["-10".to_string(), "45".to_string()]);
        }
        let mut grid = vec![vec![cell]];
        let mut tracks = vec![Track::Size(0.0)];
        // fill = 50 - 10 = 40, clamped up to the minimum of 45
        let widths = distribute_widths(&mut grid, &mut tracks, 50.0);
        assert_eq!(widths, vec![45.0]);
    }

    #[test]
    fn test_span_spreads_over_flexible_tracks() {
        // A 100-wide object spanning [fixed 30, spacer 20, flexible]:
        // the fixed track keeps 30, spacer and flexible get (100-30)/2 each.
        let mut grid = vec![
            vec![
                object(Some(SizeSpec::Abs(30.0)), Some(SizeSpec::Abs(10.0)), 1),
                GridCell::Empty,
                GridCell::Empty,
            ],
            vec![
                object(Some(SizeSpec::Abs(100.0)), Some(SizeSpec::Abs(10.0)), 3),
                GridCell::Dash,
                GridCell::Dash,
            ],
        ];
        let mut tracks = vec![Track::Size(0.0), Track::Spacer(20.0), Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![30.0, 35.0, 35.0]);
    }

    #[test]
    fn test_full_span_too_small_redistributes_equally() {
        // Both tracks are already fixed at 30 by row one; the 100-wide
        // spanning object redistributes to 50 per track.
        let mut grid = vec![
            vec![
                object(Some(SizeSpec::Abs(30.0)), Some(SizeSpec::Abs(10.0)), 1),
                object(Some(SizeSpec::Abs(30.0)), Some(SizeSpec::Abs(10.0)), 1),
            ],
            vec![
                object(Some(SizeSpec::Abs(100.0)), Some(SizeSpec::Abs(10.0)), 2),
                GridCell::Dash,
            ],
        ];
        let mut tracks = vec![Track::Size(0.0), Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![50.0, 50.0]);
    }

    #[test]
    fn test_full_span_large_enough_is_left_alone() {
        let mut grid = vec![
            vec![
                object(Some(SizeSpec::Abs(60.0)), Some(SizeSpec::Abs(10.0)), 1),
                object(Some(SizeSpec::Abs(80.0)), Some(SizeSpec::Abs(10.0)), 1),
            ],
            vec![
                object(Some(SizeSpec::Abs(100.0)), Some(SizeSpec::Abs(10.0)), 2),
                GridCell::Dash,
            ],
        ];
        let mut tracks = vec![Track::Size(0.0), Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![60.0, 80.0]);
    }

    #[test]
    fn test_no_space_column_stays_zero() {
        let mut grid = vec![vec![
            object(Some(SizeSpec::Abs(40.0)), Some(SizeSpec::Abs(10.0)), 1),
            GridCell::Empty,
            object(Some(SizeSpec::Abs(40.0)), Some(SizeSpec::Abs(10.0)), 1),
        ]];
        let mut tracks = vec![Track::Size(0.0), Track::NoSpace, Track::Size(0.0)];
        let widths = distribute_widths(&mut grid, &mut tracks, 0.0);
        assert_eq!(widths, vec![40.0, 0.0, 40.0]);
    }

    #[test]
    fn test_blank_row_placeholder_sets_row_height() {
        let mut grid = vec![
            vec![object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1)],
            vec![GridCell::Spacer { height: 20.0 }],
            vec![object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1)],
        ];
        let mut tracks = row_tracks(3);
        let heights = distribute_heights(&mut grid, &mut tracks, 0.0);
        assert_eq!(heights, vec![30.0, 20.0, 30.0]);
    }

    #[test]
    fn test_spacer_row_sweep_keeps_gap() {
        let mut grid = vec![
            vec![object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1), GridCell::Empty],
            vec![GridCell::Empty, GridCell::Empty],
            vec![object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1), GridCell::Empty],
        ];
        let mut tracks = row_tracks(3);
        mark_spacer_rows(&grid, &mut tracks, 20.0);
        let heights = distribute_heights(&mut grid, &mut tracks, 0.0);
        assert_eq!(heights, vec![30.0, 20.0, 30.0]);
    }

    #[test]
    fn test_rowspan_consumes_spacer_row() {
        // Column two spans all three rows with a 100-high object; the
        // spacer row between the fixed rows is claimed by the spread.
        let mut grid = vec![
            vec![
                object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1),
                {
                    let mut cell = object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(100.0)), 1);
                    if let GridCell::Object(obj) = &mut cell {
                        obj.rowspan = 3;
                    }
                    cell
                },
            ],
            vec![GridCell::Empty, GridCell::Pipe],
            vec![
                object(Some(SizeSpec::Abs(10.0)), Some(SizeSpec::Abs(30.0)), 1),
                GridCell::Pipe,
            ],
        ];
        let mut tracks = row_tracks(3);
        mark_spacer_rows(&grid, &mut tracks, 20.0);
        let heights = distribute_heights(&mut grid, &mut tracks, 0.0);
        // Rows one and three hold 30 each; the middle spacer row takes the
        // remainder of the 100.
        assert_eq!(heights, vec![30.0, 40.0, 30.0]);
    }

    #[test]
    fn test_fill_target_counts_spacers() {
        let tracks = vec![Track::Size(30.0), Track::Spacer(20.0), Track::Size(0.0)];
        assert_eq!(fill_remaining(&tracks, 100.0), 50.0);
        assert_eq!(fill_remaining(&tracks, 0.0), 0.0);
    }
}
