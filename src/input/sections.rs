//! Splits a diagram file into its spec, layout, and shape sections

use crate::error::{DiagramError, Result};
use crate::input::lines::{Lines, NumberedLine};

/// The three sections of a diagram file. The layout cursor is already
/// positioned past the `layout:` marker with its reset index locked, so it
/// can be replayed. Each shape section starts with its header line (the text
/// after `shape:`).
#[derive(Debug, Clone)]
pub struct FileSections {
    pub spec: Lines,
    pub layout: Lines,
    pub shapes: Vec<Lines>,
}

/// Split raw source into spec / layout / shape sections.
///
/// Comments are stripped after splitting, numbers are preserved, and the
/// spec section is reordered: `settings:` and `variable:` blocks are hoisted
/// to the top (their values feed everything else) and `svg:` blocks sink to
/// the bottom (they reference elements defined later in the file).
pub fn split_sections(source: &str) -> Result<FileSections> {
    let all: Vec<NumberedLine> = source
        .split('\n')
        .enumerate()
        .map(|(i, l)| NumberedLine::new(i + 1, l))
        .collect();

    split_lines(all, 1)
}

/// Section splitting for a shape block that carries its own spec. The error
/// for a missing `layout:` marker is anchored to `origin_line` (the shape
/// header).
pub fn split_spec_layout(lines: Vec<NumberedLine>, origin_line: usize) -> Result<(Lines, Lines)> {
    let sections = split_lines(lines, origin_line)?;
    Ok((sections.spec, sections.layout))
}

fn split_lines(all: Vec<NumberedLine>, origin_line: usize) -> Result<FileSections> {
    let layout_at = all
        .iter()
        .position(|l| l.text.starts_with("layout:"))
        .ok_or_else(|| {
            DiagramError::invalid_spec(
                "Invalid specification: must provide a spec followed by a layout section",
                origin_line,
            )
        })?;

    let mut spec_lines: Vec<NumberedLine> = all[..layout_at].to_vec();

    // The layout section begins with the remainder of the marker line,
    // conventionally empty.
    let mut rest: Vec<NumberedLine> = Vec::with_capacity(all.len() - layout_at);
    rest.push(NumberedLine::new(
        all[layout_at].number,
        all[layout_at].text["layout:".len()..].to_string(),
    ));
    rest.extend_from_slice(&all[layout_at + 1..]);

    // Peel off shape blocks, each opened by a `shape:` marker.
    let mut layout_lines = Vec::new();
    let mut shapes: Vec<Vec<NumberedLine>> = Vec::new();
    for line in rest {
        if line.text.starts_with("shape:") {
            shapes.push(vec![NumberedLine::new(
                line.number,
                line.text["shape:".len()..].trim().to_string(),
            )]);
        } else if let Some(current) = shapes.last_mut() {
            current.push(line);
        } else {
            layout_lines.push(line);
        }
    }

    strip_comments(&mut spec_lines);
    strip_comments(&mut layout_lines);
    for shape in &mut shapes {
        strip_comments(shape);
    }

    spec_lines = move_to_top(spec_lines, "settings:");
    spec_lines = move_to_top(spec_lines, "variable:");
    spec_lines = move_to_bottom(spec_lines, "svg:");

    let mut layout = Lines::from_lines(layout_lines);
    layout.pop();
    layout.lock_reset();

    Ok(FileSections {
        spec: Lines::from_lines(spec_lines),
        layout,
        shapes: shapes.into_iter().map(Lines::from_lines).collect(),
    })
}

/// Index where a comment begins, if any. Whole-line comments start with
/// `//`; trailing comments need a space before the slashes so URLs survive.
fn comment_index(line: &str) -> Option<usize> {
    if line.starts_with("//") {
        Some(0)
    } else {
        line.find(" //")
    }
}

fn strip_comments(lines: &mut [NumberedLine]) {
    for line in lines {
        if let Some(i) = comment_index(&line.text) {
            line.text.truncate(i);
        }
    }
}

fn move_to_top(lines: Vec<NumberedLine>, marker: &str) -> Vec<NumberedLine> {
    let (hoisted, rest) = partition_blocks(lines, marker);
    let mut out = hoisted;
    out.extend(rest);
    out
}

fn move_to_bottom(lines: Vec<NumberedLine>, marker: &str) -> Vec<NumberedLine> {
    let (sunk, rest) = partition_blocks(lines, marker);
    let mut out = rest;
    out.extend(sunk);
    out
}

/// Split lines into (blocks starting with `marker`, everything else). A
/// block is a non-indented line plus the indented and blank lines after it.
fn partition_blocks(
    lines: Vec<NumberedLine>,
    marker: &str,
) -> (Vec<NumberedLine>, Vec<NumberedLine>) {
    let mut matched = Vec::new();
    let mut rest = Vec::new();
    let mut in_match = false;
    for line in lines {
        if line.text.starts_with(|c: char| !c.is_whitespace()) && !line.text.is_empty() {
            in_match = line.text.starts_with(marker);
        }
        if in_match {
            matched.push(line);
        } else {
            rest.push(line);
        }
    }
    (matched, rest)
}
