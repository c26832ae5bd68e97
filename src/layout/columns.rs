//! Column discovery for ASCII layout grids
//!
//! A column is a run of character positions that holds a non-space character
//! on any line. The space between and around columns becomes spacer spans,
//! one per character position, each worth one horizontal spacer. Dashes and
//! dots never mark a position as occupied: dashes are span continuations and
//! a lone dot splits two columns with no space between them.

use crate::input::NumberedLine;

/// Classification of a character-position span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Holds elements.
    Occupied,
    /// Space between columns; takes the horizontal spacer width per
    /// character.
    EmptySpace,
    /// A `.` separator column; collapses to zero width.
    ZeroWidth,
}

/// One span of the column graph, in character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
    pub kind: ColumnKind,
}

impl ColumnSpan {
    pub fn chars(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// The characters of `line` in `[start, end)`, by character position.
pub fn char_slice(line: &str, start: usize, end: usize) -> String {
    line.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// Strip the common indentation of all non-blank lines, so the leftmost
/// element starts a column at position zero.
pub fn trim_preceding_whitespace(lines: &mut [NumberedLine]) {
    let mut min_indent: Option<usize> = None;
    for line in lines.iter() {
        let indent = line.text.chars().take_while(|c| c.is_whitespace()).count();
        if indent < line.text.chars().count() {
            min_indent = Some(match min_indent {
                Some(m) => m.min(indent),
                None => indent,
            });
        }
    }
    let Some(min_indent) = min_indent else {
        return;
    };
    if min_indent == 0 {
        return;
    }
    for line in lines.iter_mut() {
        line.text = line.text.chars().skip(min_indent).collect();
    }
}

/// Build the column graph of a block of layout lines. Occupied runs merge
/// into a single span; empty positions each become their own span so a
/// partial run of dashes spans exactly the positions it covers.
pub fn column_graph(lines: &[NumberedLine]) -> Vec<ColumnSpan> {
    let max = lines
        .iter()
        .map(|l| l.text.chars().count())
        .max()
        .unwrap_or(0);

    let mut occupied = vec![false; max];
    for line in lines {
        for (i, c) in line.text.chars().enumerate() {
            if c != ' ' && c != '-' && c != '.' {
                occupied[i] = true;
            }
        }
    }

    let mut spans = Vec::new();
    let empty = |start: usize, end: usize| ColumnSpan {
        start,
        end,
        kind: ColumnKind::EmptySpace,
    };
    let filled = |start: usize, end: usize| ColumnSpan {
        start,
        end,
        kind: ColumnKind::Occupied,
    };

    let mut start = 0usize;
    let mut end = 0usize;
    let mut on = false;
    for (i, &occ) in occupied.iter().enumerate() {
        if !on && occ {
            if start != i {
                spans.push(empty(start, i));
            }
            start = i;
            end = i + 1;
            on = true;
        } else if on && occ {
            end = i + 1;
        } else if on && !occ {
            spans.push(filled(start, end));
            on = false;
            start = i;
        } else {
            spans.push(empty(start, i));
            start = i;
            end = i + 1;
        }
    }
    if on {
        spans.push(filled(start, end));
    } else if start != max {
        spans.push(empty(start, end));
    }

    // An empty span whose content is a single dot on some line, and nothing
    // but spaces and dashes elsewhere, collapses to zero width.
    for span in &mut spans {
        if span.kind != ColumnKind::EmptySpace {
            continue;
        }
        let mut has_dot = false;
        let mut has_other = false;
        for line in lines {
            let s = char_slice(&line.text, span.start, span.end);
            if s == "." {
                has_dot = true;
            } else if !s.is_empty() && s != " " && s != "-" {
                has_other = true;
                break;
            }
        }
        if has_dot && !has_other {
            span.kind = ColumnKind::ZeroWidth;
        }
    }

    spans
}
