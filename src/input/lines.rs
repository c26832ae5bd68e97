//! Numbered source lines with a replayable cursor

/// One line of source text together with its original 1-based line number.
/// Numbers survive reordering and section splitting, so errors raised deep
/// in layout still point at the right place in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedLine {
    pub number: usize,
    pub text: String,
}

impl NumberedLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A cursor over numbered lines.
///
/// `reset` rewinds to the locked reset index rather than the start; shape
/// layouts lock the cursor past their header so each instantiation replays
/// only the body.
#[derive(Debug, Clone, Default)]
pub struct Lines {
    lines: Vec<NumberedLine>,
    index: usize,
    reset_index: usize,
    last_number: usize,
}

impl Lines {
    pub fn from_text(text: &str, first_line_number: usize) -> Self {
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(i, l)| NumberedLine::new(first_line_number + i, l))
            .collect();
        Self::from_lines(lines)
    }

    pub fn from_lines(lines: Vec<NumberedLine>) -> Self {
        let last_number = lines.first().map(|l| l.number).unwrap_or(1);
        Self {
            lines,
            index: 0,
            reset_index: 0,
            last_number,
        }
    }

    pub fn pop(&mut self) -> Option<NumberedLine> {
        let line = self.lines.get(self.index).cloned()?;
        self.index += 1;
        self.last_number = line.number;
        Some(line)
    }

    pub fn peek(&self) -> Option<&NumberedLine> {
        self.lines.get(self.index)
    }

    /// Rewind to the locked reset index.
    pub fn reset(&mut self) {
        self.index = self.reset_index;
        self.last_number = self
            .lines
            .get(self.index)
            .map(|l| l.number)
            .unwrap_or(self.last_number);
    }

    /// Make the current position the target of future `reset` calls.
    pub fn lock_reset(&mut self) {
        self.reset_index = self.index;
    }

    /// Line number of the most recently popped line. Used to anchor errors
    /// when no specific line is at hand.
    pub fn current_line_number(&self) -> usize {
        self.last_number
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn as_slice(&self) -> &[NumberedLine] {
        &self.lines
    }

    /// Remaining lines from the cursor to the end, without consuming them.
    pub fn remaining(&self) -> &[NumberedLine] {
        &self.lines[self.index.min(self.lines.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_text_numbers_lines() {
        let lines = Lines::from_text("a\nb\nc", 1);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.as_slice()[2], NumberedLine::new(3, "c"));
    }

    #[test]
    fn test_from_text_with_offset() {
        let lines = Lines::from_text("x\ny", 10);
        assert_eq!(lines.as_slice()[1].number, 11);
    }

    #[test]
    fn test_pop_and_peek() {
        let mut lines = Lines::from_text("a\nb", 1);
        assert_eq!(lines.peek().map(|l| l.text.as_str()), Some("a"));
        assert_eq!(lines.pop().map(|l| l.text), Some("a".to_string()));
        assert_eq!(lines.pop().map(|l| l.text), Some("b".to_string()));
        assert_eq!(lines.pop(), None);
    }

    #[test]
    fn test_reset_replays_from_lock() {
        let mut lines = Lines::from_text("header\nbody1\nbody2", 1);
        lines.pop();
        lines.lock_reset();
        assert_eq!(lines.pop().map(|l| l.text), Some("body1".to_string()));
        lines.pop();
        lines.reset();
        assert_eq!(lines.pop().map(|l| l.text), Some("body1".to_string()));
    }

    #[test]
    fn test_current_line_number_tracks_pop() {
        let mut lines = Lines::from_text("a\nb", 5);
        lines.pop();
        assert_eq!(lines.current_line_number(), 5);
        lines.pop();
        assert_eq!(lines.current_line_number(), 6);
    }
}
