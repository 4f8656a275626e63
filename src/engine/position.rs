//! Position tracking
//!
//! Line and column are computed lazily: the locator remembers the offset its
//! line/column refer to and walks forward through the decoded text when the
//! current event moves. Columns count characters; `\r\n`, `\r` and `\n` are
//! each one line break.

/// Line/column cursor and the span of the current event.
///
/// Offsets are absolute offsets into the decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    offset: u64,
    line: u64,
    column: u64,
    after_cr: bool,
    event_start: u64,
    event_end: u64,
}

impl Locator {
    pub fn new() -> Self {
        Locator {
            offset: 0,
            line: 1,
            column: 0,
            after_cr: false,
            event_start: 0,
            event_end: 0,
        }
    }

    /// Move the cursor forward to `target`.
    ///
    /// `text` is the retained decoded text and `base` the absolute offset of
    /// its first byte. Targets behind the cursor are ignored.
    pub fn advance_to(&mut self, target: u64, text: &str, base: u64) {
        if target <= self.offset {
            return;
        }
        let from = self.offset.saturating_sub(base) as usize;
        let to = target.saturating_sub(base) as usize;
        if let Some(span) = text.get(from..to) {
            for c in span.chars() {
                match c {
                    '\n' if self.after_cr => self.after_cr = false,
                    '\n' | '\r' => {
                        self.line += 1;
                        self.column = 0;
                        self.after_cr = c == '\r';
                    }
                    _ => {
                        self.column += 1;
                        self.after_cr = false;
                    }
                }
            }
        }
        self.offset = target;
    }

    /// Make `[start, end)` the current event and move the cursor to its start
    pub fn set_event(&mut self, start: u64, end: u64, text: &str, base: u64) {
        self.advance_to(start, text, base);
        self.event_start = start;
        self.event_end = end.max(start);
    }

    /// 1-based line of the current event
    #[inline]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// 0-based column of the current event
    #[inline]
    pub fn column(&self) -> u64 {
        self.column
    }

    #[inline]
    pub fn event_start(&self) -> u64 {
        self.event_start
    }

    #[inline]
    pub fn event_end(&self) -> u64 {
        self.event_end
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_columns() {
        let text = "ab\ncd\r\nef\rg";
        let mut loc = Locator::new();
        assert_eq!((loc.line(), loc.column()), (1, 0));

        loc.set_event(2, 3, text, 0);
        assert_eq!((loc.line(), loc.column()), (1, 2));

        loc.set_event(4, 5, text, 0);
        assert_eq!((loc.line(), loc.column()), (2, 1));

        // past the CR LF pair
        loc.set_event(7, 8, text, 0);
        assert_eq!((loc.line(), loc.column()), (3, 0));

        loc.set_event(11, 11, text, 0);
        assert_eq!((loc.line(), loc.column()), (4, 1));
    }

    #[test]
    fn test_cr_lf_split_across_calls() {
        let text = "a\r\nb";
        let mut loc = Locator::new();
        loc.advance_to(2, text, 0);
        assert_eq!((loc.line(), loc.column()), (2, 0));
        loc.advance_to(3, text, 0);
        assert_eq!((loc.line(), loc.column()), (2, 0));
    }

    #[test]
    fn test_columns_count_characters() {
        let text = "\u{E9}\u{E9}x";
        let mut loc = Locator::new();
        loc.set_event(4, 5, text, 0);
        assert_eq!(loc.column(), 2);
    }

    #[test]
    fn test_rebased_text() {
        let mut loc = Locator::new();
        loc.advance_to(3, "abc", 0);
        // first three bytes dropped from the buffer
        loc.set_event(5, 6, "de\nf", 3);
        assert_eq!((loc.line(), loc.column()), (1, 5));
        assert_eq!((loc.event_start(), loc.event_end()), (5, 6));
    }
}
