//! SIMD-accelerated scanning over decoded text using memchr
//!
//! The engine decodes every input encoding to UTF-8 before tokenizing, so the
//! scanner works on `&str`. All XML delimiters are ASCII, which means a byte
//! offset returned by a memchr search is always a char boundary.

use memchr::{memchr, memchr3, memmem};

/// Cursor over a slice of decoded text
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get the remaining text
    #[inline]
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Get a slice from start to end positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Peek at the current character
    #[inline]
    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip whitespace characters, returning whether any were skipped
    #[inline]
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Check if the text at the current position starts with `needle`
    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.remaining().starts_with(needle)
    }

    /// Three-way prefix test used for incremental input.
    ///
    /// Returns `Some(true)` on a match, `Some(false)` on a mismatch and `None`
    /// when the remaining text is a strict prefix of `needle`.
    #[inline]
    pub fn match_prefix(&self, needle: &str) -> Option<bool> {
        let rest = self.remaining();
        if rest.len() >= needle.len() {
            Some(rest.starts_with(needle))
        } else if needle.starts_with(rest) {
            None
        } else {
            Some(false)
        }
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining().as_bytes()).map(|i| self.pos + i)
    }

    /// Find the end of a character-data run: `<`, `&`, `\r` or `\n`
    #[inline]
    pub fn find_text_boundary(&self) -> Option<usize> {
        let bytes = self.remaining().as_bytes();
        let hit = memchr3(b'<', b'&', b'\n', bytes);
        let cr = memchr(b'\r', &bytes[..hit.unwrap_or(bytes.len())]);
        cr.or(hit).map(|i| self.pos + i)
    }

    /// Find next occurrence of a multi-byte pattern
    #[inline]
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        memmem::find(self.remaining().as_bytes(), needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Read an XML name at the current position.
    ///
    /// Returns `None` if the current character cannot start a name. The name
    /// ends at the first non-name character or at the end of the input; the
    /// caller decides whether the latter means "incomplete".
    pub fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let rest = self.remaining();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if is_name_start_char(c) => {}
            _ => return None,
        }
        let len = chars
            .find(|&(_, c)| !is_name_char(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        Some(&self.input[start..self.pos])
    }

    /// Find the next `>` that is not inside a quoted literal
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut pos = self.pos;
        let mut quote: Option<u8> = None;

        while pos < bytes.len() {
            let b = bytes[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => return Some(pos),
                None => {}
            }
            pos += 1;
        }
        None
    }
}

/// XML whitespace (S production)
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// NameStartChar from XML 1.0 (fifth edition)
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '_' | ':'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// NameChar from XML 1.0 (fifth edition)
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Char production from XML 1.0
#[inline]
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

/// Offset of the first character that is not allowed in an XML document
#[inline]
pub fn find_invalid_char(s: &str) -> Option<usize> {
    // Every byte >= 0x20 is fine except inside U+FFFE / U+FFFF.
    let bytes = s.as_bytes();
    if bytes.iter().all(|&b| b >= 0x20 && b != 0xEF || matches!(b, b'\t' | b'\n' | b'\r')) {
        return None;
    }
    s.char_indices().find(|&(_, c)| !is_xml_char(c)).map(|(i, _)| i)
}

/// Whether `s` is a complete XML Name
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if is_name_start_char(c)) && chars.all(is_name_char)
}

/// Whether `s` is an NCName (a Name without colons)
pub fn is_ncname(s: &str) -> bool {
    is_name(s) && !s.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_text_boundary() {
        assert_eq!(Scanner::new("hello <world>").find_text_boundary(), Some(6));
        assert_eq!(Scanner::new("ab\r\ncd<").find_text_boundary(), Some(2));
        assert_eq!(Scanner::new("a&b").find_text_boundary(), Some(1));
        assert_eq!(Scanner::new("plain").find_text_boundary(), None);
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new("<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new("element-name>");
        assert_eq!(scanner.read_name(), Some("element-name"));
        assert_eq!(scanner.position(), 12);

        let mut scanner = Scanner::new("élan ");
        assert_eq!(scanner.read_name(), Some("élan"));

        let mut scanner = Scanner::new("1abc");
        assert_eq!(scanner.read_name(), None);
    }

    #[test]
    fn test_match_prefix() {
        assert_eq!(Scanner::new("<!--x").match_prefix("<!--"), Some(true));
        assert_eq!(Scanner::new("<!-").match_prefix("<!--"), None);
        assert_eq!(Scanner::new("<!a").match_prefix("<!--"), Some(false));
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new("  \t\n hello");
        assert!(scanner.skip_whitespace());
        assert_eq!(scanner.position(), 5);
        assert!(!scanner.skip_whitespace());
    }

    #[test]
    fn test_invalid_chars() {
        assert_eq!(find_invalid_char("abc\u{1}"), Some(3));
        assert_eq!(find_invalid_char("ok\u{FFFE}"), Some(2));
        assert_eq!(find_invalid_char("fine\t\n"), None);
        assert_eq!(find_invalid_char("caf\u{E9}"), None);
    }

    #[test]
    fn test_names() {
        assert!(is_name("a:b"));
        assert!(!is_ncname("a:b"));
        assert!(is_ncname("_x.y-z"));
        assert!(!is_name(""));
        assert!(!is_name("-a"));
    }
}
