//! XML Tokenizer
//!
//! Pure recognizers over decoded text. Each `scan_*` function looks at the
//! start of its input and returns one complete token with its length, or
//! reports why it can't:
//!
//! - `ScanError::Partial` - the token may continue past the end of the input.
//!   The carried code is what to report if no more input is coming.
//! - `ScanError::Invalid` - the input is malformed at `offset` bytes from the
//!   token start.
//!
//! Tokens borrow from the input and never allocate, except for the attribute
//! and DOCTYPE subset lists.
//!
//! Character data is split at `<`, `&`, `\r` and `\n`, and a run is only
//! returned once its terminating delimiter is visible. Combined with markup
//! only being returned once complete, this makes the token sequence of a
//! document independent of how the input was chunked.

use memchr::memchr;

use super::scanner::{find_invalid_char, is_whitespace, is_xml_char, Scanner};
use crate::error::XmlError;

/// Why a token could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    Partial(XmlError),
    Invalid { code: XmlError, offset: usize },
}

impl ScanError {
    /// Move an error offset from a sub-slice into the enclosing token
    fn shifted(self, by: usize) -> ScanError {
        match self {
            ScanError::Invalid { code, offset } => ScanError::Invalid {
                code,
                offset: offset + by,
            },
            partial => partial,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

#[inline]
fn invalid<T>(code: XmlError, offset: usize) -> ScanResult<T> {
    Err(ScanError::Invalid { code, offset })
}

#[inline]
fn partial<T>() -> ScanResult<T> {
    Err(ScanError::Partial(XmlError::UnclosedToken))
}

/// Attribute exactly as written in a start tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub name: &'a str,
    /// Value between the quotes, not yet normalized
    pub value: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    pub name: &'a str,
    pub attributes: Vec<RawAttribute<'a>>,
    /// `<name/>`
    pub empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    Char(char),
    Entity(&'a str),
}

/// Parsed `<?xml ...?>` pseudo-attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlDecl<'a> {
    pub version: &'a str,
    pub encoding: Option<&'a str>,
    pub standalone: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDecl<'a> {
    pub name: &'a str,
    /// `<!ENTITY % name ...>`
    pub parameter: bool,
    /// Literal value of an internal entity
    pub value: Option<&'a str>,
    pub system_id: Option<&'a str>,
    pub public_id: Option<&'a str>,
    /// NDATA notation of an unparsed entity
    pub notation: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetKind<'a> {
    Whitespace,
    Comment(&'a str),
    Pi { target: &'a str, data: &'a str },
    Entity(EntityDecl<'a>),
    ParamRef(&'a str),
    /// ELEMENT, ATTLIST or NOTATION declaration
    Markup,
}

/// One piece of a DOCTYPE internal subset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetItem<'a> {
    pub raw: &'a str,
    pub kind: SubsetKind<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctype<'a> {
    pub name: &'a str,
    pub system_id: Option<&'a str>,
    pub public_id: Option<&'a str>,
    pub subset: Option<Vec<SubsetItem<'a>>>,
    /// Raw text up to and including `[`, or up to the closing `>`
    pub header: &'a str,
    /// Raw text after the internal subset (or the lone `>`)
    pub trailer: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    StartTag(StartTag<'a>),
    EndTag(&'a str),
    /// Run of character data without delimiters
    Chars(&'a str),
    /// `\n`, `\r\n` or `\r`
    Newline,
    Reference(Reference<'a>),
    /// Content of a CDATA section
    Cdata(&'a str),
    Comment(&'a str),
    Pi { target: &'a str, data: &'a str },
    /// Body of `<?xml ...?>` after the target
    XmlDecl(&'a str),
    Doctype(Doctype<'a>),
    /// Whitespace outside the document element
    Whitespace(&'a str),
    /// Character data outside the document element
    Text(&'a str),
}

/// A token and the number of bytes it spans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned<'a> {
    pub token: Token<'a>,
    pub len: usize,
}

impl<'a> Scanned<'a> {
    #[inline]
    fn new(token: Token<'a>, len: usize) -> Self {
        Scanned { token, len }
    }
}

// ============================================================================
// Content
// ============================================================================

/// Scan one token inside the document element (or entity replacement text)
pub fn scan_content(input: &str, is_final: bool) -> ScanResult<Scanned<'_>> {
    match input.as_bytes().first() {
        None => partial(),
        Some(b'<') => scan_markup(input, true),
        Some(b'&') => scan_reference(input),
        Some(b'\r') | Some(b'\n') => scan_newline(input, is_final),
        Some(_) => scan_chars(input, is_final),
    }
}

fn scan_chars(input: &str, is_final: bool) -> ScanResult<Scanned<'_>> {
    let end = match Scanner::new(input).find_text_boundary() {
        Some(end) => end,
        None if is_final => input.len(),
        None => return partial(),
    };
    let run = &input[..end];
    if let Some(i) = memchr::memmem::find(run.as_bytes(), b"]]>") {
        return invalid(XmlError::InvalidToken, i);
    }
    if let Some(i) = find_invalid_char(run) {
        return invalid(XmlError::InvalidToken, i);
    }
    Ok(Scanned::new(Token::Chars(run), end))
}

fn scan_newline(input: &str, is_final: bool) -> ScanResult<Scanned<'_>> {
    let bytes = input.as_bytes();
    let len = match (bytes[0], bytes.get(1)) {
        (b'\r', Some(b'\n')) => 2,
        (b'\r', None) if !is_final => return partial(),
        _ => 1,
    };
    Ok(Scanned::new(Token::Newline, len))
}

/// Scan `&name;`, `&#N;` or `&#xH;`
pub fn scan_reference(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance(1);

    if s.peek() == Some(b'#') {
        s.advance(1);
        let hex = s.peek() == Some(b'x');
        if hex {
            s.advance(1);
        }
        let digits_start = s.position();
        let mut value: u32 = 0;
        let mut overflow = false;
        loop {
            let b = match s.peek() {
                Some(b) => b,
                None => return partial(),
            };
            let digit = match b {
                b';' => break,
                b'0'..=b'9' => u32::from(b - b'0'),
                b'a'..=b'f' if hex => u32::from(b - b'a' + 10),
                b'A'..=b'F' if hex => u32::from(b - b'A' + 10),
                _ => return invalid(XmlError::InvalidToken, s.position()),
            };
            let radix = if hex { 16 } else { 10 };
            match value.checked_mul(radix).and_then(|v| v.checked_add(digit)) {
                Some(v) => value = v,
                None => overflow = true,
            }
            s.advance(1);
        }
        if s.position() == digits_start {
            return invalid(XmlError::InvalidToken, s.position());
        }
        s.advance(1);
        return match char::from_u32(value).filter(|&c| !overflow && is_xml_char(c)) {
            Some(c) => Ok(Scanned::new(Token::Reference(Reference::Char(c)), s.position())),
            None => invalid(XmlError::BadCharRef, 0),
        };
    }

    let name = match s.read_name() {
        Some(name) => name,
        None if s.is_eof() => return partial(),
        None => return invalid(XmlError::InvalidToken, s.position()),
    };
    match s.peek() {
        Some(b';') => {
            s.advance(1);
            Ok(Scanned::new(Token::Reference(Reference::Entity(name)), s.position()))
        }
        None => partial(),
        Some(_) => invalid(XmlError::InvalidToken, s.position()),
    }
}

/// Scan a construct starting with `<`
fn scan_markup(input: &str, in_content: bool) -> ScanResult<Scanned<'_>> {
    let s = Scanner::new(input);
    match input.as_bytes().get(1) {
        None => partial(),
        Some(b'/') => scan_end_tag(input),
        Some(b'?') => scan_pi(input),
        Some(b'!') => {
            match s.match_prefix("<!--") {
                Some(true) => return scan_comment(input),
                None => return partial(),
                Some(false) => {}
            }
            let keyword = if in_content { "<![CDATA[" } else { "<!DOCTYPE" };
            match s.match_prefix(keyword) {
                Some(true) if in_content => scan_cdata(input),
                Some(true) => scan_doctype(input),
                None => partial(),
                Some(false) => invalid(XmlError::InvalidToken, 2),
            }
        }
        Some(_) => scan_start_tag(input),
    }
}

fn scan_start_tag(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance(1);
    let name = match s.read_name() {
        Some(name) => name,
        None if s.is_eof() => return partial(),
        None => return invalid(XmlError::InvalidToken, 1),
    };

    let mut attributes = Vec::new();
    loop {
        let had_space = s.skip_whitespace();
        match s.peek() {
            None => return partial(),
            Some(b'>') => {
                s.advance(1);
                let tag = StartTag { name, attributes, empty: false };
                return Ok(Scanned::new(Token::StartTag(tag), s.position()));
            }
            Some(b'/') => {
                return match s.remaining().as_bytes().get(1) {
                    None => partial(),
                    Some(b'>') => {
                        s.advance(2);
                        let tag = StartTag { name, attributes, empty: true };
                        Ok(Scanned::new(Token::StartTag(tag), s.position()))
                    }
                    Some(_) => invalid(XmlError::InvalidToken, s.position()),
                };
            }
            Some(_) if !had_space => return invalid(XmlError::InvalidToken, s.position()),
            Some(_) => {
                let attr_start = s.position();
                let attr_name = match s.read_name() {
                    Some(n) => n,
                    None => return invalid(XmlError::InvalidToken, attr_start),
                };
                s.skip_whitespace();
                match s.peek() {
                    None => return partial(),
                    Some(b'=') => s.advance(1),
                    Some(_) => return invalid(XmlError::InvalidToken, s.position()),
                }
                s.skip_whitespace();
                let quote = match s.peek() {
                    None => return partial(),
                    Some(q @ (b'"' | b'\'')) => q,
                    Some(_) => return invalid(XmlError::InvalidToken, s.position()),
                };
                s.advance(1);
                let value_start = s.position();
                let value_end = match s.find_byte(quote) {
                    Some(end) => end,
                    None => return partial(),
                };
                let value = s.slice(value_start, value_end);
                if let Some(i) = memchr(b'<', value.as_bytes()) {
                    return invalid(XmlError::InvalidToken, value_start + i);
                }
                if let Some(i) = find_invalid_char(value) {
                    return invalid(XmlError::InvalidToken, value_start + i);
                }
                attributes.push(RawAttribute { name: attr_name, value });
                s.advance(value_end + 1 - value_start);
            }
        }
    }
}

fn scan_end_tag(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance(2);
    let name = match s.read_name() {
        Some(name) => name,
        None if s.is_eof() => return partial(),
        None => return invalid(XmlError::InvalidToken, 2),
    };
    s.skip_whitespace();
    match s.peek() {
        None => partial(),
        Some(b'>') => {
            s.advance(1);
            Ok(Scanned::new(Token::EndTag(name), s.position()))
        }
        Some(_) => invalid(XmlError::InvalidToken, s.position()),
    }
}

fn scan_comment(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance(4);
    let dashes = match s.find_str("--") {
        Some(i) => i,
        None => return partial(),
    };
    match input.as_bytes().get(dashes + 2) {
        None => partial(),
        Some(b'>') => {
            let body = &input[4..dashes];
            if let Some(i) = find_invalid_char(body) {
                return invalid(XmlError::InvalidToken, 4 + i);
            }
            Ok(Scanned::new(Token::Comment(body), dashes + 3))
        }
        Some(_) => invalid(XmlError::InvalidToken, dashes),
    }
}

fn scan_pi(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance(2);
    let target = match s.read_name() {
        Some(t) => t,
        None if s.is_eof() => return partial(),
        None => return invalid(XmlError::InvalidToken, 2),
    };
    if s.is_eof() {
        return partial();
    }

    let (data, len) = match s.match_prefix("?>") {
        None => return partial(),
        Some(true) => ("", s.position() + 2),
        Some(false) => {
            if !s.skip_whitespace() {
                return invalid(XmlError::InvalidToken, s.position());
            }
            let data_start = s.position();
            let end = match s.find_str("?>") {
                Some(end) => end,
                None => return partial(),
            };
            let data = &input[data_start..end];
            if let Some(i) = find_invalid_char(data) {
                return invalid(XmlError::InvalidToken, data_start + i);
            }
            (data, end + 2)
        }
    };

    if target.eq_ignore_ascii_case("xml") {
        if target != "xml" {
            return invalid(XmlError::InvalidToken, 2);
        }
        return Ok(Scanned::new(Token::XmlDecl(&input[5..len - 2]), len));
    }
    Ok(Scanned::new(Token::Pi { target, data }, len))
}

fn scan_cdata(input: &str) -> ScanResult<Scanned<'_>> {
    const OPEN: usize = "<![CDATA[".len();
    let end = match memchr::memmem::find(&input.as_bytes()[OPEN..], b"]]>") {
        Some(i) => OPEN + i,
        None => return Err(ScanError::Partial(XmlError::UnclosedCdataSection)),
    };
    let body = &input[OPEN..end];
    if let Some(i) = find_invalid_char(body) {
        return invalid(XmlError::InvalidToken, OPEN + i);
    }
    Ok(Scanned::new(Token::Cdata(body), end + 3))
}

// ============================================================================
// Prolog and epilog
// ============================================================================

/// Scan one token outside the document element
pub fn scan_misc(input: &str, is_final: bool) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    match s.peek() {
        None => partial(),
        Some(b'<') => scan_markup(input, false),
        Some(b) if is_whitespace(b) => {
            s.skip_whitespace();
            if s.is_eof() && !is_final {
                return partial();
            }
            Ok(Scanned::new(Token::Whitespace(&input[..s.position()]), s.position()))
        }
        Some(_) => {
            let len = s.peek_char().map_or(1, char::len_utf8);
            Ok(Scanned::new(Token::Text(&input[..len]), len))
        }
    }
}

fn require_whitespace(s: &mut Scanner<'_>) -> ScanResult<()> {
    if s.skip_whitespace() {
        Ok(())
    } else if s.is_eof() {
        partial()
    } else {
        invalid(XmlError::Syntax, s.position())
    }
}

fn read_name_or<'a>(s: &mut Scanner<'a>, code: XmlError) -> ScanResult<&'a str> {
    match s.read_name() {
        Some(_) if s.is_eof() => partial(),
        Some(name) => Ok(name),
        None if s.is_eof() => partial(),
        None => invalid(code, s.position()),
    }
}

/// Quoted literal; returns the text between the quotes
fn read_literal<'a>(s: &mut Scanner<'a>) -> ScanResult<&'a str> {
    let quote = match s.peek() {
        None => return partial(),
        Some(q @ (b'"' | b'\'')) => q,
        Some(_) => return invalid(XmlError::Syntax, s.position()),
    };
    s.advance(1);
    let start = s.position();
    let end = match s.find_byte(quote) {
        Some(end) => end,
        None => return partial(),
    };
    s.advance(end + 1 - start);
    Ok(s.slice(start, end))
}

#[inline]
fn is_pubid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || " \r\n-'()+,./:=?;!*#@$_%".contains(c)
}

/// `SYSTEM "sys"` or `PUBLIC "pub" "sys"`; `(None, None)` if neither keyword
fn scan_external_id<'a>(s: &mut Scanner<'a>) -> ScanResult<(Option<&'a str>, Option<&'a str>)> {
    match (s.match_prefix("SYSTEM"), s.match_prefix("PUBLIC")) {
        (Some(true), _) => {
            s.advance(6);
            require_whitespace(s)?;
            let system = read_literal(s)?;
            Ok((Some(system), None))
        }
        (_, Some(true)) => {
            s.advance(6);
            require_whitespace(s)?;
            let literal_start = s.position() + 1;
            let public = read_literal(s)?;
            if let Some((i, _)) = public.char_indices().find(|&(_, c)| !is_pubid_char(c)) {
                return invalid(XmlError::PublicId, literal_start + i);
            }
            require_whitespace(s)?;
            let system = read_literal(s)?;
            Ok((Some(system), Some(public)))
        }
        (None, _) | (_, None) => partial(),
        _ => Ok((None, None)),
    }
}

fn scan_doctype(input: &str) -> ScanResult<Scanned<'_>> {
    let mut s = Scanner::new(input);
    s.advance("<!DOCTYPE".len());
    require_whitespace(&mut s)?;
    let name = read_name_or(&mut s, XmlError::Syntax)?;

    let had_space = s.skip_whitespace();
    if s.is_eof() {
        return partial();
    }
    let (system_id, public_id) = if had_space {
        let ids = scan_external_id(&mut s)?;
        s.skip_whitespace();
        ids
    } else {
        (None, None)
    };

    let (header_end, subset, trailer_start) = match s.peek() {
        None => return partial(),
        Some(b'>') => (s.position(), None, s.position()),
        Some(b'[') => {
            s.advance(1);
            let header_end = s.position();
            let items = scan_subset(&mut s)?;
            (header_end, Some(items), s.position())
        }
        Some(_) => return invalid(XmlError::Syntax, s.position()),
    };
    if subset.is_some() {
        // past the closing ']'
        s.advance(1);
        s.skip_whitespace();
        match s.peek() {
            None => return partial(),
            Some(b'>') => {}
            Some(_) => return invalid(XmlError::Syntax, s.position()),
        }
    }
    s.advance(1);

    let doctype = Doctype {
        name,
        system_id,
        public_id,
        subset,
        header: &input[..header_end],
        trailer: &input[trailer_start..s.position()],
    };
    Ok(Scanned::new(Token::Doctype(doctype), s.position()))
}

/// Scan internal subset items, stopping at the closing `]` (not consumed)
fn scan_subset<'a>(s: &mut Scanner<'a>) -> ScanResult<Vec<SubsetItem<'a>>> {
    let mut items = Vec::new();
    loop {
        let start = s.position();
        if s.skip_whitespace() {
            items.push(SubsetItem {
                raw: s.slice(start, s.position()),
                kind: SubsetKind::Whitespace,
            });
            continue;
        }
        let kind = match s.peek() {
            None => return partial(),
            Some(b']') => return Ok(items),
            Some(b'%') => {
                s.advance(1);
                let name = read_name_or(s, XmlError::Syntax)?;
                if s.peek() != Some(b';') {
                    return invalid(XmlError::Syntax, s.position());
                }
                s.advance(1);
                SubsetKind::ParamRef(name)
            }
            Some(b'<') => {
                let rest = s.remaining();
                let (kind, len) = scan_declaration(rest).map_err(|e| e.shifted(start))?;
                s.advance(len);
                kind
            }
            Some(_) => return invalid(XmlError::Syntax, start),
        };
        items.push(SubsetItem {
            raw: s.slice(start, s.position()),
            kind,
        });
    }
}

/// One markup declaration, comment or PI inside the internal subset
fn scan_declaration(input: &str) -> ScanResult<(SubsetKind<'_>, usize)> {
    let s = Scanner::new(input);
    if s.match_prefix("<?") == Some(true) {
        let Scanned { token, len } = scan_pi(input)?;
        return match token {
            Token::Pi { target, data } => Ok((SubsetKind::Pi { target, data }, len)),
            _ => invalid(XmlError::MisplacedXmlPi, 0),
        };
    }
    let mut undecided = false;
    for keyword in ["<!--", "<!ENTITY", "<!ELEMENT", "<!ATTLIST", "<!NOTATION"] {
        match s.match_prefix(keyword) {
            Some(true) => {
                return match keyword {
                    "<!--" => {
                        let Scanned { token, len } = scan_comment(input)?;
                        match token {
                            Token::Comment(body) => Ok((SubsetKind::Comment(body), len)),
                            _ => invalid(XmlError::Syntax, 0),
                        }
                    }
                    "<!ENTITY" => scan_entity_decl(input).map(|(decl, len)| (SubsetKind::Entity(decl), len)),
                    _ => match Scanner::new(input).find_tag_end_quoted() {
                        Some(end) => Ok((SubsetKind::Markup, end + 1)),
                        None => partial(),
                    },
                };
            }
            None => undecided = true,
            Some(false) => {}
        }
    }
    if undecided {
        partial()
    } else {
        invalid(XmlError::Syntax, 0)
    }
}

fn scan_entity_decl(input: &str) -> ScanResult<(EntityDecl<'_>, usize)> {
    let mut s = Scanner::new(input);
    s.advance("<!ENTITY".len());
    require_whitespace(&mut s)?;
    let parameter = s.peek() == Some(b'%');
    if parameter {
        s.advance(1);
        require_whitespace(&mut s)?;
    }
    let name = read_name_or(&mut s, XmlError::Syntax)?;
    require_whitespace(&mut s)?;

    let mut decl = EntityDecl {
        name,
        parameter,
        value: None,
        system_id: None,
        public_id: None,
        notation: None,
    };
    match s.peek() {
        None => return partial(),
        Some(b'"' | b'\'') => {
            let value_start = s.position() + 1;
            let value = read_literal(&mut s)?;
            if let Some(i) = memchr(b'%', value.as_bytes()) {
                return invalid(XmlError::ParamEntityRef, value_start + i);
            }
            decl.value = Some(value);
        }
        Some(_) => {
            let (system_id, public_id) = scan_external_id(&mut s)?;
            if system_id.is_none() {
                return invalid(XmlError::Syntax, s.position());
            }
            decl.system_id = system_id;
            decl.public_id = public_id;
            let had_space = s.skip_whitespace();
            match s.match_prefix("NDATA") {
                None => return partial(),
                Some(true) if had_space && !parameter => {
                    s.advance(5);
                    require_whitespace(&mut s)?;
                    decl.notation = Some(read_name_or(&mut s, XmlError::Syntax)?);
                }
                Some(true) => return invalid(XmlError::Syntax, s.position()),
                Some(false) => {}
            }
        }
    }
    s.skip_whitespace();
    match s.peek() {
        None => partial(),
        Some(b'>') => Ok((decl, s.position() + 1)),
        Some(_) => invalid(XmlError::Syntax, s.position()),
    }
}

// ============================================================================
// XML declaration
// ============================================================================

/// Parse the body of `<?xml ...?>` (the text between `xml` and `?>`)
pub fn parse_xml_decl(body: &str) -> Result<XmlDecl<'_>, XmlError> {
    let mut s = Scanner::new(body);
    let mut next = pseudo_attribute(&mut s)?;

    let version = match next {
        Some(("version", v)) if is_version(v) => v,
        _ => return Err(XmlError::XmlDecl),
    };
    next = pseudo_attribute(&mut s)?;

    let mut encoding = None;
    if let Some(("encoding", e)) = next {
        if !is_encoding_name(e) {
            return Err(XmlError::XmlDecl);
        }
        encoding = Some(e);
        next = pseudo_attribute(&mut s)?;
    }

    let mut standalone = None;
    if let Some(("standalone", v)) = next {
        standalone = Some(match v {
            "yes" => true,
            "no" => false,
            _ => return Err(XmlError::XmlDecl),
        });
        next = pseudo_attribute(&mut s)?;
    }

    match next {
        None => Ok(XmlDecl {
            version,
            encoding,
            standalone,
        }),
        Some(_) => Err(XmlError::XmlDecl),
    }
}

fn pseudo_attribute<'a>(s: &mut Scanner<'a>) -> Result<Option<(&'a str, &'a str)>, XmlError> {
    let had_space = s.skip_whitespace();
    if s.is_eof() {
        return Ok(None);
    }
    if !had_space {
        return Err(XmlError::XmlDecl);
    }
    let name = s.read_name().ok_or(XmlError::XmlDecl)?;
    s.skip_whitespace();
    if s.peek() != Some(b'=') {
        return Err(XmlError::XmlDecl);
    }
    s.advance(1);
    s.skip_whitespace();
    let value = read_literal(s).map_err(|_| XmlError::XmlDecl)?;
    Ok(Some((name, value)))
}

fn is_version(v: &str) -> bool {
    v.strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

fn is_encoding_name(e: &str) -> bool {
    let mut bytes = e.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Split CDATA content into runs and line breaks.
///
/// Yields `(text, raw)`; for line breaks `text` is `"\n"` and `raw` the
/// original `\r\n`, `\r` or `\n`.
pub fn split_lines(content: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut rest = content;
    std::iter::from_fn(move || {
        let bytes = rest.as_bytes();
        let first = *bytes.first()?;
        let len = match first {
            b'\r' if bytes.get(1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => memchr::memchr2(b'\r', b'\n', bytes).unwrap_or(bytes.len()),
        };
        let (piece, tail) = rest.split_at(len);
        rest = tail;
        let text = if matches!(first, b'\r' | b'\n') { "\n" } else { piece };
        Some((text, piece))
    })
}
