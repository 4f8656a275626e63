//! Encoding detection and decoding
//!
//! Input bytes are decoded to UTF-8 before tokenizing.
//!
//! - Detection looks at the byte order mark, the `<\0` / `\0<` patterns of
//!   UTF-16 without a BOM, and the `encoding` label of a leading XML
//!   declaration.
//! - Built-in decoders: UTF-8, UTF-16 (LE/BE), ISO-8859-1 and US-ASCII.
//! - Any other label is resolved through the unknown-encoding callback, which
//!   answers with an [`EncodingInfo`].

use std::fmt;

use super::scanner::is_whitespace;
use super::tokenizer::parse_xml_decl;

/// Converter for one multi-byte sequence of a custom encoding
pub type ConvertFn = Box<dyn Fn(&[u8]) -> Option<char> + Send + Sync>;

/// Description of an encoding supplied by the unknown-encoding callback.
///
/// `map[b]` describes what byte `b` starts:
/// - `>= 0`: a single-byte character with that scalar value
/// - `-1`: an invalid byte
/// - `-2`, `-3`, `-4`: a sequence of that many bytes, decoded by `convert`
///
/// Bytes used by XML markup (printable ASCII, tab, newline, carriage return)
/// must map to themselves.
pub struct EncodingInfo {
    map: [i32; 256],
    convert: Option<ConvertFn>,
}

impl EncodingInfo {
    /// Create an encoding from its byte map
    pub fn new(map: [i32; 256]) -> Self {
        EncodingInfo { map, convert: None }
    }

    /// Build a single-byte encoding from a per-byte table
    pub fn single_byte<F>(table: F) -> Self
    where
        F: Fn(u8) -> Option<char>,
    {
        let mut map = [-1i32; 256];
        for (b, slot) in map.iter_mut().enumerate() {
            if let Some(c) = table(b as u8) {
                *slot = c as i32;
            }
        }
        EncodingInfo::new(map)
    }

    /// Attach the converter used for multi-byte sequences
    pub fn with_convert<F>(mut self, convert: F) -> Self
    where
        F: Fn(&[u8]) -> Option<char> + Send + Sync + 'static,
    {
        self.convert = Some(Box::new(convert));
        self
    }

    /// The byte map
    pub fn map(&self) -> &[i32; 256] {
        &self.map
    }

    /// Check the map is usable for XML.
    pub(crate) fn is_valid(&self) -> bool {
        self.map.iter().enumerate().all(|(b, &m)| {
            let markup = b < 0x80 && (b >= 0x20 && b != 0x7F || matches!(b, 0x09 | 0x0A | 0x0D));
            if markup {
                return m == b as i32;
            }
            match m {
                -1 => true,
                -4..=-2 => self.convert.is_some(),
                m if m >= 0 => u32::try_from(m).ok().and_then(char::from_u32).is_some(),
                _ => false,
            }
        })
    }
}

impl fmt::Debug for EncodingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingInfo")
            .field("multi_byte", &self.convert.is_some())
            .finish_non_exhaustive()
    }
}

/// Byte-width family detected from the first bytes of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    EightBit,
    Utf16Le,
    Utf16Be,
}

/// Result of looking at the start of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sniffed {
    pub family: Family,
    /// Length of the byte order mark to skip
    pub bom_len: usize,
}

/// Detect the byte family. Returns `None` while more bytes are needed.
pub fn sniff(raw: &[u8], is_final: bool) -> Option<Sniffed> {
    let (family, bom_len) = match raw {
        [0xFF, 0xFE, ..] => (Family::Utf16Le, 2),
        [0xFE, 0xFF, ..] => (Family::Utf16Be, 2),
        [0xEF, 0xBB, 0xBF, ..] => (Family::EightBit, 3),
        [b'<', 0x00, ..] => (Family::Utf16Le, 0),
        [0x00, b'<', ..] => (Family::Utf16Be, 0),
        [] | [_] | [0xEF, 0xBB] if !is_final => return None,
        _ => (Family::EightBit, 0),
    };
    Some(Sniffed { family, bom_len })
}

/// Encoding label found in a leading XML declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Not enough input to tell yet
    Pending,
    /// No declaration, or a declaration without an encoding
    Absent,
    Named(String),
}

/// Read the `encoding` pseudo-attribute of a leading XML declaration.
///
/// `raw` starts after the byte order mark. Malformed declarations report
/// `Absent`; the tokenizer raises the error once decoding is set up.
pub fn declared_label(raw: &[u8], family: Family, is_final: bool) -> Label {
    let (text, complete) = leading_markup(raw, family);
    let waiting = !complete && !is_final;

    if !text.starts_with("<?xml") {
        return if waiting && "<?xml".starts_with(text.as_str()) {
            Label::Pending
        } else {
            Label::Absent
        };
    }
    match text.as_bytes().get(5) {
        None if waiting => return Label::Pending,
        Some(&b) if is_whitespace(b) => {}
        _ => return Label::Absent,
    }
    if waiting {
        return Label::Pending;
    }
    if !complete || !text.ends_with("?>") {
        return Label::Absent;
    }
    match parse_xml_decl(&text[5..text.len() - 2]) {
        Ok(decl) => decl.encoding.map_or(Label::Absent, |e| Label::Named(e.to_string())),
        Err(_) => Label::Absent,
    }
}

/// Decode code units up to and including the first `>`, one char per unit.
fn leading_markup(raw: &[u8], family: Family) -> (String, bool) {
    let mut text = String::new();
    let units: Box<dyn Iterator<Item = u32> + '_> = match family {
        Family::EightBit => Box::new(raw.iter().map(|&b| b as u32)),
        Family::Utf16Le => Box::new(raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)),
        Family::Utf16Be => Box::new(raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]) as u32)),
    };
    for unit in units {
        text.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
        if unit == u32::from(b'>') {
            return (text, true);
        }
    }
    (text, false)
}

/// Why decoding stopped before the end of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A malformed byte sequence
    Invalid,
    /// A sequence cut off by the end of the available bytes
    Incomplete,
}

/// Outcome of one decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Bytes of `raw` turned into text
    pub consumed: usize,
    pub stop: Option<Stop>,
}

/// A concrete byte-to-text decoder
#[derive(Debug)]
pub enum Decoder {
    Utf8,
    Utf16 { big_endian: bool },
    Latin1,
    Ascii,
    Custom(EncodingInfo),
}

impl Decoder {
    /// Look up a built-in decoder by label (case-insensitive)
    pub fn builtin(label: &str, family: Family) -> Option<Decoder> {
        let decoder = match label.to_ascii_uppercase().as_str() {
            "UTF-8" => Decoder::Utf8,
            "ISO-8859-1" => Decoder::Latin1,
            "US-ASCII" => Decoder::Ascii,
            "UTF-16LE" => Decoder::Utf16 { big_endian: false },
            "UTF-16BE" => Decoder::Utf16 { big_endian: true },
            "UTF-16" => Decoder::Utf16 {
                big_endian: family != Family::Utf16Le,
            },
            _ => return None,
        };
        Some(decoder)
    }

    /// The decoder used when no label is given
    pub fn for_family(family: Family) -> Decoder {
        match family {
            Family::EightBit => Decoder::Utf8,
            Family::Utf16Le => Decoder::Utf16 { big_endian: false },
            Family::Utf16Be => Decoder::Utf16 { big_endian: true },
        }
    }

    /// Whether this decoder reads two-byte code units
    pub fn is_sixteen_bit(&self) -> bool {
        matches!(self, Decoder::Utf16 { .. })
    }

    /// Whether decoded offsets equal source offsets
    pub fn is_identity(&self) -> bool {
        matches!(self, Decoder::Utf8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Decoder::Utf8 => "UTF-8",
            Decoder::Utf16 { big_endian: false } => "UTF-16LE",
            Decoder::Utf16 { big_endian: true } => "UTF-16BE",
            Decoder::Latin1 => "ISO-8859-1",
            Decoder::Ascii => "US-ASCII",
            Decoder::Custom(_) => "custom",
        }
    }

    /// Decode as much of `raw` as possible onto `out`.
    ///
    /// For non-identity decoders `marks` receives `(text_offset, raw_offset)`
    /// for the start of every decoded character; offsets are relative to the
    /// start of `out` before the call and to `raw`.
    pub fn decode(&self, raw: &[u8], out: &mut String, marks: &mut Vec<(usize, usize)>) -> Decoded {
        match self {
            Decoder::Utf8 => decode_utf8(raw, out),
            Decoder::Utf16 { big_endian } => decode_utf16(raw, *big_endian, out, marks),
            Decoder::Latin1 => decode_bytes(raw, out, marks, |b| Some(b as char)),
            Decoder::Ascii => decode_bytes(raw, out, marks, |b| b.is_ascii().then_some(b as char)),
            Decoder::Custom(info) => decode_custom(info, raw, out, marks),
        }
    }
}

fn decode_utf8(raw: &[u8], out: &mut String) -> Decoded {
    match std::str::from_utf8(raw) {
        Ok(s) => {
            out.push_str(s);
            Decoded {
                consumed: raw.len(),
                stop: None,
            }
        }
        Err(e) => {
            let valid = e.valid_up_to();
            // valid_up_to marks a verified prefix
            if let Ok(s) = std::str::from_utf8(&raw[..valid]) {
                out.push_str(s);
            }
            let stop = if e.error_len().is_some() {
                Stop::Invalid
            } else {
                Stop::Incomplete
            };
            Decoded {
                consumed: valid,
                stop: Some(stop),
            }
        }
    }
}

fn decode_bytes<F>(raw: &[u8], out: &mut String, marks: &mut Vec<(usize, usize)>, f: F) -> Decoded
where
    F: Fn(u8) -> Option<char>,
{
    let base = out.len();
    for (i, &b) in raw.iter().enumerate() {
        match f(b) {
            Some(c) => {
                marks.push((out.len() - base, i));
                out.push(c);
            }
            None => {
                return Decoded {
                    consumed: i,
                    stop: Some(Stop::Invalid),
                }
            }
        }
    }
    Decoded {
        consumed: raw.len(),
        stop: None,
    }
}

fn decode_utf16(raw: &[u8], big_endian: bool, out: &mut String, marks: &mut Vec<(usize, usize)>) -> Decoded {
    let base = out.len();
    let unit = |i: usize| {
        let pair = [raw[i], raw[i + 1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    };
    let mut i = 0;
    while i + 1 < raw.len() {
        let first = unit(i);
        let (c, len) = match first {
            0xD800..=0xDBFF => {
                if i + 3 >= raw.len() {
                    return Decoded {
                        consumed: i,
                        stop: Some(Stop::Incomplete),
                    };
                }
                match unit(i + 2) {
                    low @ 0xDC00..=0xDFFF => {
                        let scalar = 0x10000 + ((u32::from(first) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                        (char::from_u32(scalar), 4)
                    }
                    _ => (None, 2),
                }
            }
            0xDC00..=0xDFFF => (None, 2),
            other => (char::from_u32(u32::from(other)), 2),
        };
        match c {
            Some(c) => {
                marks.push((out.len() - base, i));
                out.push(c);
                i += len;
            }
            None => {
                return Decoded {
                    consumed: i,
                    stop: Some(Stop::Invalid),
                }
            }
        }
    }
    let stop = (i < raw.len()).then_some(Stop::Incomplete);
    Decoded { consumed: i, stop }
}

fn decode_custom(info: &EncodingInfo, raw: &[u8], out: &mut String, marks: &mut Vec<(usize, usize)>) -> Decoded {
    let base = out.len();
    let mut i = 0;
    while i < raw.len() {
        let m = info.map[raw[i] as usize];
        let (c, len) = match m {
            m if m >= 0 => (u32::try_from(m).ok().and_then(char::from_u32), 1),
            -4..=-2 => {
                let len = m.unsigned_abs() as usize;
                if i + len > raw.len() {
                    return Decoded {
                        consumed: i,
                        stop: Some(Stop::Incomplete),
                    };
                }
                let c = info.convert.as_ref().and_then(|f| f(&raw[i..i + len]));
                (c, len)
            }
            _ => (None, 1),
        };
        match c {
            Some(c) => {
                marks.push((out.len() - base, i));
                out.push(c);
                i += len;
            }
            None => {
                return Decoded {
                    consumed: i,
                    stop: Some(Stop::Invalid),
                }
            }
        }
    }
    Decoded {
        consumed: raw.len(),
        stop: None,
    }
}
