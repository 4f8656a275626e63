//! Input buffering
//!
//! Raw bytes are queued until a decoder is chosen, then decoded into a text
//! buffer the tokenizer reads from. The text buffer keeps some already
//! consumed text for the input-context query, and a source map translates
//! text offsets back to byte offsets in the original input.

use std::collections::VecDeque;

use super::encoding::{Decoder, Stop};
use super::position::Locator;
use crate::error::XmlError;

/// Consumed text kept for the input-context query
pub const CONTEXT_BYTES: usize = 1024;

const INITIAL_CAPACITY: usize = 4096;

/// Maps absolute text offsets to absolute source byte offsets
#[derive(Debug, Default)]
struct SourceMap {
    /// Source offset of text offset 0 for identity decoding (the BOM length)
    shift: u64,
    identity: bool,
    /// `(text, source)` at each character start, for non-identity decoders
    marks: VecDeque<(u64, u64)>,
    /// `(text, source)` at the end of the decoded text
    end: (u64, u64),
}

impl SourceMap {
    fn source_offset(&self, text_offset: u64) -> u64 {
        if self.identity {
            return text_offset + self.shift;
        }
        let (end_text, end_source) = self.end;
        if text_offset >= end_text {
            return end_source + (text_offset - end_text);
        }
        match self.marks.partition_point(|&(t, _)| t <= text_offset) {
            0 => self.marks.front().map_or(self.shift, |&(_, s)| s),
            i => {
                let (t, s) = self.marks[i - 1];
                s + (text_offset - t)
            }
        }
    }

    fn discard_before(&mut self, text_offset: u64) {
        while self.marks.len() > 1 && self.marks[1].0 <= text_offset {
            self.marks.pop_front();
        }
    }
}

/// Raw and decoded input of one parser
#[derive(Debug)]
pub struct Input {
    raw: Vec<u8>,
    /// Source offset of `raw[0]`
    raw_offset: u64,
    decoder: Option<Decoder>,
    text: String,
    /// Consumed prefix of `text`
    pos: usize,
    /// Absolute text offset of `text[0]`
    base: u64,
    map: SourceMap,
    /// Where decoding stopped for good, as an absolute text offset
    stop: Option<(Stop, u64)>,
    scratch: Vec<u8>,
    scratch_len: Option<usize>,
}

impl Input {
    pub fn new() -> Result<Self, XmlError> {
        let mut raw = Vec::new();
        raw.try_reserve(INITIAL_CAPACITY).map_err(|_| XmlError::NoMemory)?;
        let mut text = String::new();
        text.try_reserve(INITIAL_CAPACITY).map_err(|_| XmlError::NoMemory)?;
        Ok(Input {
            raw,
            raw_offset: 0,
            decoder: None,
            text,
            pos: 0,
            base: 0,
            map: SourceMap::default(),
            stop: None,
            scratch: Vec::new(),
            scratch_len: None,
        })
    }

    /// Queue raw bytes
    pub fn push(&mut self, data: &[u8]) -> Result<(), XmlError> {
        self.raw.try_reserve(data.len()).map_err(|_| XmlError::NoMemory)?;
        self.raw.extend_from_slice(data);
        Ok(())
    }

    /// Bytes not yet decoded
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[inline]
    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    /// Install the decoder, dropping `skip` leading bytes (a byte order mark)
    pub fn set_decoder(&mut self, decoder: Decoder, skip: usize) {
        let skip = skip.min(self.raw.len());
        self.raw.drain(..skip);
        self.raw_offset += skip as u64;
        self.map.identity = decoder.is_identity();
        self.map.shift = self.raw_offset;
        self.map.end = (0, self.raw_offset);
        self.decoder = Some(decoder);
    }

    /// Decode as much queued input as possible
    pub fn decode(&mut self, is_final: bool) -> Result<(), XmlError> {
        let decoder = match &self.decoder {
            Some(d) => d,
            None => return Ok(()),
        };
        if matches!(self.stop, Some((Stop::Invalid, _))) || self.raw.is_empty() {
            return Ok(());
        }
        self.text.try_reserve(self.raw.len()).map_err(|_| XmlError::NoMemory)?;

        let text_start = self.base + self.text.len() as u64;
        let mut marks = Vec::new();
        let decoded = decoder.decode(&self.raw, &mut self.text, &mut marks);
        if !self.map.identity {
            self.map.marks.extend(
                marks
                    .into_iter()
                    .map(|(t, r)| (text_start + t as u64, self.raw_offset + r as u64)),
            );
        }
        self.raw.drain(..decoded.consumed);
        self.raw_offset += decoded.consumed as u64;
        let text_end = self.base + self.text.len() as u64;
        self.map.end = (text_end, self.raw_offset);

        self.stop = match decoded.stop {
            Some(Stop::Invalid) => Some((Stop::Invalid, text_end)),
            Some(Stop::Incomplete) if is_final => Some((Stop::Incomplete, text_end)),
            _ => None,
        };
        Ok(())
    }

    /// Whether the decoded text ends exactly at the end of the input seen so far
    #[inline]
    pub fn fully_decoded(&self) -> bool {
        self.raw.is_empty() && self.stop.is_none()
    }

    #[inline]
    pub fn stop(&self) -> Option<(Stop, u64)> {
        self.stop
    }

    /// Decoded text not yet consumed
    #[inline]
    pub fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    /// Retained decoded text, including some consumed context
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Absolute offset of `text()[0]`
    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Absolute offset of the first unconsumed byte
    #[inline]
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    #[inline]
    pub fn consume(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.text.len());
    }

    /// Source byte offset of an absolute text offset
    #[inline]
    pub fn source_offset(&self, text_offset: u64) -> u64 {
        self.map.source_offset(text_offset)
    }

    /// Drop consumed text beyond the retained context
    pub fn compact(&mut self, locator: &mut Locator) {
        if self.pos <= 2 * CONTEXT_BYTES {
            return;
        }
        let mut cut = self.pos - CONTEXT_BYTES;
        while !self.text.is_char_boundary(cut) {
            cut -= 1;
        }
        locator.advance_to(self.base + cut as u64, &self.text, self.base);
        self.text.drain(..cut);
        self.pos -= cut;
        self.base += cut as u64;
        self.map.discard_before(self.base);
    }

    /// Hand out a writable buffer of `len` bytes
    pub fn get_buffer(&mut self, len: usize) -> Option<&mut [u8]> {
        self.scratch.clear();
        self.scratch.try_reserve(len).ok()?;
        self.scratch.resize(len, 0);
        self.scratch_len = Some(len);
        Some(&mut self.scratch[..])
    }

    /// Take back the buffer from `get_buffer`, truncated to `len`
    pub fn take_buffer(&mut self, len: usize) -> Result<Vec<u8>, XmlError> {
        match self.scratch_len {
            None if len > 0 => Err(XmlError::NoBuffer),
            Some(available) if len > available => Err(XmlError::InvalidArgument),
            _ => {
                self.scratch_len = None;
                let mut buffer = std::mem::take(&mut self.scratch);
                buffer.truncate(len);
                Ok(buffer)
            }
        }
    }

    /// Return a buffer so its allocation can be reused
    pub fn restore_buffer(&mut self, mut buffer: Vec<u8>) {
        buffer.clear();
        self.scratch = buffer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_identity_offsets_include_bom() {
        let mut input = Input::new().unwrap();
        input.push(b"\xEF\xBB\xBF<a/>").unwrap();
        input.set_decoder(Decoder::Utf8, 3);
        input.decode(false).unwrap();
        assert_eq!(input.rest(), "<a/>");
        assert_eq!(input.source_offset(0), 3);
        assert_eq!(input.source_offset(4), 7);
    }

    #[test]
    fn test_utf16_offsets() {
        let mut input = Input::new().unwrap();
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(utf16le("<a>\u{E9}</a>"));
        input.push(&bytes).unwrap();
        input.set_decoder(Decoder::Utf16 { big_endian: false }, 2);
        input.decode(false).unwrap();
        assert_eq!(input.rest(), "<a>\u{E9}</a>");
        // '<' of the end tag: 3 ASCII chars + 2-byte UTF-8 char in text
        assert_eq!(input.source_offset(5), 2 + 2 * 4);
        assert_eq!(input.source_offset(input.offset() + input.rest().len() as u64), 2 + 2 * 8);
    }

    #[test]
    fn test_partial_sequences_wait() {
        let mut input = Input::new().unwrap();
        input.set_decoder(Decoder::Utf8, 0);
        input.push(b"a\xC3").unwrap();
        input.decode(false).unwrap();
        assert_eq!(input.rest(), "a");
        assert!(!input.fully_decoded());
        assert_eq!(input.stop(), None);

        input.push(b"\xA9").unwrap();
        input.decode(false).unwrap();
        assert_eq!(input.rest(), "a\u{E9}");
        assert!(input.fully_decoded());
    }

    #[test]
    fn test_stops() {
        let mut input = Input::new().unwrap();
        input.set_decoder(Decoder::Utf8, 0);
        input.push(b"ab\xC3").unwrap();
        input.decode(true).unwrap();
        assert_eq!(input.stop(), Some((Stop::Incomplete, 2)));

        let mut input = Input::new().unwrap();
        input.set_decoder(Decoder::Utf8, 0);
        input.push(b"a\xFFb").unwrap();
        input.decode(false).unwrap();
        assert_eq!(input.stop(), Some((Stop::Invalid, 1)));
    }

    #[test]
    fn test_compact_keeps_context() {
        let mut input = Input::new().unwrap();
        input.set_decoder(Decoder::Utf8, 0);
        let data = "x".repeat(5000);
        input.push(data.as_bytes()).unwrap();
        input.decode(false).unwrap();
        input.consume(4000);

        let mut locator = Locator::new();
        input.compact(&mut locator);
        assert_eq!(input.offset(), 4000);
        assert_eq!(input.base(), 4000 - CONTEXT_BYTES as u64);
        assert_eq!(input.text().len(), 5000 - 4000 + CONTEXT_BYTES);
        assert_eq!(locator.column(), 4000 - CONTEXT_BYTES as u64);
    }

    #[test]
    fn test_scratch_buffer() {
        let mut input = Input::new().unwrap();
        assert_eq!(input.take_buffer(1), Err(XmlError::NoBuffer));
        assert_eq!(input.take_buffer(0), Ok(Vec::new()));

        let buf = input.get_buffer(8).unwrap();
        buf[..3].copy_from_slice(b"<a>");
        assert_eq!(input.take_buffer(9), Err(XmlError::InvalidArgument));
        assert_eq!(input.take_buffer(3).unwrap(), b"<a>".to_vec());
        assert_eq!(input.take_buffer(3), Err(XmlError::NoBuffer));
    }
}
