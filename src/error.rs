//! Error codes and error types
//!
//! - `XmlError` - the engine's error code table. Numeric values are stable and
//!   follow the classic incremental-parser numbering, so codes can cross an FFI
//!   or NIF boundary as plain integers.
//! - `ParseError` - an error code bundled with the position it was raised at.
//! - `ReadError` - failure while pulling input from a `std::io::Read`.

use thiserror::Error;

/// Error code reported by the engine.
///
/// `XmlError::None` is the "no error" value returned by the error-code query
/// on a parser that has not failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{}", self.description())]
#[repr(i32)]
pub enum XmlError {
    None = 0,
    NoMemory = 1,
    Syntax = 2,
    NoElements = 3,
    InvalidToken = 4,
    UnclosedToken = 5,
    PartialChar = 6,
    TagMismatch = 7,
    DuplicateAttribute = 8,
    JunkAfterDocElement = 9,
    ParamEntityRef = 10,
    UndefinedEntity = 11,
    RecursiveEntityRef = 12,
    AsyncEntity = 13,
    BadCharRef = 14,
    BinaryEntityRef = 15,
    AttributeExternalEntityRef = 16,
    MisplacedXmlPi = 17,
    UnknownEncoding = 18,
    IncorrectEncoding = 19,
    UnclosedCdataSection = 20,
    ExternalEntityHandling = 21,
    NotStandalone = 22,
    UnexpectedState = 23,
    EntityDeclaredInPe = 24,
    FeatureRequiresXmlDtd = 25,
    CantChangeFeatureOnceParsing = 26,
    UnboundPrefix = 27,
    UndeclaringPrefix = 28,
    IncompletePe = 29,
    XmlDecl = 30,
    TextDecl = 31,
    PublicId = 32,
    Suspended = 33,
    NotSuspended = 34,
    Aborted = 35,
    Finished = 36,
    SuspendPe = 37,
    ReservedPrefixXml = 38,
    ReservedPrefixXmlns = 39,
    ReservedNamespaceUri = 40,
    InvalidArgument = 41,
    NoBuffer = 42,
    AmplificationLimitBreach = 43,
    NotStarted = 44,
}

/// Every code in numeric order; `ALL[n].code() == n`.
const ALL: [XmlError; 45] = [
    XmlError::None,
    XmlError::NoMemory,
    XmlError::Syntax,
    XmlError::NoElements,
    XmlError::InvalidToken,
    XmlError::UnclosedToken,
    XmlError::PartialChar,
    XmlError::TagMismatch,
    XmlError::DuplicateAttribute,
    XmlError::JunkAfterDocElement,
    XmlError::ParamEntityRef,
    XmlError::UndefinedEntity,
    XmlError::RecursiveEntityRef,
    XmlError::AsyncEntity,
    XmlError::BadCharRef,
    XmlError::BinaryEntityRef,
    XmlError::AttributeExternalEntityRef,
    XmlError::MisplacedXmlPi,
    XmlError::UnknownEncoding,
    XmlError::IncorrectEncoding,
    XmlError::UnclosedCdataSection,
    XmlError::ExternalEntityHandling,
    XmlError::NotStandalone,
    XmlError::UnexpectedState,
    XmlError::EntityDeclaredInPe,
    XmlError::FeatureRequiresXmlDtd,
    XmlError::CantChangeFeatureOnceParsing,
    XmlError::UnboundPrefix,
    XmlError::UndeclaringPrefix,
    XmlError::IncompletePe,
    XmlError::XmlDecl,
    XmlError::TextDecl,
    XmlError::PublicId,
    XmlError::Suspended,
    XmlError::NotSuspended,
    XmlError::Aborted,
    XmlError::Finished,
    XmlError::SuspendPe,
    XmlError::ReservedPrefixXml,
    XmlError::ReservedPrefixXmlns,
    XmlError::ReservedNamespaceUri,
    XmlError::InvalidArgument,
    XmlError::NoBuffer,
    XmlError::AmplificationLimitBreach,
    XmlError::NotStarted,
];

impl XmlError {
    /// Numeric value of this code.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a code by its numeric value.
    pub fn from_code(code: i32) -> Option<XmlError> {
        usize::try_from(code).ok().and_then(|i| ALL.get(i).copied())
    }

    /// Human-readable message for this code.
    pub fn description(self) -> &'static str {
        match self {
            XmlError::None => "no error",
            XmlError::NoMemory => "out of memory",
            XmlError::Syntax => "syntax error",
            XmlError::NoElements => "no element found",
            XmlError::InvalidToken => "not well-formed (invalid token)",
            XmlError::UnclosedToken => "unclosed token",
            XmlError::PartialChar => "partial character",
            XmlError::TagMismatch => "mismatched tag",
            XmlError::DuplicateAttribute => "duplicate attribute",
            XmlError::JunkAfterDocElement => "junk after document element",
            XmlError::ParamEntityRef => "illegal parameter entity reference",
            XmlError::UndefinedEntity => "undefined entity",
            XmlError::RecursiveEntityRef => "recursive entity reference",
            XmlError::AsyncEntity => "asynchronous entity",
            XmlError::BadCharRef => "reference to invalid character number",
            XmlError::BinaryEntityRef => "reference to binary entity",
            XmlError::AttributeExternalEntityRef => "reference to external entity in attribute",
            XmlError::MisplacedXmlPi => "XML or text declaration not at start of entity",
            XmlError::UnknownEncoding => "unknown encoding",
            XmlError::IncorrectEncoding => "encoding specified in XML declaration is incorrect",
            XmlError::UnclosedCdataSection => "unclosed CDATA section",
            XmlError::ExternalEntityHandling => "error in processing external entity reference",
            XmlError::NotStandalone => "document is not standalone",
            XmlError::UnexpectedState => "unexpected parser state",
            XmlError::EntityDeclaredInPe => "entity declared in parameter entity",
            XmlError::FeatureRequiresXmlDtd => "requested feature requires DTD support",
            XmlError::CantChangeFeatureOnceParsing => "cannot change setting once parsing has begun",
            XmlError::UnboundPrefix => "unbound prefix",
            XmlError::UndeclaringPrefix => "must not undeclare prefix",
            XmlError::IncompletePe => "incomplete markup in parameter entity",
            XmlError::XmlDecl => "XML declaration not well-formed",
            XmlError::TextDecl => "text declaration not well-formed",
            XmlError::PublicId => "illegal character(s) in public id",
            XmlError::Suspended => "parser suspended",
            XmlError::NotSuspended => "parser not suspended",
            XmlError::Aborted => "parsing aborted",
            XmlError::Finished => "parsing finished",
            XmlError::SuspendPe => "cannot suspend in external parameter entity",
            XmlError::ReservedPrefixXml => {
                "reserved prefix (xml) must not be undeclared or bound to another namespace name"
            }
            XmlError::ReservedPrefixXmlns => {
                "reserved prefix (xmlns) must not be declared or undeclared"
            }
            XmlError::ReservedNamespaceUri => {
                "prefix must not be bound to one of the reserved namespace names"
            }
            XmlError::InvalidArgument => "invalid argument",
            XmlError::NoBuffer => "a successful prior call to get_buffer is required",
            XmlError::AmplificationLimitBreach => {
                "limit on input amplification factor (from DTD and entities) breached"
            }
            XmlError::NotStarted => "parser not started",
        }
    }
}

/// An error code together with where the parser stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} at line {line}, column {column}")]
pub struct ParseError {
    pub code: XmlError,
    /// 1-based line.
    pub line: u64,
    /// 0-based column, in characters.
    pub column: u64,
    /// Offset from the start of the document, in source bytes.
    pub byte_index: u64,
}

/// Failure of [`XmlParser::parse_reader`](crate::XmlParser::parse_reader).
#[derive(Debug, Error)]
pub enum ReadError {
    /// The reader itself failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes read were rejected by the parser.
    #[error("XML error: {0}")]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense() {
        for (i, e) in ALL.iter().enumerate() {
            assert_eq!(e.code() as usize, i);
            assert_eq!(XmlError::from_code(i as i32), Some(*e));
        }
        assert_eq!(XmlError::from_code(45), None);
        assert_eq!(XmlError::from_code(-1), None);
    }

    #[test]
    fn test_well_known_values() {
        assert_eq!(XmlError::TagMismatch.code(), 7);
        assert_eq!(XmlError::UnknownEncoding.code(), 18);
        assert_eq!(XmlError::Finished.code(), 36);
        assert_eq!(XmlError::TagMismatch.description(), "mismatched tag");
        assert_eq!(XmlError::None.to_string(), "no error");
    }

    #[test]
    fn test_xml_error_display() {
        let err: Box<dyn std::error::Error> = Box::new(XmlError::AmplificationLimitBreach);
        assert_eq!(err.to_string(), XmlError::AmplificationLimitBreach.description());
        assert!(err.source().is_none());
        assert_eq!(format!("{}", XmlError::TagMismatch), "mismatched tag");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            code: XmlError::NoElements,
            line: 3,
            column: 7,
            byte_index: 40,
        };
        assert_eq!(err.to_string(), "no element found at line 3, column 7");
    }
}
