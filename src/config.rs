//! Parser configuration
//!
//! - `ParserConfig` - creation options (encoding override, namespace separator)
//! - `EventKind` - the event kinds that can be routed to a handler
//! - `EventMask` - a set of enabled kinds, filled in by `on_post_create`

/// Options for creating a parser engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Encoding that overrides detection; `None` autodetects
    pub encoding: Option<String>,
    /// Turns on namespace processing; names are reported as `uri + sep + local`
    pub namespace_separator: Option<char>,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the document encoding. An empty name means autodetect.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        let encoding = encoding.into();
        self.encoding = (!encoding.is_empty()).then_some(encoding);
        self
    }

    /// Enable namespace processing. `'\0'` leaves it off.
    pub fn with_namespace_separator(mut self, separator: char) -> Self {
        self.namespace_separator = (separator != '\0').then_some(separator);
        self
    }
}

/// An event kind that can be enabled on a parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartElement,
    EndElement,
    CharacterData,
    ProcessingInstruction,
    Comment,
    StartCdataSection,
    EndCdataSection,
    Default,
    UnknownEncoding,
    StartNamespaceDecl,
    EndNamespaceDecl,
    XmlDecl,
    StartDoctypeDecl,
    EndDoctypeDecl,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::StartElement,
        EventKind::EndElement,
        EventKind::CharacterData,
        EventKind::ProcessingInstruction,
        EventKind::Comment,
        EventKind::StartCdataSection,
        EventKind::EndCdataSection,
        EventKind::Default,
        EventKind::UnknownEncoding,
        EventKind::StartNamespaceDecl,
        EventKind::EndNamespaceDecl,
        EventKind::XmlDecl,
        EventKind::StartDoctypeDecl,
        EventKind::EndDoctypeDecl,
    ];

    /// snake_case name, as used by the NIF layer
    pub fn name(self) -> &'static str {
        match self {
            EventKind::StartElement => "start_element",
            EventKind::EndElement => "end_element",
            EventKind::CharacterData => "character_data",
            EventKind::ProcessingInstruction => "processing_instruction",
            EventKind::Comment => "comment",
            EventKind::StartCdataSection => "start_cdata_section",
            EventKind::EndCdataSection => "end_cdata_section",
            EventKind::Default => "default",
            EventKind::UnknownEncoding => "unknown_encoding",
            EventKind::StartNamespaceDecl => "start_namespace_decl",
            EventKind::EndNamespaceDecl => "end_namespace_decl",
            EventKind::XmlDecl => "xml_decl",
            EventKind::StartDoctypeDecl => "start_doctype_decl",
            EventKind::EndDoctypeDecl => "end_doctype_decl",
        }
    }

    pub fn from_name(name: &str) -> Option<EventKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[inline]
    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of enabled event kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventMask {
    bits: u16,
    default_expand: bool,
}

impl EventMask {
    /// Empty mask
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kind enabled, default handler in non-expanding mode
    pub fn all() -> Self {
        let mut mask = Self::new();
        for kind in EventKind::ALL {
            mask.enable(kind);
        }
        mask
    }

    pub fn enable(&mut self, kind: EventKind) -> &mut Self {
        self.set(kind, true)
    }

    pub fn disable(&mut self, kind: EventKind) -> &mut Self {
        self.set(kind, false)
    }

    pub fn set(&mut self, kind: EventKind, on: bool) -> &mut Self {
        if on {
            self.bits |= kind.bit();
        } else {
            self.bits &= !kind.bit();
        }
        self
    }

    #[inline]
    pub fn is_enabled(&self, kind: EventKind) -> bool {
        self.bits & kind.bit() != 0
    }

    /// Whether internal entities are expanded while the default handler is on
    pub fn set_default_expand(&mut self, expand: bool) -> &mut Self {
        self.default_expand = expand;
        self
    }

    #[inline]
    pub fn default_expand(&self) -> bool {
        self.default_expand
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Enabled kinds in declaration order
    pub fn iter(&self) -> impl Iterator<Item = EventKind> + '_ {
        EventKind::ALL.into_iter().filter(move |&kind| self.is_enabled(kind))
    }
}
