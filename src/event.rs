//! The shared parse-event vocabulary consumed by both sinks.
//!
//! A streaming binary parser walks a `.wasm` module and surfaces one
//! [`Event`] per structural step: module begin/end, section begin/end,
//! one event per section entry, one event per operator inside function
//! bodies and init expressions. The emitter and the disassembler both
//! consume this vocabulary through the [`EventSource`] interface.
//!
//! Payloads carry values exactly as the parser decoded them. In particular
//! value types stay raw signed tags ([`TypeTag`]): the sinks re-emit or
//! textualize tags without judging them, since module validation is the
//! business of a different tool.

use crate::operator::Operator;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Value-type tags
// ---------------------------------------------------------------------------

/// A value type as decoded from the binary: the signed LEB128 tag byte.
pub type TypeTag = i32;

/// 32-bit integer (`i32`), wire byte 0x7f.
pub const TAG_I32: TypeTag = -0x01;
/// 64-bit integer (`i64`), wire byte 0x7e.
pub const TAG_I64: TypeTag = -0x02;
/// 32-bit float (`f32`), wire byte 0x7d.
pub const TAG_F32: TypeTag = -0x03;
/// 64-bit float (`f64`), wire byte 0x7c.
pub const TAG_F64: TypeTag = -0x04;
/// Function reference element type (`anyfunc`), wire byte 0x70.
pub const TAG_ANYFUNC: TypeTag = -0x10;
/// Function type constructor form, wire byte 0x60.
pub const TAG_FUNC: TypeTag = -0x20;
/// Empty block type, wire byte 0x40.
pub const TAG_EMPTY_BLOCK: TypeTag = -0x40;

/// Returns the text-format name for a value-type tag.
///
/// Unknown tags render as `<invalid>` rather than failing: the sinks do
/// not validate, and an unknown tag in a position the text format cannot
/// express is still better surfaced than swallowed.
pub fn type_name(tag: TypeTag) -> &'static str {
    match tag {
        TAG_I32 => "i32",
        TAG_I64 => "i64",
        TAG_F32 => "f32",
        TAG_F64 => "f64",
        TAG_ANYFUNC => "anyfunc",
        TAG_FUNC => "func",
        _ => "<invalid>",
    }
}

// ---------------------------------------------------------------------------
// Section identifiers
// ---------------------------------------------------------------------------

/// Section id byte, one per known section kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
}

impl SectionId {
    /// The wire id byte for this section.
    pub fn code(self) -> u8 {
        match self {
            SectionId::Custom => 0,
            SectionId::Type => 1,
            SectionId::Import => 2,
            SectionId::Function => 3,
            SectionId::Table => 4,
            SectionId::Memory => 5,
            SectionId::Global => 6,
            SectionId::Export => 7,
            SectionId::Start => 8,
            SectionId::Element => 9,
            SectionId::Code => 10,
            SectionId::Data => 11,
        }
    }

    /// Decodes a section id byte.
    pub fn decode(byte: u8) -> Result<SectionId, UnknownKind> {
        match byte {
            0 => Ok(SectionId::Custom),
            1 => Ok(SectionId::Type),
            2 => Ok(SectionId::Import),
            3 => Ok(SectionId::Function),
            4 => Ok(SectionId::Table),
            5 => Ok(SectionId::Memory),
            6 => Ok(SectionId::Global),
            7 => Ok(SectionId::Export),
            8 => Ok(SectionId::Start),
            9 => Ok(SectionId::Element),
            10 => Ok(SectionId::Code),
            11 => Ok(SectionId::Data),
            _ => Err(UnknownKind::Section(byte)),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry payloads
// ---------------------------------------------------------------------------

/// Module preamble values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for ModuleHeader {
    fn default() -> Self {
        ModuleHeader {
            magic: 0x6d73_6100,
            version: 1,
        }
    }
}

/// Identity of the section being entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    pub id: SectionId,
    /// Section name; non-empty only for custom sections.
    pub name: Vec<u8>,
}

impl SectionInfo {
    pub fn new(id: SectionId) -> SectionInfo {
        SectionInfo { id, name: Vec::new() }
    }
}

/// A function signature from the type section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    /// Type constructor form tag ([`TAG_FUNC`] for function types).
    pub form: TypeTag,
    pub params: Vec<TypeTag>,
    pub returns: Vec<TypeTag>,
}

impl FunctionType {
    pub fn new(params: Vec<TypeTag>, returns: Vec<TypeTag>) -> FunctionType {
        FunctionType {
            form: TAG_FUNC,
            params,
            returns,
        }
    }
}

/// Limits of a table or memory (min, optional max).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizableLimits {
    pub initial: u32,
    pub maximum: Option<u32>,
}

/// A table declaration: element type plus limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub element_type: TypeTag,
    pub limits: ResizableLimits,
}

/// A memory declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: ResizableLimits,
}

/// A global declaration: content type plus mutability flag (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub content_type: TypeTag,
    pub mutability: u32,
}

/// The kind-specific payload of an import entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Function { type_index: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportKind {
    /// The wire kind byte for this import.
    pub fn code(&self) -> u8 {
        match self {
            ImportKind::Function { .. } => 0,
            ImportKind::Table(_) => 1,
            ImportKind::Memory(_) => 2,
            ImportKind::Global(_) => 3,
        }
    }
}

/// One entry of the import section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: Vec<u8>,
    pub field: Vec<u8>,
    pub kind: ImportKind,
}

/// The target namespace of an export entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    /// The wire kind byte.
    pub fn code(self) -> u8 {
        match self {
            ExternalKind::Function => 0,
            ExternalKind::Table => 1,
            ExternalKind::Memory => 2,
            ExternalKind::Global => 3,
        }
    }

    /// Decodes a kind byte. This is the parser-facing boundary where a
    /// malformed kind byte surfaces; past it, kinds are a closed sum.
    pub fn decode(byte: u8) -> Result<ExternalKind, UnknownKind> {
        match byte {
            0 => Ok(ExternalKind::Function),
            1 => Ok(ExternalKind::Table),
            2 => Ok(ExternalKind::Memory),
            3 => Ok(ExternalKind::Global),
            _ => Err(UnknownKind::External(byte)),
        }
    }
}

/// One entry of the export section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub field: Vec<u8>,
    pub kind: ExternalKind,
    pub index: u32,
}

/// One entry of the function section: the type index of a declared function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEntry {
    pub type_index: u32,
}

/// Locals declaration of a function body, in compressed (count, type) runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionInformation {
    pub locals: Vec<(u32, TypeTag)>,
}

/// Body of an element segment: the function indices it installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegmentBody {
    pub elements: Vec<u32>,
}

/// Body of a data segment: the raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegmentBody {
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Errors carried by the stream
// ---------------------------------------------------------------------------

/// A kind byte outside its defined range, reported at the decode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnknownKind {
    #[error("unknown section id: {0}")]
    Section(u8),
    #[error("unknown import/export kind: {0}")]
    External(u8),
}

/// A failure reported by the upstream parser, surfaced through the stream
/// as [`Event::Error`] and propagated to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParserError {
    pub message: String,
}

impl ParserError {
    pub fn new(message: impl Into<String>) -> ParserError {
        ParserError {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// The event stream
// ---------------------------------------------------------------------------

/// One parse event: the reader state tag together with its payload.
///
/// The sinks dispatch on the variant; each handler takes the payload it
/// knows by value, with no downcasting anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginModule(ModuleHeader),
    EndModule,

    BeginSection(SectionInfo),
    EndSection,

    TypeEntry(FunctionType),
    ImportEntry(ImportEntry),
    FunctionEntry(FunctionEntry),
    TableEntry(TableType),
    MemoryEntry(MemoryType),
    ExportEntry(ExportEntry),
    StartEntry { func_index: u32 },

    BeginFunctionBody(FunctionInformation),
    CodeOperator(Operator),
    EndFunctionBody,

    BeginGlobalEntry(GlobalType),
    EndGlobalEntry,

    BeginElementEntry { index: u32 },
    ElementBody(ElementSegmentBody),
    EndElementEntry,

    BeginDataEntry { index: u32 },
    DataBody(DataSegmentBody),
    EndDataEntry,

    BeginInitExpression,
    InitExpressionOperator(Operator),
    EndInitExpression,

    Error(ParserError),
}

impl Event {
    /// Short name of the event kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::BeginModule(_) => "BeginModule",
            Event::EndModule => "EndModule",
            Event::BeginSection(_) => "BeginSection",
            Event::EndSection => "EndSection",
            Event::TypeEntry(_) => "TypeEntry",
            Event::ImportEntry(_) => "ImportEntry",
            Event::FunctionEntry(_) => "FunctionEntry",
            Event::TableEntry(_) => "TableEntry",
            Event::MemoryEntry(_) => "MemoryEntry",
            Event::ExportEntry(_) => "ExportEntry",
            Event::StartEntry { .. } => "StartEntry",
            Event::BeginFunctionBody(_) => "BeginFunctionBody",
            Event::CodeOperator(_) => "CodeOperator",
            Event::EndFunctionBody => "EndFunctionBody",
            Event::BeginGlobalEntry(_) => "BeginGlobalEntry",
            Event::EndGlobalEntry => "EndGlobalEntry",
            Event::BeginElementEntry { .. } => "BeginElementEntry",
            Event::ElementBody(_) => "ElementBody",
            Event::EndElementEntry => "EndElementEntry",
            Event::BeginDataEntry { .. } => "BeginDataEntry",
            Event::DataBody(_) => "DataBody",
            Event::EndDataEntry => "EndDataEntry",
            Event::BeginInitExpression => "BeginInitExpression",
            Event::InitExpressionOperator(_) => "InitExpressionOperator",
            Event::EndInitExpression => "EndInitExpression",
            Event::Error(_) => "Error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}

// ---------------------------------------------------------------------------
// The consumed reader interface
// ---------------------------------------------------------------------------

/// The interface the sinks consume events through.
///
/// A streaming parser implements this over its input buffer; [`EventLog`]
/// implements it over an already-decoded event list. `read` pulls the next
/// event, returning `None` when the stream cannot advance (input exhausted
/// or more bytes needed -- the caller decides which by `has_more_bytes`).
pub trait EventSource {
    /// Advances the stream and returns the next event.
    fn read(&mut self) -> Option<Event>;

    /// True when unconsumed input remains.
    fn has_more_bytes(&self) -> bool;

    /// Seeks past the remainder of the current section, consuming events
    /// up to and including the matching [`Event::EndSection`].
    fn skip_section(&mut self);
}

/// An [`EventSource`] over a pre-recorded event list.
///
/// Useful for tests and for callers that hold a fully decoded module and
/// want to replay it through a sink.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    pos: usize,
}

impl EventLog {
    pub fn new(events: Vec<Event>) -> EventLog {
        EventLog { events, pos: 0 }
    }

    /// Number of events not yet read.
    pub fn remaining(&self) -> usize {
        self.events.len() - self.pos
    }
}

impl EventSource for EventLog {
    fn read(&mut self) -> Option<Event> {
        let event = self.events.get(self.pos)?.clone();
        self.pos += 1;
        Some(event)
    }

    fn has_more_bytes(&self) -> bool {
        self.pos < self.events.len()
    }

    fn skip_section(&mut self) {
        while let Some(event) = self.read() {
            if matches!(event, Event::EndSection) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_kind_decode() {
        assert_eq!(ExternalKind::decode(0).unwrap(), ExternalKind::Function);
        assert_eq!(ExternalKind::decode(3).unwrap(), ExternalKind::Global);
        assert!(ExternalKind::decode(4).is_err());
    }

    #[test]
    fn section_id_round_trip() {
        for byte in 0u8..=11 {
            assert_eq!(SectionId::decode(byte).unwrap().code(), byte);
        }
        assert!(SectionId::decode(12).is_err());
    }

    #[test]
    fn type_names() {
        assert_eq!(type_name(TAG_I32), "i32");
        assert_eq!(type_name(TAG_F64), "f64");
        assert_eq!(type_name(TAG_ANYFUNC), "anyfunc");
        assert_eq!(type_name(0x7f), "<invalid>");
    }

    #[test]
    fn event_log_skip_section() {
        let mut log = EventLog::new(vec![
            Event::BeginSection(SectionInfo::new(SectionId::Custom)),
            Event::EndSection,
            Event::BeginSection(SectionInfo::new(SectionId::Type)),
        ]);
        assert!(matches!(log.read(), Some(Event::BeginSection(_))));
        log.skip_section();
        match log.read() {
            Some(Event::BeginSection(info)) => assert_eq!(info.id, SectionId::Type),
            other => panic!("expected type section, got {other:?}"),
        }
        assert!(!log.has_more_bytes());
    }
}
