//! Encodes a parse-event stream back to WebAssembly binary format (`.wasm`).
//!
//! The emitter is a streaming writer driven by [`Event`]s. Sections and
//! function bodies are length-prefixed with LEB128, but their lengths are
//! only knowable after the contents have been written; the emitter reserves
//! a fixed five-byte patchable slot for every such prefix and back-patches
//! it in place, keeping emission single-pass (see
//! [`encoding::write_patchable_vu32`]). The resulting modules are slightly
//! larger than minimally encoded ones (up to four bytes per patched slot)
//! but byte-for-byte deterministic.
//!
//! Event ordering is enforced by an explicit state machine: every event is
//! checked against the current [`EmitterState`], and anything out of place
//! fails with [`EmitError::UnexpectedState`]. A failed emitter is poisoned;
//! callers must discard it.
//!
//! # Binary format overview
//!
//! A WebAssembly binary begins with a magic number (`\0asm`) and version
//! (1), followed by sections in module order. Each section is encoded as:
//!
//! ```text
//! section_id: u8 | byte_length: vu32 | contents: byte*
//! ```
//!
//! and each supported section's contents are a vu32 entry count followed
//! by that many entries (the start section, which holds a bare function
//! index, is the one exception).
//!
//! # Example
//!
//! ```
//! use wasmsink::emitter::Emitter;
//! use wasmsink::event::{Event, EventLog, ModuleHeader};
//!
//! let mut emitter = Emitter::new();
//! let mut source = EventLog::new(vec![
//!     Event::BeginModule(ModuleHeader::default()),
//!     Event::EndModule,
//! ]);
//! emitter.write(&mut source).unwrap();
//! assert_eq!(emitter.take_data().unwrap(), b"\0asm\x01\x00\x00\x00");
//! ```

use thiserror::Error;

use crate::encoding::{
    self, patch_vu32, write_patchable_vu32, write_u8vec, write_vu1, write_vu32, write_vs32,
};
use crate::event::{
    Event, EventSource, FunctionType, GlobalType, ImportKind, ParserError, ResizableLimits,
    SectionId, SectionInfo, TableType,
};
use crate::operator::Operator;

// ===========================================================================
// Error type
// ===========================================================================

/// Errors that can occur during emission.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Event received is not legal in the current emitter state.
    #[error("unexpected {event} event in emitter state {state:?}")]
    UnexpectedState {
        state: EmitterState,
        event: &'static str,
    },

    /// A function body or init expression was closed without a trailing
    /// `end` operator.
    #[error("body not terminated by an `end` operator")]
    MissingEndOperator,

    /// The section kind has no emitter support (custom sections carry raw
    /// payloads the event vocabulary cannot express).
    #[error("section not supported by the emitter: {0:?}")]
    UnsupportedSection(SectionId),

    /// A section or body grew past what a patchable u32 slot can hold.
    #[error("patched size exceeds u32 range: {0}")]
    SizeOverflow(usize),

    /// The upstream parser reported a failure mid-stream.
    #[error("parser error: {0}")]
    Parser(#[from] ParserError),
}

// ===========================================================================
// States
// ===========================================================================

/// The emitter's position in the module grammar.
///
/// One closed sum, one value at a time; each event handler matches the
/// current state totally, so the legal-event table of the format lives in
/// a single `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Initial,
    Error,
    Module,
    TypeSection,
    ImportSection,
    FunctionSection,
    TableSection,
    MemorySection,
    GlobalSection,
    ExportSection,
    StartSection,
    ElementSection,
    CodeSection,
    DataSection,
    FunctionBody,
    GlobalEntry,
    GlobalEntryEnd,
    ElementEntry,
    ElementEntryBody,
    ElementEntryEnd,
    DataEntry,
    DataEntryBody,
    DataEntryEnd,
    InitExpression,
}

// ===========================================================================
// Emitter
// ===========================================================================

/// A streaming binary emitter.
///
/// Feed it events via [`Emitter::write`] (drains an [`EventSource`]) or
/// [`Emitter::write_event`] (one event at a time). The finalized module
/// bytes become available from [`Emitter::take_data`] once `EndModule`
/// has been processed.
#[derive(Debug)]
pub struct Emitter {
    buffer: Vec<u8>,
    state: EmitterState,

    // Current section bookkeeping. `section_start` is the position right
    // after the size slot, so the patched size covers the entries-count
    // slot and everything written since.
    section_start: usize,
    section_size_pos: usize,
    entries_count: u32,
    entries_count_pos: Option<usize>,

    // Current function body bookkeeping.
    body_start: usize,
    body_size_pos: usize,

    // Whether the most recent operator written was `end`; required before
    // a body or init expression may close.
    end_written: bool,

    // State to restore once the current init expression closes.
    init_expression_after: EmitterState,

    // Finalized output, populated at EndModule.
    data: Option<Vec<u8>>,
}

impl Emitter {
    pub fn new() -> Emitter {
        Emitter {
            buffer: Vec::new(),
            state: EmitterState::Initial,
            section_start: 0,
            section_size_pos: 0,
            entries_count: 0,
            entries_count_pos: None,
            body_start: 0,
            body_size_pos: 0,
            end_written: false,
            init_expression_after: EmitterState::Error,
            data: None,
        }
    }

    /// The current emitter state.
    pub fn state(&self) -> EmitterState {
        self.state
    }

    /// Takes the finalized module bytes. `None` until `EndModule` has been
    /// processed; taking the data arms the emitter for a fresh module.
    pub fn take_data(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }

    /// Drains `source`, emitting every event until `EndModule` or stream
    /// end. Parser failures surfaced through the stream abort emission.
    pub fn write<S: EventSource>(&mut self, source: &mut S) -> Result<(), EmitError> {
        while let Some(event) = source.read() {
            let done = matches!(event, Event::EndModule);
            self.write_event(&event)?;
            if done {
                break;
            }
        }
        Ok(())
    }

    /// Emits a single event.
    ///
    /// This is the whole state machine: one total match over
    /// (current state, event). Any pair outside the table poisons the
    /// emitter and fails with [`EmitError::UnexpectedState`].
    pub fn write_event(&mut self, event: &Event) -> Result<(), EmitError> {
        use EmitterState as S;

        match (self.state, event) {
            (_, Event::Error(error)) => {
                self.state = S::Error;
                return Err(EmitError::Parser(error.clone()));
            }

            (S::Initial, Event::BeginModule(_)) => {
                self.buffer.extend_from_slice(&encoding::MAGIC);
                self.buffer.extend_from_slice(&encoding::VERSION.to_le_bytes());
                self.state = S::Module;
            }
            (S::Module, Event::EndModule) => {
                self.data = Some(std::mem::take(&mut self.buffer));
                self.state = S::Initial;
            }

            (S::Module, Event::BeginSection(info)) => {
                self.begin_section(info)?;
            }
            (
                S::TypeSection
                | S::ImportSection
                | S::FunctionSection
                | S::TableSection
                | S::MemorySection
                | S::GlobalSection
                | S::ExportSection
                | S::StartSection
                | S::ElementSection
                | S::CodeSection
                | S::DataSection,
                Event::EndSection,
            ) => {
                self.end_section()?;
            }

            // -- Flat section entries --
            (S::TypeSection, Event::TypeEntry(func_type)) => {
                self.entries_count += 1;
                write_function_type(&mut self.buffer, func_type);
            }
            (S::ImportSection, Event::ImportEntry(import)) => {
                self.entries_count += 1;
                write_u8vec(&mut self.buffer, &import.module);
                write_u8vec(&mut self.buffer, &import.field);
                self.buffer.push(import.kind.code());
                match &import.kind {
                    ImportKind::Function { type_index } => {
                        write_vu32(&mut self.buffer, *type_index);
                    }
                    ImportKind::Table(table_type) => {
                        write_table_type(&mut self.buffer, table_type);
                    }
                    ImportKind::Memory(memory_type) => {
                        write_limits(&mut self.buffer, &memory_type.limits);
                    }
                    ImportKind::Global(global_type) => {
                        write_global_type(&mut self.buffer, global_type);
                    }
                }
            }
            (S::FunctionSection, Event::FunctionEntry(entry)) => {
                self.entries_count += 1;
                write_vu32(&mut self.buffer, entry.type_index);
            }
            (S::TableSection, Event::TableEntry(table_type)) => {
                self.entries_count += 1;
                write_table_type(&mut self.buffer, table_type);
            }
            (S::MemorySection, Event::MemoryEntry(memory_type)) => {
                self.entries_count += 1;
                write_limits(&mut self.buffer, &memory_type.limits);
            }
            (S::ExportSection, Event::ExportEntry(export)) => {
                self.entries_count += 1;
                write_u8vec(&mut self.buffer, &export.field);
                self.buffer.push(export.kind.code());
                write_vu32(&mut self.buffer, export.index);
            }
            (S::StartSection, Event::StartEntry { func_index }) => {
                write_vu32(&mut self.buffer, *func_index);
            }

            // -- Function bodies --
            (S::CodeSection, Event::BeginFunctionBody(info)) => {
                self.entries_count += 1;
                self.body_size_pos = write_patchable_vu32(&mut self.buffer);
                self.body_start = self.buffer.len();
                self.end_written = false;
                write_vu32(&mut self.buffer, info.locals.len() as u32);
                for (count, type_tag) in &info.locals {
                    write_vu32(&mut self.buffer, *count);
                    write_vs32(&mut self.buffer, *type_tag);
                }
                self.state = S::FunctionBody;
            }
            (S::FunctionBody, Event::CodeOperator(op)) => {
                self.write_operator(op);
            }
            (S::FunctionBody, Event::EndFunctionBody) => {
                if !self.end_written {
                    self.state = S::Error;
                    return Err(EmitError::MissingEndOperator);
                }
                let size = self.span_from(self.body_start)?;
                patch_vu32(&mut self.buffer, self.body_size_pos, size);
                self.state = S::CodeSection;
            }

            // -- Global entries --
            (S::GlobalSection, Event::BeginGlobalEntry(global_type)) => {
                self.entries_count += 1;
                write_global_type(&mut self.buffer, global_type);
                self.state = S::GlobalEntry;
            }
            (S::GlobalEntry, Event::BeginInitExpression) => {
                self.begin_init_expression(S::GlobalEntryEnd);
            }
            (S::GlobalEntryEnd, Event::EndGlobalEntry) => {
                self.state = S::GlobalSection;
            }

            // -- Element entries --
            (S::ElementSection, Event::BeginElementEntry { index }) => {
                self.entries_count += 1;
                write_vu32(&mut self.buffer, *index);
                self.state = S::ElementEntry;
            }
            (S::ElementEntry, Event::BeginInitExpression) => {
                self.begin_init_expression(S::ElementEntryBody);
            }
            (S::ElementEntryBody, Event::ElementBody(body)) => {
                write_vu32(&mut self.buffer, body.elements.len() as u32);
                for func_index in &body.elements {
                    write_vu32(&mut self.buffer, *func_index);
                }
                self.state = S::ElementEntryEnd;
            }
            (S::ElementEntryEnd, Event::EndElementEntry) => {
                self.state = S::ElementSection;
            }

            // -- Data entries --
            (S::DataSection, Event::BeginDataEntry { index }) => {
                self.entries_count += 1;
                write_vu32(&mut self.buffer, *index);
                self.state = S::DataEntry;
            }
            (S::DataEntry, Event::BeginInitExpression) => {
                self.begin_init_expression(S::DataEntryBody);
            }
            (S::DataEntryBody, Event::DataBody(body)) => {
                write_u8vec(&mut self.buffer, &body.data);
                self.state = S::DataEntryEnd;
            }
            (S::DataEntryEnd, Event::EndDataEntry) => {
                self.state = S::DataSection;
            }

            // -- Init expressions --
            // Readers differ on whether operators inside an init expression
            // arrive tagged as init-expression or plain code operators;
            // both encode identically, so both are accepted.
            (S::InitExpression, Event::InitExpressionOperator(op) | Event::CodeOperator(op)) => {
                self.write_operator(op);
            }
            (S::InitExpression, Event::EndInitExpression) => {
                if !self.end_written {
                    self.state = S::Error;
                    return Err(EmitError::MissingEndOperator);
                }
                self.state = self.init_expression_after;
            }

            (state, event) => {
                self.state = S::Error;
                return Err(EmitError::UnexpectedState {
                    state,
                    event: event.kind_name(),
                });
            }
        }
        Ok(())
    }

    // -- Section framing ----------------------------------------------------

    fn begin_section(&mut self, info: &SectionInfo) -> Result<(), EmitError> {
        use EmitterState as S;

        let next_state = match info.id {
            SectionId::Type => S::TypeSection,
            SectionId::Import => S::ImportSection,
            SectionId::Function => S::FunctionSection,
            SectionId::Table => S::TableSection,
            SectionId::Memory => S::MemorySection,
            SectionId::Global => S::GlobalSection,
            SectionId::Export => S::ExportSection,
            SectionId::Start => S::StartSection,
            SectionId::Element => S::ElementSection,
            SectionId::Code => S::CodeSection,
            SectionId::Data => S::DataSection,
            SectionId::Custom => {
                self.state = S::Error;
                return Err(EmitError::UnsupportedSection(info.id));
            }
        };

        write_vu32(&mut self.buffer, info.id.code() as u32);
        self.section_size_pos = write_patchable_vu32(&mut self.buffer);
        self.section_start = self.buffer.len();
        self.entries_count = 0;
        // The start section's payload is a bare function index, not an
        // entry vector; every other section gets a patchable count.
        self.entries_count_pos = if info.id == SectionId::Start {
            None
        } else {
            Some(write_patchable_vu32(&mut self.buffer))
        };
        self.state = next_state;
        Ok(())
    }

    fn end_section(&mut self) -> Result<(), EmitError> {
        if let Some(count_pos) = self.entries_count_pos {
            patch_vu32(&mut self.buffer, count_pos, self.entries_count);
        }
        let size = self.span_from(self.section_start)?;
        patch_vu32(&mut self.buffer, self.section_size_pos, size);
        self.state = EmitterState::Module;
        Ok(())
    }

    fn begin_init_expression(&mut self, after: EmitterState) {
        self.init_expression_after = after;
        self.end_written = false;
        self.state = EmitterState::InitExpression;
    }

    fn write_operator(&mut self, op: &Operator) {
        op.encode_into(&mut self.buffer);
        self.end_written = op.is_end();
    }

    /// Bytes written since `start`, checked into patchable range.
    fn span_from(&mut self, start: usize) -> Result<u32, EmitError> {
        let span = self.buffer.len() - start;
        u32::try_from(span).map_err(|_| {
            self.state = EmitterState::Error;
            EmitError::SizeOverflow(span)
        })
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Entry encoding helpers (shared by section entries and import payloads)
// ===========================================================================

/// Encodes a function type: form tag, parameter vector, return vector.
///
/// ```text
/// functype ::= form:vs32 vec(valtype) vec(valtype)
/// ```
fn write_function_type(buf: &mut Vec<u8>, func_type: &FunctionType) {
    write_vs32(buf, func_type.form);
    write_vu32(buf, func_type.params.len() as u32);
    for param in &func_type.params {
        write_vs32(buf, *param);
    }
    write_vu32(buf, func_type.returns.len() as u32);
    for ret in &func_type.returns {
        write_vs32(buf, *ret);
    }
}

/// Encodes limits (flags, min, optional max).
///
/// ```text
/// limits ::= 0x00 min:vu32 | 0x01 min:vu32 max:vu32
/// ```
fn write_limits(buf: &mut Vec<u8>, limits: &ResizableLimits) {
    match limits.maximum {
        Some(maximum) => {
            write_vu1(buf, true);
            write_vu32(buf, limits.initial);
            write_vu32(buf, maximum);
        }
        None => {
            write_vu1(buf, false);
            write_vu32(buf, limits.initial);
        }
    }
}

/// Encodes a table type: element type tag plus limits.
fn write_table_type(buf: &mut Vec<u8>, table_type: &TableType) {
    write_vs32(buf, table_type.element_type);
    write_limits(buf, &table_type.limits);
}

/// Encodes a global type: content type tag plus mutability flag.
fn write_global_type(buf: &mut Vec<u8>, global_type: &GlobalType) {
    write_vs32(buf, global_type.content_type);
    write_vu1(buf, global_type.mutability != 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FunctionInformation, ModuleHeader};

    #[test]
    fn empty_module() {
        let mut emitter = Emitter::new();
        emitter
            .write_event(&Event::BeginModule(ModuleHeader::default()))
            .unwrap();
        emitter.write_event(&Event::EndModule).unwrap();
        assert_eq!(
            emitter.take_data().unwrap(),
            vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(emitter.state(), EmitterState::Initial);
    }

    #[test]
    fn rejects_events_out_of_order() {
        let mut emitter = Emitter::new();
        let err = emitter.write_event(&Event::EndSection).unwrap_err();
        assert!(matches!(
            err,
            EmitError::UnexpectedState {
                state: EmitterState::Initial,
                event: "EndSection"
            }
        ));
        // Poisoned: even a legal opening event now fails.
        assert!(emitter
            .write_event(&Event::BeginModule(ModuleHeader::default()))
            .is_err());
    }

    #[test]
    fn rejects_custom_sections() {
        let mut emitter = Emitter::new();
        emitter
            .write_event(&Event::BeginModule(ModuleHeader::default()))
            .unwrap();
        let err = emitter
            .write_event(&Event::BeginSection(SectionInfo {
                id: SectionId::Custom,
                name: b"name".to_vec(),
            }))
            .unwrap_err();
        assert!(matches!(err, EmitError::UnsupportedSection(SectionId::Custom)));
    }

    #[test]
    fn missing_end_operator_is_rejected() {
        let mut emitter = Emitter::new();
        emitter
            .write_event(&Event::BeginModule(ModuleHeader::default()))
            .unwrap();
        emitter
            .write_event(&Event::BeginSection(SectionInfo::new(SectionId::Code)))
            .unwrap();
        emitter
            .write_event(&Event::BeginFunctionBody(FunctionInformation::default()))
            .unwrap();
        emitter
            .write_event(&Event::CodeOperator(Operator::Nop))
            .unwrap();
        let err = emitter.write_event(&Event::EndFunctionBody).unwrap_err();
        assert!(matches!(err, EmitError::MissingEndOperator));
        // No EndModule fired: nothing is observable from the caller's side.
        assert!(emitter.take_data().is_none());
    }
}
