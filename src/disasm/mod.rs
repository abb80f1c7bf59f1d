//! Renders a parse-event stream as canonical WebAssembly text format.
//!
//! The disassembler is the text-producing sibling of
//! [`crate::emitter::Emitter`]: it pulls events from an
//! [`EventSource`] and appends `wat` S-expressions to a string buffer,
//! finalized when `EndModule` arrives.
//!
//! Names are synthesized from stable indices: `$type<n>` for type entries,
//! `$func<n>` for functions (imports first, then declared bodies),
//! `$global<n>`, `$table<n>`, and `$var<n>` for params and locals. The
//! printer tracks structured control flow (`block`/`loop`/`if`/`else`/
//! `end`) with a numeric indent level and a cached prefix string,
//! maintained in lockstep.
//!
//! Custom sections carry no text representation here and are skipped via
//! [`EventSource::skip_section`].
//!
//! # Example
//!
//! ```
//! use wasmsink::disasm::Disassembler;
//! use wasmsink::event::{Event, EventLog, ModuleHeader};
//!
//! let mut source = EventLog::new(vec![
//!     Event::BeginModule(ModuleHeader::default()),
//!     Event::EndModule,
//! ]);
//! let text = Disassembler::new().disassemble(&mut source).unwrap();
//! assert_eq!(text, "(module\n)\n");
//! ```

pub mod float;

use std::fmt::Write as _;

use thiserror::Error;

use crate::event::{
    type_name, Event, EventSource, ExternalKind, FunctionType, GlobalType, ImportKind,
    ParserError, ResizableLimits, SectionId,
};
use crate::operator::Operator;

// ===========================================================================
// Error type
// ===========================================================================

/// Errors that can occur during disassembly.
#[derive(Debug, Error)]
pub enum DisasmError {
    /// An event arrived that has no meaning at this point of the stream.
    #[error("unexpected {0} event in disassembly")]
    UnexpectedEvent(&'static str),

    /// A signature lookup referenced a type entry that never arrived.
    #[error("no type recorded for type index {0}")]
    UnknownTypeIndex(u32),

    /// A function body arrived without a matching function-section entry.
    #[error("no signature recorded for function body {0}")]
    UnknownFunctionSignature(u32),

    /// The stream ended before `EndModule`.
    #[error("event stream ended before the module was closed")]
    UnexpectedEndOfStream,

    /// The upstream parser reported a failure mid-stream.
    #[error("parser error: {0}")]
    Parser(#[from] ParserError),
}

// ===========================================================================
// Disassembler
// ===========================================================================

/// A streaming text-format writer.
///
/// Drive it with [`Disassembler::disassemble`]; the finalized text is
/// returned when the stream closes the module, and the instance resets
/// for the next one.
#[derive(Debug)]
pub struct Disassembler {
    out: String,

    // Signature bookkeeping: the type table, and the type index of each
    // declared function in order.
    types: Vec<FunctionType>,
    func_types: Vec<u32>,

    // Running counters defining the stable symbolic names.
    func_index: u32,
    import_count: u32,
    global_count: u32,
    table_count: u32,

    // Operator indentation: numeric level plus cached prefix string.
    indent: String,
    indent_level: u32,

    // Inside an init expression the implicit-terminator suppression of
    // function bodies does not apply.
    in_init_expression: bool,
}

impl Disassembler {
    pub fn new() -> Disassembler {
        Disassembler {
            out: String::new(),
            types: Vec::new(),
            func_types: Vec::new(),
            func_index: 0,
            import_count: 0,
            global_count: 0,
            table_count: 0,
            indent: String::new(),
            indent_level: 0,
            in_init_expression: false,
        }
    }

    /// Drains `source` until the module closes and returns the text.
    ///
    /// Parser failures surfaced through the stream abort disassembly and
    /// are returned unchanged; a stream that ends without `EndModule`
    /// fails with [`DisasmError::UnexpectedEndOfStream`].
    pub fn disassemble<S: EventSource>(&mut self, source: &mut S) -> Result<String, DisasmError> {
        while let Some(event) = source.read() {
            match event {
                Event::BeginSection(ref info) if info.id == SectionId::Custom => {
                    source.skip_section();
                }
                Event::EndModule => {
                    self.out.push_str(")\n");
                    let text = std::mem::take(&mut self.out);
                    *self = Disassembler::new();
                    return Ok(text);
                }
                Event::Error(error) => return Err(DisasmError::Parser(error)),
                event => self.handle(&event)?,
            }
        }
        Err(DisasmError::UnexpectedEndOfStream)
    }

    fn handle(&mut self, event: &Event) -> Result<(), DisasmError> {
        match event {
            Event::BeginModule(_) => {
                self.out.push_str("(module\n");
            }

            // Sections carry no text of their own; entries do.
            Event::BeginSection(_) | Event::EndSection => {}

            Event::TypeEntry(func_type) => {
                let index = self.types.len();
                let _ = write!(self.out, "  (type $type{index} (func");
                write_signature(&mut self.out, func_type, false);
                self.out.push_str("))\n");
                self.types.push(func_type.clone());
            }

            Event::ImportEntry(import) => match &import.kind {
                ImportKind::Function { type_index } => {
                    let func_type = self
                        .types
                        .get(*type_index as usize)
                        .ok_or(DisasmError::UnknownTypeIndex(*type_index))?;
                    let n = self.import_count;
                    self.import_count += 1;
                    let _ = write!(self.out, "  (import $func{n} ");
                    write_quoted(&mut self.out, &import.module);
                    self.out.push(' ');
                    write_quoted(&mut self.out, &import.field);
                    self.out.push_str(" (func");
                    write_signature(&mut self.out, func_type, false);
                    self.out.push_str("))\n");
                }
                ImportKind::Table(table_type) => {
                    let n = self.table_count;
                    self.table_count += 1;
                    self.out.push_str("  (import ");
                    write_quoted(&mut self.out, &import.module);
                    self.out.push(' ');
                    write_quoted(&mut self.out, &import.field);
                    let _ = write!(
                        self.out,
                        " (table $table{n} {} {}))\n",
                        limits_to_string(&table_type.limits),
                        type_name(table_type.element_type)
                    );
                }
                ImportKind::Memory(memory_type) => {
                    self.out.push_str("  (import ");
                    write_quoted(&mut self.out, &import.module);
                    self.out.push(' ');
                    write_quoted(&mut self.out, &import.field);
                    let _ = write!(
                        self.out,
                        " (memory {}))\n",
                        limits_to_string(&memory_type.limits)
                    );
                }
                ImportKind::Global(global_type) => {
                    let n = self.global_count;
                    self.global_count += 1;
                    self.out.push_str("  (import ");
                    write_quoted(&mut self.out, &import.module);
                    self.out.push(' ');
                    write_quoted(&mut self.out, &import.field);
                    let _ = write!(
                        self.out,
                        " (global $global{n} {}))\n",
                        global_type_to_string(global_type)
                    );
                }
            },

            Event::FunctionEntry(entry) => {
                self.func_types.push(entry.type_index);
            }

            Event::TableEntry(table_type) => {
                let n = self.table_count;
                self.table_count += 1;
                let _ = write!(
                    self.out,
                    "  (table $table{n} {} {})\n",
                    limits_to_string(&table_type.limits),
                    type_name(table_type.element_type)
                );
            }

            Event::MemoryEntry(memory_type) => {
                let _ = write!(self.out, "  (memory {})\n", limits_to_string(&memory_type.limits));
            }

            Event::ExportEntry(export) => {
                self.out.push_str("  (export ");
                write_quoted(&mut self.out, &export.field);
                let index = export.index;
                let _ = match export.kind {
                    ExternalKind::Function => write!(self.out, " $func{index})\n"),
                    ExternalKind::Table => write!(self.out, " (table $table{index}))\n"),
                    ExternalKind::Memory => write!(self.out, " memory)\n"),
                    ExternalKind::Global => write!(self.out, " (global $global{index}))\n"),
                };
            }

            Event::StartEntry { func_index } => {
                let _ = write!(self.out, "  (start $func{func_index})\n");
            }

            Event::BeginGlobalEntry(global_type) => {
                let n = self.global_count;
                self.global_count += 1;
                let _ = write!(
                    self.out,
                    "  (global $global{n} {}\n",
                    global_type_to_string(global_type)
                );
            }
            Event::EndGlobalEntry => {
                self.out.push_str("  )\n");
            }

            Event::BeginElementEntry { .. } => {
                self.out.push_str("  (elem\n");
            }
            Event::ElementBody(body) => {
                for func_index in &body.elements {
                    let _ = write!(self.out, "   $func{func_index}");
                }
                self.out.push('\n');
            }
            Event::EndElementEntry => {
                self.out.push_str("  )\n");
            }

            Event::BeginDataEntry { .. } => {
                self.out.push_str("  (data\n");
            }
            Event::DataBody(body) => {
                self.out.push_str("    ");
                write_quoted(&mut self.out, &body.data);
                self.out.push('\n');
            }
            Event::EndDataEntry => {
                self.out.push_str("  )\n");
            }

            Event::BeginInitExpression => {
                self.out.push_str("    (\n");
                self.indent = "      ".to_string();
                self.indent_level = 0;
                self.in_init_expression = true;
            }
            Event::InitExpressionOperator(op) => {
                self.print_operator(op);
            }
            Event::EndInitExpression => {
                self.out.push_str("    )\n");
                self.in_init_expression = false;
            }

            Event::BeginFunctionBody(info) => {
                let body_index = self.func_index;
                let type_index = *self
                    .func_types
                    .get(body_index as usize)
                    .ok_or(DisasmError::UnknownFunctionSignature(body_index))?;
                let func_type = self
                    .types
                    .get(type_index as usize)
                    .ok_or(DisasmError::UnknownTypeIndex(type_index))?;

                let symbol = self.import_count + body_index;
                let _ = write!(self.out, "  (func $func{symbol}");
                write_signature(&mut self.out, func_type, true);
                self.out.push('\n');

                // Local slots continue the $var numbering after the params.
                let mut slot = func_type.params.len() as u32;
                for (count, type_tag) in &info.locals {
                    for _ in 0..*count {
                        let _ = write!(self.out, "    (local $var{slot} {})\n", type_name(*type_tag));
                        slot += 1;
                    }
                }

                self.indent = "    ".to_string();
                self.indent_level = 0;
            }
            Event::CodeOperator(op) => {
                self.print_operator(op);
            }
            Event::EndFunctionBody => {
                self.func_index += 1;
                self.out.push_str("  )\n");
            }

            // Intercepted by the driver loop before dispatch.
            Event::EndModule | Event::Error(_) => {
                return Err(DisasmError::UnexpectedEvent(event.kind_name()));
            }
        }
        Ok(())
    }

    /// Prints one operator line, maintaining structured-control indent.
    ///
    /// `end`/`else` drop back one level before printing; `block`/`loop`/
    /// `if`/`else` push one level after. The `end` at level zero of a
    /// function body is the implicit body terminator and is not printed;
    /// inside init expressions every operator prints.
    fn print_operator(&mut self, op: &Operator) {
        if op.is_end() && self.indent_level == 0 && !self.in_init_expression {
            return;
        }
        if matches!(op, Operator::End | Operator::Else) && self.indent_level > 0 {
            self.decrease_indent();
        }
        self.out.push_str(&self.indent);
        let _ = write!(self.out, "{op}");
        self.out.push('\n');
        if matches!(
            op,
            Operator::Block { .. } | Operator::Loop { .. } | Operator::If { .. } | Operator::Else
        ) {
            self.increase_indent();
        }
    }

    fn increase_indent(&mut self) {
        self.indent.push_str("  ");
        self.indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        self.indent.truncate(self.indent.len() - 2);
        self.indent_level -= 1;
    }
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Text helpers
// ===========================================================================

/// Appends a signature to `out`: `(param …)` groups then a `(result …)`
/// group, each omitted when empty. With `named_params` every parameter
/// gets its own `(param $var<i> t)` group; otherwise one compact
/// `(param t …)` group is used.
fn write_signature(out: &mut String, func_type: &FunctionType, named_params: bool) {
    if !func_type.params.is_empty() {
        if named_params {
            for (i, tag) in func_type.params.iter().enumerate() {
                let _ = write!(out, " (param $var{i} {})", type_name(*tag));
            }
        } else {
            out.push_str(" (param");
            for tag in &func_type.params {
                let _ = write!(out, " {}", type_name(*tag));
            }
            out.push(')');
        }
    }
    if !func_type.returns.is_empty() {
        out.push_str(" (result");
        for tag in &func_type.returns {
            let _ = write!(out, " {}", type_name(*tag));
        }
        out.push(')');
    }
}

/// Formats table/memory limits: `initial` or `initial maximum`.
fn limits_to_string(limits: &ResizableLimits) -> String {
    match limits.maximum {
        Some(maximum) => format!("{} {}", limits.initial, maximum),
        None => format!("{}", limits.initial),
    }
}

/// Formats a global type: `t` for immutable, `(mut t)` for mutable.
fn global_type_to_string(global_type: &GlobalType) -> String {
    let name = type_name(global_type.content_type);
    if global_type.mutability != 0 {
        format!("(mut {name})")
    } else {
        name.to_string()
    }
}

/// Appends `bytes` to `out` as a double-quoted string, escaping control
/// bytes, non-ASCII bytes, `"`, and `\` as `\hh`.
fn write_quoted(out: &mut String, bytes: &[u8]) {
    out.push('"');
    for &byte in bytes {
        if byte < 0x20 || byte >= 0x7f || byte == b'"' || byte == b'\\' {
            let _ = write!(out, "\\{byte:02x}");
        } else {
            out.push(byte as char);
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{TAG_F64, TAG_I32};

    #[test]
    fn signature_forms() {
        let func_type = FunctionType::new(vec![TAG_I32, TAG_F64], vec![TAG_I32]);
        let mut compact = String::new();
        write_signature(&mut compact, &func_type, false);
        assert_eq!(compact, " (param i32 f64) (result i32)");

        let mut named = String::new();
        write_signature(&mut named, &func_type, true);
        assert_eq!(named, " (param $var0 i32) (param $var1 f64) (result i32)");

        let mut empty = String::new();
        write_signature(&mut empty, &FunctionType::new(vec![], vec![]), false);
        assert_eq!(empty, "");
    }

    #[test]
    fn limits_forms() {
        assert_eq!(
            limits_to_string(&ResizableLimits { initial: 1, maximum: None }),
            "1"
        );
        assert_eq!(
            limits_to_string(&ResizableLimits { initial: 1, maximum: Some(16) }),
            "1 16"
        );
    }

    #[test]
    fn global_type_forms() {
        assert_eq!(
            global_type_to_string(&GlobalType { content_type: TAG_I32, mutability: 0 }),
            "i32"
        );
        assert_eq!(
            global_type_to_string(&GlobalType { content_type: TAG_I32, mutability: 1 }),
            "(mut i32)"
        );
    }

    #[test]
    fn quoted_escaping() {
        let mut out = String::new();
        write_quoted(&mut out, b"hi");
        assert_eq!(out, "\"hi\"");

        let mut out = String::new();
        write_quoted(&mut out, &[0x00, b'"', b'\\', 0x7f, b'A']);
        assert_eq!(out, "\"\\00\\22\\5c\\7fA\"");
    }
}
