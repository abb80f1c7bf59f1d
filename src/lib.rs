//! Streaming sinks for WebAssembly parse events.
//!
//! wasmsink sits downstream of a streaming binary parser: the parser decodes
//! a `.wasm` module into a sequence of typed [`event::Event`]s, and the two
//! sinks in this crate consume that sequence to produce output in either
//! direction:
//!
//! - [`emitter::Emitter`] -- re-emits the canonical binary byte stream
//!   (LEB128-encoded, section-framed, with back-patched size prefixes).
//! - [`disasm::Disassembler`] -- renders the canonical text format
//!   (S-expression `wat` syntax).
//!
//! # Modules
//!
//! - [`event`] -- The shared event vocabulary and the [`event::EventSource`]
//!   interface the sinks consume.
//! - [`encoding`] -- LEB128, patchable size slots, and IEEE 754 primitives.
//! - [`operator`] -- The operator model and its binary codec.
//! - [`emitter`] -- Binary emitter. Event stream in, `.wasm` bytes out.
//! - [`disasm`] -- Disassembler. Event stream in, `wat` text out.
//!
//! # Example
//!
//! Emit and disassemble an empty module:
//!
//! ```
//! use wasmsink::event::{Event, EventLog, ModuleHeader};
//! use wasmsink::emitter::Emitter;
//! use wasmsink::disasm::Disassembler;
//!
//! let events = vec![
//!     Event::BeginModule(ModuleHeader::default()),
//!     Event::EndModule,
//! ];
//!
//! let mut emitter = Emitter::new();
//! emitter.write(&mut EventLog::new(events.clone())).unwrap();
//! assert_eq!(
//!     emitter.take_data().unwrap(),
//!     b"\0asm\x01\x00\x00\x00".to_vec(),
//! );
//!
//! let text = Disassembler::new()
//!     .disassemble(&mut EventLog::new(events))
//!     .unwrap();
//! assert_eq!(text, "(module\n)\n");
//! ```
//!
//! # Scope
//!
//! The upstream byte-level parser is an external collaborator; this crate
//! only defines the interface it must satisfy ([`event::EventSource`]).
//! Neither sink validates the module: type checking, control-flow
//! well-formedness, execution, and transformation are all out of scope.
//! Both sinks target the WebAssembly MVP construct set
//! (binary version 1, single-byte opcodes).

pub mod disasm;
pub mod emitter;
pub mod encoding;
pub mod event;
pub mod operator;
