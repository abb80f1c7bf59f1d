//! Emitter tests: framing, entry encodings, and negative tests.
//!
//! Testing strategy: expected byte sequences are built with the same
//! five-byte patchable LEB128 form the emitter uses for size and count
//! prefixes, so assertions are exact byte-for-byte comparisons rather
//! than LEB128-tolerant ones.

#[cfg(test)]
mod tests {
    use wasmsink::emitter::{EmitError, Emitter, EmitterState};
    use wasmsink::event::{
        DataSegmentBody, ElementSegmentBody, Event, EventLog, ExportEntry, ExternalKind,
        FunctionEntry, FunctionInformation, FunctionType, GlobalType, ImportEntry, ImportKind,
        MemoryType, ModuleHeader, ParserError, ResizableLimits, SectionId, SectionInfo, TableType,
        TAG_ANYFUNC, TAG_F32, TAG_I32, TAG_I64,
    };
    use wasmsink::operator::{Int64, MemoryImmediate, Operator};

    // =======================================================================
    // Helpers
    // =======================================================================

    /// Drives a fresh emitter over `events` and returns the module bytes.
    fn emit(events: Vec<Event>) -> Vec<u8> {
        let mut emitter = Emitter::new();
        emitter
            .write(&mut EventLog::new(events))
            .unwrap_or_else(|e| panic!("emission failed: {e}"));
        emitter.take_data().expect("no data after EndModule")
    }

    /// The five-byte padded LEB128 encoding the emitter back-patches.
    fn patched(v: u32) -> Vec<u8> {
        vec![
            0x80 | (v & 0x7f) as u8,
            0x80 | ((v >> 7) & 0x7f) as u8,
            0x80 | ((v >> 14) & 0x7f) as u8,
            0x80 | ((v >> 21) & 0x7f) as u8,
            ((v >> 28) & 0x0f) as u8,
        ]
    }

    /// Module preamble: magic plus version 1.
    fn preamble() -> Vec<u8> {
        vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]
    }

    /// Wraps section contents (entries only) in id, patched size, and
    /// patched entry count.
    fn section(id: u8, entry_count: u32, entries: &[u8]) -> Vec<u8> {
        let mut bytes = vec![id];
        bytes.extend(patched(5 + entries.len() as u32));
        bytes.extend(patched(entry_count));
        bytes.extend_from_slice(entries);
        bytes
    }

    fn begin_module() -> Event {
        Event::BeginModule(ModuleHeader::default())
    }

    fn begin_section(id: SectionId) -> Event {
        Event::BeginSection(SectionInfo::new(id))
    }

    // =======================================================================
    // Module framing
    // =======================================================================

    #[test]
    fn empty_module() {
        let bytes = emit(vec![begin_module(), Event::EndModule]);
        assert_eq!(bytes, preamble());
    }

    #[test]
    fn empty_section_patches_zero_count() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Type),
            Event::EndSection,
            Event::EndModule,
        ]);
        let mut expected = preamble();
        expected.extend(section(1, 0, &[]));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn emitter_resets_after_take_data() {
        let events = vec![
            begin_module(),
            begin_section(SectionId::Memory),
            Event::MemoryEntry(MemoryType {
                limits: ResizableLimits {
                    initial: 1,
                    maximum: Some(16),
                },
            }),
            Event::EndSection,
            Event::EndModule,
        ];

        let mut emitter = Emitter::new();
        emitter.write(&mut EventLog::new(events.clone())).unwrap();
        let first = emitter.take_data().unwrap();

        emitter.write(&mut EventLog::new(events)).unwrap();
        let second = emitter.take_data().unwrap();

        assert_eq!(first, second, "emitter should be reusable after take_data");
        assert_eq!(emitter.state(), EmitterState::Initial);
    }

    #[test]
    fn data_is_unavailable_until_end_module() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        assert!(emitter.take_data().is_none());
        emitter.write_event(&Event::EndModule).unwrap();
        assert!(emitter.take_data().is_some());
    }

    // =======================================================================
    // Identity function module (type + function + export + code)
    // =======================================================================

    #[test]
    fn identity_function_module() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Type),
            Event::TypeEntry(FunctionType::new(vec![TAG_I32], vec![TAG_I32])),
            Event::EndSection,
            begin_section(SectionId::Function),
            Event::FunctionEntry(FunctionEntry { type_index: 0 }),
            Event::EndSection,
            begin_section(SectionId::Export),
            Event::ExportEntry(ExportEntry {
                field: b"id".to_vec(),
                kind: ExternalKind::Function,
                index: 0,
            }),
            Event::EndSection,
            begin_section(SectionId::Code),
            Event::BeginFunctionBody(FunctionInformation::default()),
            Event::CodeOperator(Operator::GetLocal { local_index: 0 }),
            Event::CodeOperator(Operator::End),
            Event::EndFunctionBody,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut expected = preamble();
        // Type: form 0x60, 1 param i32, 1 return i32
        expected.extend(section(1, 1, &[0x60, 0x01, 0x7F, 0x01, 0x7F]));
        // Function: type index 0
        expected.extend(section(3, 1, &[0x00]));
        // Export: "id", kind func, index 0
        expected.extend(section(7, 1, &[0x02, 0x69, 0x64, 0x00, 0x00]));
        // Code: one body (patched size slot, zero locals, get_local 0, end)
        let mut body = patched(4);
        body.extend_from_slice(&[0x00, 0x20, 0x00, 0x0B]);
        expected.extend(section(10, 1, &body));

        assert_eq!(bytes, expected);
    }

    #[test]
    fn function_body_with_locals() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Code),
            Event::BeginFunctionBody(FunctionInformation {
                locals: vec![(2, TAG_I32), (1, TAG_I64)],
            }),
            Event::CodeOperator(Operator::End),
            Event::EndFunctionBody,
            Event::EndSection,
            Event::EndModule,
        ]);

        // Locals: 2 runs, (2 x i32) (1 x i64), then the terminator.
        let mut body = patched(6);
        body.extend_from_slice(&[0x02, 0x02, 0x7F, 0x01, 0x7E, 0x0B]);
        let mut expected = preamble();
        expected.extend(section(10, 1, &body));
        assert_eq!(bytes, expected);
    }

    // =======================================================================
    // Import section
    // =======================================================================

    #[test]
    fn import_entries_of_all_kinds() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Import),
            Event::ImportEntry(ImportEntry {
                module: b"env".to_vec(),
                field: b"f".to_vec(),
                kind: ImportKind::Function { type_index: 2 },
            }),
            Event::ImportEntry(ImportEntry {
                module: b"env".to_vec(),
                field: b"t".to_vec(),
                kind: ImportKind::Table(TableType {
                    element_type: TAG_ANYFUNC,
                    limits: ResizableLimits {
                        initial: 10,
                        maximum: None,
                    },
                }),
            }),
            Event::ImportEntry(ImportEntry {
                module: b"env".to_vec(),
                field: b"m".to_vec(),
                kind: ImportKind::Memory(MemoryType {
                    limits: ResizableLimits {
                        initial: 1,
                        maximum: Some(16),
                    },
                }),
            }),
            Event::ImportEntry(ImportEntry {
                module: b"env".to_vec(),
                field: b"g".to_vec(),
                kind: ImportKind::Global(GlobalType {
                    content_type: TAG_I32,
                    mutability: 1,
                }),
            }),
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut entries = Vec::new();
        // "env" "f" func 2
        entries.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b'f', 0x00, 0x02]);
        // "env" "t" table anyfunc, min 10
        entries.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b't', 0x01, 0x70, 0x00, 0x0A]);
        // "env" "m" memory 1..16
        entries.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b'm', 0x02, 0x01, 0x01, 0x10]);
        // "env" "g" global (mut i32)
        entries.extend_from_slice(&[0x03, b'e', b'n', b'v', 0x01, b'g', 0x03, 0x7F, 0x01]);

        let mut expected = preamble();
        expected.extend(section(2, 4, &entries));
        assert_eq!(bytes, expected);
    }

    // =======================================================================
    // Table, global, element, and start sections
    // =======================================================================

    #[test]
    fn table_section_entry() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Table),
            Event::TableEntry(TableType {
                element_type: TAG_ANYFUNC,
                limits: ResizableLimits {
                    initial: 2,
                    maximum: Some(4),
                },
            }),
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut expected = preamble();
        expected.extend(section(4, 1, &[0x70, 0x01, 0x02, 0x04]));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn global_entry_with_init_expression() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Global),
            Event::BeginGlobalEntry(GlobalType {
                content_type: TAG_I32,
                mutability: 1,
            }),
            Event::BeginInitExpression,
            Event::InitExpressionOperator(Operator::I32Const { value: 42 }),
            Event::InitExpressionOperator(Operator::End),
            Event::EndInitExpression,
            Event::EndGlobalEntry,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut expected = preamble();
        expected.extend(section(6, 1, &[0x7F, 0x01, 0x41, 0x2A, 0x0B]));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn element_entry_with_function_vector() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Element),
            Event::BeginElementEntry { index: 0 },
            Event::BeginInitExpression,
            Event::InitExpressionOperator(Operator::I32Const { value: 0 }),
            Event::InitExpressionOperator(Operator::End),
            Event::EndInitExpression,
            Event::ElementBody(ElementSegmentBody {
                elements: vec![0, 1],
            }),
            Event::EndElementEntry,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut expected = preamble();
        expected.extend(section(9, 1, &[0x00, 0x41, 0x00, 0x0B, 0x02, 0x00, 0x01]));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn start_section_has_no_entry_count() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Start),
            Event::StartEntry { func_index: 3 },
            Event::EndSection,
            Event::EndModule,
        ]);

        // The start payload is the bare function index: no count slot.
        let mut expected = preamble();
        expected.push(8);
        expected.extend(patched(1));
        expected.push(0x03);
        assert_eq!(bytes, expected);
    }

    // =======================================================================
    // Data section
    // =======================================================================

    #[test]
    fn data_entry_with_init_expression() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Data),
            Event::BeginDataEntry { index: 0 },
            Event::BeginInitExpression,
            // Readers may deliver init operators as plain code operators.
            Event::CodeOperator(Operator::I32Const { value: 1024 }),
            Event::CodeOperator(Operator::End),
            Event::EndInitExpression,
            Event::DataBody(DataSegmentBody {
                data: vec![0x68, 0x69],
            }),
            Event::EndDataEntry,
            Event::EndSection,
            Event::EndModule,
        ]);

        // memory index, i32.const 1024, end, length-prefixed "hi"
        let entry = [0x00, 0x41, 0x80, 0x08, 0x0B, 0x02, 0x68, 0x69];
        let mut expected = preamble();
        expected.extend(section(11, 1, &entry));
        assert_eq!(bytes, expected);
    }

    // =======================================================================
    // Operator immediates inside bodies
    // =======================================================================

    #[test]
    fn body_operator_immediates() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Code),
            Event::BeginFunctionBody(FunctionInformation::default()),
            Event::CodeOperator(Operator::BrTable {
                targets: vec![1, 2, 3, 0],
            }),
            Event::CodeOperator(Operator::I32Load {
                mem: MemoryImmediate {
                    flags: 2,
                    offset: 16,
                },
            }),
            Event::CodeOperator(Operator::CallIndirect { type_index: 1 }),
            Event::CodeOperator(Operator::I64Const {
                value: Int64::from(-1),
            }),
            Event::CodeOperator(Operator::F32Const { value: 1.0 }),
            Event::CodeOperator(Operator::End),
            Event::EndFunctionBody,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut contents = vec![0x00]; // no locals
        contents.extend_from_slice(&[0x0E, 0x03, 0x01, 0x02, 0x03, 0x00]);
        contents.extend_from_slice(&[0x28, 0x02, 0x10]);
        contents.extend_from_slice(&[0x11, 0x01, 0x00]);
        contents.push(0x42);
        contents.extend_from_slice(&(-1i64).to_le_bytes());
        contents.extend_from_slice(&[0x43, 0x00, 0x00, 0x80, 0x3F]);
        contents.push(0x0B);

        let mut body = patched(contents.len() as u32);
        body.extend(contents);
        let mut expected = preamble();
        expected.extend(section(10, 1, &body));
        assert_eq!(bytes, expected);
    }

    #[test]
    fn float_constants_emit_ieee_bytes() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Code),
            Event::BeginFunctionBody(FunctionInformation::default()),
            Event::CodeOperator(Operator::F32Const { value: 6.283_185_5 }),
            Event::CodeOperator(Operator::F64Const {
                value: std::f64::consts::TAU,
            }),
            Event::CodeOperator(Operator::End),
            Event::EndFunctionBody,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut contents = vec![0x00];
        contents.extend_from_slice(&[0x43, 219, 15, 201, 64]);
        contents.extend_from_slice(&[0x44, 24, 45, 68, 84, 251, 33, 25, 64]);
        contents.push(0x0B);

        let mut body = patched(contents.len() as u32);
        body.extend(contents);
        let mut expected = preamble();
        expected.extend(section(10, 1, &body));
        assert_eq!(bytes, expected);
    }

    // =======================================================================
    // Negative tests
    // =======================================================================

    #[test]
    fn missing_end_in_function_body() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        emitter.write_event(&begin_section(SectionId::Code)).unwrap();
        emitter
            .write_event(&Event::BeginFunctionBody(FunctionInformation::default()))
            .unwrap();
        emitter
            .write_event(&Event::CodeOperator(Operator::Nop))
            .unwrap();
        let err = emitter.write_event(&Event::EndFunctionBody).unwrap_err();
        assert!(matches!(err, EmitError::MissingEndOperator));
        assert_eq!(emitter.state(), EmitterState::Error);
    }

    #[test]
    fn missing_end_in_init_expression() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        emitter.write_event(&begin_section(SectionId::Data)).unwrap();
        emitter
            .write_event(&Event::BeginDataEntry { index: 0 })
            .unwrap();
        emitter.write_event(&Event::BeginInitExpression).unwrap();
        emitter
            .write_event(&Event::InitExpressionOperator(Operator::I32Const { value: 0 }))
            .unwrap();
        let err = emitter.write_event(&Event::EndInitExpression).unwrap_err();
        assert!(matches!(err, EmitError::MissingEndOperator));
    }

    #[test]
    fn entry_event_in_wrong_section() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        emitter.write_event(&begin_section(SectionId::Type)).unwrap();
        let err = emitter
            .write_event(&Event::MemoryEntry(MemoryType {
                limits: ResizableLimits {
                    initial: 1,
                    maximum: None,
                },
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            EmitError::UnexpectedState {
                state: EmitterState::TypeSection,
                event: "MemoryEntry"
            }
        ));
    }

    #[test]
    fn custom_section_is_rejected() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        let err = emitter
            .write_event(&Event::BeginSection(SectionInfo {
                id: SectionId::Custom,
                name: b"name".to_vec(),
            }))
            .unwrap_err();
        assert!(matches!(err, EmitError::UnsupportedSection(SectionId::Custom)));
    }

    #[test]
    fn parser_error_is_propagated() {
        let mut emitter = Emitter::new();
        emitter.write_event(&begin_module()).unwrap();
        let err = emitter
            .write_event(&Event::Error(ParserError::new("truncated input")))
            .unwrap_err();
        match err {
            EmitError::Parser(parser_error) => {
                assert_eq!(parser_error.message, "truncated input");
            }
            other => panic!("expected parser error, got {other:?}"),
        }
        assert_eq!(emitter.state(), EmitterState::Error);
    }

    #[test]
    fn poisoned_emitter_stays_poisoned() {
        let mut emitter = Emitter::new();
        assert!(emitter.write_event(&Event::EndModule).is_err());
        assert!(emitter.write_event(&begin_module()).is_err());
        assert!(emitter.take_data().is_none());
    }

    // =======================================================================
    // Mixed sections: f32 const in a data init expression
    // =======================================================================

    #[test]
    fn f32_const_in_init_expression() {
        let bytes = emit(vec![
            begin_module(),
            begin_section(SectionId::Global),
            Event::BeginGlobalEntry(GlobalType {
                content_type: TAG_F32,
                mutability: 0,
            }),
            Event::BeginInitExpression,
            Event::InitExpressionOperator(Operator::F32Const { value: 1.0 }),
            Event::InitExpressionOperator(Operator::End),
            Event::EndInitExpression,
            Event::EndGlobalEntry,
            Event::EndSection,
            Event::EndModule,
        ]);

        let mut expected = preamble();
        expected.extend(section(
            6,
            1,
            &[0x7D, 0x00, 0x43, 0x00, 0x00, 0x80, 0x3F, 0x0B],
        ));
        assert_eq!(bytes, expected);
    }
}
