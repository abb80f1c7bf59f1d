//! Operator encoding to binary format.

use super::Operator;
use crate::encoding;

impl Operator {
    /// Get the opcode byte for this operator.
    pub fn opcode(&self) -> u8 {
        use Operator::*;
        match self {
            // Control operators
            Unreachable => 0x00,
            Nop => 0x01,
            Block { .. } => 0x02,
            Loop { .. } => 0x03,
            If { .. } => 0x04,
            Else => 0x05,
            End => 0x0B,
            Br { .. } => 0x0C,
            BrIf { .. } => 0x0D,
            BrTable { .. } => 0x0E,
            Return => 0x0F,
            Call { .. } => 0x10,
            CallIndirect { .. } => 0x11,

            // Parametric operators
            Drop => 0x1A,
            Select => 0x1B,

            // Variable access
            GetLocal { .. } => 0x20,
            SetLocal { .. } => 0x21,
            TeeLocal { .. } => 0x22,
            GetGlobal { .. } => 0x23,
            SetGlobal { .. } => 0x24,

            // Memory operators
            I32Load { .. } => 0x28,
            I64Load { .. } => 0x29,
            F32Load { .. } => 0x2A,
            F64Load { .. } => 0x2B,
            I32Load8S { .. } => 0x2C,
            I32Load8U { .. } => 0x2D,
            I32Load16S { .. } => 0x2E,
            I32Load16U { .. } => 0x2F,
            I64Load8S { .. } => 0x30,
            I64Load8U { .. } => 0x31,
            I64Load16S { .. } => 0x32,
            I64Load16U { .. } => 0x33,
            I64Load32S { .. } => 0x34,
            I64Load32U { .. } => 0x35,
            I32Store { .. } => 0x36,
            I64Store { .. } => 0x37,
            F32Store { .. } => 0x38,
            F64Store { .. } => 0x39,
            I32Store8 { .. } => 0x3A,
            I32Store16 { .. } => 0x3B,
            I64Store8 { .. } => 0x3C,
            I64Store16 { .. } => 0x3D,
            I64Store32 { .. } => 0x3E,
            CurrentMemory => 0x3F,
            GrowMemory => 0x40,

            // Constants
            I32Const { .. } => 0x41,
            I64Const { .. } => 0x42,
            F32Const { .. } => 0x43,
            F64Const { .. } => 0x44,

            // i32 comparisons
            I32Eqz => 0x45,
            I32Eq => 0x46,
            I32Ne => 0x47,
            I32LtS => 0x48,
            I32LtU => 0x49,
            I32GtS => 0x4A,
            I32GtU => 0x4B,
            I32LeS => 0x4C,
            I32LeU => 0x4D,
            I32GeS => 0x4E,
            I32GeU => 0x4F,

            // i64 comparisons
            I64Eqz => 0x50,
            I64Eq => 0x51,
            I64Ne => 0x52,
            I64LtS => 0x53,
            I64LtU => 0x54,
            I64GtS => 0x55,
            I64GtU => 0x56,
            I64LeS => 0x57,
            I64LeU => 0x58,
            I64GeS => 0x59,
            I64GeU => 0x5A,

            // f32 comparisons
            F32Eq => 0x5B,
            F32Ne => 0x5C,
            F32Lt => 0x5D,
            F32Gt => 0x5E,
            F32Le => 0x5F,
            F32Ge => 0x60,

            // f64 comparisons
            F64Eq => 0x61,
            F64Ne => 0x62,
            F64Lt => 0x63,
            F64Gt => 0x64,
            F64Le => 0x65,
            F64Ge => 0x66,

            // i32 arithmetic
            I32Clz => 0x67,
            I32Ctz => 0x68,
            I32Popcnt => 0x69,
            I32Add => 0x6A,
            I32Sub => 0x6B,
            I32Mul => 0x6C,
            I32DivS => 0x6D,
            I32DivU => 0x6E,
            I32RemS => 0x6F,
            I32RemU => 0x70,
            I32And => 0x71,
            I32Or => 0x72,
            I32Xor => 0x73,
            I32Shl => 0x74,
            I32ShrS => 0x75,
            I32ShrU => 0x76,
            I32Rotl => 0x77,
            I32Rotr => 0x78,

            // i64 arithmetic
            I64Clz => 0x79,
            I64Ctz => 0x7A,
            I64Popcnt => 0x7B,
            I64Add => 0x7C,
            I64Sub => 0x7D,
            I64Mul => 0x7E,
            I64DivS => 0x7F,
            I64DivU => 0x80,
            I64RemS => 0x81,
            I64RemU => 0x82,
            I64And => 0x83,
            I64Or => 0x84,
            I64Xor => 0x85,
            I64Shl => 0x86,
            I64ShrS => 0x87,
            I64ShrU => 0x88,
            I64Rotl => 0x89,
            I64Rotr => 0x8A,

            // f32 arithmetic
            F32Abs => 0x8B,
            F32Neg => 0x8C,
            F32Ceil => 0x8D,
            F32Floor => 0x8E,
            F32Trunc => 0x8F,
            F32Nearest => 0x90,
            F32Sqrt => 0x91,
            F32Add => 0x92,
            F32Sub => 0x93,
            F32Mul => 0x94,
            F32Div => 0x95,
            F32Min => 0x96,
            F32Max => 0x97,
            F32Copysign => 0x98,

            // f64 arithmetic
            F64Abs => 0x99,
            F64Neg => 0x9A,
            F64Ceil => 0x9B,
            F64Floor => 0x9C,
            F64Trunc => 0x9D,
            F64Nearest => 0x9E,
            F64Sqrt => 0x9F,
            F64Add => 0xA0,
            F64Sub => 0xA1,
            F64Mul => 0xA2,
            F64Div => 0xA3,
            F64Min => 0xA4,
            F64Max => 0xA5,
            F64Copysign => 0xA6,

            // Conversions
            I32WrapI64 => 0xA7,
            I32TruncSF32 => 0xA8,
            I32TruncUF32 => 0xA9,
            I32TruncSF64 => 0xAA,
            I32TruncUF64 => 0xAB,
            I64ExtendSI32 => 0xAC,
            I64ExtendUI32 => 0xAD,
            I64TruncSF32 => 0xAE,
            I64TruncUF32 => 0xAF,
            I64TruncSF64 => 0xB0,
            I64TruncUF64 => 0xB1,
            F32ConvertSI32 => 0xB2,
            F32ConvertUI32 => 0xB3,
            F32ConvertSI64 => 0xB4,
            F32ConvertUI64 => 0xB5,
            F32DemoteF64 => 0xB6,
            F64ConvertSI32 => 0xB7,
            F64ConvertUI32 => 0xB8,
            F64ConvertSI64 => 0xB9,
            F64ConvertUI64 => 0xBA,
            F64PromoteF32 => 0xBB,
            I32ReinterpretF32 => 0xBC,
            I64ReinterpretF64 => 0xBD,
            F32ReinterpretI32 => 0xBE,
            F64ReinterpretI64 => 0xBF,
        }
    }

    /// Appends the binary encoding of this operator to `buf`: the opcode
    /// byte followed by the immediates the opcode dictates.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        use Operator::*;

        buf.push(self.opcode());

        match self {
            // Block types
            Block { block_type } | Loop { block_type } | If { block_type } => {
                encoding::write_vs32(buf, *block_type);
            }

            // Branch depths
            Br { depth } | BrIf { depth } => {
                encoding::write_vu32(buf, *depth);
            }

            // Branch table: count excludes the trailing default target
            BrTable { targets } => {
                encoding::write_vu32(buf, targets.len().saturating_sub(1) as u32);
                for target in targets {
                    encoding::write_vu32(buf, *target);
                }
            }

            // Calls
            Call { func_index } => {
                encoding::write_vu32(buf, *func_index);
            }
            CallIndirect { type_index } => {
                encoding::write_vu32(buf, *type_index);
                buf.push(0x00); // reserved byte
            }

            // Variable access
            GetLocal { local_index } | SetLocal { local_index } | TeeLocal { local_index } => {
                encoding::write_vu32(buf, *local_index);
            }
            GetGlobal { global_index } | SetGlobal { global_index } => {
                encoding::write_vu32(buf, *global_index);
            }

            // Memory operators with an address immediate
            I32Load { mem }
            | I64Load { mem }
            | F32Load { mem }
            | F64Load { mem }
            | I32Load8S { mem }
            | I32Load8U { mem }
            | I32Load16S { mem }
            | I32Load16U { mem }
            | I64Load8S { mem }
            | I64Load8U { mem }
            | I64Load16S { mem }
            | I64Load16U { mem }
            | I64Load32S { mem }
            | I64Load32U { mem }
            | I32Store { mem }
            | I64Store { mem }
            | F32Store { mem }
            | F64Store { mem }
            | I32Store8 { mem }
            | I32Store16 { mem }
            | I64Store8 { mem }
            | I64Store16 { mem }
            | I64Store32 { mem } => {
                encoding::write_vu32(buf, mem.flags);
                encoding::write_vu32(buf, mem.offset);
            }

            // Memory size
            CurrentMemory | GrowMemory => {
                buf.push(0x00); // reserved byte
            }

            // Constants
            I32Const { value } => {
                encoding::write_vs32(buf, *value);
            }
            I64Const { value } => {
                // The parser hands the immediate over as its original
                // decoded payload; write it back bit-exact.
                buf.extend_from_slice(&value.0);
            }
            F32Const { value } => {
                encoding::write_f32(buf, *value);
            }
            F64Const { value } => {
                encoding::write_f64(buf, *value);
            }

            // All other operators have no immediates
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Int64, MemoryImmediate};
    use super::*;
    use crate::event::{TAG_EMPTY_BLOCK, TAG_I32};

    fn encode(op: Operator) -> Vec<u8> {
        let mut buf = Vec::new();
        op.encode_into(&mut buf);
        buf
    }

    #[test]
    fn encode_no_immediates() {
        assert_eq!(encode(Operator::Unreachable), vec![0x00]);
        assert_eq!(encode(Operator::Nop), vec![0x01]);
        assert_eq!(encode(Operator::End), vec![0x0B]);
        assert_eq!(encode(Operator::I32Add), vec![0x6A]);
        assert_eq!(encode(Operator::F64ReinterpretI64), vec![0xBF]);
    }

    #[test]
    fn encode_block_types() {
        assert_eq!(
            encode(Operator::Block { block_type: TAG_EMPTY_BLOCK }),
            vec![0x02, 0x40]
        );
        assert_eq!(encode(Operator::If { block_type: TAG_I32 }), vec![0x04, 0x7F]);
    }

    #[test]
    fn encode_br_table() {
        // opcode, count=3, three targets, default
        assert_eq!(
            encode(Operator::BrTable {
                targets: vec![1, 2, 3, 0]
            }),
            vec![0x0E, 0x03, 0x01, 0x02, 0x03, 0x00]
        );
    }

    #[test]
    fn encode_call_indirect_reserved_byte() {
        assert_eq!(
            encode(Operator::CallIndirect { type_index: 2 }),
            vec![0x11, 0x02, 0x00]
        );
    }

    #[test]
    fn encode_memory_immediates() {
        assert_eq!(
            encode(Operator::I32Load {
                mem: MemoryImmediate { flags: 2, offset: 16 }
            }),
            vec![0x28, 0x02, 0x10]
        );
        assert_eq!(encode(Operator::GrowMemory), vec![0x40, 0x00]);
    }

    #[test]
    fn encode_constants() {
        assert_eq!(encode(Operator::I32Const { value: 1024 }), vec![0x41, 0x80, 0x08]);
        assert_eq!(encode(Operator::I32Const { value: -1 }), vec![0x41, 0x7F]);
        assert_eq!(
            encode(Operator::I64Const {
                value: Int64([1, 2, 3, 4, 5, 6, 7, 8])
            }),
            vec![0x42, 1, 2, 3, 4, 5, 6, 7, 8]
        );
        assert_eq!(
            encode(Operator::F32Const { value: 1.0 }),
            vec![0x43, 0x00, 0x00, 0x80, 0x3F]
        );
        assert_eq!(
            encode(Operator::F64Const { value: 1.0 }),
            vec![0x44, 0, 0, 0, 0, 0, 0, 0xF0, 0x3F]
        );
    }

    #[test]
    fn encode_variable_access() {
        assert_eq!(encode(Operator::GetLocal { local_index: 0 }), vec![0x20, 0x00]);
        assert_eq!(encode(Operator::TeeLocal { local_index: 200 }), vec![0x22, 0xC8, 0x01]);
        assert_eq!(encode(Operator::SetGlobal { global_index: 1 }), vec![0x24, 0x01]);
    }
}
