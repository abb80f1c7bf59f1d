//! WebAssembly operator representation.
//!
//! Defines the MVP operator set as one algebraic data type, each variant
//! carrying exactly the immediates its opcode dictates, plus the mnemonic
//! table and the text-format name derivation used by the disassembler.

pub mod encode;

use crate::event::{type_name, TypeTag, TAG_EMPTY_BLOCK};
use std::fmt;

/// Memory immediate for load/store operators.
///
/// `flags` holds the log2 alignment as encoded in the binary; `offset` is
/// the constant address offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryImmediate {
    pub flags: u32,
    pub offset: u32,
}

/// An `i64.const` immediate, kept as the opaque 8-byte little-endian
/// payload the parser decoded. Treated bit-exact by the emitter; the
/// disassembler interprets it as a signed 64-bit value for printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int64(pub [u8; 8]);

impl Int64 {
    /// The payload interpreted as a signed 64-bit little-endian value.
    pub fn as_i64(self) -> i64 {
        i64::from_le_bytes(self.0)
    }
}

impl From<i64> for Int64 {
    fn from(v: i64) -> Int64 {
        Int64(v.to_le_bytes())
    }
}

impl fmt::Display for Int64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Algebraic data type representing the MVP operator set.
///
/// For `BrTable` the last target is the default, matching the wire layout
/// where the default follows the table proper.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // Control operators
    Unreachable,
    Nop,
    Block { block_type: TypeTag },
    Loop { block_type: TypeTag },
    If { block_type: TypeTag },
    Else,
    End,
    Br { depth: u32 },
    BrIf { depth: u32 },
    BrTable { targets: Vec<u32> },
    Return,
    Call { func_index: u32 },
    CallIndirect { type_index: u32 },

    // Parametric operators
    Drop,
    Select,

    // Variable access
    GetLocal { local_index: u32 },
    SetLocal { local_index: u32 },
    TeeLocal { local_index: u32 },
    GetGlobal { global_index: u32 },
    SetGlobal { global_index: u32 },

    // Memory loads
    I32Load { mem: MemoryImmediate },
    I64Load { mem: MemoryImmediate },
    F32Load { mem: MemoryImmediate },
    F64Load { mem: MemoryImmediate },
    I32Load8S { mem: MemoryImmediate },
    I32Load8U { mem: MemoryImmediate },
    I32Load16S { mem: MemoryImmediate },
    I32Load16U { mem: MemoryImmediate },
    I64Load8S { mem: MemoryImmediate },
    I64Load8U { mem: MemoryImmediate },
    I64Load16S { mem: MemoryImmediate },
    I64Load16U { mem: MemoryImmediate },
    I64Load32S { mem: MemoryImmediate },
    I64Load32U { mem: MemoryImmediate },

    // Memory stores
    I32Store { mem: MemoryImmediate },
    I64Store { mem: MemoryImmediate },
    F32Store { mem: MemoryImmediate },
    F64Store { mem: MemoryImmediate },
    I32Store8 { mem: MemoryImmediate },
    I32Store16 { mem: MemoryImmediate },
    I64Store8 { mem: MemoryImmediate },
    I64Store16 { mem: MemoryImmediate },
    I64Store32 { mem: MemoryImmediate },

    // Memory size
    CurrentMemory,
    GrowMemory,

    // Constants
    I32Const { value: i32 },
    I64Const { value: Int64 },
    F32Const { value: f32 },
    F64Const { value: f64 },

    // i32 comparisons
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // i64 comparisons
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // f32 comparisons
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // f64 comparisons
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // i32 arithmetic
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    // i64 arithmetic
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // f32 arithmetic
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,

    // f64 arithmetic
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    // Conversions
    I32WrapI64,
    I32TruncSF32,
    I32TruncUF32,
    I32TruncSF64,
    I32TruncUF64,
    I64ExtendSI32,
    I64ExtendUI32,
    I64TruncSF32,
    I64TruncUF32,
    I64TruncSF64,
    I64TruncUF64,
    F32ConvertSI32,
    F32ConvertUI32,
    F32ConvertSI64,
    F32ConvertUI64,
    F32DemoteF64,
    F64ConvertSI32,
    F64ConvertUI32,
    F64ConvertSI64,
    F64ConvertUI64,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
}

impl Operator {
    /// True for the block terminator operator.
    pub fn is_end(&self) -> bool {
        matches!(self, Operator::End)
    }

    /// Get the mnemonic for this operator, in the underscore-separated
    /// form the operator name table uses. [`Operator::text_name`] derives
    /// the text-format spelling from it.
    pub fn mnemonic(&self) -> &'static str {
        use Operator::*;
        match self {
            // Control
            Unreachable => "unreachable",
            Nop => "nop",
            Block { .. } => "block",
            Loop { .. } => "loop",
            If { .. } => "if",
            Else => "else",
            End => "end",
            Br { .. } => "br",
            BrIf { .. } => "br_if",
            BrTable { .. } => "br_table",
            Return => "return",
            Call { .. } => "call",
            CallIndirect { .. } => "call_indirect",

            // Parametric
            Drop => "drop",
            Select => "select",

            // Variable
            GetLocal { .. } => "get_local",
            SetLocal { .. } => "set_local",
            TeeLocal { .. } => "tee_local",
            GetGlobal { .. } => "get_global",
            SetGlobal { .. } => "set_global",

            // Memory
            I32Load { .. } => "i32_load",
            I64Load { .. } => "i64_load",
            F32Load { .. } => "f32_load",
            F64Load { .. } => "f64_load",
            I32Load8S { .. } => "i32_load8_s",
            I32Load8U { .. } => "i32_load8_u",
            I32Load16S { .. } => "i32_load16_s",
            I32Load16U { .. } => "i32_load16_u",
            I64Load8S { .. } => "i64_load8_s",
            I64Load8U { .. } => "i64_load8_u",
            I64Load16S { .. } => "i64_load16_s",
            I64Load16U { .. } => "i64_load16_u",
            I64Load32S { .. } => "i64_load32_s",
            I64Load32U { .. } => "i64_load32_u",
            I32Store { .. } => "i32_store",
            I64Store { .. } => "i64_store",
            F32Store { .. } => "f32_store",
            F64Store { .. } => "f64_store",
            I32Store8 { .. } => "i32_store8",
            I32Store16 { .. } => "i32_store16",
            I64Store8 { .. } => "i64_store8",
            I64Store16 { .. } => "i64_store16",
            I64Store32 { .. } => "i64_store32",
            CurrentMemory => "current_memory",
            GrowMemory => "grow_memory",

            // Constants
            I32Const { .. } => "i32_const",
            I64Const { .. } => "i64_const",
            F32Const { .. } => "f32_const",
            F64Const { .. } => "f64_const",

            // Comparisons
            I32Eqz => "i32_eqz",
            I32Eq => "i32_eq",
            I32Ne => "i32_ne",
            I32LtS => "i32_lt_s",
            I32LtU => "i32_lt_u",
            I32GtS => "i32_gt_s",
            I32GtU => "i32_gt_u",
            I32LeS => "i32_le_s",
            I32LeU => "i32_le_u",
            I32GeS => "i32_ge_s",
            I32GeU => "i32_ge_u",
            I64Eqz => "i64_eqz",
            I64Eq => "i64_eq",
            I64Ne => "i64_ne",
            I64LtS => "i64_lt_s",
            I64LtU => "i64_lt_u",
            I64GtS => "i64_gt_s",
            I64GtU => "i64_gt_u",
            I64LeS => "i64_le_s",
            I64LeU => "i64_le_u",
            I64GeS => "i64_ge_s",
            I64GeU => "i64_ge_u",
            F32Eq => "f32_eq",
            F32Ne => "f32_ne",
            F32Lt => "f32_lt",
            F32Gt => "f32_gt",
            F32Le => "f32_le",
            F32Ge => "f32_ge",
            F64Eq => "f64_eq",
            F64Ne => "f64_ne",
            F64Lt => "f64_lt",
            F64Gt => "f64_gt",
            F64Le => "f64_le",
            F64Ge => "f64_ge",

            // Arithmetic
            I32Clz => "i32_clz",
            I32Ctz => "i32_ctz",
            I32Popcnt => "i32_popcnt",
            I32Add => "i32_add",
            I32Sub => "i32_sub",
            I32Mul => "i32_mul",
            I32DivS => "i32_div_s",
            I32DivU => "i32_div_u",
            I32RemS => "i32_rem_s",
            I32RemU => "i32_rem_u",
            I32And => "i32_and",
            I32Or => "i32_or",
            I32Xor => "i32_xor",
            I32Shl => "i32_shl",
            I32ShrS => "i32_shr_s",
            I32ShrU => "i32_shr_u",
            I32Rotl => "i32_rotl",
            I32Rotr => "i32_rotr",
            I64Clz => "i64_clz",
            I64Ctz => "i64_ctz",
            I64Popcnt => "i64_popcnt",
            I64Add => "i64_add",
            I64Sub => "i64_sub",
            I64Mul => "i64_mul",
            I64DivS => "i64_div_s",
            I64DivU => "i64_div_u",
            I64RemS => "i64_rem_s",
            I64RemU => "i64_rem_u",
            I64And => "i64_and",
            I64Or => "i64_or",
            I64Xor => "i64_xor",
            I64Shl => "i64_shl",
            I64ShrS => "i64_shr_s",
            I64ShrU => "i64_shr_u",
            I64Rotl => "i64_rotl",
            I64Rotr => "i64_rotr",
            F32Abs => "f32_abs",
            F32Neg => "f32_neg",
            F32Ceil => "f32_ceil",
            F32Floor => "f32_floor",
            F32Trunc => "f32_trunc",
            F32Nearest => "f32_nearest",
            F32Sqrt => "f32_sqrt",
            F32Add => "f32_add",
            F32Sub => "f32_sub",
            F32Mul => "f32_mul",
            F32Div => "f32_div",
            F32Min => "f32_min",
            F32Max => "f32_max",
            F32Copysign => "f32_copysign",
            F64Abs => "f64_abs",
            F64Neg => "f64_neg",
            F64Ceil => "f64_ceil",
            F64Floor => "f64_floor",
            F64Trunc => "f64_trunc",
            F64Nearest => "f64_nearest",
            F64Sqrt => "f64_sqrt",
            F64Add => "f64_add",
            F64Sub => "f64_sub",
            F64Mul => "f64_mul",
            F64Div => "f64_div",
            F64Min => "f64_min",
            F64Max => "f64_max",
            F64Copysign => "f64_copysign",

            // Conversions
            I32WrapI64 => "i32_wrap_i64",
            I32TruncSF32 => "i32_trunc_s_f32",
            I32TruncUF32 => "i32_trunc_u_f32",
            I32TruncSF64 => "i32_trunc_s_f64",
            I32TruncUF64 => "i32_trunc_u_f64",
            I64ExtendSI32 => "i64_extend_s_i32",
            I64ExtendUI32 => "i64_extend_u_i32",
            I64TruncSF32 => "i64_trunc_s_f32",
            I64TruncUF32 => "i64_trunc_u_f32",
            I64TruncSF64 => "i64_trunc_s_f64",
            I64TruncUF64 => "i64_trunc_u_f64",
            F32ConvertSI32 => "f32_convert_s_i32",
            F32ConvertUI32 => "f32_convert_u_i32",
            F32ConvertSI64 => "f32_convert_s_i64",
            F32ConvertUI64 => "f32_convert_u_i64",
            F32DemoteF64 => "f32_demote_f64",
            F64ConvertSI32 => "f64_convert_s_i32",
            F64ConvertUI32 => "f64_convert_u_i32",
            F64ConvertSI64 => "f64_convert_s_i64",
            F64ConvertUI64 => "f64_convert_u_i64",
            F64PromoteF32 => "f64_promote_f32",
            I32ReinterpretF32 => "i32_reinterpret_f32",
            I64ReinterpretF64 => "i64_reinterpret_f64",
            F32ReinterpretI32 => "f32_reinterpret_i32",
            F64ReinterpretI64 => "f64_reinterpret_i64",
        }
    }

    /// Derives the text-format spelling from the mnemonic: a leading
    /// `iNN_`/`fNN_` becomes `iNN.`/`fNN.` and a trailing `_iNN`/`_fNN`
    /// becomes `/iNN`/`/fNN`, so `i32_add` prints as `i32.add` and
    /// `i32_trunc_s_f32` as `i32.trunc_s/f32`.
    pub fn text_name(&self) -> String {
        derive_text_name(self.mnemonic())
    }

    /// Default log2 alignment for a memory access operator: the natural
    /// alignment of the access width. `None` for non-memory operators.
    pub fn natural_alignment(&self) -> Option<u32> {
        use Operator::*;
        match self {
            I32Load8S { .. } | I32Load8U { .. } | I64Load8S { .. } | I64Load8U { .. }
            | I32Store8 { .. } | I64Store8 { .. } => Some(0),
            I32Load16S { .. } | I32Load16U { .. } | I64Load16S { .. } | I64Load16U { .. }
            | I32Store16 { .. } | I64Store16 { .. } => Some(1),
            I32Load { .. } | F32Load { .. } | I64Load32S { .. } | I64Load32U { .. }
            | I32Store { .. } | F32Store { .. } | I64Store32 { .. } => Some(2),
            I64Load { .. } | F64Load { .. } | I64Store { .. } | F64Store { .. } => Some(3),
            _ => None,
        }
    }

    /// Formats a memory immediate for this operator, eliding the alignment
    /// when it matches the operator's natural alignment:
    /// `offset=N`, `align=M`, or `offset=N align=M`.
    pub fn memory_address_to_string(&self, mem: &MemoryImmediate) -> String {
        let default_flags = self.natural_alignment().unwrap_or(0);
        if mem.flags == default_flags {
            format!("offset={}", mem.offset)
        } else if mem.offset == 0 {
            format!("align={}", 1u32 << mem.flags)
        } else {
            format!("offset={} align={}", mem.offset, 1u32 << mem.flags)
        }
    }
}

fn derive_text_name(mnemonic: &str) -> String {
    let mut name = mnemonic.to_string();
    for prefix in ["i32_", "i64_", "f32_", "f64_"] {
        if name.starts_with(prefix) {
            name.replace_range(3..4, ".");
            break;
        }
    }
    for suffix in ["_i32", "_i64", "_f32", "_f64"] {
        if name.ends_with(suffix) {
            let cut = name.len() - suffix.len();
            name.replace_range(cut..cut + 1, "/");
            break;
        }
    }
    name
}

impl fmt::Display for Operator {
    /// Text-format rendering: the derived name followed by the operator's
    /// immediates in canonical order, space separated. Symbolic indices use
    /// the stable `$var`/`$func`/`$type`/`$global` prefixes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operator::*;

        write!(f, "{}", self.text_name())?;

        match self {
            Block { block_type } | Loop { block_type } | If { block_type } => {
                if *block_type != TAG_EMPTY_BLOCK {
                    write!(f, " {}", type_name(*block_type))?;
                }
                Ok(())
            }
            Br { depth } | BrIf { depth } => write!(f, " {depth}"),
            BrTable { targets } => {
                for target in targets {
                    write!(f, " {target}")?;
                }
                Ok(())
            }
            Call { func_index } => write!(f, " $func{func_index}"),
            CallIndirect { type_index } => write!(f, " $type{type_index}"),
            GetLocal { local_index } | SetLocal { local_index } | TeeLocal { local_index } => {
                write!(f, " $var{local_index}")
            }
            GetGlobal { global_index } | SetGlobal { global_index } => {
                write!(f, " $global{global_index}")
            }
            I32Const { value } => write!(f, " {value}"),
            I64Const { value } => write!(f, " {value}"),
            F32Const { value } => write!(f, " {}", crate::disasm::float::format_f32(*value)),
            F64Const { value } => write!(f, " {}", crate::disasm::float::format_f64(*value)),
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
            | I64Store32 { mem } => write!(f, " {}", self.memory_address_to_string(mem)),
            // current_memory/grow_memory carry only a reserved zero byte,
            // which the text format does not show.
            _ => Ok(()),
        }
    }
}
