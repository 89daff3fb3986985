//! Disassembly text formatting (C5 emit personality, §6.1).
//!
//! NASM-compatible output: lowercase mnemonics, `dest, src` operand order,
//! bracketed memory expressions, explicit `byte`/`word` size prefixes only
//! where the width can't be inferred from a register operand, self-relative
//! jump targets (`je $+0`), and unsigned decimal immediates. Grounded in
//! the register-name tables already established in `registers.rs`; the
//! teacher has no disassembler of its own to generalize from.

use crate::arch::i8086::operand::{DecodedOperands, Direction, Mode, Width};
use crate::arch::i8086::registers::{REGISTER_NAMES_BYTE, REGISTER_NAMES_WORD};
use crate::arch::i8086::tag::{Condition, Tag};
use crate::error::EmulatorError;

fn register_name(index: u8, width: Width) -> &'static str {
    match width {
        Width::Byte => REGISTER_NAMES_BYTE[index as usize],
        Width::Word => REGISTER_NAMES_WORD[index as usize],
    }
}

/// r/m's base-register expression, e.g. `bx + si`, `bp`.
fn memory_base_expr(rm_index: u8) -> &'static str {
    match rm_index {
        0 => "bx + si",
        1 => "bx + di",
        2 => "bp + si",
        3 => "bp + di",
        4 => "si",
        5 => "di",
        6 => "bp",
        7 => "bx",
        _ => unreachable!("rm_index is a 3-bit field"),
    }
}

fn format_memory_operand(rm_index: u8, mode: Mode, displacement: u16) -> String {
    if mode == Mode::Mem && rm_index == 0b110 {
        return format!("[{}]", displacement);
    }
    let base = memory_base_expr(rm_index);
    let signed = displacement as i16;
    if signed == 0 {
        // `[bp]` with zero displacement re-collapses to the no-displacement
        // form (§6.1) — a separate ModR/M encoding, identical text.
        return format!("[{}]", base);
    }
    if signed < 0 {
        format!("[{} - {}]", base, -(signed as i32))
    } else {
        format!("[{} + {}]", base, signed)
    }
}

/// Renders the r/m operand, whether it names a register or memory.
fn format_rm(ops: &DecodedOperands) -> String {
    match ops.mode {
        Some(Mode::Reg) | None => register_name(ops.rm_index, *ops.width).to_string(),
        Some(mode) => format_memory_operand(ops.rm_index, mode, ops.displacement),
    }
}

/// A memory r/m operand's width is ambiguous without an explicit prefix
/// (there's no register alongside it to infer it from); a register r/m
/// operand carries its own width in the register name.
fn needs_size_prefix(ops: &DecodedOperands) -> bool {
    !matches!(ops.mode, Some(Mode::Reg) | None)
}

fn size_prefix(width: Width) -> &'static str {
    match width {
        Width::Byte => "byte ",
        Width::Word => "word ",
    }
}

fn mnemonic(tag: Tag) -> &'static str {
    match tag {
        Tag::Move | Tag::MoveImmediate | Tag::MoveImmediateToRegister | Tag::MoveToAx
        | Tag::MoveAx => "mov",
        Tag::PushRegister | Tag::Push => "push",
        Tag::PopRegister => "pop",
        Tag::Xchg | Tag::XchgAx => "xchg",
        Tag::Add | Tag::AddImmediate | Tag::AddImmediateToAx => "add",
        Tag::Sub | Tag::SubImmediate => "sub",
        Tag::Cmp | Tag::CmpImmediate => "cmp",
        Tag::Inc | Tag::IncRegister => "inc",
        Tag::And | Tag::AndImmediate | Tag::AndImmediateToAx => "and",
        Tag::Not => "not",
        Tag::ConditionalJump(condition) => condition_mnemonic(condition),
        Tag::Loop => "loop",
        Tag::LoopZero => "loopz",
        Tag::LoopNotZero => "loopnz",
        Tag::JumpIfCxZero => "jcxz",
        Tag::Clc => "clc",
        Tag::Stc => "stc",
        Tag::Cmc => "cmc",
        Tag::AdcImmediate
        | Tag::SbbImmediate
        | Tag::OrImmediate
        | Tag::XorImmediate
        | Tag::Neg
        | Tag::TestImmediate
        | Tag::Mul
        | Tag::Imul
        | Tag::Div
        | Tag::Idiv
        | Tag::Dec
        | Tag::DecRegister
        | Tag::CallIndirect
        | Tag::JmpIndirect
        | Tag::Invalid => "(bad)",
    }
}

fn condition_mnemonic(condition: Condition) -> &'static str {
    match condition {
        Condition::Jo => "jo",
        Condition::Jno => "jno",
        Condition::Jb => "jb",
        Condition::Jnb => "jnb",
        Condition::Je => "je",
        Condition::Jne => "jne",
        Condition::Jbe => "jbe",
        Condition::Ja => "ja",
        Condition::Js => "js",
        Condition::Jns => "jns",
        Condition::Jp => "jp",
        Condition::Jnp => "jnp",
        Condition::Jl => "jl",
        Condition::Jnl => "jnl",
        Condition::Jle => "jle",
        Condition::Jg => "jg",
    }
}

/// `je $+0`, `jne $-6` (§6.1): the rendered offset is the signed
/// displacement plus the instruction's own 2-byte length, NASM's
/// convention for a self-relative target with no label to reconstruct.
/// `ops.displacement` is already sign-extended at decode time.
fn format_branch_target(ops: &DecodedOperands) -> String {
    let rendered = (ops.displacement as i16) + 2;
    if rendered < 0 {
        format!("$-{}", -rendered)
    } else {
        format!("$+{}", rendered)
    }
}

/// Renders one instruction as NASM-style text (§6.1). Errors for the same
/// tags `semantics::execute` refuses (§4.5.6) — a disassembly listing that
/// silently prints a plausible-looking `adc`/`mul`/`div` line for an opcode
/// this system never actually emulates would be worse than refusing it.
pub fn emit(tag: Tag, ops: &DecodedOperands) -> Result<String, EmulatorError> {
    let text = match tag {
        Tag::Move | Tag::Add | Tag::Sub | Tag::Cmp | Tag::And | Tag::Xchg => {
            let reg = register_name(ops.reg_index, *ops.width);
            let rm = format_rm(ops);
            match ops.direction.unwrap() {
                Direction::RegDest => format!("{} {}, {}", mnemonic(tag), reg, rm),
                Direction::RegSource => format!("{} {}, {}", mnemonic(tag), rm, reg),
            }
        }
        Tag::MoveImmediate | Tag::AddImmediate | Tag::SubImmediate | Tag::CmpImmediate
        | Tag::AndImmediate => {
            let rm = format_rm(ops);
            let prefix = if needs_size_prefix(ops) {
                size_prefix(*ops.width)
            } else {
                ""
            };
            format!("{} {}{}, {}", mnemonic(tag), prefix, rm, ops.immediate)
        }
        Tag::MoveImmediateToRegister => {
            let reg = register_name(ops.reg_index, *ops.width);
            format!("{} {}, {}", mnemonic(tag), reg, ops.immediate)
        }
        Tag::MoveToAx => {
            let reg = register_name(0, *ops.width);
            format!("{} {}, [{}]", mnemonic(tag), reg, ops.displacement)
        }
        Tag::MoveAx => {
            let reg = register_name(0, *ops.width);
            format!("{} [{}], {}", mnemonic(tag), ops.displacement, reg)
        }
        Tag::AddImmediateToAx | Tag::AndImmediateToAx => {
            let reg = register_name(0, *ops.width);
            format!("{} {}, {}", mnemonic(tag), reg, ops.immediate)
        }
        Tag::PushRegister | Tag::PopRegister | Tag::IncRegister => {
            let reg = register_name(ops.reg_index, Width::Word);
            format!("{} {}", mnemonic(tag), reg)
        }
        Tag::XchgAx => {
            let reg = register_name(ops.reg_index, Width::Word);
            format!("{} ax, {}", mnemonic(tag), reg)
        }
        Tag::Push | Tag::Inc | Tag::Not => {
            let rm = format_rm(ops);
            let prefix = if needs_size_prefix(ops) {
                size_prefix(*ops.width)
            } else {
                ""
            };
            format!("{} {}{}", mnemonic(tag), prefix, rm)
        }
        Tag::ConditionalJump(_) | Tag::Loop | Tag::LoopZero | Tag::LoopNotZero
        | Tag::JumpIfCxZero => {
            format!("{} {}", mnemonic(tag), format_branch_target(ops))
        }
        Tag::Clc | Tag::Stc | Tag::Cmc => mnemonic(tag).to_string(),

        Tag::AdcImmediate
        | Tag::SbbImmediate
        | Tag::OrImmediate
        | Tag::XorImmediate
        | Tag::Neg
        | Tag::TestImmediate
        | Tag::Mul
        | Tag::Imul
        | Tag::Div
        | Tag::Idiv
        | Tag::Dec
        | Tag::DecRegister
        | Tag::CallIndirect
        | Tag::JmpIndirect
        | Tag::Invalid => return Err(EmulatorError::UnimplementedInstruction { tag }),
    };
    Ok(text)
}
