//! The 8086 architecture: wires the Tag Decoder (C2), Operand Decoder
//! (C3), Register & Flag File (C4), and Instruction Semantics (C5)
//! together behind the `Architecture` trait the driver (C6) depends on.

pub mod format;
pub mod operand;
pub mod registers;
pub mod semantics;
pub mod tag;

use crate::arch::{Architecture, StepMode, StepOutcome};
use crate::cursor::Cursor;
use crate::error::{EmulatorError, EmulatorResult};
use crate::memory::Memory;
use operand::DecodedOperands;
use registers::Registers;
use tag::{tag_of, Tag};

pub struct I8086 {
    pub registers: Registers,
}

impl I8086 {
    pub fn new() -> Self {
        I8086 {
            registers: Registers::new(),
        }
    }
}

impl Default for I8086 {
    fn default() -> Self {
        I8086::new()
    }
}

/// §4.3's per-tag operand-decoding dispatch: each instruction class names
/// exactly one of the shared encoding forms from `operand.rs`.
fn decode_operands(
    tag: Tag,
    cursor: &mut Cursor,
    byte1: u8,
) -> Result<DecodedOperands, EmulatorError> {
    use operand::*;
    match tag {
        Tag::Move | Tag::Add | Tag::Sub | Tag::Cmp | Tag::And | Tag::Xchg => {
            decode_standard(cursor, byte1)
        }

        Tag::AddImmediate
        | Tag::AdcImmediate
        | Tag::SubImmediate
        | Tag::SbbImmediate
        | Tag::CmpImmediate
        | Tag::AndImmediate
        | Tag::OrImmediate
        | Tag::XorImmediate => decode_standard_immediate(cursor, byte1),

        Tag::MoveImmediate => decode_move_immediate(cursor, byte1),
        Tag::MoveImmediateToRegister => decode_immediate_to_register(cursor, byte1),
        Tag::MoveToAx | Tag::MoveAx => decode_ax_direct(cursor, byte1),
        Tag::AddImmediateToAx | Tag::AndImmediateToAx => decode_immediate_to_ax(cursor, byte1),

        Tag::PushRegister
        | Tag::PopRegister
        | Tag::IncRegister
        | Tag::DecRegister
        | Tag::XchgAx => Ok(decode_register_compact(byte1)),

        Tag::ConditionalJump(_)
        | Tag::Loop
        | Tag::LoopZero
        | Tag::LoopNotZero
        | Tag::JumpIfCxZero => decode_conditional_jump(cursor),

        Tag::Inc | Tag::Dec | Tag::CallIndirect | Tag::JmpIndirect | Tag::Push => {
            decode_inc_dec_group(cursor, byte1)
        }

        Tag::TestImmediate | Tag::Not | Tag::Neg | Tag::Mul | Tag::Imul | Tag::Div | Tag::Idiv => {
            decode_unary_group(cursor, byte1)
        }

        Tag::Clc | Tag::Stc | Tag::Cmc | Tag::Invalid => Ok(DecodedOperands::default()),
    }
}

impl Architecture for I8086 {
    fn name(&self) -> &'static str {
        "i8086"
    }

    /// Implements the C6 per-instruction fetch cycle (§4.6): read byte1,
    /// peek byte2 for tag classification, decode operands (which may
    /// consume byte2 and more), then either format or execute.
    fn step(
        &mut self,
        memory: &mut Memory,
        ip: &mut u16,
        mode: StepMode,
    ) -> EmulatorResult<StepOutcome> {
        let start_ip = *ip;
        let mut cursor = Cursor::new(memory, ip);
        let byte1 = cursor.read_byte()?;
        let byte2 = cursor.peek_byte();
        let tag = tag_of(byte1, byte2);

        if tag == Tag::Invalid {
            return Err(EmulatorError::UnknownOpcode { byte1, byte2 });
        }

        let ops = decode_operands(tag, &mut cursor, byte1)?;
        let bytes_consumed = *ip - start_ip;

        let text = match mode {
            StepMode::Decode => Some(format!("{:?} {:?}", tag, ops)),
            StepMode::Disassemble => Some(format::emit(tag, &ops)?),
            StepMode::Emulate => {
                semantics::execute(tag, &ops, &mut self.registers, memory, ip)?;
                None
            }
        };

        Ok(StepOutcome {
            text,
            bytes_consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_mode_does_not_execute() {
        let mut memory = Memory::new(crate::memory::MEMORY_SIZE);
        memory.write(0x100, 0xB9); // mov cx, imm16
        memory.write(0x101, 0x34);
        memory.write(0x102, 0x12);
        let mut arch = I8086::new();
        let mut ip = 0x100u16;
        let outcome = arch.step(&mut memory, &mut ip, StepMode::Decode).unwrap();
        assert_eq!(arch.registers.get_word(registers::CX), 0);
        assert_eq!(outcome.bytes_consumed, 3);
        assert_eq!(ip, 0x103);
    }

    #[test]
    fn emulate_mode_mutates_registers() {
        let mut memory = Memory::new(crate::memory::MEMORY_SIZE);
        memory.write(0x100, 0xB9);
        memory.write(0x101, 0x34);
        memory.write(0x102, 0x12);
        let mut arch = I8086::new();
        let mut ip = 0x100u16;
        arch.step(&mut memory, &mut ip, StepMode::Emulate).unwrap();
        assert_eq!(arch.registers.get_word(registers::CX), 0x1234);
    }

    #[test]
    fn disassemble_mode_produces_nasm_text() {
        let mut memory = Memory::new(crate::memory::MEMORY_SIZE);
        memory.write(0x100, 0x89);
        memory.write(0x101, 0xD9); // mov cx, bx
        let mut arch = I8086::new();
        let mut ip = 0x100u16;
        let outcome = arch
            .step(&mut memory, &mut ip, StepMode::Disassemble)
            .unwrap();
        assert_eq!(outcome.text.as_deref(), Some("mov cx, bx"));
    }

    #[test]
    fn unknown_opcode_errors() {
        let mut memory = Memory::new(crate::memory::MEMORY_SIZE);
        memory.write(0x100, 0x0F);
        let mut arch = I8086::new();
        let mut ip = 0x100u16;
        let result = arch.step(&mut memory, &mut ip, StepMode::Decode);
        assert!(matches!(result, Err(EmulatorError::UnknownOpcode { .. })));
    }
}
