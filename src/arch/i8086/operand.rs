//! Operand Decoder (C3, §4.3).
//!
//! Three shared encoding patterns cover every implemented instruction; each
//! is a function that takes the already-fetched `byte1` (and, for group
//! opcodes, already knows its `Tag`) and fills in a `DecodedOperands`
//! record while advancing the cursor for whatever trailing bytes the
//! encoding needs. Grounded in the teacher's `fetch_memory`/
//! `fetch_instruction_address` split (`cpu/cpu.rs`): one function resolves
//! "what value does this operand read", a second resolves "what address
//! does this operand write to" — generalized here into a single record
//! that both `semantics::execute` and `format::emit` can read without
//! re-decoding.

use crate::cursor::Cursor;
use crate::error::EmulatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    RegSource = 0,
    RegDest = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte = 0,
    Word = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mem = 0,
    MemDisp8 = 1,
    MemDisp16 = 2,
    Reg = 3,
}

impl Mode {
    fn from_bits(bits: u8) -> Mode {
        match bits {
            0b00 => Mode::Mem,
            0b01 => Mode::MemDisp8,
            0b10 => Mode::MemDisp16,
            0b11 => Mode::Reg,
            _ => unreachable!("mode is a 2-bit field"),
        }
    }
}

/// §3.3. Not every field is meaningful for every instruction; each C5
/// handler documents which ones it consumes. Numeric fields are held
/// unsigned; `sign_extend` tracks whether `immediate` should be
/// interpreted as a sign-extended byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedOperands {
    pub direction: Option<Direction>,
    pub width: Width_,
    pub mode: Option<Mode>,
    pub reg_index: u8,
    pub rm_index: u8,
    pub displacement: u16,
    pub immediate: u16,
    pub instruction_size_bytes: u8,
    pub sign_extend: bool,
}

// `Width` has no natural "default" reading, but `DecodedOperands` needs
// `Default` for ergonomic construction in the decode helpers below; this
// thin wrapper gives byte-width as the default without implying anything
// semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Width_(pub Width);
impl Default for Width_ {
    fn default() -> Self {
        Width_(Width::Byte)
    }
}

impl std::ops::Deref for Width_ {
    type Target = Width;
    fn deref(&self) -> &Width {
        &self.0
    }
}

/// r/m base expressions for `mode != Reg` (§4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveAddress {
    /// A fully-resolved memory address, already including displacement.
    Memory(u16),
    /// `mode == Reg`: the r/m field names a register instead.
    Register(u8),
}

/// Implements the ModR/M r/m-field table of §4.3.4, including the
/// `mode=Mem, r/m=0b110` direct-address special case.
pub fn effective_address(
    rm_index: u8,
    mode: Mode,
    displacement: u16,
    get_word_reg: impl Fn(u8) -> u16,
) -> EffectiveAddress {
    if mode == Mode::Reg {
        return EffectiveAddress::Register(rm_index);
    }

    // Register indices into the word register file for BX, SP, BP, SI, DI.
    const BX: u8 = 3;
    const BP: u8 = 5;
    const SI: u8 = 6;
    const DI: u8 = 7;

    let base = match rm_index {
        0 => get_word_reg(BX).wrapping_add(get_word_reg(SI)),
        1 => get_word_reg(BX).wrapping_add(get_word_reg(DI)),
        2 => get_word_reg(BP).wrapping_add(get_word_reg(SI)),
        3 => get_word_reg(BP).wrapping_add(get_word_reg(DI)),
        4 => get_word_reg(SI),
        5 => get_word_reg(DI),
        6 => {
            if mode == Mode::Mem {
                // Direct-address special case: the "displacement" *is* the
                // absolute address, not an offset from BP.
                return EffectiveAddress::Memory(displacement);
            }
            get_word_reg(BP)
        }
        7 => get_word_reg(BX),
        _ => unreachable!("rm_index is a 3-bit field"),
    };

    EffectiveAddress::Memory(base.wrapping_add(displacement))
}

/// Reads the ModR/M byte and any trailing displacement, per §4.3.1's
/// shared rule (mode/reg/r-m bit layout, disp8/disp16/direct-address
/// special case). Shared by every instruction form that carries ModR/M.
fn decode_modrm(cursor: &mut Cursor) -> Result<(Mode, u8, u8, u16), EmulatorError> {
    let byte2 = cursor.read_byte()?;
    let mode = Mode::from_bits((byte2 >> 6) & 0b11);
    let reg = (byte2 >> 3) & 0b111;
    let rm = byte2 & 0b111;

    let displacement = match (mode, rm) {
        (Mode::Mem, 0b110) => cursor.read_word()?,
        (Mode::MemDisp8, _) => (cursor.read_byte()? as i8) as i16 as u16,
        (Mode::MemDisp16, _) => cursor.read_word()?,
        _ => 0,
    };

    Ok((mode, reg, rm, displacement))
}

/// §4.3.1 — standard two-operand form:
/// `[opcode d w] [mod reg r/m] [disp-lo] [disp-hi]`.
/// Used by MOVE, ADD, SUB, CMP, AND, XCHG (reg-reg or reg-mem).
pub fn decode_standard(cursor: &mut Cursor, byte1: u8) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let direction = if byte1 & 0b10 != 0 {
        Direction::RegDest
    } else {
        Direction::RegSource
    };
    let width = if byte1 & 0b01 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let (mode, reg, rm, displacement) = decode_modrm(cursor)?;

    Ok(DecodedOperands {
        direction: Some(direction),
        width: Width_(width),
        mode: Some(mode),
        reg_index: reg,
        rm_index: rm,
        displacement,
        immediate: 0,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// §4.3.2 — standard immediate form (the `0x80`-`0x83` ALU-immediate
/// group): `[opcode s w] [mod subop r/m] [disp…] [data-lo] [data-hi?]`.
pub fn decode_standard_immediate(
    cursor: &mut Cursor,
    byte1: u8,
) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let sign_extend_bit = byte1 & 0b10 != 0;
    let width = if byte1 & 0b01 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let (mode, subop, rm, displacement) = decode_modrm(cursor)?;

    let (immediate, sign_extend) = if sign_extend_bit && width == Width::Word {
        ((cursor.read_byte()? as i8) as i16 as u16, true)
    } else if width == Width::Word {
        (cursor.read_word()?, false)
    } else {
        (cursor.read_byte()? as u16, false)
    };

    Ok(DecodedOperands {
        direction: None,
        width: Width_(width),
        mode: Some(mode),
        reg_index: subop,
        rm_index: rm,
        displacement,
        immediate,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend,
    })
}

/// `0xC6`/`0xC7` MOVE_IMMEDIATE: ModR/M + displacement as above, then a
/// `w`-typed immediate with no sign-extend bit at all.
pub fn decode_move_immediate(
    cursor: &mut Cursor,
    byte1: u8,
) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 & 0b01 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let (mode, reg, rm, displacement) = decode_modrm(cursor)?;
    let immediate = if width == Width::Word {
        cursor.read_word()?
    } else {
        cursor.read_byte()? as u16
    };

    Ok(DecodedOperands {
        direction: Some(Direction::RegDest),
        width: Width_(width),
        mode: Some(mode),
        reg_index: reg,
        rm_index: rm,
        displacement,
        immediate,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// §4.3.3 — immediate-to-register (`0xB0`-`0xBF`): `w` is bit 3 of byte1,
/// `reg` is bits 2:0, immediate is 1 or 2 bytes.
pub fn decode_immediate_to_register(
    cursor: &mut Cursor,
    byte1: u8,
) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 & 0b0000_1000 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let reg = byte1 & 0b111;
    let immediate = if width == Width::Word {
        cursor.read_word()?
    } else {
        cursor.read_byte()? as u16
    };

    Ok(DecodedOperands {
        direction: Some(Direction::RegDest),
        width: Width_(width),
        mode: None,
        reg_index: reg,
        rm_index: 0,
        displacement: 0,
        immediate,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// §4.3.3 — AX / direct-memory form (`0xA0`-`0xA3`): `w` is bit 0,
/// followed by a 16-bit address. `MoveToAx` reads AL/AX from that address;
/// `MoveAx` writes AL/AX to it.
pub fn decode_ax_direct(cursor: &mut Cursor, byte1: u8) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 & 0b01 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let address = cursor.read_word()?;

    Ok(DecodedOperands {
        direction: None,
        width: Width_(width),
        mode: Some(Mode::Mem),
        reg_index: 0,
        rm_index: 0,
        displacement: address,
        immediate: 0,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// §4.3.3 — accumulator-immediate short forms (`0x04/05`, `0x24/25`): a
/// `w`-typed immediate with no ModR/M byte at all.
pub fn decode_immediate_to_ax(
    cursor: &mut Cursor,
    byte1: u8,
) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 & 0b01 != 0 {
        Width::Word
    } else {
        Width::Byte
    };
    let immediate = if width == Width::Word {
        cursor.read_word()?
    } else {
        cursor.read_byte()? as u16
    };

    Ok(DecodedOperands {
        direction: None,
        width: Width_(width),
        mode: None,
        reg_index: 0,
        rm_index: 0,
        displacement: 0,
        immediate,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// §4.3.3 — compact register forms: register index in bits 2:0 of byte1,
/// no further bytes. Used by PUSH_REGISTER, POP_REGISTER, INC_REGISTER,
/// DEC_REGISTER, XCHG_AX.
pub fn decode_register_compact(byte1: u8) -> DecodedOperands {
    DecodedOperands {
        direction: None,
        width: Width_(Width::Word),
        mode: None,
        reg_index: byte1 & 0b111,
        rm_index: 0,
        displacement: 0,
        immediate: 0,
        instruction_size_bytes: 1,
        sign_extend: false,
    }
}

/// §4.3.3 — conditional jump / LOOP family: one signed 8-bit displacement,
/// no ModR/M.
pub fn decode_conditional_jump(cursor: &mut Cursor) -> Result<DecodedOperands, EmulatorError> {
    let offset = cursor.read_byte()?;
    Ok(DecodedOperands {
        direction: None,
        width: Width_(Width::Byte),
        mode: None,
        reg_index: 0,
        rm_index: 0,
        // Sign-extended at decode time so consumers never have to
        // re-interpret a zero-extended byte as a two's-complement offset.
        displacement: (offset as i8) as i16 as u16,
        immediate: 0,
        instruction_size_bytes: 2,
        sign_extend: true,
    })
}

/// `0xFE`/`0xFF` group (INC/DEC/CALL/JMP/PUSH): ModR/M only, no immediate.
/// `0xFE` is always byte-sized; `0xFF`'s non-INC/DEC subops all operate on
/// a word (a call/jump target or a pushed value).
pub fn decode_inc_dec_group(cursor: &mut Cursor, byte1: u8) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 == 0xFE { Width::Byte } else { Width::Word };
    let (mode, subop, rm, displacement) = decode_modrm(cursor)?;

    Ok(DecodedOperands {
        direction: None,
        width: Width_(width),
        mode: Some(mode),
        reg_index: subop,
        rm_index: rm,
        displacement,
        immediate: 0,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

/// `0xF6`/`0xF7` unary group: ModR/M, then an immediate only for the
/// TEST subopcodes (0 and 1) — NOT/NEG/MUL/IMUL/DIV/IDIV take no
/// immediate at all.
pub fn decode_unary_group(cursor: &mut Cursor, byte1: u8) -> Result<DecodedOperands, EmulatorError> {
    let start = cursor.ip();
    let width = if byte1 & 1 != 0 { Width::Word } else { Width::Byte };
    let (mode, subop, rm, displacement) = decode_modrm(cursor)?;

    let immediate = if subop == 0 || subop == 1 {
        if width == Width::Word {
            cursor.read_word()?
        } else {
            cursor.read_byte()? as u16
        }
    } else {
        0
    };

    Ok(DecodedOperands {
        direction: None,
        width: Width_(width),
        mode: Some(mode),
        reg_index: subop,
        rm_index: rm,
        displacement,
        immediate,
        instruction_size_bytes: (cursor.ip().wrapping_sub(start) + 1) as u8,
        sign_extend: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn cursor_over<'a>(mem: &'a Memory, ip: &'a mut u16) -> Cursor<'a> {
        Cursor::new(mem, ip)
    }

    #[test]
    fn standard_reg_to_reg_mov() {
        // mov cx, bx -> 89 D9 (mod=11 reg=011(BX) rm=001(CX), d=0 w=1)
        let mut mem = Memory::new(8);
        mem.write(0, 0x89);
        mem.write(1, 0xD9);
        let mut ip = 1u16; // byte1 already consumed by the caller
        let mut cursor = cursor_over(&mem, &mut ip);
        let ops = decode_standard(&mut cursor, 0x89).unwrap();
        assert_eq!(ops.mode, Some(Mode::Reg));
        assert_eq!(ops.reg_index, 0b011);
        assert_eq!(ops.rm_index, 0b001);
        assert_eq!(ops.direction, Some(Direction::RegSource));
        assert_eq!(*ops.width, Width::Word);
        assert_eq!(ops.instruction_size_bytes, 2);
    }

    #[test]
    fn direct_address_special_case_reads_disp16() {
        // mov word [1000], 1 -> C7 06 E8 03 01 00
        let mut mem = Memory::new(8);
        let bytes = [0xC7u8, 0x06, 0xE8, 0x03, 0x01, 0x00];
        for (i, b) in bytes.iter().enumerate() {
            mem.write(i as u16, *b);
        }
        let mut ip = 1u16;
        let mut cursor = cursor_over(&mem, &mut ip);
        let ops = decode_move_immediate(&mut cursor, 0xC7).unwrap();
        assert_eq!(ops.mode, Some(Mode::Mem));
        assert_eq!(ops.rm_index, 0b110);
        assert_eq!(ops.displacement, 1000);
        assert_eq!(ops.immediate, 1);
        assert_eq!(ops.instruction_size_bytes, 6);
    }

    #[test]
    fn sign_extend_regression_and_cx_0xff80() {
        // and cx, 0xFF80 -> 83 E1 80 : s=1 w=1, one byte immediate sign-extended.
        let mut mem = Memory::new(8);
        let bytes = [0x83u8, 0xE1, 0x80];
        for (i, b) in bytes.iter().enumerate() {
            mem.write(i as u16, *b);
        }
        let mut ip = 1u16;
        let mut cursor = cursor_over(&mem, &mut ip);
        let ops = decode_standard_immediate(&mut cursor, 0x83).unwrap();
        assert!(ops.sign_extend);
        assert_eq!(ops.immediate, 0xFF80);
    }

    #[test]
    fn effective_address_direct_special_case() {
        let get = |_i: u8| 0u16;
        let ea = effective_address(0b110, Mode::Mem, 1000, get);
        assert_eq!(ea, EffectiveAddress::Memory(1000));
    }

    #[test]
    fn effective_address_bp_no_displacement() {
        let get = |i: u8| if i == 5 { 0x50 } else { 0 };
        let ea = effective_address(0b110, Mode::MemDisp8, 0, get);
        assert_eq!(ea, EffectiveAddress::Memory(0x50));
    }

    #[test]
    fn effective_address_bx_si() {
        let get = |i: u8| match i {
            3 => 0x10, // BX
            6 => 0x04, // SI
            _ => 0,
        };
        let ea = effective_address(0, Mode::Mem, 0, get);
        assert_eq!(ea, EffectiveAddress::Memory(0x14));
    }
}
