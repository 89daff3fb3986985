//! Tag Decoder (C2, §4.2).
//!
//! `tag_of` is a pure, total function over `(byte1, byte2)`: every pair
//! maps to either a well-defined `Tag` or `Tag::Invalid`, and it never
//! panics (§8, tag-decoder totality). Grounded in the teacher's
//! `decoder.rs::decode_opcode`, which does the same one-byte-or-group-byte
//! classification for the 6502 and returns a plain enum instead of nesting
//! the sub-match into the dispatch table.

/// The single opcode identity produced by the tag decoder, abstracted from
/// the raw byte pattern. Tags with no registered C5 handler still decode
/// successfully here (§4.5.6) — only their execute/emit dispatch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    // Data transfer
    Move,
    MoveImmediate,
    MoveImmediateToRegister,
    MoveToAx,
    MoveAx,
    PushRegister,
    PopRegister,
    Push,
    Xchg,
    XchgAx,

    // Arithmetic
    Add,
    AddImmediate,
    AddImmediateToAx,
    AdcImmediate,
    Sub,
    SubImmediate,
    SbbImmediate,
    Cmp,
    CmpImmediate,
    Inc,
    IncRegister,
    Dec,
    DecRegister,

    // Logic
    And,
    AndImmediate,
    AndImmediateToAx,
    OrImmediate,
    XorImmediate,
    Not,
    Neg,
    TestImmediate,
    Mul,
    Imul,
    Div,
    Idiv,

    // Control transfer
    ConditionalJump(Condition),
    Loop,
    LoopZero,
    LoopNotZero,
    JumpIfCxZero,
    CallIndirect,
    JmpIndirect,

    // Processor control
    Clc,
    Stc,
    Cmc,

    /// No rule in §4.2 matched this byte pair.
    Invalid,
}

/// The 16 condition-code predicates of the 8086's `0x70`-`0x7F` Jcc block
/// (§4.5.4). Carried as data on `Tag::ConditionalJump` rather than as 16
/// separate tag variants, since they share one C5 handler and differ only
/// in which flag expression is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Jo,
    Jno,
    Jb,
    Jnb,
    Je,
    Jne,
    Jbe,
    Ja,
    Js,
    Jns,
    Jp,
    Jnp,
    Jl,
    Jnl,
    Jle,
    Jg,
}

/// ALU-immediate subopcode order for the `0x80`-`0x83` group (§4.2 rule 2).
fn alu_immediate_tag(subop: u8) -> Tag {
    match subop {
        0 => Tag::AddImmediate,
        1 => Tag::OrImmediate,
        2 => Tag::AdcImmediate,
        3 => Tag::SbbImmediate,
        4 => Tag::AndImmediate,
        5 => Tag::SubImmediate,
        6 => Tag::XorImmediate,
        7 => Tag::CmpImmediate,
        _ => unreachable!("subop is a 3-bit field"),
    }
}

/// `0xFE`/`0xFF` group (§4.2 rule 2).
fn inc_dec_group_tag(byte1: u8, subop: u8) -> Tag {
    match (byte1, subop) {
        (_, 0) => Tag::Inc,
        (_, 1) => Tag::Dec,
        (0xFF, 2) | (0xFF, 3) => Tag::CallIndirect,
        (0xFF, 4) | (0xFF, 5) => Tag::JmpIndirect,
        (0xFF, 6) => Tag::Push,
        _ => Tag::Invalid,
    }
}

/// `0xF6`/`0xF7` group (§4.2 rule 2).
fn unary_group_tag(subop: u8) -> Tag {
    match subop {
        0 | 1 => Tag::TestImmediate,
        2 => Tag::Not,
        3 => Tag::Neg,
        4 => Tag::Mul,
        5 => Tag::Imul,
        6 => Tag::Div,
        7 => Tag::Idiv,
        _ => unreachable!("subop is a 3-bit field"),
    }
}

fn condition_for(byte1: u8) -> Condition {
    match byte1 & 0x0F {
        0x0 => Condition::Jo,
        0x1 => Condition::Jno,
        0x2 => Condition::Jb,
        0x3 => Condition::Jnb,
        0x4 => Condition::Je,
        0x5 => Condition::Jne,
        0x6 => Condition::Jbe,
        0x7 => Condition::Ja,
        0x8 => Condition::Js,
        0x9 => Condition::Jns,
        0xA => Condition::Jp,
        0xB => Condition::Jnp,
        0xC => Condition::Jl,
        0xD => Condition::Jnl,
        0xE => Condition::Jle,
        0xF => Condition::Jg,
        _ => unreachable!("masked to 4 bits"),
    }
}

/// `(byte1, byte2) → Tag`, per §4.2. `byte2` is only consulted for the
/// group opcodes; the caller (C6) is responsible for supplying 0 when
/// `byte2` would read past the end of memory (§4.1 `peek_byte`).
pub fn tag_of(byte1: u8, byte2: u8) -> Tag {
    let subop = (byte2 >> 3) & 0b111;

    match byte1 {
        0x00..=0x03 => Tag::Add,
        0x04 | 0x05 => Tag::AddImmediateToAx,
        0x20..=0x23 => Tag::And,
        0x24 | 0x25 => Tag::AndImmediateToAx,
        0x28..=0x2B => Tag::Sub,
        0x38..=0x3B => Tag::Cmp,
        0x40..=0x47 => Tag::IncRegister,
        0x48..=0x4F => Tag::DecRegister,
        0x50..=0x57 => Tag::PushRegister,
        0x58..=0x5F => Tag::PopRegister,
        0x70..=0x7F => Tag::ConditionalJump(condition_for(byte1)),
        0x80..=0x83 => alu_immediate_tag(subop),
        0x86 | 0x87 => Tag::Xchg,
        0x88..=0x8B => Tag::Move,
        0x91..=0x97 => Tag::XchgAx,
        0xA0 | 0xA1 => Tag::MoveToAx,
        0xA2 | 0xA3 => Tag::MoveAx,
        0xB0..=0xBF => Tag::MoveImmediateToRegister,
        0xC6 | 0xC7 => Tag::MoveImmediate,
        0xE0 => Tag::LoopNotZero,
        0xE1 => Tag::LoopZero,
        0xE2 => Tag::Loop,
        0xE3 => Tag::JumpIfCxZero,
        0xF5 => Tag::Cmc,
        0xF6 | 0xF7 => unary_group_tag(subop),
        0xF8 => Tag::Clc,
        0xF9 => Tag::Stc,
        0xFE => inc_dec_group_tag(byte1, subop),
        0xFF => inc_dec_group_tag(byte1, subop),
        _ => Tag::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totality_never_panics() {
        for b1 in 0u16..=255 {
            for b2 in 0u16..=255 {
                let _ = tag_of(b1 as u8, b2 as u8);
            }
        }
    }

    #[test]
    fn standard_move() {
        assert_eq!(tag_of(0x89, 0xD9), Tag::Move);
    }

    #[test]
    fn move_immediate_to_register() {
        assert_eq!(tag_of(0xB9, 0x00), Tag::MoveImmediateToRegister);
    }

    #[test]
    fn alu_immediate_group_and() {
        // `and cx, 0xFF80` -> `83 E1 80`: reg field of E1 is 100 (AND).
        assert_eq!(tag_of(0x83, 0xE1), Tag::AndImmediate);
    }

    #[test]
    fn alu_immediate_group_covers_all_eight_subops() {
        let expected = [
            Tag::AddImmediate,
            Tag::OrImmediate,
            Tag::AdcImmediate,
            Tag::SbbImmediate,
            Tag::AndImmediate,
            Tag::SubImmediate,
            Tag::XorImmediate,
            Tag::CmpImmediate,
        ];
        for (subop, want) in expected.iter().enumerate() {
            let byte2 = (subop as u8) << 3;
            assert_eq!(tag_of(0x81, byte2), *want);
        }
    }

    #[test]
    fn conditional_jumps_cover_full_range() {
        assert_eq!(tag_of(0x74, 0), Tag::ConditionalJump(Condition::Je));
        assert_eq!(tag_of(0x75, 0), Tag::ConditionalJump(Condition::Jne));
        assert_eq!(tag_of(0x7F, 0), Tag::ConditionalJump(Condition::Jg));
    }

    #[test]
    fn carry_flag_triplet() {
        assert_eq!(tag_of(0xF8, 0), Tag::Clc);
        assert_eq!(tag_of(0xF9, 0), Tag::Stc);
        assert_eq!(tag_of(0xF5, 0), Tag::Cmc);
    }

    #[test]
    fn fe_group_byte_sized_only_supports_inc_dec() {
        assert_eq!(tag_of(0xFE, 0b000_00_000), Tag::Inc);
        assert_eq!(tag_of(0xFE, 0b001_00_000), Tag::Dec);
        assert_eq!(tag_of(0xFE, 0b010_00_000), Tag::Invalid);
    }

    #[test]
    fn ff_group_supports_call_jmp_push() {
        assert_eq!(tag_of(0xFF, 0b010_00_000), Tag::CallIndirect);
        assert_eq!(tag_of(0xFF, 0b100_00_000), Tag::JmpIndirect);
        assert_eq!(tag_of(0xFF, 0b110_00_000), Tag::Push);
    }

    #[test]
    fn f6_group_not() {
        assert_eq!(tag_of(0xF6, 0b010_00_000), Tag::Not);
        assert_eq!(tag_of(0xF7, 0b010_00_000), Tag::Not);
    }

    #[test]
    fn unknown_opcode_is_invalid() {
        assert_eq!(tag_of(0x0F, 0x00), Tag::Invalid);
    }

    #[test]
    fn loop_family() {
        assert_eq!(tag_of(0xE0, 0), Tag::LoopNotZero);
        assert_eq!(tag_of(0xE1, 0), Tag::LoopZero);
        assert_eq!(tag_of(0xE2, 0), Tag::Loop);
        assert_eq!(tag_of(0xE3, 0), Tag::JumpIfCxZero);
    }
}
