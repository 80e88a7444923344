//! The fixed opcode table.

/// Every instruction the CPU understands. The discriminant is the encoded opcode byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `LDA #imm`
    LdaImm = 0xA9,
    /// `LDA addr`
    LdaAbs = 0xAD,
    /// `STA addr`
    StaAbs = 0x8D,
    /// `ADC addr`, no carry.
    AdcAbs = 0x6D,
    LdxImm = 0xA2,
    LdxAbs = 0xAE,
    LdyImm = 0xA0,
    LdyAbs = 0xAC,
    Nop = 0xEA,
    Brk = 0x00,
    /// Compare X with memory; sets Z on equality.
    CpxAbs = 0xEC,
    /// Branch by a signed byte when Z is clear.
    Bne = 0xD0,
    /// Increment memory. Does not touch Z.
    IncAbs = 0xEE,
    /// System call selected by X.
    Sys = 0xFF,
}

impl Opcode {
    pub const ALL: [Opcode; 14] = [
        Opcode::LdaImm,
        Opcode::LdaAbs,
        Opcode::StaAbs,
        Opcode::AdcAbs,
        Opcode::LdxImm,
        Opcode::LdxAbs,
        Opcode::LdyImm,
        Opcode::LdyAbs,
        Opcode::Nop,
        Opcode::Brk,
        Opcode::CpxAbs,
        Opcode::Bne,
        Opcode::IncAbs,
        Opcode::Sys,
    ];

    pub fn decode(byte: u8) -> Option<Self> {
        Some(match byte {
            0xA9 => Opcode::LdaImm,
            0xAD => Opcode::LdaAbs,
            0x8D => Opcode::StaAbs,
            0x6D => Opcode::AdcAbs,
            0xA2 => Opcode::LdxImm,
            0xAE => Opcode::LdxAbs,
            0xA0 => Opcode::LdyImm,
            0xAC => Opcode::LdyAbs,
            0xEA => Opcode::Nop,
            0x00 => Opcode::Brk,
            0xEC => Opcode::CpxAbs,
            0xD0 => Opcode::Bne,
            0xEE => Opcode::IncAbs,
            0xFF => Opcode::Sys,
            _ => return None,
        })
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Encoded length in bytes (opcode plus inline operands).
    pub const fn len(self) -> u8 {
        match self {
            Opcode::Nop | Opcode::Brk | Opcode::Sys => 1,
            Opcode::LdaImm | Opcode::LdxImm | Opcode::LdyImm | Opcode::Bne => 2,
            Opcode::LdaAbs
            | Opcode::StaAbs
            | Opcode::AdcAbs
            | Opcode::LdxAbs
            | Opcode::LdyAbs
            | Opcode::CpxAbs
            | Opcode::IncAbs => 3,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LdaImm | Opcode::LdaAbs => "LDA",
            Opcode::StaAbs => "STA",
            Opcode::AdcAbs => "ADC",
            Opcode::LdxImm | Opcode::LdxAbs => "LDX",
            Opcode::LdyImm | Opcode::LdyAbs => "LDY",
            Opcode::Nop => "NOP",
            Opcode::Brk => "BRK",
            Opcode::CpxAbs => "CPX",
            Opcode::Bne => "BNE",
            Opcode::IncAbs => "INC",
            Opcode::Sys => "SYS",
        }
    }
}
