//! Components relating to decoded LS-8 instructions.
//!
//! This module holds:
//! - [`Reg`]: a register index (R0-R7),
//! - [`Opcode`]: the one-byte operation identifiers of the LS-8 instruction set,
//! - [`Instr`]: a fully decoded instruction (opcode together with its operands).

use crate::sim::SimErr;

/// A register. Must be between 0 and 7.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// or by using [`Reg::try_from`].
///
/// ## Examples
///
/// ```text
/// LDI R0, 8
///     ~~
/// MUL R0, R1
///     ~~  ~~
/// PUSH R2
///      ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// The 0th register in the register file.
    pub const R0: Reg = Reg(0);
    /// The 1st register in the register file.
    pub const R1: Reg = Reg(1);
    /// The 2nd register in the register file.
    pub const R2: Reg = Reg(2);
    /// The 3rd register in the register file.
    pub const R3: Reg = Reg(3);
    /// The 4th register in the register file.
    pub const R4: Reg = Reg(4);
    /// The 5th register in the register file.
    pub const R5: Reg = Reg(5);
    /// The 6th register in the register file.
    pub const R6: Reg = Reg(6);
    /// The 7th register in the register file.
    pub const R7: Reg = Reg(7);

    /// The stack pointer (an alias of R7).
    pub const SP: Reg = R7;
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = SimErr;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=7 => Ok(Reg(value)),
            _     => Err(SimErr::RegisterOutOfRange(value)),
        }
    }
}

macro_rules! opcodes {
    ($($(#[$m:meta])* $name:ident = $value:literal),+ $(,)?) => {
        /// An LS-8 opcode.
        ///
        /// The bits of each opcode byte are laid out as `AABCDDDD`, where:
        /// - `AA` is the number of operands following the opcode,
        /// - `B` is set if the operation is handled by the ALU,
        /// - `C` is set if the instruction sets the PC directly,
        /// - `DDDD` identifies the instruction.
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$m])* $name = $value),+
        }

        impl TryFrom<u8> for Opcode {
            type Error = SimErr;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$name)),+,
                    _ => Err(SimErr::UnknownOpcode(value))
                }
            }
        }

        impl std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$name => f.write_str(stringify!($name))),+
                }
            }
        }
    };
}
opcodes! {
    /// Halt the machine.
    HLT  = 0b0000_0001,
    /// Return from a subroutine.
    RET  = 0b0001_0001,
    /// Push a register onto the stack.
    PUSH = 0b0100_0101,
    /// Pop the top of the stack into a register.
    POP  = 0b0100_0110,
    /// Print a register's value.
    PRN  = 0b0100_0111,
    /// Call a subroutine.
    CALL = 0b0101_0000,
    /// Jump unconditionally.
    JMP  = 0b0101_0100,
    /// Jump if the equal flag is set.
    JEQ  = 0b0101_0101,
    /// Jump if the equal flag is clear.
    JNE  = 0b0101_0110,
    /// Load an immediate value into a register.
    LDI  = 0b1000_0010,
    /// Add two registers.
    ADD  = 0b1010_0000,
    /// Multiply two registers.
    MUL  = 0b1010_0010,
    /// Compare two registers.
    CMP  = 0b1010_0111,
}

impl Opcode {
    /// The byte encoding of this opcode.
    pub fn byte(self) -> u8 {
        self as u8
    }
    /// The number of operand bytes that follow this opcode.
    pub fn operands(self) -> u8 {
        self.byte() >> 6
    }
    /// The full length of this instruction in bytes (opcode included).
    pub fn width(self) -> u8 {
        self.operands() + 1
    }
    /// Whether this operation is performed by the ALU.
    pub fn is_alu(self) -> bool {
        self.byte() & 0b0010_0000 != 0
    }
    /// Whether this instruction sets the PC itself.
    pub fn sets_pc(self) -> bool {
        self.byte() & 0b0001_0000 != 0
    }
}

/// A decoded LS-8 instruction.
///
/// Every instruction is decoded out of a fixed 3-byte window
/// (the opcode and the two bytes following it),
/// regardless of how many operands the instruction actually uses.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Instr {
    /// `HLT`: stops the machine.
    HLT,
    /// `LDI reg, imm`: `reg = imm`.
    LDI(Reg, u8),
    /// `PRN reg`: outputs `reg` as a decimal number.
    PRN(Reg),
    /// `MUL a, b`: `a = a * b` (wrapping).
    MUL(Reg, Reg),
    /// `ADD a, b`: `a = a + b` (wrapping).
    ADD(Reg, Reg),
    /// `CMP a, b`: sets the condition flags by comparing `a` and `b`.
    CMP(Reg, Reg),
    /// `PUSH reg`: decrements SP and stores `reg` at `mem[SP]`.
    PUSH(Reg),
    /// `POP reg`: loads `mem[SP]` into `reg` and increments SP.
    POP(Reg),
    /// `CALL reg`: pushes the return address and jumps to `reg`.
    CALL(Reg),
    /// `RET`: pops the return address into the PC.
    RET,
    /// `JMP reg`: jumps to `reg`.
    JMP(Reg),
    /// `JEQ reg`: jumps to `reg` if the equal flag is set.
    JEQ(Reg),
    /// `JNE reg`: jumps to `reg` if the equal flag is clear.
    JNE(Reg),
}

impl Instr {
    /// Decodes an instruction from its 3-byte fetch window.
    ///
    /// This fails if the opcode is not recognized
    /// or if a register operand is not between 0 and 7.
    /// Immediate operands are never checked.
    pub fn decode([op, a, b]: [u8; 3]) -> Result<Self, SimErr> {
        let reg = |byte: u8| Reg::try_from(byte);

        let instr = match Opcode::try_from(op)? {
            Opcode::HLT  => Instr::HLT,
            Opcode::RET  => Instr::RET,
            Opcode::PUSH => Instr::PUSH(reg(a)?),
            Opcode::POP  => Instr::POP(reg(a)?),
            Opcode::PRN  => Instr::PRN(reg(a)?),
            Opcode::CALL => Instr::CALL(reg(a)?),
            Opcode::JMP  => Instr::JMP(reg(a)?),
            Opcode::JEQ  => Instr::JEQ(reg(a)?),
            Opcode::JNE  => Instr::JNE(reg(a)?),
            Opcode::LDI  => Instr::LDI(reg(a)?, b),
            Opcode::ADD  => Instr::ADD(reg(a)?, reg(b)?),
            Opcode::MUL  => Instr::MUL(reg(a)?, reg(b)?),
            Opcode::CMP  => Instr::CMP(reg(a)?, reg(b)?),
        };

        Ok(instr)
    }

    /// The opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instr::HLT       => Opcode::HLT,
            Instr::LDI(_, _) => Opcode::LDI,
            Instr::PRN(_)    => Opcode::PRN,
            Instr::MUL(_, _) => Opcode::MUL,
            Instr::ADD(_, _) => Opcode::ADD,
            Instr::CMP(_, _) => Opcode::CMP,
            Instr::PUSH(_)   => Opcode::PUSH,
            Instr::POP(_)    => Opcode::POP,
            Instr::CALL(_)   => Opcode::CALL,
            Instr::RET       => Opcode::RET,
            Instr::JMP(_)    => Opcode::JMP,
            Instr::JEQ(_)    => Opcode::JEQ,
            Instr::JNE(_)    => Opcode::JNE,
        }
    }
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = self.opcode();
        match *self {
            Instr::HLT | Instr::RET => write!(f, "{op}"),
            Instr::LDI(r, imm) => write!(f, "{op} {r}, {imm}"),
            Instr::PRN(r) | Instr::PUSH(r) | Instr::POP(r)
            | Instr::CALL(r) | Instr::JMP(r) | Instr::JEQ(r) | Instr::JNE(r) => write!(f, "{op} {r}"),
            Instr::MUL(a, b) | Instr::ADD(a, b) | Instr::CMP(a, b) => write!(f, "{op} {a}, {b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::reg_consts::{R0, R1, R7};
    use super::{Instr, Opcode, Reg};
    use crate::sim::SimErr;

    #[test]
    fn test_reg_range() {
        for i in 0..8 {
            assert_eq!(Reg::try_from(i).map(Reg::reg_no), Ok(i));
        }
        assert_eq!(Reg::try_from(8), Err(SimErr::RegisterOutOfRange(8)));
        assert_eq!(Reg::try_from(255), Err(SimErr::RegisterOutOfRange(255)));
    }

    #[test]
    fn test_opcode_bits() {
        assert_eq!(Opcode::HLT.width(), 1);
        assert_eq!(Opcode::RET.width(), 1);
        assert_eq!(Opcode::PRN.width(), 2);
        assert_eq!(Opcode::CALL.width(), 2);
        assert_eq!(Opcode::LDI.width(), 3);
        assert_eq!(Opcode::CMP.width(), 3);

        assert!(Opcode::ADD.is_alu());
        assert!(Opcode::MUL.is_alu());
        assert!(Opcode::CMP.is_alu());
        assert!(!Opcode::LDI.is_alu());

        assert!(Opcode::CALL.sets_pc());
        assert!(Opcode::RET.sets_pc());
        assert!(Opcode::JNE.sets_pc());
        assert!(!Opcode::PUSH.sets_pc());
    }

    #[test]
    fn test_decode() {
        assert_eq!(Instr::decode([0x82, 0, 8]), Ok(Instr::LDI(R0, 8)));
        assert_eq!(Instr::decode([0x47, 0, 0xFF]), Ok(Instr::PRN(R0)));
        assert_eq!(Instr::decode([0xA2, 0, 1]), Ok(Instr::MUL(R0, R1)));
        assert_eq!(Instr::decode([0x01, 0xFF, 0xFF]), Ok(Instr::HLT));
        assert_eq!(Instr::decode([0x50, 7, 0]), Ok(Instr::CALL(R7)));

        // immediates are unchecked
        assert_eq!(Instr::decode([0x82, 1, 0xFF]), Ok(Instr::LDI(R1, 0xFF)));
    }

    #[test]
    fn test_decode_fail() {
        assert_eq!(Instr::decode([0x00, 0, 0]), Err(SimErr::UnknownOpcode(0x00)));
        assert_eq!(Instr::decode([0xFF, 0, 0]), Err(SimErr::UnknownOpcode(0xFF)));
        assert_eq!(Instr::decode([0x82, 8, 0]), Err(SimErr::RegisterOutOfRange(8)));
        assert_eq!(Instr::decode([0xA0, 0, 9]), Err(SimErr::RegisterOutOfRange(9)));
    }

    #[test]
    fn test_disasm() {
        assert_eq!(Instr::LDI(R0, 8).to_string(), "LDI R0, 8");
        assert_eq!(Instr::MUL(R0, R1).to_string(), "MUL R0, R1");
        assert_eq!(Instr::PUSH(R1).to_string(), "PUSH R1");
        assert_eq!(Instr::HLT.to_string(), "HLT");
    }
}
