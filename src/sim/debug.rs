//! Breakpoints for debugging simulation.
//!
//! Insert a [`Breakpoint`] into `Simulator::breakpoints` and every run function
//! (anything but [`Simulator::step_in`]) pauses as soon as its condition holds
//! after an instruction finishes.
//!
//! ```
//! use ls8_ensemble::ast::reg_consts::R0;
//! use ls8_ensemble::parse::Program;
//! use ls8_ensemble::sim::Simulator;
//! use ls8_ensemble::sim::debug::{Breakpoint, Comparator};
//!
//! // LDI R0,8; LDI R0,9; HLT
//! let program = Program::new(vec![0x82, 0, 8, 0x82, 0, 9, 0x01]).unwrap();
//! let mut sim = Simulator::default();
//! sim.load_program(&program);
//!
//! sim.breakpoints.insert(Breakpoint::Reg { reg: R0, value: Comparator::Gt(0) });
//! sim.run().unwrap();
//! assert!(sim.hit_breakpoint());
//! assert_eq!(sim.pc, 3);
//! ```
use crate::ast::{Opcode, Reg};

use super::Simulator;

/// A condition on the simulator's state which pauses execution.
#[derive(PartialEq, Eq, Hash)]
pub enum Breakpoint {
    /// Pause when execution reaches this address.
    PC(u8),

    /// Pause when the next instruction to execute has this opcode.
    Op(Opcode),

    /// Pause when a register's value satisfies a comparison.
    Reg {
        /// The register to watch.
        reg: Reg,
        /// The comparison its value must satisfy.
        value: Comparator
    },

    /// Pause when a memory cell's value satisfies a comparison.
    Mem {
        /// The address to watch.
        addr: u8,
        /// The comparison its value must satisfy.
        value: Comparator
    },
}
impl Breakpoint where Breakpoint: Send + Sync {}

impl Breakpoint {
    /// Whether the simulator's current state triggers this breakpoint.
    pub fn check(&self, sim: &Simulator) -> bool {
        match self {
            Breakpoint::PC(addr) => sim.pc == *addr,
            Breakpoint::Op(op) => sim.mem[sim.pc] == op.byte(),
            Breakpoint::Reg { reg, value } => value.check(sim.reg_file[*reg]),
            Breakpoint::Mem { addr, value } => value.check(sim.mem[*addr]),
        }
    }
}
impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breakpoint::PC(addr) => write!(f, "Breakpoint(PC == 0x{addr:02X})"),
            Breakpoint::Op(op) => write!(f, "Breakpoint(op == {op})"),
            Breakpoint::Reg { reg, value } => write!(f, "Breakpoint({reg} {value})"),
            Breakpoint::Mem { addr, value } => write!(f, "Breakpoint(mem[0x{addr:02X}] {value})"),
        }
    }
}

/// A comparison against a fixed byte.
///
/// Each variant holds the right-hand side; the watched value is the left-hand side
/// (so `Lt(5)` holds for any value below 5).
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum Comparator {
    /// Never holds.
    Never,
    /// `value < rhs`
    Lt(u8),
    /// `value == rhs`
    Eq(u8),
    /// `value <= rhs`
    Le(u8),
    /// `value > rhs`
    Gt(u8),
    /// `value != rhs`
    Ne(u8),
    /// `value >= rhs`
    Ge(u8),
    /// Always holds.
    Always
}
impl Comparator {
    /// Splits this comparator into its operator and right-hand side
    /// (or `None` for the constant comparators).
    fn parts(self) -> Option<(&'static str, u8)> {
        match self {
            Comparator::Never | Comparator::Always => None,
            Comparator::Lt(rhs) => Some(("<", rhs)),
            Comparator::Eq(rhs) => Some(("==", rhs)),
            Comparator::Le(rhs) => Some(("<=", rhs)),
            Comparator::Gt(rhs) => Some((">", rhs)),
            Comparator::Ne(rhs) => Some(("!=", rhs)),
            Comparator::Ge(rhs) => Some((">=", rhs)),
        }
    }

    /// Whether the value satisfies this comparison.
    pub fn check(self, value: u8) -> bool {
        match self {
            Comparator::Never  => false,
            Comparator::Always => true,
            Comparator::Lt(rhs) => value < rhs,
            Comparator::Eq(rhs) => value == rhs,
            Comparator::Le(rhs) => value <= rhs,
            Comparator::Gt(rhs) => value > rhs,
            Comparator::Ne(rhs) => value != rhs,
            Comparator::Ge(rhs) => value >= rhs,
        }
    }
}
impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self, self.parts()) {
            (_, Some((op, rhs))) => write!(f, "{op} {rhs}"),
            (Comparator::Never, None) => f.write_str("never"),
            (_, None) => f.write_str("always"),
        }
    }
}
