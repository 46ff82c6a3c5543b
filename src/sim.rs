//! Simulating and execution for LS-8 programs.
//!
//! This module is focused on executing loaded programs (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Simulator`]: The struct that simulates the machine.
//! - [`mem`]: The module handling memory, the register file, and the condition flags.
//! - [`device`]: The module handling the output of the `PRN` instruction.
//! - [`debug`]: The module handling types of breakpoints for the simulator.
//!
//! # Usage
//!
//! To simulate some code, you need to instantiate a Simulator and load a program to it:
//!
//! ```
//! use ls8_ensemble::parse::Program;
//! use ls8_ensemble::sim::Simulator;
//!
//! let program = Program::new(vec![0b0000_0001]).unwrap(); // HLT
//! let mut simulator = Simulator::new(Default::default());
//! simulator.load_program(&program);
//! simulator.run().unwrap();
//! assert!(simulator.hit_halt());
//! ```
//!
//! ## Execution
//!
//! Each cycle, the simulator fetches 3 bytes starting at the PC
//! (the opcode and two operand bytes, regardless of whether the instruction uses them),
//! decodes them into an [`Instr`], and executes it.
//! The PC then advances past the instruction, unless the instruction set the PC itself.
//!
//! [`Simulator::run`] executes until the machine halts. For finer control there are:
//! - [`Simulator::step_in`], [`Simulator::step_over`], [`Simulator::step_out`]: stepping by instruction or by subroutine
//! - [`Simulator::run_with_limit`], [`Simulator::run_while`]: running under a step budget or a caller-supplied condition
//!
//! ```
//! use ls8_ensemble::parse::parse_program;
//! use ls8_ensemble::sim::Simulator;
//! use ls8_ensemble::sim::device::BufferedDisplay;
//! use ls8_ensemble::ast::reg_consts::{R0, R1};
//!
//! let src = "
//!     10000010 # LDI R0,8
//!     00000000
//!     00001000
//!     10000010 # LDI R1,9
//!     00000001
//!     00001001
//!     10100010 # MUL R0,R1
//!     00000000
//!     00000001
//!     01000111 # PRN R0
//!     00000000
//!     00000001 # HLT
//! ";
//! let program = parse_program(src).unwrap();
//!
//! let mut sim = Simulator::new(Default::default());
//! let display = BufferedDisplay::default();
//! sim.set_output(display.clone());
//! sim.load_program(&program);
//!
//! // One instruction at a time:
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 8);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R1], 9);
//! sim.step_in().unwrap();
//! assert_eq!(sim.reg_file[R0], 72);
//!
//! // Running the rest:
//! sim.run().unwrap();
//! assert_eq!(&*display.get_buffer().read().unwrap(), &[72]);
//! ```
//!
//! ## Querying State
//!
//! - The PC is the `sim.pc` field.
//! - The register file is the `sim.reg_file` field, which can be indexed with a [`Reg`].
//! - Memory is the `sim.mem` field, which can be indexed with a `u8` address.
//! - The condition flags are available through [`Simulator::cond`].
//!
//! ## Errors
//!
//! Any error stops execution immediately; there is no recovery.
//! The instruction which caused the error has no effect, and the PC still points at it.
//!
//! ```
//! use ls8_ensemble::parse::Program;
//! use ls8_ensemble::sim::{Simulator, SimErr};
//!
//! let program = Program::new(vec![0b1111_1111]).unwrap();
//! let mut sim = Simulator::new(Default::default());
//! sim.load_program(&program);
//!
//! assert_eq!(sim.run(), Err(SimErr::UnknownOpcode(0xFF)));
//! assert_eq!(sim.pc, 0);
//! ```
//!
//! ## Breakpoints
//!
//! The `breakpoints` field of [`Simulator`] holds a set of [`Breakpoint`]s.
//! Every execution function except [`Simulator::step_in`] pauses once any of them holds.
//!
//! Each executed cycle is also logged (at the `trace` level) in the format produced by [`Simulator::trace`].
//!
//! [`Breakpoint`]: self::debug::Breakpoint
pub mod mem;
pub mod debug;
pub mod device;

use std::collections::HashSet;

use crate::ast::reg_consts::SP;
use crate::ast::{Instr, Opcode, Reg};
use crate::parse::Program;
use debug::Breakpoint;
use device::{OutputDevice, OutputHandle};

use self::mem::{CondFlags, MachineInitStrategy, Mem, RegFile};

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SimErr {
    /// The byte at the PC is not a recognized opcode.
    UnknownOpcode(u8),
    /// A register operand was not between 0 and 7.
    RegisterOutOfRange(u8),
    /// An address past the end of memory was accessed
    /// (or the PC was advanced past the end of memory).
    AddressOutOfRange(u16),
    /// A push was attempted while the stack pointer was at address 0.
    StackOverflow,
    /// A pop was attempted while the stack pointer was at the last address of memory.
    StackUnderflow,
    /// The ALU was invoked with an operation it does not implement.
    UnsupportedAluOp(Opcode),
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::UnknownOpcode(op)       => write!(f, "unknown instruction 0x{op:02X}"),
            SimErr::RegisterOutOfRange(r)   => write!(f, "register index {r} out of range"),
            SimErr::AddressOutOfRange(addr) => write!(f, "address 0x{addr:X} out of range"),
            SimErr::StackOverflow           => f.write_str("stack overflow"),
            SimErr::StackUnderflow          => f.write_str("stack underflow"),
            SimErr::UnsupportedAluOp(op)    => write!(f, "unsupported ALU operation {op}"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::UnknownOpcode(_)      => Some("check that the PC did not run into data or past a missing HLT".into()),
            SimErr::RegisterOutOfRange(_) => Some("registers are numbered R0-R7".into()),
            SimErr::AddressOutOfRange(_)  => Some(format!("memory only spans 0x00-0x{:02X}; programs must HLT before running off its end", mem::MEM_SIZE - 1).into()),
            SimErr::StackOverflow         => Some("check for unbounded recursion or PUSHes without matching POPs".into()),
            SimErr::StackUnderflow        => Some("check for POPs or RETs without a matching PUSH or CALL".into()),
            SimErr::UnsupportedAluOp(_)   => None,
        }
    }
}

/// Why a step did not complete normally.
enum StepBreak {
    /// A halt was executed.
    Halt,
    /// The instruction failed.
    Err(SimErr),
}
impl From<SimErr> for StepBreak {
    fn from(value: SimErr) -> Self {
        Self::Err(value)
    }
}

/// How the PC changes after an instruction is executed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Flow {
    /// Advance the PC by the given number of bytes.
    Advance(u8),
    /// The instruction set the PC to this address.
    Jump(u8),
    /// Stop the machine.
    Halt,
}

/// Why the last run stopped (when it did not stop on an error).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
enum PauseCondition {
    /// `HLT` was executed.
    Halt,
    /// A breakpoint held.
    Breakpoint,
    /// The run condition stopped holding.
    Tripwire,
    /// The run ended in an error (or nothing has run yet).
    #[default]
    Unsuccessful
}

/// Configuration flags for [`Simulator`].
///
/// Flags can be changed on a live `Simulator`; [`Simulator::reset`] keeps them.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct SimFlags {
    /// The creation strategy for memory.
    ///
    /// This is used to initialize the `mem` field.
    /// Changing it has no effect until the next `Simulator::new` or `Simulator::reset`.
    ///
    /// By default, this flag is [`MachineInitStrategy::default`] (zeroed memory).
    pub machine_init: MachineInitStrategy,
}

/// Executes LS-8 programs.
#[derive(Debug)]
pub struct Simulator {
    // Machine state. [`Simulator::reset`] reinitializes everything here.

    /// Memory (program, data, and stack).
    pub mem: Mem,

    /// The eight general purpose registers (R7 is the stack pointer).
    pub reg_file: RegFile,

    /// The program counter.
    pub pc: u8,

    /// The condition flags, set by `CMP`.
    cond: CondFlags,

    /// The number of `CALL`s which have not yet been matched with a `RET`.
    frame_depth: u64,

    /// How many instructions have completed (`HLT` excluded).
    ///
    /// Callers may clear this freely.
    pub instructions_run: u64,

    /// Why the last call of the run family returned.
    pause_condition: PauseCondition,

    // Settings. [`Simulator::reset`] keeps everything here.

    /// Configuration (see [`SimFlags`]).
    pub flags: SimFlags,

    /// Conditions which pause the run family.
    pub breakpoints: HashSet<Breakpoint>,

    /// Where `PRN` sends its output.
    output: OutputHandle,
}
impl Simulator where Simulator: Send {}

impl Simulator {
    /// Creates a new simulator with the provided flags, but without a loaded program.
    pub fn new(flags: SimFlags) -> Self {
        let mut filler = flags.machine_init.generator();

        Self {
            mem: Mem::new(&mut filler),
            reg_file: RegFile::new(),
            pc: 0,
            cond: CondFlags::new(),
            frame_depth: 0,
            instructions_run: 0,
            pause_condition: Default::default(),

            flags,
            breakpoints: Default::default(),
            output: Default::default(),
        }
    }

    /// Resets the simulator.
    ///
    /// Machine state returns to what [`Simulator::new`] produces. Kept as-is:
    /// - Flags
    /// - Breakpoints
    /// - The output device (however, its output is reset)
    ///
    /// Memory is refilled, so the program has to be loaded again.
    pub fn reset(&mut self) {
        let flags = self.flags;
        let breakpoints = std::mem::take(&mut self.breakpoints);
        let output = std::mem::take(&mut self.output);

        *self = Simulator::new(flags);
        self.breakpoints = breakpoints;
        self.output = output;
        self.output.reset();

        log::debug!("simulator reset");
    }

    /// Loads a program into this simulator, starting at address 0.
    pub fn load_program(&mut self, program: &Program) {
        self.mem.copy_program(program.as_bytes());
        log::debug!("loaded {} bytes into memory", program.len());
    }

    /// Sets the device which `PRN` sends its output to.
    ///
    /// By default, this is [`device::StdoutDisplay`].
    pub fn set_output(&mut self, dev: impl OutputDevice) {
        self.output = OutputHandle::new(dev);
    }

    /// Gets the condition flags.
    pub fn cond(&self) -> CondFlags {
        self.cond
    }

    /// The number of subroutine frames deep the simulator is
    /// (`CALL` increases this by 1, `RET` decreases it by 1).
    pub fn frame_depth(&self) -> u64 {
        self.frame_depth
    }

    /// Whether the last run paused on a breakpoint.
    pub fn hit_breakpoint(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Breakpoint)
    }

    /// Whether the last run (or step) executed `HLT`.
    pub fn hit_halt(&self) -> bool {
        matches!(self.pause_condition, PauseCondition::Halt)
    }

    /// Renders the state of the machine for the current cycle.
    ///
    /// This consists of the PC, the 3 bytes of the fetch window, and the register file, all in hex.
    ///
    /// ```
    /// use ls8_ensemble::sim::Simulator;
    ///
    /// let sim = Simulator::default();
    /// assert_eq!(sim.trace(), "TRACE: 00 | 00 00 00 | 00 00 00 00 00 00 00 F4");
    /// ```
    pub fn trace(&self) -> String {
        let [op, a, b] = self.mem.fetch_window(self.pc);
        let regs: String = self.reg_file.as_slice()
            .iter()
            .map(|r| format!(" {r:02X}"))
            .collect();

        format!("TRACE: {:02X} | {op:02X} {a:02X} {b:02X} |{regs}", self.pc)
    }

    /// Computes the PC after advancing by the given number of bytes,
    /// erroring if that would go past the end of memory.
    fn advanced_pc(&self, len: u8) -> Result<u8, SimErr> {
        self.pc.checked_add(len)
            .ok_or(SimErr::AddressOutOfRange(u16::from(self.pc) + u16::from(len)))
    }

    /// Decrements the stack pointer and writes the value to the top of the stack.
    fn push(&mut self, value: u8) -> Result<(), SimErr> {
        let sp = self.reg_file[SP]
            .checked_sub(1)
            .ok_or(SimErr::StackOverflow)?;

        self.reg_file[SP] = sp;
        self.mem[sp] = value;
        Ok(())
    }

    /// Reads the value at the top of the stack and increments the stack pointer.
    fn pop(&mut self) -> Result<u8, SimErr> {
        let sp = self.reg_file[SP];
        let next_sp = sp.checked_add(1).ok_or(SimErr::StackUnderflow)?;

        let value = self.mem[sp];
        self.reg_file[SP] = next_sp;
        Ok(value)
    }

    /// Writes the value at the top of the stack into `dr`, then increments the stack pointer.
    ///
    /// If `dr` is the stack pointer, the increment applies to the popped value.
    fn pop_into(&mut self, dr: Reg) -> Result<(), SimErr> {
        let sp = self.reg_file[SP];
        sp.checked_add(1).ok_or(SimErr::StackUnderflow)?;

        let value = self.mem[sp];
        let base = if dr == SP { value } else { sp };
        let next_sp = base.checked_add(1).ok_or(SimErr::StackUnderflow)?;

        self.reg_file[dr] = value;
        self.reg_file[SP] = next_sp;
        Ok(())
    }

    /// Sends a value to the output device.
    fn print(&mut self, value: u8) {
        if !self.output.print(value) {
            log::warn!("output device did not accept value {value}");
        }
    }

    /// Performs an arithmetic or comparison operation on two registers.
    ///
    /// - `ADD`: `a = a + b` (wrapping)
    /// - `MUL`: `a = a * b` (wrapping)
    /// - `CMP`: sets exactly one condition flag, depending on whether `a` is less than, equal to, or greater than `b`
    ///
    /// Any other opcode raises [`SimErr::UnsupportedAluOp`].
    pub fn alu(&mut self, op: Opcode, a: Reg, b: Reg) -> Result<(), SimErr> {
        if !op.is_alu() {
            return Err(SimErr::UnsupportedAluOp(op));
        }
        let (lhs, rhs) = (self.reg_file[a], self.reg_file[b]);

        match op {
            Opcode::ADD => self.reg_file[a] = lhs.wrapping_add(rhs),
            Opcode::MUL => self.reg_file[a] = lhs.wrapping_mul(rhs),
            Opcode::CMP => self.cond = CondFlags::from_ordering(lhs.cmp(&rhs)),
            op => return Err(SimErr::UnsupportedAluOp(op)),
        }

        Ok(())
    }

    /// Whether executing this instruction (in the current state) continues at the next instruction.
    ///
    /// `CALL` counts, as its return address is the next instruction.
    fn falls_through(&self, instr: Instr) -> bool {
        match instr {
            Instr::HLT     => false,
            Instr::CALL(_) => true,
            Instr::JEQ(_)  => !self.cond.is_equal(),
            Instr::JNE(_)  => self.cond.is_equal(),
            _ => !instr.opcode().sets_pc(),
        }
    }

    /// Executes a decoded instruction, returning how the PC should change.
    fn execute(&mut self, instr: Instr) -> Result<Flow, SimErr> {
        let next = Flow::Advance(instr.opcode().width());

        let flow = match instr {
            Instr::HLT => Flow::Halt,
            Instr::LDI(dr, imm) => {
                self.reg_file[dr] = imm;
                next
            },
            Instr::PRN(sr) => {
                self.print(self.reg_file[sr]);
                next
            },
            Instr::MUL(a, b) | Instr::ADD(a, b) | Instr::CMP(a, b) => {
                self.alu(instr.opcode(), a, b)?;
                next
            },
            Instr::PUSH(sr) => {
                self.push(self.reg_file[sr])?;
                next
            },
            Instr::POP(dr) => {
                self.pop_into(dr)?;
                next
            },
            Instr::CALL(br) => {
                let ret_addr = self.advanced_pc(instr.opcode().width())?;
                self.push(ret_addr)?;
                self.frame_depth += 1;
                Flow::Jump(self.reg_file[br])
            },
            Instr::RET => {
                let ret_addr = self.pop()?;
                self.frame_depth = self.frame_depth.saturating_sub(1);
                Flow::Jump(ret_addr)
            },
            Instr::JMP(br) => Flow::Jump(self.reg_file[br]),
            Instr::JEQ(br) => match self.cond.is_equal() {
                true  => Flow::Jump(self.reg_file[br]),
                false => next,
            },
            Instr::JNE(br) => match self.cond.is_equal() {
                true  => next,
                false => Flow::Jump(self.reg_file[br]),
            },
        };

        Ok(flow)
    }

    /// Fetches, decodes, and executes the instruction at the PC.
    ///
    /// If this errors, the state is left as it was before the instruction.
    fn step(&mut self) -> Result<(), StepBreak> {
        log::trace!("{}", self.trace());

        let instr = Instr::decode(self.mem.fetch_window(self.pc))?;

        // Checked up front so that a failing instruction has no effect.
        if self.falls_through(instr) {
            self.advanced_pc(instr.opcode().width())?;
        }

        match self.execute(instr)? {
            Flow::Advance(len) => self.pc = self.advanced_pc(len)?,
            Flow::Jump(addr) => self.pc = addr,
            Flow::Halt => {
                log::debug!("halted at 0x{:02X} after {} instructions", self.pc, self.instructions_run);
                return Err(StepBreak::Halt);
            },
        }

        self.instructions_run = self.instructions_run.wrapping_add(1);
        Ok(())
    }

    /// Executes instructions while `tripwire` returns true.
    ///
    /// Execution also stops on `HLT`, on an error, or once a breakpoint holds.
    /// `tripwire` is consulted before each instruction.
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Simulator) -> bool) -> Result<(), SimErr> {
        std::mem::take(&mut self.pause_condition);

        let result = loop {
            if !tripwire(self) {
                break Ok(PauseCondition::Tripwire);
            }

            match self.step() {
                Ok(_) => {},
                Err(StepBreak::Halt) => break Ok(PauseCondition::Halt),
                Err(StepBreak::Err(e)) => break Err(e)
            }

            // breakpoints are checked after the instruction completes
            if self.breakpoints.iter().any(|bp| bp.check(self)) {
                break Ok(PauseCondition::Breakpoint);
            }
        };

        self.pause_condition = result?;
        Ok(())
    }

    /// Executes until `HLT`, an error, or a breakpoint.
    ///
    /// A program that never halts never returns; see [`Simulator::run_with_limit`].
    pub fn run(&mut self) -> Result<(), SimErr> {
        self.run_while(|_| true)
    }

    /// Like [`Simulator::run`], but executes at most `max_steps` instructions.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), SimErr> {
        let i = self.instructions_run;
        self.run_while(|sim| sim.instructions_run.wrapping_sub(i) < max_steps)
    }

    /// Executes a single instruction, ignoring breakpoints.
    ///
    /// Executing `HLT` is not an error; the PC simply stays on the `HLT`.
    pub fn step_in(&mut self) -> Result<(), SimErr> {
        match self.step() {
            Ok(()) => Ok(()),
            Err(StepBreak::Halt) => {
                self.pause_condition = PauseCondition::Halt;
                Ok(())
            },
            Err(StepBreak::Err(e)) => Err(e)
        }
    }

    /// Executes one instruction, treating a `CALL` and everything up to its matching `RET` as one instruction.
    pub fn step_over(&mut self) -> Result<(), SimErr> {
        let curr_frame = self.frame_depth;
        let mut first = Some(());

        // always execute once, then continue while inside a deeper frame
        self.run_while(|sim| first.take().is_some() || curr_frame < sim.frame_depth)
    }

    /// Executes until the current subroutine returns.
    ///
    /// Outside of any subroutine, this does nothing.
    pub fn step_out(&mut self) -> Result<(), SimErr> {
        let curr_frame = self.frame_depth;
        let mut first = Some(());

        // always execute once, then continue until a shallower frame is reached
        if curr_frame != 0 {
            self.run_while(|sim| first.take().is_some() || curr_frame <= sim.frame_depth)?;
        }

        Ok(())
    }
}
impl Default for Simulator {
    fn default() -> Self {
        Self::new(Default::default())
    }
}
