//! Memory handling for the LS-8 simulator.
//!
//! This module consists of:
//! - [`Mem`]: The memory.
//! - [`RegFile`]: The register file.
//! - [`CondFlags`]: The condition flags set by `CMP`.
//! - [`MachineInitStrategy`]: How memory is filled when the machine is created.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::Rng;

use crate::ast::reg_consts::SP;
use crate::ast::Reg;

use super::SimErr;

/// The number of addressable bytes of memory.
pub const MEM_SIZE: usize = 1 << 8;
/// The initial value of the stack pointer.
pub const SP_INIT: u8 = 0xF4;

/// Trait that describes types that can be used to create the initial data for [`Mem`].
pub trait ByteFiller {
    /// Generate the data.
    fn generate(&mut self) -> u8;
}
impl ByteFiller for () {
    /// This creates unseeded, non-deterministic values.
    fn generate(&mut self) -> u8 {
        rand::random()
    }
}
impl ByteFiller for u8 {
    /// Sets each byte to the given value.
    fn generate(&mut self) -> u8 {
        *self
    }
}
impl ByteFiller for StdRng {
    /// This creates values from the standard random number generator.
    ///
    /// This can be used to create deterministic, seeded values.
    fn generate(&mut self) -> u8 {
        self.gen()
    }
}

/// Strategy used to initialize the `mem` of the [`Simulator`].
///
/// The register file is not affected by this strategy;
/// it is always zeroed (except for the stack pointer).
///
/// [`Simulator`]: super::Simulator
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MachineInitStrategy {
    /// Initializes each byte randomly and non-deterministically.
    Unseeded,

    /// Initializes each byte randomly and deterministically.
    Seeded {
        /// The seed the RNG was initialized with.
        seed: u64
    },

    /// Initializes each byte to a known value.
    Known {
        /// The value to initialize each byte to.
        value: u8
    }
}
impl Default for MachineInitStrategy {
    /// Zeroed memory.
    fn default() -> Self {
        MachineInitStrategy::Known { value: 0 }
    }
}

impl MachineInitStrategy {
    pub(super) fn generator(&self) -> impl ByteFiller {
        use rand::SeedableRng;

        match self {
            MachineInitStrategy::Unseeded => MIGenerator::Unseeded,
            MachineInitStrategy::Seeded { seed } => MIGenerator::Seeded(Box::new(StdRng::seed_from_u64(*seed))),
            MachineInitStrategy::Known { value } => MIGenerator::Known(*value),
        }
    }
}

enum MIGenerator {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(u8)
}
impl ByteFiller for MIGenerator {
    fn generate(&mut self) -> u8 {
        match self {
            MIGenerator::Unseeded  => ().generate(),
            MIGenerator::Seeded(r) => r.generate(),
            MIGenerator::Known(k)  => k.generate(),
        }
    }
}

/// Memory.
///
/// Instructions and data share this single 256-byte address space.
///
/// This struct provides two methods of accessing memory:
/// - indexing with a `u8` address: direct access, which can never be out of range
/// - [`Mem::read`] and [`Mem::write`]: access with computed (wide) addresses, which are bounds-checked
///
/// ```
/// use ls8_ensemble::sim::mem::Mem;
/// use ls8_ensemble::sim::SimErr;
///
/// let mut mem = Mem::new(&mut 0u8);
/// mem[0xF3] = 11;
/// assert_eq!(mem[0xF3], 11);
///
/// assert_eq!(mem.read(0xF3), Ok(11));
/// assert_eq!(mem.write(0x100, 1), Err(SimErr::AddressOutOfRange(0x100)));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Mem([u8; MEM_SIZE]);
impl Mem {
    /// Creates a new memory with a provided byte creation strategy.
    pub fn new(filler: &mut impl ByteFiller) -> Self {
        Self(std::array::from_fn(|_| filler.generate()))
    }

    /// Copies a program image into memory, starting at address 0.
    ///
    /// Images longer than memory are truncated
    /// (a [`Program`](crate::parse::Program) never is).
    pub fn copy_program(&mut self, image: &[u8]) {
        let len = image.len().min(MEM_SIZE);
        self.0[..len].copy_from_slice(&image[..len]);
    }

    /// Fallibly reads the byte at the provided address, erroring if the address is out of range.
    pub fn read(&self, addr: u16) -> Result<u8, SimErr> {
        self.0.get(usize::from(addr))
            .copied()
            .ok_or(SimErr::AddressOutOfRange(addr))
    }

    /// Fallibly writes the byte at the provided address, erroring if the address is out of range.
    pub fn write(&mut self, addr: u16, data: u8) -> Result<(), SimErr> {
        let cell = self.0.get_mut(usize::from(addr))
            .ok_or(SimErr::AddressOutOfRange(addr))?;
        *cell = data;
        Ok(())
    }

    /// Reads the 3-byte fetch window starting at the given address.
    ///
    /// Bytes past the end of memory wrap around to the start.
    pub fn fetch_window(&self, addr: u8) -> [u8; 3] {
        std::array::from_fn(|i| self[addr.wrapping_add(i as u8)])
    }

    /// Gets the memory as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
impl std::ops::Index<u8> for Mem {
    type Output = u8;

    fn index(&self, index: u8) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<u8> for Mem {
    fn index_mut(&mut self, index: u8) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}
impl std::fmt::Debug for Mem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only print the used part of memory.
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        f.debug_struct("Mem")
            .field("data", &&self.0[..end])
            .finish_non_exhaustive()
    }
}

/// The register file.
///
/// This struct can be indexed with a [`Reg`]
/// (which can be constructed using the [`crate::ast::reg_consts`] module or via [`Reg::try_from`]).
///
/// R7 is the stack pointer, but is otherwise an ordinary register.
///
/// # Example
///
/// ```
/// use ls8_ensemble::sim::mem::RegFile;
/// use ls8_ensemble::ast::reg_consts::{R0, SP};
///
/// let mut reg = RegFile::new();
/// reg[R0] = 11;
/// assert_eq!(reg[R0], 11);
/// assert_eq!(reg[SP], 0xF4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile([u8; 8]);
impl RegFile {
    /// Creates a register file with all registers zeroed, except for the stack pointer.
    pub fn new() -> Self {
        let mut regs = Self([0; 8]);
        regs[SP] = SP_INIT;
        regs
    }

    /// Reads the register with the given register number, erroring if it is not between 0 and 7.
    pub fn read(&self, index: u8) -> Result<u8, SimErr> {
        Reg::try_from(index).map(|r| self[r])
    }

    /// Writes to the register with the given register number, erroring if it is not between 0 and 7.
    pub fn write(&mut self, index: u8, data: u8) -> Result<(), SimErr> {
        let r = Reg::try_from(index)?;
        self[r] = data;
        Ok(())
    }

    /// Gets the registers as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
impl Default for RegFile {
    fn default() -> Self {
        Self::new()
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u8;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

/// The condition flags (`FL`), set by `CMP`.
///
/// The flags are encoded as the following:
/// - `FL[2]`: Less-than
/// - `FL[1]`: Greater-than
/// - `FL[0]`: Equal
///
/// ```text
///          LGE
///          |||
///          VVV
/// 0b0000_0001
/// ```
///
/// Before the first `CMP`, no flags are set.
/// After any `CMP`, exactly one flag is set.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CondFlags(u8);

impl CondFlags {
    const EQUAL:   u8 = 0b001;
    const GREATER: u8 = 0b010;
    const LESS:    u8 = 0b100;

    /// Creates condition flags where no flag is set.
    pub fn new() -> Self {
        Self(0)
    }
    /// Creates condition flags from the result of comparing two values.
    pub fn from_ordering(ord: Ordering) -> Self {
        match ord {
            Ordering::Less    => Self(Self::LESS),
            Ordering::Equal   => Self(Self::EQUAL),
            Ordering::Greater => Self(Self::GREATER),
        }
    }

    /// Checks whether the equal flag is set.
    pub fn is_equal(&self) -> bool {
        self.0 & Self::EQUAL != 0
    }
    /// Checks whether the less-than flag is set.
    pub fn is_less(&self) -> bool {
        self.0 & Self::LESS != 0
    }
    /// Checks whether the greater-than flag is set.
    pub fn is_greater(&self) -> bool {
        self.0 & Self::GREATER != 0
    }

    /// Gets the bit-representation of the flags.
    pub fn get(&self) -> u8 {
        self.0
    }
}
impl std::fmt::Debug for CondFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use std::fmt::Write;

        f.write_str("CondFlags(")?;
        if self.is_less()    { f.write_char('L')?; };
        if self.is_greater() { f.write_char('G')?; };
        if self.is_equal()   { f.write_char('E')?; };
        f.write_char(')')
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::ast::reg_consts::{R0, R6, SP};
    use crate::sim::SimErr;

    use super::{CondFlags, MachineInitStrategy, Mem, RegFile, MEM_SIZE, SP_INIT};

    #[test]
    fn test_mem_bounds() {
        let mut mem = Mem::new(&mut 0u8);

        assert_eq!(mem.write(0x00, 1), Ok(()));
        assert_eq!(mem.write(0xFF, 2), Ok(()));
        assert_eq!(mem.read(0x00), Ok(1));
        assert_eq!(mem.read(0xFF), Ok(2));

        assert_eq!(mem.read(0x100), Err(SimErr::AddressOutOfRange(0x100)));
        assert_eq!(mem.write(0x100, 3), Err(SimErr::AddressOutOfRange(0x100)));
        assert_eq!(mem.write(u16::MAX, 3), Err(SimErr::AddressOutOfRange(u16::MAX)));

        // failed write did not touch anything
        assert!(mem.as_slice()[1..0xFF].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mem_fetch_window() {
        let mut mem = Mem::new(&mut 0u8);
        mem.copy_program(&[0x82, 0x00, 0x08]);
        assert_eq!(mem.fetch_window(0), [0x82, 0x00, 0x08]);

        mem[0xFF] = 0x01;
        assert_eq!(mem.fetch_window(0xFF), [0x01, 0x82, 0x00]);
        assert_eq!(mem.fetch_window(0xFE), [0x00, 0x01, 0x82]);
    }

    #[test]
    fn test_mem_init_strategy() {
        let mut gen = MachineInitStrategy::default().generator();
        assert!(Mem::new(&mut gen).as_slice().iter().all(|&b| b == 0));

        let mut gen = MachineInitStrategy::Known { value: 0xAA }.generator();
        assert!(Mem::new(&mut gen).as_slice().iter().all(|&b| b == 0xAA));

        let seeded = |seed| Mem::new(&mut MachineInitStrategy::Seeded { seed }.generator());
        assert_eq!(seeded(2110), seeded(2110));
        assert_eq!(Mem::new(&mut StdRng::seed_from_u64(7)), Mem::new(&mut StdRng::seed_from_u64(7)));
        assert_eq!(seeded(1).as_slice().len(), MEM_SIZE);
    }

    #[test]
    fn test_reg_file() {
        let mut regs = RegFile::new();
        assert_eq!(regs.as_slice(), &[0, 0, 0, 0, 0, 0, 0, SP_INIT]);

        regs[R0] = 9;
        assert_eq!(regs.read(0), Ok(9));
        assert_eq!(regs.write(6, 12), Ok(()));
        assert_eq!(regs[R6], 12);
        assert_eq!(regs.write(7, 0xF0), Ok(()));
        assert_eq!(regs[SP], 0xF0);

        assert_eq!(regs.read(8), Err(SimErr::RegisterOutOfRange(8)));
        assert_eq!(regs.write(200, 1), Err(SimErr::RegisterOutOfRange(200)));
    }

    #[test]
    fn test_cond_flags() {
        let flags = CondFlags::new();
        assert!(!flags.is_equal() && !flags.is_less() && !flags.is_greater());

        for ord in [Ordering::Less, Ordering::Equal, Ordering::Greater] {
            let flags = CondFlags::from_ordering(ord);
            assert_eq!(flags.get().count_ones(), 1);
        }
        assert!(CondFlags::from_ordering(Ordering::Equal).is_equal());
        assert!(CondFlags::from_ordering(Ordering::Less).is_less());
        assert!(CondFlags::from_ordering(Ordering::Greater).is_greater());
        assert_eq!(format!("{:?}", CondFlags::from_ordering(Ordering::Less)), "CondFlags(L)");
    }
}
