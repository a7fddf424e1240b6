//! Virtual Machine context: memory, registers and flags.

use core::fmt;

use crate::error::{Error, Result};

/// Memory size in bytes.
pub const MEMORY_SIZE: usize = 256;
/// Count of general purpose registers.
pub const REGISTER_COUNT: usize = 8;
/// Register reserved as stack pointer.
pub const SP: u8 = 7;
/// Initial value of [`SP`]. The stack grows down from here.
pub const SP_INIT: u8 = 0xF4;

/// Flat zero-initialized byte store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    pub const fn new() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }

    pub fn read(&self, addr: usize) -> Result<u8> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(Error::AddressOutOfBounds(addr))
    }
    pub fn write(&mut self, addr: usize, v: u8) -> Result<()> {
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(Error::AddressOutOfBounds(addr))?;
        *cell = v;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}
impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Register bank.
///
/// Slots are stored wide, so arithmetic may run past 8 bits, and are
/// truncated back to a byte on every [`Registers::get`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    slots: [u64; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        let mut slots = [0; REGISTER_COUNT];
        slots[SP as usize] = SP_INIT as u64;
        Self { slots }
    }

    pub fn get(&self, reg: u8) -> Result<u8> {
        self.raw(reg).map(|v| v as u8)
    }
    pub fn set(&mut self, reg: u8, v: u8) -> Result<()> {
        self.set_raw(reg, v as u64)
    }

    /// Untruncated slot value.
    pub fn raw(&self, reg: u8) -> Result<u64> {
        self.slots
            .get(reg as usize)
            .copied()
            .ok_or(Error::RegisterOutOfBounds(reg))
    }
    pub fn set_raw(&mut self, reg: u8, v: u64) -> Result<()> {
        let slot = self
            .slots
            .get_mut(reg as usize)
            .ok_or(Error::RegisterOutOfBounds(reg))?;
        *slot = v;
        Ok(())
    }
}
impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare result. Exactly one bit is set after `CMP`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    pub const EQUAL: u8 = 0b001;
    pub const LESS_THAN: u8 = 0b010;
    pub const GREATER_THAN: u8 = 0b100;

    /// Flags holding the result of comparing `a` with `b`.
    pub fn compare(a: u8, b: u8) -> Self {
        Self(if a > b {
            Self::GREATER_THAN
        } else if a < b {
            Self::LESS_THAN
        } else {
            Self::EQUAL
        })
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
    pub const fn is_equal(self) -> bool {
        self.0 & Self::EQUAL != 0
    }
    pub const fn is_less(self) -> bool {
        self.0 & Self::LESS_THAN != 0
    }
    pub const fn is_greater(self) -> bool {
        self.0 & Self::GREATER_THAN != 0
    }
}

/// Represents full Virtual Machine state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VMContext {
    pub memory: Memory,
    pub registers: Registers,
    /// Address of the next instruction.
    pub pc: usize,
    /// Last fetched opcode byte.
    pub ir: u8,
    pub flags: Flags,
    pub halted: bool,
}

impl VMContext {
    /// Allocate new context.
    pub fn new() -> Self {
        Default::default()
    }

    /// Writes program bytes starting at address 0.
    ///
    /// ```
    /// # use ls8_base::{vm::VMContext, Error};
    /// let mut ctx = VMContext::new();
    /// assert_eq!(ctx.load(&[0b0000_0001]), Ok(()));
    /// assert_eq!(ctx.load(&[0; 257]), Err(Error::ProgramTooLarge(257)));
    /// ```
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MEMORY_SIZE {
            return Err(Error::ProgramTooLarge(program.len()));
        }
        for (addr, byte) in program.iter().enumerate() {
            self.memory.write(addr, *byte)?;
        }
        Ok(())
    }

    /// Decrements SP, then stores `v` at the new top.
    pub fn push(&mut self, v: u8) -> Result<()> {
        let sp = self
            .registers
            .get(SP)?
            .checked_sub(1)
            .ok_or(Error::StackOverflow)?;
        self.registers.set(SP, sp)?;
        self.memory.write(sp as usize, v)
    }

    /// Reads the top of stack, then increments SP.
    pub fn pop(&mut self) -> Result<u8> {
        let sp = self.registers.get(SP)?;
        let v = self.memory.read(sp as usize)?;
        let sp = sp.checked_add(1).ok_or(Error::StackUnderflow)?;
        self.registers.set(SP, sp)?;
        Ok(v)
    }

    /// Snapshot of PC, the instruction at PC and all registers.
    pub fn trace(&self) -> Trace<'_> {
        Trace(self)
    }
}

/// Printable state dump, see [`VMContext::trace`].
///
/// ```
/// # use ls8_base::vm::VMContext;
/// let mut ctx = VMContext::new();
/// ctx.load(&[0b1000_0010, 0x00, 0x08]).unwrap();
///
/// assert_eq!(
///     ctx.trace().to_string(),
///     "TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"
/// );
/// ```
pub struct Trace<'a>(&'a VMContext);

impl fmt::Display for Trace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.0;
        let peek = |addr: usize| ctx.memory.read(addr).unwrap_or_default();

        write!(
            f,
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            ctx.pc,
            peek(ctx.pc),
            peek(ctx.pc + 1),
            peek(ctx.pc + 2)
        )?;
        for reg in 0..REGISTER_COUNT as u8 {
            write!(f, " {:02X}", ctx.registers.get(reg).unwrap_or_default())?;
        }
        Ok(())
    }
}
