//! Fatal VM errors.
//!
//! Nothing here is recovered from: every variant ends the run.

use alloc::string::String;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Fetched byte has no handler in the dispatch table.
    #[error("Could not find instruction: {0}")]
    UnknownOpcode(u8),
    #[error("unsupported ALU operation: {0}")]
    UnsupportedOperation(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("memory address {0} is out of bounds")]
    AddressOutOfBounds(usize),
    #[error("register R{0} is out of bounds")]
    RegisterOutOfBounds(u8),
    /// PUSH or CALL with the stack pointer already at address 0.
    #[error("stack overflow")]
    StackOverflow,
    /// POP or RET with the stack pointer at the last address.
    #[error("stack underflow")]
    StackUnderflow,
    #[error("program of {0} bytes does not fit into memory")]
    ProgramTooLarge(usize),
}
