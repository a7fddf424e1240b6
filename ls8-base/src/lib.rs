//! # LS-8 Virtual Machine
//!
//! This crate contains base things of ls8. A program goes through 4 stages
//! to be executed:
//!
//! 1. [`loader`] -- text stage. Turns binary literal lines into bytes.
//! 2. [`vm`] -- virtual environment. Allocates memory, registers and flags.
//! 3. [`opcode`] -- decode opcode bytes into instructions.
//! 4. [`runner`] -- fetch, dispatch and execute instructions, using [`alu`]
//!    for arithmetic.
//!
//! The dispatch table of stage 4 can be replaced by own if it needed.
//!
//! # Example
//! Opcode list and encodings can be found in [`OPCode`] enum.
//!
//! ```
//! # use ls8_base::{loader::load_program, runner::*};
//! #
//! let source = "
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 10000010 # LDI R1,9
//! 00000001
//! 00001001
//! 10100000 # ADD R0,R1
//! 00000000
//! 00000001
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ";
//!
//! let program = load_program(source).expect("valid program text");
//! let mut ls8 = LS8Runner::new(&program).expect("program fits in memory");
//!
//! let mut output = vec![];
//! loop {
//!     match ls8.run_once() {
//!         Ok(LS8Signal::Continue) => continue,
//!         Ok(LS8Signal::Data(v)) => output.push(v),
//!         Ok(LS8Signal::Halt) => break,
//!         Err(e) => panic!("runtime-error: {e}"),
//!     }
//! }
//!
//! assert_eq!(output, [17]);
//! ```
//!
//! # Machine layout
//!
//! 256 bytes of memory, 8 registers. `R7` is the stack pointer, initialized
//! to `0xF4`, and the stack grows down.
//!
//! ## Opcode byte
//!
//! |  Bits | Description                                      |
//! |-------|--------------------------------------------------|
//! |  7..6 | operand bytes that follow the opcode (0..=2)     |
//! |     5 | ALU operation                                    |
//! |     4 | handler sets PC, no automatic advance            |
//! |  3..0 | instruction identifier                           |
//!
//! Instruction length is always `((opcode >> 6) & 0b11) + 1` bytes. Operands
//! are register numbers (`0..=7`) or, for `LDI`, an immediate byte.
//!
//! ## Flags
//!
//! | Bit | Name           |
//! |-----|----------------|
//! |   0 | `EQUAL`        |
//! |   1 | `LESS_THAN`    |
//! |   2 | `GREATER_THAN` |
//!
//! Set only by `CMP`, read by `JEQ` and `JNE`.
//!

#![cfg_attr(feature = "no-std", no_std)]
extern crate alloc;

// doc imports
#[allow(unused_imports)]
use {opcode::*, vm::*};

pub mod alu;
pub mod error;
pub mod loader;
pub mod opcode;
pub mod runner;
pub mod vm;

pub use error::{Error, Result};
