//! Arithmetic logic unit.
//!
//! Operands are read as bytes, the result is computed at 64 bits and stored
//! untruncated into the destination register.

use alloc::string::ToString;
use core::str::FromStr;

use crate::{
    error::{Error, Result},
    opcode::OPCode,
    vm::VMContext,
};

/// ALU operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    /// Unary, second operand is ignored.
    Not,
    Shl,
    Shr,
}

impl AluOp {
    pub const VARIANTS: &[AluOp] = &[
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
        Self::Shl,
        Self::Shr,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
        }
    }

    /// Applies operation to raw operand values.
    pub fn apply(self, lhs: u64, rhs: u64) -> Result<u64> {
        let shift = |rhs: u64| u32::try_from(rhs).unwrap_or(u32::MAX);

        Ok(match self {
            Self::Div | Self::Mod if rhs == 0 => {
                return Err(match self {
                    Self::Div => Error::DivideByZero,
                    _ => Error::ModuloByZero,
                })
            }

            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => lhs / rhs,
            Self::Mod => lhs % rhs,
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Xor => lhs ^ rhs,
            Self::Not => !lhs,
            Self::Shl => lhs.checked_shl(shift(rhs)).unwrap_or(0),
            Self::Shr => lhs.checked_shr(shift(rhs)).unwrap_or(0),
        })
    }
}

impl FromStr for AluOp {
    type Err = Error;

    /// ```
    /// # use ls8_base::{alu::AluOp, Error};
    /// assert_eq!("xor".parse::<AluOp>(), Ok(AluOp::Xor));
    /// assert_eq!("CMP".parse::<AluOp>(), Err(Error::UnsupportedOperation("CMP".into())));
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        Self::VARIANTS
            .iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::UnsupportedOperation(s.to_string()))
    }
}

impl TryFrom<OPCode> for AluOp {
    type Error = Error;

    fn try_from(op: OPCode) -> Result<Self> {
        Ok(match op {
            OPCode::Add => Self::Add,
            OPCode::Sub => Self::Sub,
            OPCode::Mul => Self::Mul,
            OPCode::Div => Self::Div,
            OPCode::Mod => Self::Mod,
            OPCode::And => Self::And,
            OPCode::Or => Self::Or,
            OPCode::Xor => Self::Xor,
            OPCode::Not => Self::Not,
            OPCode::Shl => Self::Shl,
            OPCode::Shr => Self::Shr,

            _ => return Err(Error::UnsupportedOperation(op.mnemonic().to_string())),
        })
    }
}

impl VMContext {
    /// Performs `%a <- %a op %b` and returns the new value of `%a`.
    ///
    /// ```
    /// # use ls8_base::{vm::VMContext, alu::AluOp};
    /// let mut ctx = VMContext::new();
    /// ctx.registers.set(0, 8).unwrap();
    /// ctx.registers.set(1, 9).unwrap();
    ///
    /// assert_eq!(ctx.alu(AluOp::Add, 0, 1), Ok(17));
    /// assert_eq!(ctx.registers.get(0), Ok(17));
    /// ```
    pub fn alu(&mut self, op: AluOp, reg_a: u8, reg_b: u8) -> Result<u8> {
        let lhs = self.registers.get(reg_a)? as u64;
        let rhs = match op {
            AluOp::Not => 0,
            _ => self.registers.get(reg_b)? as u64,
        };
        let v = op.apply(lhs, rhs)?;

        self.registers.set_raw(reg_a, v)?;
        self.registers.get(reg_a)
    }
}
