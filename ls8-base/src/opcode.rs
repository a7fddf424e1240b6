//! Opcode table and instruction decoder.
//!
//! Every instruction is one opcode byte followed by up to two operand bytes.
//! The opcode byte carries its own layout:
//!
//! ```text
//! AABCDDDD
//! ||||
//! |||+---- instruction identifier
//! ||+----- sets PC directly
//! |+------ ALU operation
//! +------- operand count - 1 (total bytes including opcode = AA + 1)
//! ```
use ls8_base_proc_upper::upper;

use core::fmt;

/// read macro or code bellow.
///
/// ```ignore
/// enum Foo {
///     /// doc
///     Bar = 0b0000_0001,
/// }
/// ```
macro_rules! impl_opcodes {
    ($(#[$m:meta])* $v:vis enum $name:ident { $($(#[doc = $vm:expr])* $var:ident = $code:literal),* $(,)? }) => {
        $(#[$m])*
        #[repr(u8)]
        $v enum $name {$(
            $(#[doc = $vm])* $var = $code,
        )*}

        impl $name {
            /// Array of all variants.
            pub const VARIANTS: &[$name] = &[$(Self::$var, )*];

            /// Get assembler mnemonic of variant.
            pub const fn mnemonic(self) -> &'static str {
                match self {$(
                    Self::$var => upper!($var),
                )*}
            }

            /// Get documentation for variant.
            ///
            /// *Note*: provided documentation is IN-CODE documentation, like that
            /// you type in `///`.
            pub const fn incode_doc(self) -> &'static str {
                match self {$(
                    Self::$var => concat!( $($vm)* , ),
                )*}
            }

            /// Try get opcode by raw byte.
            pub const fn from_raw(raw: u8) -> Option<Self> {
                match raw {
                    $( $code => Some(Self::$var), )*
                    _ => None,
                }
            }
        }
    };
}

impl_opcodes! {
    /// Represents opcode. Can be obtained from raw byte using [`OPCode::from_raw`].
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub enum OPCode {
        /// Halt the machine
        Hlt = 0b0000_0001,
        /// Load immediate `b` into `%a`
        Ldi = 0b1000_0010,
        /// Print `%a` as decimal integer
        Prn = 0b0100_0111,

        /// Performs `%a <- %a + %b`
        Add = 0b1010_0000,
        /// Performs `%a <- %a - %b`
        Sub = 0b1010_0001,
        /// Performs `%a <- %a * %b`
        Mul = 0b1010_0010,
        /// Performs `%a <- %a / %b`
        Div = 0b1010_0011,
        /// Performs `%a <- %a % %b`
        Mod = 0b1010_0100,
        /// Compare `%a` with `%b` and set flags
        Cmp = 0b1010_0111,
        /// Performs `%a <- %a & %b`
        And = 0b1010_1000,
        /// Performs `%a <- %a | %b`
        Or  = 0b1010_1010,
        /// Performs `%a <- %a ^ %b`
        Xor = 0b1010_1011,
        /// Performs `%a <- !%a`
        Not = 0b0110_1001,
        /// Performs `%a <- %a << %b`
        Shl = 0b1010_1100,
        /// Performs `%a <- %a >> %b`
        Shr = 0b1010_1101,

        /// Push `%a` on the stack
        Push = 0b0100_0101,
        /// Pop top of the stack into `%a`
        Pop  = 0b0100_0110,

        /// Push return address and jump to `%a`
        Call = 0b0101_0000,
        /// Pop return address into PC
        Ret  = 0b0001_0001,

        /// Jump to `%a`
        Jmp = 0b0101_0100,
        /// Jump to `%a` if equal flag is set
        Jeq = 0b0101_0101,
        /// Jump to `%a` if equal flag is clear
        Jne = 0b0101_0110,
    }
}

impl OPCode {
    /// Returns raw opcode byte.
    #[inline(always)]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Total bytes used by instruction with this opcode byte, including itself.
#[inline(always)]
pub const fn operand_count(ir: u8) -> u8 {
    ((ir >> 6) & 0b11) + 1
}

/// Returns `true` if the handler of this opcode byte is declared to set PC.
#[inline(always)]
pub const fn sets_pc(ir: u8) -> bool {
    (ir >> 4) & 1 == 1
}

/// One fetched instruction: opcode byte and two operand bytes.
///
/// Operands past [`Instruction::operand_count`] are zero and must not be used.
///
/// # Example
/// ```
/// # use ls8_base::opcode::{Instruction, OPCode};
/// let ins = Instruction::new(0b1000_0010, 0, 8);
///
/// assert_eq!(ins.kind(), Some(OPCode::Ldi));
/// assert_eq!(ins.operand_count(), 3);
/// assert!(!ins.sets_pc());
/// assert_eq!(ins.to_string(), "LDI 0, 8");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub ir: u8,
    pub operand_a: u8,
    pub operand_b: u8,
}

impl Instruction {
    pub const fn new(ir: u8, operand_a: u8, operand_b: u8) -> Self {
        Self {
            ir,
            operand_a,
            operand_b,
        }
    }

    #[inline(always)]
    pub const fn operand_count(self) -> u8 {
        operand_count(self.ir)
    }

    #[inline(always)]
    pub const fn sets_pc(self) -> bool {
        sets_pc(self.ir)
    }

    #[inline(always)]
    pub const fn kind(self) -> Option<OPCode> {
        OPCode::from_raw(self.ir)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(kind) = self.kind() else {
            return write!(f, "??? {:#010b}", self.ir);
        };
        match self.operand_count() {
            1 => write!(f, "{}", kind.mnemonic()),
            2 => write!(f, "{} {}", kind.mnemonic(), self.operand_a),
            _ => write!(f, "{} {}, {}", kind.mnemonic(), self.operand_a, self.operand_b),
        }
    }
}

/// Iterator over instructions of a loaded program.
///
/// ```
/// # use ls8_base::opcode::Disassembler;
/// let program = [0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001];
/// let lines: Vec<_> = Disassembler::new(&program)
///     .map(|(addr, ins)| format!("{addr:02X}: {ins}"))
///     .collect();
///
/// assert_eq!(lines, ["00: LDI 0, 8", "03: PRN 0", "05: HLT"]);
/// ```
pub struct Disassembler<'a> {
    program: &'a [u8],
    offset: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(program: &'a [u8]) -> Self {
        Self { program, offset: 0 }
    }
}

impl<'a> Iterator for Disassembler<'a> {
    type Item = (usize, Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        let addr = self.offset;
        let ir = *self.program.get(addr)?;
        let count = operand_count(ir) as usize;
        let operand = |n: usize| {
            if n < count {
                self.program.get(addr + n).copied().unwrap_or_default()
            } else {
                0
            }
        };
        let ins = Instruction::new(ir, operand(1), operand(2));

        self.offset += count;
        Some((addr, ins))
    }
}
