//! Fetch-decode-execute loop.
//!
//! Handlers are plain functions looked up by opcode byte in a [`Dispatch`]
//! table. Each returns a [`Step`] telling the loop whether it already moved
//! PC itself. See [`LS8Runner`] docs for more.

use core::fmt;

use hashbrown::HashMap;

use crate::{
    alu::AluOp,
    error::{Error, Result},
    opcode::{operand_count, Instruction, OPCode},
    vm::{Flags, VMContext},
};

/// Outcome of one handler call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Handler left PC alone, the loop advances it.
    Next,
    /// Handler set PC.
    Jump,
    /// Like [`Step::Next`], but with a value for the output sink.
    Output(u8),
}

/// Instruction handler: context and the two operand bytes.
pub type Handler = fn(&mut VMContext, u8, u8) -> Result<Step>;

fn op_hlt(ctx: &mut VMContext, _: u8, _: u8) -> Result<Step> {
    ctx.halted = true;
    Ok(Step::Next)
}
fn op_ldi(ctx: &mut VMContext, a: u8, b: u8) -> Result<Step> {
    ctx.registers.set(a, b)?;
    Ok(Step::Next)
}
fn op_prn(ctx: &mut VMContext, a: u8, _: u8) -> Result<Step> {
    ctx.registers.get(a).map(Step::Output)
}

/// Shared by all ALU opcodes, operation is taken from the fetched IR.
fn op_alu(ctx: &mut VMContext, a: u8, b: u8) -> Result<Step> {
    let op = OPCode::from_raw(ctx.ir).ok_or(Error::UnknownOpcode(ctx.ir))?;
    ctx.alu(AluOp::try_from(op)?, a, b)?;
    Ok(Step::Next)
}
fn op_cmp(ctx: &mut VMContext, a: u8, b: u8) -> Result<Step> {
    ctx.flags = Flags::compare(ctx.registers.get(a)?, ctx.registers.get(b)?);
    Ok(Step::Next)
}

fn op_push(ctx: &mut VMContext, a: u8, _: u8) -> Result<Step> {
    let v = ctx.registers.get(a)?;
    ctx.push(v)?;
    Ok(Step::Next)
}
fn op_pop(ctx: &mut VMContext, a: u8, _: u8) -> Result<Step> {
    let v = ctx.pop()?;
    ctx.registers.set(a, v)?;
    Ok(Step::Next)
}

fn op_call(ctx: &mut VMContext, a: u8, _: u8) -> Result<Step> {
    let ret = ctx.pc + 2;
    ctx.push(u8::try_from(ret).map_err(|_| Error::AddressOutOfBounds(ret))?)?;
    ctx.pc = ctx.registers.get(a)? as usize;
    Ok(Step::Jump)
}
fn op_ret(ctx: &mut VMContext, _: u8, _: u8) -> Result<Step> {
    ctx.pc = ctx.pop()? as usize;
    Ok(Step::Jump)
}

fn op_jmp(ctx: &mut VMContext, a: u8, _: u8) -> Result<Step> {
    ctx.pc = ctx.registers.get(a)? as usize;
    Ok(Step::Jump)
}
// Not taken branches fall through to normal PC advance, whatever bit 4 says.
fn op_jeq(ctx: &mut VMContext, a: u8, b: u8) -> Result<Step> {
    if ctx.flags.is_equal() {
        op_jmp(ctx, a, b)
    } else {
        Ok(Step::Next)
    }
}
fn op_jne(ctx: &mut VMContext, a: u8, b: u8) -> Result<Step> {
    if !ctx.flags.is_equal() {
        op_jmp(ctx, a, b)
    } else {
        Ok(Step::Next)
    }
}

/// Default handler of opcode.
pub fn handler(op: OPCode) -> Handler {
    match op {
        OPCode::Hlt => op_hlt,
        OPCode::Ldi => op_ldi,
        OPCode::Prn => op_prn,

        OPCode::Add
        | OPCode::Sub
        | OPCode::Mul
        | OPCode::Div
        | OPCode::Mod
        | OPCode::And
        | OPCode::Or
        | OPCode::Xor
        | OPCode::Not
        | OPCode::Shl
        | OPCode::Shr => op_alu,
        OPCode::Cmp => op_cmp,

        OPCode::Push => op_push,
        OPCode::Pop => op_pop,
        OPCode::Call => op_call,
        OPCode::Ret => op_ret,

        OPCode::Jmp => op_jmp,
        OPCode::Jeq => op_jeq,
        OPCode::Jne => op_jne,
    }
}

/// Opcode byte to handler table.
#[derive(Clone)]
pub struct Dispatch {
    table: HashMap<u8, Handler>,
}

impl Dispatch {
    /// Table with a handler for every [`OPCode`].
    pub fn new() -> Self {
        Self {
            table: OPCode::VARIANTS
                .iter()
                .map(|op| (op.as_raw(), handler(*op)))
                .collect(),
        }
    }

    /// Empty table, every opcode is unknown.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Adds or replaces handler, returning the old one.
    pub fn insert(&mut self, opcode: u8, handler: Handler) -> Option<Handler> {
        self.table.insert(opcode, handler)
    }

    pub fn get(&self, opcode: u8) -> Option<Handler> {
        self.table.get(&opcode).copied()
    }
}
impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

/// LS-8 runner
///
/// # Example
/// ```
/// # use ls8_base::runner::{LS8Runner, LS8Signal};
/// let code = [
///     0b1000_0010, 0x00, 0x08, // LDI R0, 8
///     0b0100_0111, 0x00,       // PRN R0
///     0b0000_0001,             // HLT
/// ];
/// let mut ls8 = LS8Runner::new(&code).unwrap();
///
/// assert_eq!(ls8.run_once(), Ok(LS8Signal::Continue));
/// assert_eq!(ls8.run_once(), Ok(LS8Signal::Data(8)));
/// assert_eq!(ls8.run_once(), Ok(LS8Signal::Halt));
/// assert!(ls8.context.halted);
/// ```
#[derive(Clone, Debug)]
pub struct LS8Runner {
    pub context: VMContext,
    pub dispatch: Dispatch,
}

/// Type of returned signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LS8Signal {
    /// All ok, no errors
    Continue,
    /// Like [`LS8Signal::Continue`], but with `PRN` output
    Data(u8),
    /// Machine halted
    Halt,
}

impl LS8Runner {
    /// Creates runner with `program` loaded at address 0.
    pub fn new(program: &[u8]) -> Result<Self> {
        let mut context = VMContext::new();
        context.load(program)?;

        Ok(Self::with_dispatch(context, Dispatch::new()))
    }

    pub fn with_dispatch(context: VMContext, dispatch: Dispatch) -> Self {
        Self { context, dispatch }
    }

    /// Fetch and decode instruction at PC. Operands the opcode does not
    /// use are left zero.
    fn fetch(&self, ir: u8) -> Result<Instruction> {
        let pc = self.context.pc;
        let count = operand_count(ir);
        let operand = |n: u8| {
            if n < count {
                self.context.memory.read(pc + n as usize)
            } else {
                Ok(0)
            }
        };

        Ok(Instruction::new(ir, operand(1)?, operand(2)?))
    }

    fn cycle(&mut self) -> Result<Step> {
        log::trace!("{}", self.context.trace());

        let pc = self.context.pc;
        let ir = self.context.memory.read(pc)?;
        self.context.ir = ir;

        let handler = self.dispatch.get(ir).ok_or(Error::UnknownOpcode(ir))?;
        let ins = self.fetch(ir)?;
        log::debug!("{pc:02X}: {ins}");

        let step = handler(&mut self.context, ins.operand_a, ins.operand_b)?;
        if step != Step::Jump {
            self.context.pc += ins.operand_count() as usize;
        }
        Ok(step)
    }

    /// Execute one instruction.
    ///
    /// Returns [`LS8Signal::Halt`] without doing anything once halted.
    pub fn run_once(&mut self) -> Result<LS8Signal> {
        if self.context.halted {
            return Ok(LS8Signal::Halt);
        }

        let step = self.cycle().map_err(|e| {
            log::debug!("{e} (pc {:02X})", self.context.pc);
            e
        })?;

        Ok(match step {
            _ if self.context.halted => LS8Signal::Halt,
            Step::Output(v) => LS8Signal::Data(v),
            Step::Next | Step::Jump => LS8Signal::Continue,
        })
    }

    /// Runs until `HLT`, passing every `PRN` value to `output`.
    pub fn run<F: FnMut(u8)>(&mut self, mut output: F) -> Result<()> {
        loop {
            match self.run_once()? {
                LS8Signal::Continue => {}
                LS8Signal::Data(v) => output(v),
                LS8Signal::Halt => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
#[rustfmt::skip]
mod tests {
    use alloc::{vec, vec::Vec};
    use super::*;
    use crate::vm::SP;

    const HLT: u8 = OPCode::Hlt.as_raw();
    const LDI: u8 = OPCode::Ldi.as_raw();
    const PRN: u8 = OPCode::Prn.as_raw();
    const ADD: u8 = OPCode::Add.as_raw();
    const DIV: u8 = OPCode::Div.as_raw();
    const CMP: u8 = OPCode::Cmp.as_raw();
    const PUSH: u8 = OPCode::Push.as_raw();
    const POP: u8 = OPCode::Pop.as_raw();
    const CALL: u8 = OPCode::Call.as_raw();
    const RET: u8 = OPCode::Ret.as_raw();
    const JMP: u8 = OPCode::Jmp.as_raw();
    const JEQ: u8 = OPCode::Jeq.as_raw();
    const JNE: u8 = OPCode::Jne.as_raw();

    /// Runs at most `limit` cycles, collecting output.
    fn run_collect(code: &[u8], limit: usize) -> (LS8Runner, Vec<u8>, Result<()>) {
        let mut ls8 = LS8Runner::new(code).unwrap();
        let mut out = Vec::new();
        for _ in 0..limit {
            match ls8.run_once() {
                Ok(LS8Signal::Continue) => {}
                Ok(LS8Signal::Data(v)) => out.push(v),
                Ok(LS8Signal::Halt) => return (ls8, out, Ok(())),
                Err(e) => return (ls8, out, Err(e)),
            }
        }
        panic!("program did not halt in {limit} cycles, output: {out:?}");
    }

    #[test]
    fn print_sum() {
        let code = [
            LDI, 0, 8,
            LDI, 1, 9,
            ADD, 0, 1,
            PRN, 0,
            HLT,
        ];
        let (ls8, out, res) = run_collect(&code, 16);

        assert_eq!(res, Ok(()));
        assert_eq!(out, vec![17]);
        assert!(ls8.context.halted);
        assert_eq!(ls8.context.pc, code.len());
    }

    #[test]
    fn stack_is_lifo() {
        let code = [
            LDI, 0, 5,
            PUSH, 0,
            LDI, 0, 7,
            PUSH, 0,
            POP, 1,
            POP, 2,
            PRN, 1,
            PRN, 2,
            HLT,
        ];
        let (ls8, out, res) = run_collect(&code, 16);

        assert_eq!(res, Ok(()));
        assert_eq!(out, vec![7, 5]);
        assert_eq!(ls8.context.registers.get(SP), Ok(0xF4));
    }

    #[test]
    fn call_and_return() {
        let code = [
            LDI, 1, 6,  // 0: subroutine address
            CALL, 1,    // 3
            HLT,        // 5
            LDI, 0, 42, // 6: subroutine
            PRN, 0,     // 9
            RET,        // 11
        ];
        let (ls8, out, res) = run_collect(&code, 16);

        assert_eq!(res, Ok(()));
        assert_eq!(out, vec![42]);
        // return address pushed by CALL
        assert_eq!(ls8.context.memory.read(0xF3), Ok(5));
        assert_eq!(ls8.context.registers.get(SP), Ok(0xF4));
        assert_eq!(ls8.context.pc, 6);
    }

    #[test]
    fn call_sets_pc_without_advance() {
        let code = [LDI, 1, 9, CALL, 1];
        let mut ls8 = LS8Runner::new(&code).unwrap();
        ls8.run_once().unwrap();
        ls8.run_once().unwrap();

        assert_eq!(ls8.context.pc, 9);
    }

    #[test]
    fn unknown_opcode_stops() {
        let code = [
            LDI, 0, 1,
            PRN, 0,
            0b1111_1111,
            PRN, 0,
            HLT,
        ];
        let (ls8, out, res) = run_collect(&code, 16);

        assert_eq!(res, Err(Error::UnknownOpcode(0xFF)));
        assert_eq!(out, vec![1]);
        assert_eq!(ls8.context.pc, 5);
    }

    #[test]
    fn unknown_opcode_at_memory_end() {
        let mut ctx = VMContext::new();
        ctx.pc = 255;
        ctx.memory.write(255, 0b1100_0000).unwrap();
        let mut ls8 = LS8Runner::with_dispatch(ctx, Dispatch::new());

        assert_eq!(ls8.run_once(), Err(Error::UnknownOpcode(0b1100_0000)));
    }

    #[test]
    fn running_off_memory() {
        let mut ctx = VMContext::new();
        ctx.pc = 255;
        ctx.memory.write(255, LDI).unwrap();
        let mut ls8 = LS8Runner::with_dispatch(ctx, Dispatch::new());

        assert_eq!(ls8.run_once(), Err(Error::AddressOutOfBounds(256)));
    }

    #[test]
    fn divide_by_zero() {
        let code = [
            LDI, 0, 10,
            LDI, 1, 0,
            DIV, 0, 1,
            PRN, 0,
            HLT,
        ];
        let (_, out, res) = run_collect(&code, 16);

        assert_eq!(res, Err(Error::DivideByZero));
        assert!(out.is_empty());
    }

    #[test]
    fn bad_register_operand() {
        let (_, _, res) = run_collect(&[PRN, 8, HLT], 4);

        assert_eq!(res, Err(Error::RegisterOutOfBounds(8)));
    }

    #[test]
    fn alu_handler_on_non_alu_opcode() {
        let mut dispatch = Dispatch::new();
        dispatch.insert(PRN, handler(OPCode::Add));
        let mut ctx = VMContext::new();
        ctx.load(&[PRN, 0, 0]).unwrap();
        let mut ls8 = LS8Runner::with_dispatch(ctx, dispatch);

        assert_eq!(ls8.run_once(), Err(Error::UnsupportedOperation("PRN".into())));
    }

    #[test]
    fn empty_dispatch() {
        let mut ctx = VMContext::new();
        ctx.load(&[HLT]).unwrap();
        let mut ls8 = LS8Runner::with_dispatch(ctx, Dispatch::empty());

        assert_eq!(ls8.run_once(), Err(Error::UnknownOpcode(HLT)));
    }

    #[test]
    fn jmp_skips() {
        let code = [
            LDI, 0, 8,  // 0
            JMP, 0,     // 3
            PRN, 0,     // 5: skipped
            HLT,        // 7: skipped
            PRN, 0,     // 8
            HLT,        // 10
        ];
        let (_, out, res) = run_collect(&code, 16);

        assert_eq!(res, Ok(()));
        assert_eq!(out, vec![8]);
    }

    /// Builds `CMP R0, R1; <jump> R2; PRN R0; HLT; target: PRN R1; HLT`.
    fn branch_program(jump: u8, a: u8, b: u8) -> Vec<u8> {
        vec![
            LDI, 0, a,   // 0
            LDI, 1, b,   // 3
            LDI, 2, 17,  // 6
            CMP, 0, 1,   // 9
            jump, 2,     // 12
            PRN, 0,      // 14
            HLT,         // 16
            PRN, 1,      // 17
            HLT,         // 19
        ]
    }

    #[test]
    fn conditional_branches() {
        // (jump, a, b, printed)
        let expected = [
            (JEQ, 3, 3, 3),
            (JEQ, 3, 4, 3),
            (JNE, 3, 3, 3),
            (JNE, 3, 4, 4),
        ];

        for (idx, (jump, a, b, printed)) in expected.into_iter().enumerate() {
            let (_, out, res) = run_collect(&branch_program(jump, a, b), 16);

            assert_eq!(res, Ok(()), "Testing line #{idx}");
            assert_eq!(out, vec![printed], "Testing line #{idx}");
        }
    }

    // A not taken JEQ/JNE must advance PC like any other instruction
    // instead of spinning on itself.
    #[test]
    fn not_taken_branch_advances_pc() {
        for (jump, a, b) in [(JEQ, 1, 2), (JNE, 2, 2)] {
            let mut ls8 = LS8Runner::new(&branch_program(jump, a, b)).unwrap();
            for _ in 0..4 {
                ls8.run_once().unwrap();
            }
            assert_eq!(ls8.context.pc, 12);

            assert_eq!(ls8.run_once(), Ok(LS8Signal::Continue));
            assert_eq!(ls8.context.pc, 12 + operand_count(jump) as usize);
            assert_eq!(ls8.run_once(), Ok(LS8Signal::Data(a)));
        }
    }

    #[test]
    fn halted_is_terminal() {
        let mut ls8 = LS8Runner::new(&[HLT, PRN, 0]).unwrap();

        assert_eq!(ls8.run_once(), Ok(LS8Signal::Halt));
        assert_eq!(ls8.run_once(), Ok(LS8Signal::Halt));
        assert_eq!(ls8.context.pc, 1);
    }

    #[test]
    fn run_collects_output() {
        let code = [LDI, 0, 2, PRN, 0, PRN, 0, HLT];
        let mut ls8 = LS8Runner::new(&code).unwrap();
        let mut out = Vec::new();

        assert_eq!(ls8.run(|v| out.push(v)), Ok(()));
        assert_eq!(out, vec![2, 2]);
    }

    #[test]
    fn ret_and_call_are_paired() {
        let code = [
            LDI, 3, 11, // 0
            CALL, 3,    // 3
            CALL, 3,    // 5
            PRN, 0,     // 7
            HLT,        // 9
            HLT,        // 10: never
            LDI, 1, 1,  // 11: R0 += 1
            ADD, 0, 1,  // 14
            RET,        // 17
        ];
        let (ls8, out, res) = run_collect(&code, 32);

        assert_eq!(res, Ok(()));
        assert_eq!(out, vec![2]);
        assert_eq!(ls8.context.registers.get(SP), Ok(0xF4));
    }

    #[test]
    fn ret_on_full_stack_underflows() {
        let mut ctx = VMContext::new();
        ctx.load(&[RET]).unwrap();
        ctx.registers.set(SP, 0xFF).unwrap();
        let mut ls8 = LS8Runner::with_dispatch(ctx, Dispatch::new());

        assert_eq!(ls8.run_once(), Err(Error::StackUnderflow));
    }
}
