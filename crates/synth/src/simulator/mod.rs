//! Reference semantics of the veighty-machinery VM.
//!
//! The simulator is the executable form of the oracle: it decodes a program
//! through an [`OpcodeTable`], consumes interactive input from any
//! [`BufRead`] and prints to any [`Write`]. Every state in which the VM would
//! assert is reported as a [`SimError`] instead.

mod stack;

pub use stack::{SimStack, StackValue};

use crate::error::{SimError, SimResult};
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};
use tracing::{debug, trace};
use veighty_config::{FlagPolarity, MAX_EXECUTED_INSTRUCTIONS, MAX_WORD, TRANSPORT_CAP};
use veighty_isa::encoding::{decode_int, decode_jump};
use veighty_isa::protocol::{parse_length_line, BYTECODE_PROMPT, FILE_WRITTEN, GREETING, LENGTH_PROMPT};
use veighty_isa::{OpCode, OpcodeTable};

/// Number of values the VM stack holds.
pub const STACK_CAPACITY: usize = 4096;

/// Longest file name accepted by `writefile` and `readfile`.
pub const MAX_FILE_NAME: usize = 256;

/// Stored file contents are cut to this many bytes.
pub const MAX_FILE_SIZE: usize = 4096;

/// Longest chunk `reads` takes from one line, newline included.
pub const MAX_LINE_READ: usize = 4095;

/// Why execution stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The instruction pointer left the program.
    End,
    /// A `halt` instruction executed.
    Halt,
    /// A byte outside the opcode table was fetched.
    UnknownOpcode(u8),
    /// The executed instruction limit was reached.
    StepLimit,
}

/// Summary of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub halt: HaltReason,
}

/// Interpreter over a tagged stack with an in-memory file store.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    table: &'a OpcodeTable,
    polarity: FlagPolarity,
    files: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Registers of one execution.
struct Cpu {
    ip: usize,
    flag: bool,
    stack: SimStack,
}

impl<'a> Simulator<'a> {
    pub fn new(table: &'a OpcodeTable, polarity: FlagPolarity) -> Self {
        Self {
            table,
            polarity,
            files: BTreeMap::new(),
        }
    }

    /// Starts from an existing file store, as a target that has been
    /// written to before.
    pub fn with_files(mut self, files: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        self.files = files;
        self
    }

    pub fn files(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.files
    }

    pub fn into_files(self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.files
    }

    pub fn polarity(&self) -> FlagPolarity {
        self.polarity
    }

    /// Runs `program` over a complete input buffer and returns everything
    /// it printed.
    pub fn run(&mut self, program: &[u8], input: &[u8]) -> SimResult<Vec<u8>> {
        let mut reader = input;
        let mut output = Vec::new();
        self.execute(program, &mut reader, &mut output)?;
        Ok(output)
    }

    /// Plays the target side of a connection: greeting, length line,
    /// program bytes, then execution against the same streams.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> SimResult<RunSummary> {
        for block in GREETING {
            output.write_all(block.as_bytes())?;
        }
        output.write_all(LENGTH_PROMPT.as_bytes())?;
        output.flush()?;

        let mut line = Vec::new();
        input.read_until(b'\n', &mut line)?;
        let len = parse_length_line(&line);
        if len >= TRANSPORT_CAP {
            return Err(SimError::ProgramTooLarge {
                len,
                cap: TRANSPORT_CAP,
            });
        }
        output.write_all(BYTECODE_PROMPT.as_bytes())?;
        output.flush()?;

        let mut program = vec![0; len];
        input.read_exact(&mut program)?;
        debug!(len, "received program");
        self.execute(&program, input, output)
    }

    /// Executes `program`, reading interactive input lazily so a caller can
    /// interleave input with observed output.
    pub fn execute<R: BufRead, W: Write>(
        &mut self,
        program: &[u8],
        input: &mut R,
        output: &mut W,
    ) -> SimResult<RunSummary> {
        if program.len() >= TRANSPORT_CAP {
            return Err(SimError::ProgramTooLarge {
                len: program.len(),
                cap: TRANSPORT_CAP,
            });
        }

        let mut cpu = Cpu {
            ip: 0,
            flag: false,
            stack: SimStack::new(),
        };
        for steps in 0..MAX_EXECUTED_INSTRUCTIONS {
            if cpu.ip >= program.len() {
                return Ok(RunSummary {
                    steps,
                    halt: HaltReason::End,
                });
            }
            let at = cpu.ip;
            let byte = program[at];
            cpu.ip += 1;
            let Some(op) = self.table.decode(byte) else {
                debug!(at, byte, "unknown opcode, halting");
                return Ok(RunSummary {
                    steps: steps + 1,
                    halt: HaltReason::UnknownOpcode(byte),
                });
            };
            trace!(at, %op, depth = cpu.stack.len(), "step");
            if op == OpCode::Halt {
                return Ok(RunSummary {
                    steps: steps + 1,
                    halt: HaltReason::Halt,
                });
            }
            self.step(&mut cpu, op, at, program, input, output)?;
        }
        Ok(RunSummary {
            steps: MAX_EXECUTED_INSTRUCTIONS,
            halt: HaltReason::StepLimit,
        })
    }

    fn step<R: BufRead, W: Write>(
        &mut self,
        cpu: &mut Cpu,
        op: OpCode,
        at: usize,
        program: &[u8],
        input: &mut R,
        output: &mut W,
    ) -> SimResult<()> {
        let stack = &mut cpu.stack;
        match op {
            OpCode::Nop | OpCode::Halt => {}
            OpCode::Push => {
                let bytes = operand(program, cpu.ip, 8, op, at)?;
                let value = decode_int(bytes).ok_or(SimError::TruncatedOperand { op, at })?;
                cpu.ip += 8;
                push(stack, StackValue::Int(value & MAX_WORD), op, at)?;
            }
            OpCode::Pop => {
                let value = stack.pop_int(op, at)?;
                writeln!(output, "{:#x}", value)?;
                output.flush()?;
            }
            OpCode::Read => {
                let mut bytes = [0u8; 8];
                input
                    .read_exact(&mut bytes)
                    .map_err(|_| SimError::InputExhausted { op, at })?;
                push(stack, StackValue::Int(u64::from_le_bytes(bytes) & MAX_WORD), op, at)?;
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                let top = stack.pop_int(op, at)?;
                let second = stack.pop_int(op, at)?;
                let result = match op {
                    OpCode::Add => top.wrapping_add(second),
                    OpCode::Sub => top.wrapping_sub(second),
                    OpCode::Mul => top.wrapping_mul(second),
                    _ if second == 0 => return Err(SimError::DivisionByZero { at }),
                    OpCode::Div => top / second,
                    _ => top % second,
                };
                stack.push_int(in_domain(result, op, at)?);
            }
            OpCode::Itostr => {
                let value = stack.pop_int(op, at)?;
                stack.push_str(value.to_string().into_bytes());
            }
            OpCode::Jmp => {
                cpu.ip = jump_target(program, cpu.ip, op, at)?;
            }
            OpCode::Lt | OpCode::Gt | OpCode::Eq => {
                let top = stack.pop_int(op, at)?;
                let second = stack.pop_int(op, at)?;
                let holds = match op {
                    OpCode::Lt => top < second,
                    OpCode::Gt => top > second,
                    _ => top == second,
                };
                cpu.flag = self.polarity.flag_for(holds);
            }
            OpCode::Jnz | OpCode::Jz => {
                let target = jump_target(program, cpu.ip, op, at)?;
                let taken = if op == OpCode::Jnz { cpu.flag } else { !cpu.flag };
                cpu.ip = if taken { target } else { cpu.ip + 2 };
            }
            OpCode::Inc | OpCode::Dec | OpCode::Shl | OpCode::Shr => {
                let value = stack.pop_int(op, at)?;
                let result = match op {
                    OpCode::Inc => value.wrapping_add(1),
                    OpCode::Dec => value.wrapping_sub(1),
                    OpCode::Shl => value << 1,
                    _ => value >> 1,
                };
                stack.push_int(in_domain(result, op, at)?);
            }
            OpCode::Cpy => {
                if stack.len() >= STACK_CAPACITY {
                    return Err(SimError::StackOverflow { op, at });
                }
                stack.dup(op, at)?;
            }
            OpCode::Swap => stack.swap(op, at)?,
            OpCode::Pushs => {
                let len = *program.get(cpu.ip).ok_or(SimError::TruncatedOperand { op, at })? as usize;
                let bytes = operand(program, cpu.ip + 1, len, op, at)?;
                cpu.ip += 1 + len;
                push(stack, StackValue::Str(c_string(bytes)), op, at)?;
            }
            OpCode::Pops => {
                let value = stack.pop_str(op, at)?;
                output.write_all(&value)?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
            OpCode::Reads => {
                let mut line = Vec::new();
                input.by_ref().take(MAX_LINE_READ as u64).read_until(b'\n', &mut line)?;
                if line.len() <= 1 {
                    return Err(SimError::InputExhausted { op, at });
                }
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                push(stack, StackValue::Str(c_string(&line)), op, at)?;
            }
            OpCode::Strcat => {
                let mut top = stack.pop_str(op, at)?;
                let second = stack.pop_str(op, at)?;
                top.extend_from_slice(&second);
                stack.push_str(top);
            }
            OpCode::Strlen => {
                let value = stack.pop_str(op, at)?;
                stack.push_int(value.len() as u64);
            }
            OpCode::Strtoi => {
                let value = stack.pop_str(op, at)?;
                stack.push_int(in_domain(parse_long(&value), op, at)?);
            }
            OpCode::Strcmp | OpCode::Instr => {
                let top = stack.pop_str(op, at)?;
                let second = stack.pop_str(op, at)?;
                let holds = if op == OpCode::Strcmp {
                    top == second
                } else {
                    contains(&top, &second)
                };
                cpu.flag = self.polarity.flag_for(holds);
            }
            OpCode::Writefile => {
                let name = stack.pop_str(op, at)?;
                let content = stack.pop_str(op, at)?;
                check_file_name(&name)?;
                if content.is_empty() {
                    return Err(SimError::EmptyWrite);
                }
                let stored = content[..content.len().min(MAX_FILE_SIZE)].to_vec();
                debug!(name = %String::from_utf8_lossy(&name), len = stored.len(), "file written");
                self.files.insert(name, stored);
                writeln!(output, "{}", FILE_WRITTEN)?;
                output.flush()?;
            }
            OpCode::Readfile => {
                let name = stack.pop_str(op, at)?;
                check_file_name(&name)?;
                let content = self
                    .files
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| SimError::FileNotFound(String::from_utf8_lossy(&name).into_owned()))?;
                push(stack, StackValue::Str(content), op, at)?;
            }
        }
        Ok(())
    }
}

fn push(stack: &mut SimStack, value: StackValue, op: OpCode, at: usize) -> SimResult<()> {
    if stack.len() >= STACK_CAPACITY {
        return Err(SimError::StackOverflow { op, at });
    }
    stack.push(value);
    Ok(())
}

fn operand<'p>(program: &'p [u8], start: usize, len: usize, op: OpCode, at: usize) -> SimResult<&'p [u8]> {
    program
        .get(start..start + len)
        .ok_or(SimError::TruncatedOperand { op, at })
}

fn jump_target(program: &[u8], ip: usize, op: OpCode, at: usize) -> SimResult<usize> {
    decode_jump(operand(program, ip, 2, op, at)?).ok_or(SimError::TruncatedOperand { op, at })
}

/// Results with the tag bit set would be read back as string pointers.
fn in_domain(value: u64, op: OpCode, at: usize) -> SimResult<u64> {
    if value > MAX_WORD {
        return Err(SimError::WordOverflow { op, at });
    }
    Ok(value)
}

/// Bytes up to the first NUL.
fn c_string(bytes: &[u8]) -> Vec<u8> {
    match bytes.iter().position(|b| *b == 0) {
        Some(end) => bytes[..end].to_vec(),
        None => bytes.to_vec(),
    }
}

/// Decimal prefix parse with optional sign and leading whitespace. Values
/// outside the signed 64-bit range saturate, negative ones map above the
/// word domain.
fn parse_long(bytes: &[u8]) -> u64 {
    let mut rest = bytes
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .copied()
        .peekable();
    let negative = match rest.peek() {
        Some(b'-') => {
            rest.next();
            true
        }
        Some(b'+') => {
            rest.next();
            false
        }
        _ => false,
    };
    let magnitude = rest
        .take_while(u8::is_ascii_digit)
        .fold(0i128, |acc, digit| (acc * 10 + i128::from(digit - b'0')).min(i128::from(u64::MAX)));
    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64 as u64
}

/// Substring test where the empty needle is always found.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

/// File names must be short and purely alphanumeric ASCII.
pub fn check_file_name(name: &[u8]) -> SimResult<()> {
    if name.is_empty() || name.len() > MAX_FILE_NAME || !name.iter().all(u8::is_ascii_alphanumeric) {
        return Err(SimError::InvalidFileName(String::from_utf8_lossy(name).into_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OpcodeTable {
        OpcodeTable::bundled().unwrap()
    }

    fn code(table: &OpcodeTable, ops: &[OpCode]) -> Vec<u8> {
        ops.iter().map(|op| table.byte(*op)).collect()
    }

    fn push(table: &OpcodeTable, value: u64) -> Vec<u8> {
        let mut bytes = vec![table.byte(OpCode::Push)];
        bytes.extend_from_slice(&value.to_le_bytes());
        bytes
    }

    fn pushs(table: &OpcodeTable, value: &[u8]) -> Vec<u8> {
        let mut bytes = vec![table.byte(OpCode::Pushs), value.len() as u8];
        bytes.extend_from_slice(value);
        bytes
    }

    #[test]
    fn test_arithmetic_order() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, 3);
        program.extend(push(&table, 10));
        program.extend(code(&table, &[OpCode::Sub, OpCode::Pop]));
        assert_eq!(sim.run(&program, b"").unwrap(), b"0x7\n".to_vec());
    }

    #[test]
    fn test_push_masks_tag_bit() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, u64::MAX);
        program.push(table.byte(OpCode::Pop));
        assert_eq!(sim.run(&program, b"").unwrap(), b"0x7fffffffffffffff\n".to_vec());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, MAX_WORD);
        program.push(table.byte(OpCode::Inc));
        assert!(matches!(
            sim.run(&program, b""),
            Err(SimError::WordOverflow { op: OpCode::Inc, at: 9 })
        ));

        let mut program = push(&table, 0);
        program.push(table.byte(OpCode::Dec));
        assert!(matches!(sim.run(&program, b""), Err(SimError::WordOverflow { .. })));
    }

    #[test]
    fn test_division_by_zero() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, 0);
        program.extend(push(&table, 5));
        program.push(table.byte(OpCode::Div));
        assert!(matches!(sim.run(&program, b""), Err(SimError::DivisionByZero { at: 18 })));
    }

    #[test]
    fn test_strings() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = pushs(&table, b"cd");
        program.extend(pushs(&table, b"ab"));
        program.extend(code(&table, &[OpCode::Strcat, OpCode::Cpy, OpCode::Pops, OpCode::Strlen, OpCode::Pop]));
        assert_eq!(sim.run(&program, b"").unwrap(), b"abcd\n0x4\n".to_vec());
    }

    #[test]
    fn test_reads_and_read() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let program = code(&table, &[OpCode::Reads, OpCode::Pops, OpCode::Read, OpCode::Pop]);
        let mut input = b"hello\n".to_vec();
        input.extend_from_slice(&0x2au64.to_le_bytes());
        assert_eq!(sim.run(&program, &input).unwrap(), b"hello\n0x2a\n".to_vec());

        assert!(matches!(
            sim.run(&program, b"\n"),
            Err(SimError::InputExhausted { op: OpCode::Reads, .. })
        ));
    }

    #[test]
    fn test_branch_polarity() {
        let table = table();
        // push 9, push 3, lt, jz past the pushs/pops pair
        let mut program = push(&table, 9);
        program.extend(push(&table, 3));
        program.push(table.byte(OpCode::Lt));
        program.push(table.byte(OpCode::Jz));
        program.extend_from_slice(&26u16.to_le_bytes());
        program.extend(pushs(&table, b"x"));
        program.push(table.byte(OpCode::Pops));

        let mut direct = Simulator::new(&table, FlagPolarity::Direct);
        assert_eq!(direct.run(&program, b"").unwrap(), b"x\n".to_vec());

        let mut inverted = Simulator::new(&table, FlagPolarity::Inverted);
        assert_eq!(inverted.run(&program, b"").unwrap(), b"".to_vec());
    }

    #[test]
    fn test_type_mismatch() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, 1);
        program.push(table.byte(OpCode::Pops));
        assert!(matches!(sim.run(&program, b""), Err(SimError::TypeMismatch { .. })));
    }

    #[test]
    fn test_files() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = pushs(&table, b"secret");
        program.extend(pushs(&table, b"key1"));
        program.push(table.byte(OpCode::Writefile));
        program.extend(pushs(&table, b"key1"));
        program.extend(code(&table, &[OpCode::Readfile, OpCode::Pops]));
        assert_eq!(sim.run(&program, b"").unwrap(), b"file written\nsecret\n".to_vec());
        assert_eq!(sim.files().get(&b"key1"[..]), Some(&b"secret".to_vec()));

        let mut bad = pushs(&table, b"x");
        bad.extend(pushs(&table, b"../etc"));
        bad.push(table.byte(OpCode::Writefile));
        assert!(matches!(sim.run(&bad, b""), Err(SimError::InvalidFileName(_))));

        let mut missing = pushs(&table, b"nothere");
        missing.push(table.byte(OpCode::Readfile));
        assert!(matches!(sim.run(&missing, b""), Err(SimError::FileNotFound(_))));
    }

    #[test]
    fn test_unknown_opcode_halts() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = vec![0xff];
        program.extend(push(&table, 1));
        program.push(table.byte(OpCode::Pop));
        let mut output = Vec::new();
        let summary = sim.execute(&program, &mut &b""[..], &mut output).unwrap();
        assert_eq!(summary.halt, HaltReason::UnknownOpcode(0xff));
        assert!(output.is_empty());
    }

    #[test]
    fn test_step_limit() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = vec![table.byte(OpCode::Jmp)];
        program.extend_from_slice(&0u16.to_le_bytes());
        let mut output = Vec::new();
        let summary = sim.execute(&program, &mut &b""[..], &mut output).unwrap();
        assert_eq!(summary.halt, HaltReason::StepLimit);
        assert_eq!(summary.steps, MAX_EXECUTED_INSTRUCTIONS);
    }

    #[test]
    fn test_serve_handshake() {
        let table = table();
        let mut sim = Simulator::new(&table, FlagPolarity::Direct);
        let mut program = push(&table, 12);
        program.push(table.byte(OpCode::Pop));
        let mut input = format!("{}\n", program.len()).into_bytes();
        input.extend_from_slice(&program);
        let mut output = Vec::new();
        sim.serve(&mut &input[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Go program your\n"));
        assert!(text.ends_with("Length:\nBytecode:\n0xc\n"));

        let mut output = Vec::new();
        assert!(matches!(
            sim.serve(&mut &b"4096\n"[..], &mut output),
            Err(SimError::ProgramTooLarge { len: 4096, .. })
        ));
    }

    #[test]
    fn test_parse_long() {
        assert_eq!(parse_long(b"123"), 123);
        assert_eq!(parse_long(b"  42abc"), 42);
        assert_eq!(parse_long(b"abc"), 0);
        assert!(parse_long(b"-1") > MAX_WORD);
    }
}
