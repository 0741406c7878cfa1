//! Tagged value stack of the reference simulator.
//!
//! The VM keeps integers and string pointers on one physical stack and tells
//! them apart by the top bit of each word. Modelling both as variants of one
//! LIFO keeps `cpy` and `swap` type-agnostic the way the VM treats them, and
//! turns any domain mix-up into a type mismatch.

use crate::error::{SimError, SimResult};
use std::fmt;
use veighty_isa::OpCode;

/// A value on the simulated stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    Int(u64),
    Str(Vec<u8>),
}

impl StackValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StackValue::Int(_) => "integer",
            StackValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Int(value) => write!(f, "{:#x}", value),
            StackValue::Str(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
        }
    }
}

/// LIFO of tagged values. Every accessor names the instruction and offset
/// it serves so failures point at the offending byte.
#[derive(Debug, Clone, Default)]
pub struct SimStack {
    items: Vec<StackValue>,
}

impl SimStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, value: StackValue) {
        self.items.push(value);
    }

    pub fn push_int(&mut self, value: u64) {
        self.items.push(StackValue::Int(value));
    }

    pub fn push_str(&mut self, value: Vec<u8>) {
        self.items.push(StackValue::Str(value));
    }

    pub fn pop(&mut self, op: OpCode, at: usize) -> SimResult<StackValue> {
        self.items.pop().ok_or(SimError::StackUnderflow { op, at })
    }

    pub fn pop_int(&mut self, op: OpCode, at: usize) -> SimResult<u64> {
        match self.pop(op, at)? {
            StackValue::Int(value) => Ok(value),
            StackValue::Str(_) => Err(SimError::TypeMismatch {
                op,
                at,
                expected: "integer",
            }),
        }
    }

    pub fn pop_str(&mut self, op: OpCode, at: usize) -> SimResult<Vec<u8>> {
        match self.pop(op, at)? {
            StackValue::Str(value) => Ok(value),
            StackValue::Int(_) => Err(SimError::TypeMismatch {
                op,
                at,
                expected: "string",
            }),
        }
    }

    pub fn peek(&self) -> Option<&StackValue> {
        self.items.last()
    }

    /// Duplicates the top value.
    pub fn dup(&mut self, op: OpCode, at: usize) -> SimResult<()> {
        let top = self.peek().cloned().ok_or(SimError::StackUnderflow { op, at })?;
        self.items.push(top);
        Ok(())
    }

    /// Exchanges the two topmost values.
    pub fn swap(&mut self, op: OpCode, at: usize) -> SimResult<()> {
        let len = self.items.len();
        if len < 2 {
            return Err(SimError::StackUnderflow { op, at });
        }
        self.items.swap(len - 1, len - 2);
        Ok(())
    }
}
