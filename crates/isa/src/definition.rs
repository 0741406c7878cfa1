//! Opcode definition loading.
//!
//! The VM declares its instruction set with an X-macro:
//!
//! ```text
//! #define FOREACH_INSTRUCTION(INS) \
//!   INS(nop) \
//!   INS(push) \
//!   ...
//! ```
//!
//! and numbers the generated enum from zero, so the byte of an opcode is its
//! position in that list. The table built here is the only source of opcode
//! bytes used by the encoder, the generators and the simulator.

use crate::error::{IsaError, IsaResult};
use crate::op_code::OpCode;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const DEFINITION_MACRO: &str = "FOREACH_INSTRUCTION";
const ENTRY_MARKER: &str = "INS(";

/// Definition shipped with the crate, a verbatim copy of the VM's
/// `include/opcodes.h`.
pub const BUNDLED_DEFINITION: &str = include_str!("../definitions/opcodes.h");

/// Bidirectional mapping between opcodes and their bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    bytes: [u8; OpCode::COUNT],
    opcodes: [Option<OpCode>; 256],
}

impl OpcodeTable {
    /// Builds the table from the text of an opcode definition.
    pub fn from_definition(text: &str) -> IsaResult<Self> {
        let names = parse_entries(text)?;
        if names.len() > 256 {
            return Err(IsaError::TooManyOpcodes(names.len()));
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(names.len());
        for name in names {
            let op: OpCode = name
                .parse()
                .map_err(|_| IsaError::UnknownMnemonic(name.clone()))?;
            if !seen.insert(op) {
                return Err(IsaError::DuplicateMnemonic(name));
            }
            ordered.push(op);
        }

        let missing: Vec<String> = OpCode::ALL
            .iter()
            .filter(|op| !seen.contains(op))
            .map(|op| op.mnemonic().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IsaError::MissingMnemonics(missing));
        }

        let mut bytes = [0u8; OpCode::COUNT];
        let mut opcodes = [None; 256];
        for (position, op) in ordered.into_iter().enumerate() {
            bytes[op.index()] = position as u8;
            opcodes[position] = Some(op);
        }

        debug!(entries = OpCode::COUNT, "opcode table loaded");
        Ok(Self { bytes, opcodes })
    }

    /// Reads and parses an opcode definition file.
    pub fn load(path: &Path) -> IsaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| IsaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_definition(&text)
    }

    /// Loads `path` when given, the bundled definition otherwise.
    pub fn load_or_bundled(path: Option<&Path>) -> IsaResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    /// Parses the definition bundled with the crate.
    pub fn bundled() -> IsaResult<Self> {
        Self::from_definition(BUNDLED_DEFINITION)
    }

    /// Byte that encodes `op`.
    pub fn byte(&self, op: OpCode) -> u8 {
        self.bytes[op.index()]
    }

    /// Opcode encoded by `byte`, if any.
    pub fn decode(&self, byte: u8) -> Option<OpCode> {
        self.opcodes[byte as usize]
    }
}

/// Extracts the ordered entry names of the instruction X-macro.
fn parse_entries(text: &str) -> IsaResult<Vec<String>> {
    let mut lines = text.lines();
    let header = lines
        .by_ref()
        .find(|line| {
            let line = line.trim_start();
            line.starts_with("#define") && line.contains(DEFINITION_MACRO)
        })
        .ok_or(IsaError::MissingDefinition)?;

    let mut body = String::new();
    let mut continued = header.trim_end().ends_with('\\');
    while continued {
        let Some(line) = lines.next() else { break };
        let line = line.trim_end();
        continued = line.ends_with('\\');
        body.push_str(line.trim_end_matches('\\'));
        body.push('\n');
    }

    let mut names = Vec::new();
    let mut rest = body.as_str();
    while let Some(start) = rest.find(ENTRY_MARKER) {
        rest = &rest[start + ENTRY_MARKER.len()..];
        let end = rest.find(')').ok_or(IsaError::MissingDefinition)?;
        names.push(rest[..end].trim().to_string());
        rest = &rest[end + 1..];
    }

    if names.is_empty() {
        return Err(IsaError::MissingDefinition);
    }
    Ok(names)
}
