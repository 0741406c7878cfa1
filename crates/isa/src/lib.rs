//! # Veighty ISA
//!
//! Opcode table, operand encoding and program model of the veighty-machinery
//! stack VM.
//!
//! ## Bytecode format
//!
//! - Opcode: 1 byte, assigned by the VM's opcode definition
//! - `push`: 8-byte little-endian integer (63-bit word domain)
//! - `pushs`: 1 length byte followed by up to 255 bytes
//! - `jmp`, `jz`, `jnz`: 2-byte little-endian absolute byte offset
//!
//! A program is sent as its decimal length on its own line followed by the
//! raw bytes, and must stay strictly below 4096 bytes.
//!
//! ## Example
//!
//! ```rust
//! use veighty_isa::{InstructionBuilder, OpCode, OpcodeTable, Program};
//!
//! # fn example() -> Result<(), veighty_isa::IsaError> {
//! let table = OpcodeTable::bundled()?;
//! let builder = InstructionBuilder::new(&table);
//! let program = Program::checked(vec![
//!     builder.emit_push_int(7)?,
//!     builder.emit(OpCode::Pop)?.with_output("0x7"),
//! ])?;
//! assert_eq!(program.encoded_len(), 10);
//! # Ok(())
//! # }
//! ```

/// Instruction construction against a loaded opcode table
pub mod builder;
/// Opcode definition loading and the opcode table
pub mod definition;
/// Operand encoders
pub mod encoding;
/// ISA error types and result handling
pub mod error;
/// Encoded instruction representation
pub mod instruction;
/// Opcode identities and operand encodings
pub mod op_code;
/// Program representation and wire framing
pub mod program;
/// Connection handshake text
pub mod protocol;

pub use builder::InstructionBuilder;
pub use definition::OpcodeTable;
pub use encoding::{encode_int, encode_jump, encode_string, format_hex};
pub use error::{IsaError, IsaResult};
pub use instruction::{Instruction, InstructionKind};
pub use op_code::{OpCode, OperandEncoding};
pub use program::Program;
