//! Bytecode loading for JIT log correlation.
//!
//! Class bytecode comes from `javap -c -p -v` disassembly. Each member is keyed
//! by its [`MemberSignatureParts`](jit_resolver::MemberSignatureParts) so it can
//! be aligned with log signatures and resolved runtime members.

pub mod errors;
pub mod javap;
pub mod model;
pub mod opcode;

pub use errors::BytecodeError;
pub use javap::{parse_javap_output, BytecodeProvider, JavapBytecodeLoader, StaticBytecodeProvider};
pub use model::{BytecodeInstruction, ClassBC, ExceptionTableEntry, LineTable, LineTableEntry, MemberBytecode};
pub use opcode::Opcode;
