use std::fmt;

/// Failure to obtain or decode a class's bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    /// The disassembler could not be started.
    Spawn { program: String, message: String },
    /// The disassembler ran but reported failure (usually class not found).
    JavapFailed { class: String, status: Option<i32>, stderr: String },
    /// Disassembly text did not have the expected shape.
    Malformed { line: usize, message: String },
    ClassNotFound(String),
}

impl fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeError::Spawn { program, message } => {
                write!(f, "failed to run {}: {}", program, message)
            }
            BytecodeError::JavapFailed {
                class,
                status,
                stderr,
            } => {
                write!(f, "javap failed for {}", class)?;
                if let Some(code) = status {
                    write!(f, " (exit status {})", code)?;
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            BytecodeError::Malformed { line, message } => {
                write!(f, "malformed disassembly at line {}: {}", line, message)
            }
            BytecodeError::ClassNotFound(class) => write!(f, "no bytecode available for {}", class),
        }
    }
}

impl std::error::Error for BytecodeError {}
