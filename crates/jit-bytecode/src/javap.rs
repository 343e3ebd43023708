//! `javap -c -p -v` output parsing and the loaders built on it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, trace, warn};

use jit_resolver::MemberSignatureParts;
use jit_types::{strip_generics, MethodDescriptor};

use crate::errors::BytecodeError;
use crate::model::{BytecodeInstruction, ClassBC, ExceptionTableEntry, MemberBytecode};
use crate::opcode::Opcode;

/// Source of decoded class bytecode.
pub trait BytecodeProvider: Send + Sync {
    fn load_class(&self, fqcn: &str) -> Result<ClassBC, BytecodeError>;
}

/// Runs `javap` against a class path.
#[derive(Debug, Clone)]
pub struct JavapBytecodeLoader {
    javap: PathBuf,
    class_path: Vec<PathBuf>,
}

impl JavapBytecodeLoader {
    pub fn new(javap: impl Into<PathBuf>, class_path: Vec<PathBuf>) -> Self {
        Self {
            javap: javap.into(),
            class_path,
        }
    }

    fn command(&self, fqcn: &str) -> Command {
        let mut command = Command::new(&self.javap);
        command.args(["-c", "-p", "-v"]);
        if let Ok(joined) = std::env::join_paths(&self.class_path) {
            if !joined.is_empty() {
                command.arg("-classpath").arg(joined);
            }
        }
        command.arg(fqcn);
        command
    }
}

impl BytecodeProvider for JavapBytecodeLoader {
    fn load_class(&self, fqcn: &str) -> Result<ClassBC, BytecodeError> {
        debug!(class = fqcn, javap = %self.javap.display(), "disassembling class");
        let output = self.command(fqcn).output().map_err(|e| BytecodeError::Spawn {
            program: self.javap.display().to_string(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(BytecodeError::JavapFailed {
                class: fqcn.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        parse_javap_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// In-memory javap text keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct StaticBytecodeProvider {
    classes: HashMap<String, String>,
}

impl StaticBytecodeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, fqcn: impl Into<String>, javap_text: impl Into<String>) -> Self {
        self.classes.insert(fqcn.into(), javap_text.into());
        self
    }
}

impl BytecodeProvider for StaticBytecodeProvider {
    fn load_class(&self, fqcn: &str) -> Result<ClassBC, BytecodeError> {
        let text = self
            .classes
            .get(fqcn)
            .ok_or_else(|| BytecodeError::ClassNotFound(fqcn.to_string()))?;
        parse_javap_output(text)
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    ConstantPool,
    Member,
    Code,
    Switch,
    LineNumbers,
    Exceptions,
    /// Attribute tables we do not keep (`LocalVariableTable`, `StackMapTable`, ...).
    Skipped,
}

struct JavapParser {
    class: ClassBC,
    section: Section,
    current: Option<MemberBytecode>,
    in_body: bool,
}

/// Parse the text of `javap -c -p -v <class>`.
pub fn parse_javap_output(text: &str) -> Result<ClassBC, BytecodeError> {
    let mut parser = JavapParser {
        class: ClassBC::default(),
        section: Section::Preamble,
        current: None,
        in_body: false,
    };
    for (index, line) in text.lines().enumerate() {
        parser.line(index + 1, line)?;
    }
    parser.finish_member();

    if parser.class.fqcn.is_empty() {
        return Err(BytecodeError::Malformed {
            line: 0,
            message: "no class declaration found".to_string(),
        });
    }
    Ok(parser.class)
}

impl JavapParser {
    fn line(&mut self, number: usize, line: &str) -> Result<(), BytecodeError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if !self.in_body {
            return self.preamble_line(number, line, trimmed);
        }

        if line.starts_with('}') {
            self.finish_member();
            self.in_body = false;
            self.section = Section::Preamble;
            return Ok(());
        }

        if is_declaration(line) {
            self.finish_member();
            if is_member_header(trimmed) {
                self.start_member(number, trimmed)?;
            }
            return Ok(());
        }

        if self.current.is_none() {
            return Ok(());
        }

        if let Some(value) = trimmed.strip_prefix("descriptor:") {
            self.set_descriptor(value.trim());
            return Ok(());
        }

        match trimmed {
            "Code:" => {
                self.section = Section::Code;
                return Ok(());
            }
            "LineNumberTable:" => {
                self.section = Section::LineNumbers;
                return Ok(());
            }
            "Exception table:" => {
                self.section = Section::Exceptions;
                return Ok(());
            }
            _ => {}
        }
        if is_attribute_header(trimmed) {
            self.section = Section::Skipped;
            return Ok(());
        }

        match self.section {
            Section::Code => self.code_line(number, trimmed),
            Section::Switch => {
                self.switch_line(trimmed);
                Ok(())
            }
            Section::LineNumbers => {
                self.line_number_line(trimmed);
                Ok(())
            }
            Section::Exceptions => {
                self.exception_line(trimmed);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn preamble_line(&mut self, number: usize, line: &str, trimmed: &str) -> Result<(), BytecodeError> {
        if trimmed == "{" {
            self.in_body = true;
            self.section = Section::Member;
            return Ok(());
        }
        if let Some(rest) = trimmed.strip_prefix("Compiled from") {
            self.class.source_file = Some(rest.trim().trim_matches('"').to_string());
        } else if let Some(rest) = trimmed.strip_prefix("SourceFile:") {
            self.class.source_file = Some(rest.trim().trim_matches('"').to_string());
        } else if let Some(rest) = trimmed.strip_prefix("minor version:") {
            self.class.minor_version = parse_number(number, rest)?;
        } else if let Some(rest) = trimmed.strip_prefix("major version:") {
            self.class.major_version = parse_number(number, rest)?;
        } else if trimmed == "Constant pool:" {
            self.section = Section::ConstantPool;
        } else if self.section == Section::ConstantPool && trimmed.starts_with('#') {
            self.constant_line(trimmed);
        } else if !line.starts_with(' ') && self.class.fqcn.is_empty() {
            if let Some(name) = class_name_from_declaration(trimmed) {
                self.class.fqcn = name;
            }
        }
        Ok(())
    }

    fn constant_line(&mut self, trimmed: &str) {
        let Some((index, rest)) = trimmed[1..].split_once('=') else {
            return;
        };
        let Ok(index) = index.trim().parse::<u16>() else {
            return;
        };
        let comment = match rest.split_once("//") {
            Some((_, comment)) => comment.trim().to_string(),
            None => rest.trim().to_string(),
        };
        self.class.constant_pool.insert(index, comment);
    }

    fn start_member(&mut self, number: usize, header: &str) -> Result<(), BytecodeError> {
        let header = header.strip_suffix(';').unwrap_or(header);
        let signature = MemberSignatureParts::from_bytecode_signature(header, &self.class.fqcn).map_err(|e| {
            BytecodeError::Malformed {
                line: number,
                message: e.to_string(),
            }
        })?;
        trace!(member = %signature, "javap member");
        self.current = Some(MemberBytecode::new(signature, header));
        self.section = Section::Member;
        Ok(())
    }

    /// Erased descriptor types replace the header's source spellings so
    /// lookups need no generics or import resolution.
    fn set_descriptor(&mut self, descriptor: &str) {
        let Some(member) = self.current.as_mut() else {
            return;
        };
        member.descriptor = Some(descriptor.to_string());
        match MethodDescriptor::parse(descriptor) {
            Ok(parsed) => {
                member.signature.param_types = parsed.params.iter().map(|p| p.to_string()).collect();
                if !member.signature.is_constructor() {
                    member.signature.return_type = parsed.return_type.to_string();
                }
                member.signature.generics.clear();
            }
            Err(e) => warn!(descriptor, error = %e, "unparseable member descriptor"),
        }
    }

    fn code_line(&mut self, number: usize, trimmed: &str) -> Result<(), BytecodeError> {
        let Some((offset, rest)) = trimmed.split_once(':') else {
            return Ok(());
        };
        let Ok(offset) = offset.trim().parse::<u32>() else {
            // `stack=2, locals=1, args_size=1`
            return Ok(());
        };

        let (body, comment) = match rest.split_once("//") {
            Some((body, comment)) => (body.trim(), Some(comment.trim().to_string())),
            None => (rest.trim(), None),
        };
        let (mnemonic, operands) = match body.split_once(char::is_whitespace) {
            Some((mnemonic, operands)) => (mnemonic, operands.trim()),
            None => (body, ""),
        };
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| BytecodeError::Malformed {
            line: number,
            message: format!("unknown mnemonic '{}'", mnemonic),
        })?;

        let mut instruction = BytecodeInstruction::new(offset, opcode);
        instruction.comment = comment;
        if opcode.is_switch() {
            self.section = Section::Switch;
        } else {
            instruction.parameters = operands
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(member) = self.current.as_mut() {
            member.instructions.push(instruction);
        }
        Ok(())
    }

    fn switch_line(&mut self, trimmed: &str) {
        if trimmed.starts_with('}') {
            self.section = Section::Code;
            return;
        }
        let Some(member) = self.current.as_mut() else {
            return;
        };
        if let (Some(instruction), Some((key, target))) = (member.instructions.last_mut(), trimmed.split_once(':')) {
            instruction
                .parameters
                .push(format!("{}: {}", key.trim(), target.trim()));
        }
    }

    fn line_number_line(&mut self, trimmed: &str) {
        let Some(rest) = trimmed.strip_prefix("line ") else {
            return;
        };
        let Some((line, bci)) = rest.split_once(':') else {
            return;
        };
        if let (Ok(line), Ok(bci), Some(member)) = (
            line.trim().parse::<u32>(),
            bci.trim().parse::<u32>(),
            self.current.as_mut(),
        ) {
            member.line_table.add(line, bci);
        }
    }

    fn exception_line(&mut self, trimmed: &str) {
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [from, to, target, kind @ ..] = fields.as_slice() else {
            return;
        };
        let (Ok(from), Ok(to), Ok(target)) = (from.parse(), to.parse(), target.parse()) else {
            // Header row: `from to target type`.
            return;
        };
        let catch_type = match kind {
            ["Class", name, ..] => Some(name.replace('/', ".")),
            _ => None,
        };
        if let Some(member) = self.current.as_mut() {
            member.exception_table.push(ExceptionTableEntry {
                from,
                to,
                target,
                catch_type,
            });
        }
    }

    fn finish_member(&mut self) {
        if let Some(mut member) = self.current.take() {
            member.instructions.sort_by_key(|i| i.offset);
            self.class.members.push(member);
        }
        self.section = Section::Member;
    }
}

/// Fields and members sit at exactly two spaces of indentation inside the
/// class body.
fn is_declaration(line: &str) -> bool {
    line.starts_with("  ") && !line.starts_with("   ") && line.trim_end().ends_with(';')
}

/// Methods, constructors and static initialisers; fields have no parameter list.
fn is_member_header(trimmed: &str) -> bool {
    trimmed.contains('(') || trimmed.starts_with("static {}")
}

/// `StackMapTable: number_of_entries = 1`, `LocalVariableTable:`, `Signature: #12`.
fn is_attribute_header(trimmed: &str) -> bool {
    let first = trimmed.split_whitespace().next().unwrap_or_default();
    first.len() > 1 && first.ends_with(':') && first.starts_with(|c: char| c.is_ascii_uppercase())
}

fn class_name_from_declaration(line: &str) -> Option<String> {
    let mut words = line.split_whitespace();
    while let Some(word) = words.next() {
        if matches!(word, "class" | "interface" | "enum" | "record") {
            let name = words.next()?;
            return Some(strip_generics(name));
        }
    }
    None
}

fn parse_number(line: usize, text: &str) -> Result<u16, BytecodeError> {
    text.trim().parse().map_err(|_| BytecodeError::Malformed {
        line,
        message: format!("expected a number, found '{}'", text.trim()),
    })
}
