//! Decoded per-class bytecode.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use jit_resolver::{resolve_type_name, ClassResolver, MemberSignatureParts};

use crate::opcode::Opcode;

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeInstruction {
    pub offset: u32,
    pub opcode: Opcode,
    /// Operands as printed, e.g. `#12` or `1, 1`. Switch arms are `key: target`.
    pub parameters: Vec<String>,
    /// javap's trailing `// ...` constant-pool rendering.
    pub comment: Option<String>,
}

impl BytecodeInstruction {
    pub fn new(offset: u32, opcode: Opcode) -> Self {
        Self {
            offset,
            opcode,
            parameters: Vec::new(),
            comment: None,
        }
    }
}

impl fmt::Display for BytecodeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.offset, self.opcode)?;
        if !self.parameters.is_empty() && !self.opcode.is_switch() {
            write!(f, " {}", self.parameters.join(", "))?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " // {}", comment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTableEntry {
    pub line: u32,
    pub bci: u32,
}

/// Source line to bytecode offset mapping from `LineNumberTable`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTable {
    entries: Vec<LineTableEntry>,
}

impl LineTable {
    pub fn add(&mut self, line: u32, bci: u32) {
        self.entries.push(LineTableEntry { line, bci });
    }

    pub fn entries(&self) -> &[LineTableEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First offset recorded for a source line.
    pub fn bci_for_line(&self, line: u32) -> Option<u32> {
        self.entries
            .iter()
            .filter(|e| e.line == line)
            .map(|e| e.bci)
            .min()
    }

    /// Source line of the closest entry at or before `bci`.
    pub fn line_for_bci(&self, bci: u32) -> Option<u32> {
        self.entries
            .iter()
            .filter(|e| e.bci <= bci)
            .max_by_key(|e| e.bci)
            .map(|e| e.line)
    }

    pub fn line_range(&self) -> Option<(u32, u32)> {
        let min = self.entries.iter().map(|e| e.line).min()?;
        let max = self.entries.iter().map(|e| e.line).max()?;
        Some((min, max))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionTableEntry {
    pub from: u32,
    pub to: u32,
    pub target: u32,
    /// Dotted class name; `None` for `any`.
    pub catch_type: Option<String>,
}

/// Bytecode of one method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBytecode {
    pub signature: MemberSignatureParts,
    /// Header line as printed by javap, without the trailing `;`.
    pub header: String,
    pub descriptor: Option<String>,
    /// Sorted by offset.
    pub instructions: Vec<BytecodeInstruction>,
    pub line_table: LineTable,
    pub exception_table: Vec<ExceptionTableEntry>,
}

impl MemberBytecode {
    pub fn new(signature: MemberSignatureParts, header: impl Into<String>) -> Self {
        Self {
            signature,
            header: header.into(),
            descriptor: None,
            instructions: Vec::new(),
            line_table: LineTable::default(),
            exception_table: Vec::new(),
        }
    }

    pub fn instruction_at(&self, bci: u32) -> Option<&BytecodeInstruction> {
        self.instructions
            .binary_search_by_key(&bci, |i| i.offset)
            .ok()
            .map(|index| &self.instructions[index])
    }

    pub fn has_code(&self) -> bool {
        !self.instructions.is_empty()
    }
}

/// All decoded members of one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBC {
    pub fqcn: String,
    pub source_file: Option<String>,
    pub major_version: u16,
    pub minor_version: u16,
    /// `// ...` rendering of each constant-pool entry, by index.
    pub constant_pool: BTreeMap<u16, String>,
    pub members: Vec<MemberBytecode>,
}

impl ClassBC {
    pub fn new(fqcn: impl Into<String>) -> Self {
        Self {
            fqcn: fqcn.into(),
            ..Self::default()
        }
    }

    /// Bytecode for the member described by `parts`.
    ///
    /// Tries an exact name and parameter spelling match first, then compares
    /// resolved parameter types so unqualified or generic spellings still line up.
    pub fn member_bytecode(&self, parts: &MemberSignatureParts, resolver: &dyn ClassResolver) -> Option<&MemberBytecode> {
        let candidates = || {
            self.members
                .iter()
                .filter(move |m| m.signature.member_name == parts.member_name)
        };

        if let Some(exact) = candidates().find(|m| m.signature.param_types == parts.param_types) {
            return Some(exact);
        }

        let wanted = resolve_all(parts, resolver)?;
        candidates().find(|m| {
            m.signature.param_types.len() == parts.param_types.len()
                && resolve_all(&m.signature, resolver).as_deref() == Some(wanted.as_slice())
        })
    }

    /// Java version as `major.minor`, e.g. `52.0`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }
}

fn resolve_all(parts: &MemberSignatureParts, resolver: &dyn ClassResolver) -> Option<Vec<jit_types::TypeDesc>> {
    parts
        .param_types
        .iter()
        .map(|p| resolve_type_name(p, &parts.generics, resolver).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_resolver::StaticClassResolver;

    fn member(header: &str, class: &str) -> MemberBytecode {
        MemberBytecode::new(
            MemberSignatureParts::from_bytecode_signature(header, class).unwrap(),
            header,
        )
    }

    #[test]
    fn test_line_table_lookup() {
        let mut table = LineTable::default();
        table.add(10, 0);
        table.add(11, 4);
        table.add(10, 9);
        assert_eq!(table.bci_for_line(10), Some(0));
        assert_eq!(table.line_for_bci(6), Some(11));
        assert_eq!(table.line_for_bci(9), Some(10));
        assert_eq!(table.line_range(), Some((10, 11)));
        assert_eq!(LineTable::default().line_for_bci(0), None);
    }

    #[test]
    fn test_instruction_at() {
        let mut m = member("public void run()", "a.B");
        m.instructions.push(BytecodeInstruction::new(0, Opcode::Aload0));
        m.instructions.push(BytecodeInstruction::new(1, Opcode::Invokevirtual));
        m.instructions.push(BytecodeInstruction::new(4, Opcode::Return));
        assert_eq!(m.instruction_at(1).map(|i| i.opcode), Some(Opcode::Invokevirtual));
        assert!(m.instruction_at(2).is_none());
    }

    #[test]
    fn test_member_lookup_resolves_spellings() {
        let resolver = StaticClassResolver::new()
            .with_class(jit_resolver::ResolvedClass::new("java.lang.String"));
        let mut class = ClassBC::new("a.B");
        class.members.push(member("public void put(java.lang.String, int)", "a.B"));
        class.members.push(member("public void put(int)", "a.B"));

        let log = MemberSignatureParts::from_log_signature("a/B put (Ljava/lang/String;I)V").unwrap();
        let found = class.member_bytecode(&log, &resolver).unwrap();
        assert_eq!(found.signature.param_types.len(), 2);

        let short = MemberSignatureParts::from_bytecode_signature("void put(String, int)", "a.B").unwrap();
        assert!(class.member_bytecode(&short, &resolver).is_some());

        let missing = MemberSignatureParts::from_log_signature("a/B put (J)V").unwrap();
        assert!(class.member_bytecode(&missing, &resolver).is_none());
    }

    #[test]
    fn test_instruction_display() {
        let mut insn = BytecodeInstruction::new(5, Opcode::Invokevirtual);
        insn.parameters.push("#7".to_string());
        insn.comment = Some("Method java/lang/String.length:()I".to_string());
        assert_eq!(insn.to_string(), "5: invokevirtual #7 // Method java/lang/String.length:()I");
    }
}
