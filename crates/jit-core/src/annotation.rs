//! Bytecode annotation engine.
//!
//! Walks one compilation's parse tags against the member's decoded bytecode
//! and produces an offset → explanation map.
//!
//! # Cursor
//!
//! Every `bc` tag moves the cursor to an instruction. The log's opcode must
//! equal the class file's; if it does not, the class on the class path is not
//! the one the VM ran, so the map is flagged as a mismatch and decisions are
//! ignored until the next `bc` that lines up.
//!
//! # Sanity checks
//!
//! Inlining and intrinsic decisions must sit on an invoke, branch profiles on
//! a conditional branch, eliminated allocations on `new` and eliminated locks
//! on a lock-bearing instruction. A decision anywhere else fails the member's
//! pass with [`AnnotationError::SanityCheck`] and leaves the map empty.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use jit_bytecode::{BytecodeInstruction, BytecodeProvider, MemberBytecode, Opcode};
use jit_model::{JitDataModel, MemberId, MetaMember, VmVersion};
use jit_resolver::ClassResolver;
use jit_tags::names::{
    ATTR_ACTION, ATTR_BCI, ATTR_BYTES, ATTR_CNT, ATTR_CODE, ATTR_COMMENT, ATTR_COUNT, ATTR_IICOUNT,
    ATTR_ID, ATTR_KIND, ATTR_METHOD, ATTR_NOT_TAKEN, ATTR_PROB, ATTR_REASON, ATTR_TAKEN, ATTR_TYPE,
    TAG_BC, TAG_BRANCH, TAG_CALL, TAG_ELIMINATE_ALLOCATION, TAG_ELIMINATE_LOCK, TAG_INLINE_FAIL,
    TAG_INLINE_SUCCESS, TAG_INTRINSIC, TAG_JVMS, TAG_METHOD, TAG_PARSE, TAG_PHASE, TAG_UNCOMMON_TRAP,
};
use jit_tags::{ParseDictionary, Tag};

use crate::errors::AnnotationError;
use crate::journal::{dictionary_of, member_matches_method_id, method_display_name, parse_tags};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BCAnnotationType {
    InlineSuccess,
    InlineFail,
    Branch,
    Intrinsic,
    UncommonTrap,
    EliminatedAllocation,
    EliminatedLock,
    /// The log and the class file disagree about this offset.
    Mismatch,
}

impl fmt::Display for BCAnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BCAnnotationType::InlineSuccess => "inline success",
            BCAnnotationType::InlineFail => "inline fail",
            BCAnnotationType::Branch => "branch",
            BCAnnotationType::Intrinsic => "intrinsic",
            BCAnnotationType::UncommonTrap => "uncommon trap",
            BCAnnotationType::EliminatedAllocation => "eliminated allocation",
            BCAnnotationType::EliminatedLock => "eliminated lock",
            BCAnnotationType::Mismatch => "mismatch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub annotation_type: BCAnnotationType,
    /// One fact per line.
    pub text: String,
}

impl LineAnnotation {
    fn new(annotation_type: BCAnnotationType, lines: Vec<String>) -> Self {
        Self {
            annotation_type,
            text: lines.join("\n"),
        }
    }
}

/// Offset → annotations for one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeAnnotations {
    entries: BTreeMap<u32, Vec<LineAnnotation>>,
    mismatch: bool,
}

impl BytecodeAnnotations {
    pub fn add(&mut self, bci: u32, annotation: LineAnnotation) {
        self.entries.entry(bci).or_default().push(annotation);
    }

    pub fn annotations_at(&self, bci: u32) -> &[LineAnnotation] {
        self.entries.get(&bci).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of annotated offsets.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[LineAnnotation])> {
        self.entries.iter().map(|(bci, list)| (*bci, list.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when some `bc` disagreed with the class file.
    pub fn is_mismatch(&self) -> bool {
        self.mismatch
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.mismatch = false;
    }
}

// ============================================================================
// VM dispatch
// ============================================================================

/// How a VM release writes `eliminate_allocation`/`eliminate_lock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliminationShape {
    /// JDK 8: `jvms` children carry `bci` and `method`.
    Legacy,
    /// JDK 9 to 11: same children; locks also carry `kind`.
    Modern,
}

/// Release-string prefix → elimination shape. Releases not listed here skip
/// the elimination pass.
pub const ELIMINATION_SHAPES: &[(&str, EliminationShape)] = &[
    ("1.8", EliminationShape::Legacy),
    ("25.", EliminationShape::Legacy),
    ("9", EliminationShape::Modern),
    ("10.", EliminationShape::Modern),
    ("11.", EliminationShape::Modern),
];

pub fn elimination_shape(release: &str) -> Option<EliminationShape> {
    let release = release.trim();
    ELIMINATION_SHAPES
        .iter()
        .find(|(prefix, _)| release.starts_with(prefix))
        .map(|(_, shape)| *shape)
}

// ============================================================================
// Builder
// ============================================================================

/// Rebuilds a member's annotation map on every call.
#[derive(Debug, Default)]
pub struct BytecodeAnnotationBuilder {
    annotations: BytecodeAnnotations,
}

impl BytecodeAnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn annotations(&self) -> &BytecodeAnnotations {
        &self.annotations
    }

    /// Annotate compilation `index` of `member_id`, loading bytecode through
    /// the model's per-class cache.
    pub fn build_for_member(
        &mut self,
        model: &JitDataModel,
        member_id: MemberId,
        index: usize,
        resolver: &dyn ClassResolver,
        provider: &dyn BytecodeProvider,
    ) -> Result<&BytecodeAnnotations, AnnotationError> {
        self.annotations.clear();
        let member = model
            .member(member_id)
            .ok_or(AnnotationError::UnknownMember(member_id))?;
        let name = member.signature().to_string();
        let compilation = member
            .compilations()
            .get(index)
            .ok_or_else(|| AnnotationError::NoCompilation {
                member: name.clone(),
                index,
            })?;
        let task = compilation.task.clone().ok_or_else(|| AnnotationError::NoTask {
            member: name.clone(),
            compile_id: compilation.compile_id.clone(),
        })?;

        let class_bc = model
            .class_bytecode(member.class_id(), provider)
            .ok_or_else(|| AnnotationError::BytecodeUnavailable {
                class: member.signature().class_name.clone(),
            })?;
        let bytecode = class_bc
            .member_bytecode(member.signature(), resolver)
            .ok_or(AnnotationError::MemberBytecodeMissing { member: name })?;

        self.build(&member, &task, bytecode, model.vm_version().as_ref())
    }

    /// Annotate `member` from one compile `task` against its bytecode.
    pub fn build(
        &mut self,
        member: &MetaMember,
        task: &Tag,
        bytecode: &MemberBytecode,
        vm: Option<&VmVersion>,
    ) -> Result<&BytecodeAnnotations, AnnotationError> {
        self.annotations.clear();
        match annotate(member, task, bytecode, vm, &mut self.annotations) {
            Ok(()) => Ok(&self.annotations),
            Err(error) => {
                warn!(error = %error, "annotation pass abandoned");
                self.annotations.clear();
                Err(error)
            }
        }
    }
}

fn annotate(
    member: &MetaMember,
    task: &Tag,
    bytecode: &MemberBytecode,
    vm: Option<&VmVersion>,
    annotations: &mut BytecodeAnnotations,
) -> Result<(), AnnotationError> {
    let dictionary = dictionary_of(task);
    for parse in parse_tags(task) {
        let mut walker = ParseWalker {
            member,
            bytecode,
            dictionary: &dictionary,
            annotations: &mut *annotations,
            cursor: None,
            callee: None,
            call: None,
        };
        walker.walk(parse.children())?;
    }
    apply_eliminations(member, task, bytecode, &dictionary, vm, annotations)
}

struct ParseWalker<'a> {
    member: &'a MetaMember,
    bytecode: &'a MemberBytecode,
    dictionary: &'a ParseDictionary,
    annotations: &'a mut BytecodeAnnotations,
    /// Instruction at the last `bc`; `None` before the first one or after a mismatch.
    cursor: Option<&'a BytecodeInstruction>,
    /// Method id of the pending callee.
    callee: Option<&'a str>,
    call: Option<&'a Tag>,
}

impl<'a> ParseWalker<'a> {
    fn walk(&mut self, children: &'a [Tag]) -> Result<(), AnnotationError> {
        for tag in children {
            match tag.name() {
                TAG_BC => self.move_cursor(tag),
                TAG_CALL => {
                    self.callee = tag.attribute(ATTR_METHOD);
                    self.call = Some(tag);
                }
                TAG_METHOD => self.callee = tag.attribute(ATTR_ID),
                TAG_INLINE_SUCCESS | TAG_INLINE_FAIL => self.inline_decision(tag)?,
                TAG_BRANCH => self.branch(tag)?,
                TAG_INTRINSIC => self.intrinsic(tag)?,
                TAG_UNCOMMON_TRAP => self.uncommon_trap(tag),
                TAG_PHASE => self.walk(tag.children())?,
                // Inlined callee; its offsets are not ours.
                TAG_PARSE => {}
                _ => {}
            }
        }
        Ok(())
    }

    fn move_cursor(&mut self, tag: &Tag) {
        let Some(bci) = tag.attribute(ATTR_BCI).and_then(|b| b.parse::<u32>().ok()) else {
            debug!(tag = %tag.name(), "bc without a bci");
            self.cursor = None;
            return;
        };
        let code = tag.attribute(ATTR_CODE).and_then(|c| c.parse::<u8>().ok());
        match self.bytecode.instruction_at(bci) {
            Some(instruction) if code.map_or(true, |c| c == instruction.opcode.value()) => {
                self.cursor = Some(instruction);
            }
            found => {
                let logged = code
                    .and_then(Opcode::from_value)
                    .map(|op| op.mnemonic().to_string())
                    .unwrap_or_else(|| "?".to_string());
                let actual = found
                    .map(|i| i.opcode.mnemonic().to_string())
                    .unwrap_or_else(|| "no instruction".to_string());
                warn!(
                    member = %self.member.signature(),
                    bci,
                    logged = %logged,
                    actual = %actual,
                    "log does not match class bytecode"
                );
                self.annotations.mismatch = true;
                self.annotations.add(
                    bci,
                    LineAnnotation::new(
                        BCAnnotationType::Mismatch,
                        vec![format!("Log: {}", logged), format!("Class: {}", actual)],
                    ),
                );
                self.cursor = None;
            }
        }
    }

    /// The cursor instruction if it satisfies `accepts`; `Ok(None)` when
    /// there is no usable cursor.
    fn require(
        &self,
        tag: &Tag,
        accepts: fn(Opcode) -> bool,
        expected: &'static str,
    ) -> Result<Option<&'a BytecodeInstruction>, AnnotationError> {
        let Some(instruction) = self.cursor else {
            debug!(tag = %tag.name(), "decision without a usable bc");
            return Ok(None);
        };
        if accepts(instruction.opcode) {
            Ok(Some(instruction))
        } else {
            Err(sanity_failure(self.member, instruction, tag, expected))
        }
    }

    fn inline_decision(&mut self, tag: &Tag) -> Result<(), AnnotationError> {
        let instruction = self.require(tag, Opcode::is_invoke, "an invoke instruction")?;
        let callee = self.callee.take();
        let call = self.call.take();
        let Some(instruction) = instruction else {
            return Ok(());
        };

        let success = tag.name() == TAG_INLINE_SUCCESS;
        let mut lines = vec![format!("Inlined: {}", if success { "Yes" } else { "No" })];
        if let Some(name) = callee.and_then(|id| method_display_name(id, self.dictionary)) {
            lines.push(name);
        }
        if let Some(reason) = tag.attribute(ATTR_REASON) {
            lines.push(format!("Reason: {}", reason));
        }
        if let Some(count) = call.and_then(|c| c.attribute(ATTR_COUNT)) {
            lines.push(format!("Count: {}", count));
        }
        if let Some(method) = callee.and_then(|id| self.dictionary.method(id)) {
            if let Some(bytes) = method.attribute(ATTR_BYTES) {
                lines.push(format!("Bytes: {}", bytes));
            }
            if let Some(iicount) = method.attribute(ATTR_IICOUNT) {
                lines.push(format!("Invocations: {}", iicount));
            }
        }

        let kind = if success {
            BCAnnotationType::InlineSuccess
        } else {
            BCAnnotationType::InlineFail
        };
        self.annotations
            .add(instruction.offset, LineAnnotation::new(kind, lines));
        Ok(())
    }

    fn branch(&mut self, tag: &Tag) -> Result<(), AnnotationError> {
        let Some(instruction) = self.require(tag, Opcode::is_conditional_branch, "a conditional branch")? else {
            return Ok(());
        };
        let mut lines = Vec::new();
        if let Some(count) = tag.attribute(ATTR_CNT).or_else(|| tag.attribute(ATTR_COUNT)) {
            lines.push(format!("Count: {}", count));
        }
        if let Some(taken) = tag.attribute(ATTR_TAKEN) {
            lines.push(format!("Taken: {}", taken));
        }
        if let Some(not_taken) = tag.attribute(ATTR_NOT_TAKEN) {
            lines.push(format!("Not taken: {}", not_taken));
        }
        if let Some(prob) = tag.attribute(ATTR_PROB) {
            lines.push(format!("Taken Probability: {}", prob));
        }
        self.annotations.add(
            instruction.offset,
            LineAnnotation::new(BCAnnotationType::Branch, lines),
        );
        Ok(())
    }

    fn intrinsic(&mut self, tag: &Tag) -> Result<(), AnnotationError> {
        let instruction = self.require(tag, Opcode::is_invoke, "an invoke instruction")?;
        let callee = self.callee.take();
        self.call = None;
        let Some(instruction) = instruction else {
            return Ok(());
        };
        let mut lines = vec![format!(
            "Intrinsic: {}",
            tag.attribute(ATTR_ID).unwrap_or("unknown")
        )];
        if let Some(name) = callee.and_then(|id| method_display_name(id, self.dictionary)) {
            lines.push(name);
        }
        self.annotations.add(
            instruction.offset,
            LineAnnotation::new(BCAnnotationType::Intrinsic, lines),
        );
        Ok(())
    }

    fn uncommon_trap(&mut self, tag: &Tag) {
        if let Some(method) = tag.attribute(ATTR_METHOD) {
            if !member_matches_method_id(self.member, method, self.dictionary) {
                return;
            }
        }
        let bci = tag
            .attribute(ATTR_BCI)
            .and_then(|b| b.parse::<u32>().ok())
            .or_else(|| self.cursor.map(|i| i.offset));
        let Some(bci) = bci else {
            debug!("uncommon trap without a position");
            return;
        };
        self.annotations
            .add(bci, LineAnnotation::new(BCAnnotationType::UncommonTrap, trap_lines(tag)));
    }
}

/// `Reason`, `Action` and `Comment` lines of an `uncommon_trap`.
pub fn trap_lines(tag: &Tag) -> Vec<String> {
    [("Reason", ATTR_REASON), ("Action", ATTR_ACTION), ("Comment", ATTR_COMMENT)]
        .into_iter()
        .filter_map(|(label, attr)| tag.attribute(attr).map(|v| format!("{}: {}", label, v)))
        .collect()
}

fn sanity_failure(member: &MetaMember, instruction: &BytecodeInstruction, tag: &Tag, expected: &'static str) -> AnnotationError {
    AnnotationError::SanityCheck {
        member: member.signature().to_string(),
        bci: instruction.offset,
        instruction: instruction.to_string(),
        tag: tag.name().to_string(),
        expected,
    }
}

fn apply_eliminations(
    member: &MetaMember,
    task: &Tag,
    bytecode: &MemberBytecode,
    dictionary: &ParseDictionary,
    vm: Option<&VmVersion>,
    annotations: &mut BytecodeAnnotations,
) -> Result<(), AnnotationError> {
    let release = vm.and_then(|v| v.release.as_deref());
    let Some(shape) = release.and_then(elimination_shape) else {
        debug!(release = ?release, "no elimination shape for VM release; skipping");
        return Ok(());
    };

    for tag in task.descendants_named(TAG_ELIMINATE_ALLOCATION) {
        for bci in own_jvms_offsets(member, tag, dictionary) {
            let Some(instruction) = bytecode.instruction_at(bci) else {
                continue;
            };
            if instruction.opcode != Opcode::New {
                return Err(sanity_failure(member, instruction, tag, "a new instruction"));
            }
            let mut lines = vec!["Eliminated allocation".to_string()];
            if let Some(name) = tag
                .attribute(ATTR_TYPE)
                .and_then(|id| dictionary.type_or_klass_name(id))
            {
                lines.push(format!("Type: {}", name.replace('/', ".")));
            }
            annotations.add(
                bci,
                LineAnnotation::new(BCAnnotationType::EliminatedAllocation, lines),
            );
        }
    }

    for tag in task.descendants_named(TAG_ELIMINATE_LOCK) {
        for bci in own_jvms_offsets(member, tag, dictionary) {
            let Some(instruction) = bytecode.instruction_at(bci) else {
                continue;
            };
            if !instruction.opcode.is_lock_bearing() {
                return Err(sanity_failure(member, instruction, tag, "a lock-bearing instruction"));
            }
            let mut lines = vec!["Eliminated lock".to_string()];
            if shape == EliminationShape::Modern {
                if let Some(kind) = tag.attribute(ATTR_KIND) {
                    lines.push(format!("Kind: {}", kind));
                }
            }
            annotations.add(bci, LineAnnotation::new(BCAnnotationType::EliminatedLock, lines));
        }
    }
    Ok(())
}

/// `bci` of every `jvms` child whose method is `member`.
fn own_jvms_offsets(member: &MetaMember, tag: &Tag, dictionary: &ParseDictionary) -> Vec<u32> {
    tag.named_children(TAG_JVMS)
        .filter(|jvms| {
            jvms.attribute(ATTR_METHOD)
                .is_some_and(|id| member_matches_method_id(member, id, dictionary))
        })
        .filter_map(|jvms| jvms.attribute(ATTR_BCI).and_then(|b| b.parse().ok()))
        .collect()
}
