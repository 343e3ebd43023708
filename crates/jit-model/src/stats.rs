//! Aggregate counters for one parse session.

use serde::{Deserialize, Serialize};

use jit_types::Modifier;

use crate::compilation::CompileKind;

/// Session-wide compile statistics.
///
/// Lives inside the model's lock, so each compiled event is folded in as a
/// single update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitStats {
    pub count_public: u64,
    pub count_private: u64,
    pub count_protected: u64,
    pub count_static: u64,
    pub count_final: u64,
    pub count_synchronized: u64,
    pub count_strictfp: u64,
    pub count_native: u64,
    pub count_abstract: u64,

    pub count_method: u64,
    pub count_constructor: u64,

    pub count_c1: u64,
    pub count_c2: u64,
    pub count_osr: u64,
    pub count_c2n: u64,

    pub total_native_bytes: u64,
    pub total_compile_time_ms: u64,
    pub max_compile_time_ms: u64,
    /// Queue-to-emit delay of every compiled event, in arrival order.
    pub compile_delays_ms: Vec<u64>,

    pub classes_loaded: u64,
    pub unresolved_classes: u64,
}

type Increment = fn(&mut JitStats);

fn inc_public(s: &mut JitStats) {
    s.count_public += 1;
}
fn inc_private(s: &mut JitStats) {
    s.count_private += 1;
}
fn inc_protected(s: &mut JitStats) {
    s.count_protected += 1;
}
fn inc_static(s: &mut JitStats) {
    s.count_static += 1;
}
fn inc_final(s: &mut JitStats) {
    s.count_final += 1;
}
fn inc_synchronized(s: &mut JitStats) {
    s.count_synchronized += 1;
}
fn inc_strictfp(s: &mut JitStats) {
    s.count_strictfp += 1;
}
fn inc_native(s: &mut JitStats) {
    s.count_native += 1;
}
fn inc_abstract(s: &mut JitStats) {
    s.count_abstract += 1;
}

/// Which counter each modifier feeds.
const MODIFIER_COUNTERS: &[(Modifier, Increment)] = &[
    (Modifier::Public, inc_public as Increment),
    (Modifier::Private, inc_private as Increment),
    (Modifier::Protected, inc_protected as Increment),
    (Modifier::Static, inc_static as Increment),
    (Modifier::Final, inc_final as Increment),
    (Modifier::Synchronized, inc_synchronized as Increment),
    (Modifier::Strictfp, inc_strictfp as Increment),
    (Modifier::Native, inc_native as Increment),
    (Modifier::Abstract, inc_abstract as Increment),
];

/// Facts about one compiled event needed to update the aggregate.
#[derive(Debug, Clone)]
pub struct CompiledEvent<'a> {
    pub modifiers: u32,
    pub is_constructor: bool,
    pub compiler: Option<&'a str>,
    pub kind: CompileKind,
    pub native_size: Option<u64>,
    pub delay_ms: Option<u64>,
}

impl JitStats {
    pub fn record_compiled(&mut self, event: &CompiledEvent<'_>) {
        for (modifier, increment) in MODIFIER_COUNTERS {
            if modifier.is_set(event.modifiers) {
                increment(self);
            }
        }

        if event.is_constructor {
            self.count_constructor += 1;
        } else {
            self.count_method += 1;
        }

        match event.kind {
            CompileKind::Osr => self.count_osr += 1,
            CompileKind::C2n => self.count_c2n += 1,
            CompileKind::Standard => {}
        }
        match event.compiler {
            Some(c) if c.eq_ignore_ascii_case(jit_tags::names::COMPILER_C1) => self.count_c1 += 1,
            Some(c) if c.eq_ignore_ascii_case(jit_tags::names::COMPILER_C2) => self.count_c2 += 1,
            _ => {}
        }

        self.total_native_bytes += event.native_size.unwrap_or(0);

        if let Some(delay) = event.delay_ms {
            self.total_compile_time_ms += delay;
            self.max_compile_time_ms = self.max_compile_time_ms.max(delay);
            self.compile_delays_ms.push(delay);
        }
    }

    pub fn total_compiled(&self) -> u64 {
        self.count_method + self.count_constructor
    }

    pub fn average_compile_time_ms(&self) -> Option<u64> {
        let n = self.compile_delays_ms.len() as u64;
        (n > 0).then(|| self.total_compile_time_ms / n)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
