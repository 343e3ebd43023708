//! Java member modifiers.
//!
//! Bit values follow `java.lang.reflect.Modifier`, which for methods coincide
//! with the class-file `ACC_*` flags (except `ACC_BRIDGE`/`ACC_VARARGS`, which
//! reuse the volatile/transient bits and are masked off by [`METHOD_MODIFIER_MASK`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flags that carry modifier meaning on methods and constructors.
pub const METHOD_MODIFIER_MASK: u32 = 0x0D3F;

/// Class-file `ACC_VARARGS` flag on methods.
pub const ACC_VARARGS: u16 = 0x0080;
/// Class-file `ACC_INTERFACE` flag on classes.
pub const ACC_INTERFACE: u16 = 0x0200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
    Synchronized,
    Volatile,
    Transient,
    Native,
    Interface,
    Abstract,
    Strictfp,
}

impl Modifier {
    /// Canonical source order, as printed by `Modifier.toString`.
    pub const ALL: [Modifier; 12] = [
        Modifier::Public,
        Modifier::Protected,
        Modifier::Private,
        Modifier::Abstract,
        Modifier::Static,
        Modifier::Final,
        Modifier::Transient,
        Modifier::Volatile,
        Modifier::Synchronized,
        Modifier::Native,
        Modifier::Strictfp,
        Modifier::Interface,
    ];

    pub fn bit(self) -> u32 {
        match self {
            Modifier::Public => 0x0001,
            Modifier::Private => 0x0002,
            Modifier::Protected => 0x0004,
            Modifier::Static => 0x0008,
            Modifier::Final => 0x0010,
            Modifier::Synchronized => 0x0020,
            Modifier::Volatile => 0x0040,
            Modifier::Transient => 0x0080,
            Modifier::Native => 0x0100,
            Modifier::Interface => 0x0200,
            Modifier::Abstract => 0x0400,
            Modifier::Strictfp => 0x0800,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Synchronized => "synchronized",
            Modifier::Volatile => "volatile",
            Modifier::Transient => "transient",
            Modifier::Native => "native",
            Modifier::Interface => "interface",
            Modifier::Abstract => "abstract",
            Modifier::Strictfp => "strictfp",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.keyword() == keyword)
    }

    /// Modifiers present in `bits`, in canonical order.
    pub fn from_bits(bits: u32) -> Vec<Modifier> {
        Self::ALL
            .iter()
            .copied()
            .filter(|m| bits & m.bit() != 0)
            .collect()
    }

    pub fn is_set(self, bits: u32) -> bool {
        bits & self.bit() != 0
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_round_trip() {
        for m in Modifier::ALL {
            assert_eq!(Modifier::from_keyword(m.keyword()), Some(m));
        }
        assert_eq!(Modifier::from_keyword("default"), None);
    }

    #[test]
    fn test_from_bits_canonical_order() {
        let bits = Modifier::Final.bit() | Modifier::Public.bit() | Modifier::Static.bit();
        assert_eq!(
            Modifier::from_bits(bits),
            vec![Modifier::Public, Modifier::Static, Modifier::Final]
        );
    }

    #[test]
    fn test_method_mask_drops_varargs_bit() {
        let access = (ACC_VARARGS as u32) | Modifier::Public.bit();
        assert_eq!(Modifier::from_bits(access & METHOD_MODIFIER_MASK), vec![Modifier::Public]);
    }
}
