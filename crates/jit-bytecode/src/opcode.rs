//! The JVM instruction set.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opcodes {
    ($($variant:ident = $value:literal => $mnemonic:literal,)*) => {
        /// One JVM opcode; the discriminant is the class-file byte value.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $value,)*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub fn from_value(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Nop = 0 => "nop",
    AconstNull = 1 => "aconst_null",
    IconstM1 = 2 => "iconst_m1",
    Iconst0 = 3 => "iconst_0",
    Iconst1 = 4 => "iconst_1",
    Iconst2 = 5 => "iconst_2",
    Iconst3 = 6 => "iconst_3",
    Iconst4 = 7 => "iconst_4",
    Iconst5 = 8 => "iconst_5",
    Lconst0 = 9 => "lconst_0",
    Lconst1 = 10 => "lconst_1",
    Fconst0 = 11 => "fconst_0",
    Fconst1 = 12 => "fconst_1",
    Fconst2 = 13 => "fconst_2",
    Dconst0 = 14 => "dconst_0",
    Dconst1 = 15 => "dconst_1",
    Bipush = 16 => "bipush",
    Sipush = 17 => "sipush",
    Ldc = 18 => "ldc",
    LdcW = 19 => "ldc_w",
    Ldc2W = 20 => "ldc2_w",
    Iload = 21 => "iload",
    Lload = 22 => "lload",
    Fload = 23 => "fload",
    Dload = 24 => "dload",
    Aload = 25 => "aload",
    Iload0 = 26 => "iload_0",
    Iload1 = 27 => "iload_1",
    Iload2 = 28 => "iload_2",
    Iload3 = 29 => "iload_3",
    Lload0 = 30 => "lload_0",
    Lload1 = 31 => "lload_1",
    Lload2 = 32 => "lload_2",
    Lload3 = 33 => "lload_3",
    Fload0 = 34 => "fload_0",
    Fload1 = 35 => "fload_1",
    Fload2 = 36 => "fload_2",
    Fload3 = 37 => "fload_3",
    Dload0 = 38 => "dload_0",
    Dload1 = 39 => "dload_1",
    Dload2 = 40 => "dload_2",
    Dload3 = 41 => "dload_3",
    Aload0 = 42 => "aload_0",
    Aload1 = 43 => "aload_1",
    Aload2 = 44 => "aload_2",
    Aload3 = 45 => "aload_3",
    Iaload = 46 => "iaload",
    Laload = 47 => "laload",
    Faload = 48 => "faload",
    Daload = 49 => "daload",
    Aaload = 50 => "aaload",
    Baload = 51 => "baload",
    Caload = 52 => "caload",
    Saload = 53 => "saload",
    Istore = 54 => "istore",
    Lstore = 55 => "lstore",
    Fstore = 56 => "fstore",
    Dstore = 57 => "dstore",
    Astore = 58 => "astore",
    Istore0 = 59 => "istore_0",
    Istore1 = 60 => "istore_1",
    Istore2 = 61 => "istore_2",
    Istore3 = 62 => "istore_3",
    Lstore0 = 63 => "lstore_0",
    Lstore1 = 64 => "lstore_1",
    Lstore2 = 65 => "lstore_2",
    Lstore3 = 66 => "lstore_3",
    Fstore0 = 67 => "fstore_0",
    Fstore1 = 68 => "fstore_1",
    Fstore2 = 69 => "fstore_2",
    Fstore3 = 70 => "fstore_3",
    Dstore0 = 71 => "dstore_0",
    Dstore1 = 72 => "dstore_1",
    Dstore2 = 73 => "dstore_2",
    Dstore3 = 74 => "dstore_3",
    Astore0 = 75 => "astore_0",
    Astore1 = 76 => "astore_1",
    Astore2 = 77 => "astore_2",
    Astore3 = 78 => "astore_3",
    Iastore = 79 => "iastore",
    Lastore = 80 => "lastore",
    Fastore = 81 => "fastore",
    Dastore = 82 => "dastore",
    Aastore = 83 => "aastore",
    Bastore = 84 => "bastore",
    Castore = 85 => "castore",
    Sastore = 86 => "sastore",
    Pop = 87 => "pop",
    Pop2 = 88 => "pop2",
    Dup = 89 => "dup",
    DupX1 = 90 => "dup_x1",
    DupX2 = 91 => "dup_x2",
    Dup2 = 92 => "dup2",
    Dup2X1 = 93 => "dup2_x1",
    Dup2X2 = 94 => "dup2_x2",
    Swap = 95 => "swap",
    Iadd = 96 => "iadd",
    Ladd = 97 => "ladd",
    Fadd = 98 => "fadd",
    Dadd = 99 => "dadd",
    Isub = 100 => "isub",
    Lsub = 101 => "lsub",
    Fsub = 102 => "fsub",
    Dsub = 103 => "dsub",
    Imul = 104 => "imul",
    Lmul = 105 => "lmul",
    Fmul = 106 => "fmul",
    Dmul = 107 => "dmul",
    Idiv = 108 => "idiv",
    Ldiv = 109 => "ldiv",
    Fdiv = 110 => "fdiv",
    Ddiv = 111 => "ddiv",
    Irem = 112 => "irem",
    Lrem = 113 => "lrem",
    Frem = 114 => "frem",
    Drem = 115 => "drem",
    Ineg = 116 => "ineg",
    Lneg = 117 => "lneg",
    Fneg = 118 => "fneg",
    Dneg = 119 => "dneg",
    Ishl = 120 => "ishl",
    Lshl = 121 => "lshl",
    Ishr = 122 => "ishr",
    Lshr = 123 => "lshr",
    Iushr = 124 => "iushr",
    Lushr = 125 => "lushr",
    Iand = 126 => "iand",
    Land = 127 => "land",
    Ior = 128 => "ior",
    Lor = 129 => "lor",
    Ixor = 130 => "ixor",
    Lxor = 131 => "lxor",
    Iinc = 132 => "iinc",
    I2l = 133 => "i2l",
    I2f = 134 => "i2f",
    I2d = 135 => "i2d",
    L2i = 136 => "l2i",
    L2f = 137 => "l2f",
    L2d = 138 => "l2d",
    F2i = 139 => "f2i",
    F2l = 140 => "f2l",
    F2d = 141 => "f2d",
    D2i = 142 => "d2i",
    D2l = 143 => "d2l",
    D2f = 144 => "d2f",
    I2b = 145 => "i2b",
    I2c = 146 => "i2c",
    I2s = 147 => "i2s",
    Lcmp = 148 => "lcmp",
    Fcmpl = 149 => "fcmpl",
    Fcmpg = 150 => "fcmpg",
    Dcmpl = 151 => "dcmpl",
    Dcmpg = 152 => "dcmpg",
    Ifeq = 153 => "ifeq",
    Ifne = 154 => "ifne",
    Iflt = 155 => "iflt",
    Ifge = 156 => "ifge",
    Ifgt = 157 => "ifgt",
    Ifle = 158 => "ifle",
    IfIcmpeq = 159 => "if_icmpeq",
    IfIcmpne = 160 => "if_icmpne",
    IfIcmplt = 161 => "if_icmplt",
    IfIcmpge = 162 => "if_icmpge",
    IfIcmpgt = 163 => "if_icmpgt",
    IfIcmple = 164 => "if_icmple",
    IfAcmpeq = 165 => "if_acmpeq",
    IfAcmpne = 166 => "if_acmpne",
    Goto = 167 => "goto",
    Jsr = 168 => "jsr",
    Ret = 169 => "ret",
    Tableswitch = 170 => "tableswitch",
    Lookupswitch = 171 => "lookupswitch",
    Ireturn = 172 => "ireturn",
    Lreturn = 173 => "lreturn",
    Freturn = 174 => "freturn",
    Dreturn = 175 => "dreturn",
    Areturn = 176 => "areturn",
    Return = 177 => "return",
    Getstatic = 178 => "getstatic",
    Putstatic = 179 => "putstatic",
    Getfield = 180 => "getfield",
    Putfield = 181 => "putfield",
    Invokevirtual = 182 => "invokevirtual",
    Invokespecial = 183 => "invokespecial",
    Invokestatic = 184 => "invokestatic",
    Invokeinterface = 185 => "invokeinterface",
    Invokedynamic = 186 => "invokedynamic",
    New = 187 => "new",
    Newarray = 188 => "newarray",
    Anewarray = 189 => "anewarray",
    Arraylength = 190 => "arraylength",
    Athrow = 191 => "athrow",
    Checkcast = 192 => "checkcast",
    Instanceof = 193 => "instanceof",
    Monitorenter = 194 => "monitorenter",
    Monitorexit = 195 => "monitorexit",
    Wide = 196 => "wide",
    Multianewarray = 197 => "multianewarray",
    Ifnull = 198 => "ifnull",
    Ifnonnull = 199 => "ifnonnull",
    GotoW = 200 => "goto_w",
    JsrW = 201 => "jsr_w",
}

impl Opcode {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Look up a javap mnemonic. javap spells `wide`-prefixed forms with a
    /// `_w` suffix (`iinc_w`); those map to the base instruction.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let find = |m: &str| Self::ALL.iter().copied().find(|op| op.mnemonic() == m);
        find(mnemonic).or_else(|| mnemonic.strip_suffix("_w").and_then(find))
    }

    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            Opcode::Invokevirtual
                | Opcode::Invokespecial
                | Opcode::Invokestatic
                | Opcode::Invokeinterface
                | Opcode::Invokedynamic
        )
    }

    pub fn is_conditional_branch(self) -> bool {
        matches!(self as u8, 153..=166 | 198 | 199)
    }

    pub fn is_allocation(self) -> bool {
        matches!(
            self,
            Opcode::New | Opcode::Newarray | Opcode::Anewarray | Opcode::Multianewarray
        )
    }

    /// Instructions a lock elision can apply to; invokes cover synchronized callees.
    pub fn is_lock_bearing(self) -> bool {
        matches!(self, Opcode::Monitorenter | Opcode::Monitorexit) || self.is_invoke()
    }

    pub fn is_switch(self) -> bool {
        matches!(self, Opcode::Tableswitch | Opcode::Lookupswitch)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_dense() {
        assert_eq!(Opcode::ALL.len(), 202);
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.value() as usize, i);
            assert_eq!(Opcode::from_value(i as u8), Some(*op));
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(*op));
        }
        assert_eq!(Opcode::from_value(202), None);
    }

    #[test]
    fn test_wide_mnemonics() {
        assert_eq!(Opcode::from_mnemonic("iinc_w"), Some(Opcode::Iinc));
        assert_eq!(Opcode::from_mnemonic("ldc_w"), Some(Opcode::LdcW));
        assert_eq!(Opcode::from_mnemonic("bogus"), None);
    }

    #[test]
    fn test_predicates() {
        assert!(Opcode::Invokeinterface.is_invoke());
        assert!(!Opcode::Getfield.is_invoke());
        assert!(Opcode::IfIcmplt.is_conditional_branch());
        assert!(Opcode::Ifnonnull.is_conditional_branch());
        assert!(!Opcode::Goto.is_conditional_branch());
        assert!(Opcode::Multianewarray.is_allocation());
        assert!(!Opcode::Arraylength.is_allocation());
        assert!(Opcode::Monitorexit.is_lock_bearing());
        assert!(Opcode::Invokestatic.is_lock_bearing());
        assert!(!Opcode::New.is_lock_bearing());
    }
}
