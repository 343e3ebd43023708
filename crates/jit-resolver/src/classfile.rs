//! Minimal `.class` reader: enough to enumerate methods and constructors with
//! their access flags and descriptors.

use jit_types::modifiers::{ACC_INTERFACE, ACC_VARARGS, METHOD_MODIFIER_MASK};
use jit_types::{MethodDescriptor, Modifier};

use crate::errors::ClassParseError;
use crate::runtime::{ResolvedClass, RuntimeMember};

const INIT: &str = "<init>";

/// Classes whose native varargs methods are signature-polymorphic.
const POLYMORPHIC_HOLDERS: &[&str] = &["java.lang.invoke.MethodHandle", "java.lang.invoke.VarHandle"];

/// Decode a class file into a [`ResolvedClass`].
pub fn parse_class(bytes: &[u8]) -> Result<ResolvedClass, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let _super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    reader.skip(interfaces_count as usize * 2)?;

    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        skip_member(&mut reader)?;
    }

    let fqcn = constant_pool.class_name(this_class)?.replace('/', ".");
    let polymorphic_holder = POLYMORPHIC_HOLDERS.contains(&fqcn.as_str());

    let mut members = Vec::new();
    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        let access = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;
        skip_attributes(&mut reader, attributes_count)?;

        let name = constant_pool.utf8(name_index)?;
        let descriptor = constant_pool.utf8(descriptor_index)?;
        let parsed = MethodDescriptor::parse(descriptor)
            .map_err(|_| ClassParseError::InvalidDescriptor(descriptor.to_string()))?;

        let modifiers = u32::from(access) & METHOD_MODIFIER_MASK;
        let mut member = if name == INIT {
            RuntimeMember::constructor(fqcn.clone(), modifiers, parsed.params)
        } else {
            RuntimeMember::method(name, modifiers, parsed.params, parsed.return_type)
        };
        if access & ACC_VARARGS != 0 {
            member = member.with_varargs();
            if polymorphic_holder && Modifier::Native.is_set(modifiers) {
                member = member.with_polymorphic_signature();
            }
        }
        members.push(member);
    }

    let mut source_file = None;
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        if constant_pool.utf8(name_index)? == "SourceFile" && length == 2 {
            let file_index = reader.read_u2()?;
            source_file = Some(constant_pool.utf8(file_index)?.to_string());
        } else {
            reader.skip(length)?;
        }
    }

    Ok(ResolvedClass {
        name: fqcn,
        is_interface: access_flags & ACC_INTERFACE != 0,
        members,
        source_file,
    })
}

fn skip_member(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    reader.skip(6)?;
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    // Modified UTF-8 only differs for NUL and supplementary chars.
                    Constant::Utf8(String::from_utf8_lossy(bytes).into_owned())
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };
            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFE_BABE;
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ClassFileBuilder;
    use super::*;
    use jit_types::{Primitive, TypeDesc};

    #[test]
    fn test_parse_methods_and_constructors() {
        let bytes = ClassFileBuilder::new("com/example/Widget", 0x0021)
            .method(0x0001, "<init>", "(I)V")
            .method(0x0009, "size", "()I")
            .method(0x0081, "format", "(Ljava/lang/String;[Ljava/lang/Object;)Ljava/lang/String;")
            .build();
        let class = parse_class(&bytes).unwrap();

        assert_eq!(class.name, "com.example.Widget");
        assert!(!class.is_interface);
        assert_eq!(class.members.len(), 3);

        let ctor = &class.members[0];
        assert!(ctor.is_constructor());
        assert_eq!(ctor.name, "com.example.Widget");
        assert_eq!(ctor.params, vec![TypeDesc::Primitive(Primitive::Int)]);

        let size = &class.members[1];
        assert!(size.has_modifier(Modifier::Static));
        assert_eq!(size.return_type, TypeDesc::Primitive(Primitive::Int));

        let format = &class.members[2];
        assert!(format.varargs);
        assert!(!format.polymorphic_signature);
        // ACC_VARARGS shares the transient bit and must not leak into modifiers.
        assert!(!format.has_modifier(Modifier::Transient));
    }

    #[test]
    fn test_polymorphic_signature() {
        let bytes = ClassFileBuilder::new("java/lang/invoke/MethodHandle", 0x0421)
            .method(0x0191, "invokeExact", "([Ljava/lang/Object;)Ljava/lang/Object;")
            .build();
        let class = parse_class(&bytes).unwrap();
        assert!(class.members[0].polymorphic_signature);
    }

    #[test]
    fn test_interface_flag() {
        let bytes = ClassFileBuilder::new("java/lang/Runnable", 0x0601)
            .method(0x0401, "run", "()V")
            .build();
        assert!(parse_class(&bytes).unwrap().is_interface);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(parse_class(&[0, 1, 2, 3]), Err(ClassParseError::InvalidMagic));
        assert_eq!(parse_class(&[0xCA, 0xFE]), Err(ClassParseError::UnexpectedEof));
    }
}
