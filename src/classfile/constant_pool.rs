// Constant pool decoding

use super::reader::ByteReader;
use super::{ClassFileError, LoadableConstant, MemberRef, MethodHandle};

#[derive(Debug, Clone)]
pub(crate) enum Constant {
    /// Slot 0 and the upper half of long/double entries
    Unusable,
    Utf8(String),
    Integer,
    Float,
    Long,
    Double,
    Class(u16),
    String(u16),
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType(u16),
    Dynamic,
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module,
    Package,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.u16()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let index = entries.len();
            let tag = reader.u8()?;
            let constant = match tag {
                1 => {
                    let len = reader.u16()? as usize;
                    Constant::Utf8(decode_modified_utf8(reader.bytes(len)?))
                }
                3 => {
                    reader.skip(4)?;
                    Constant::Integer
                }
                4 => {
                    reader.skip(4)?;
                    Constant::Float
                }
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(if tag == 5 {
                        Constant::Long
                    } else {
                        Constant::Double
                    });
                    // Eight-byte constants occupy two slots
                    Constant::Unusable
                }
                7 => Constant::Class(reader.u16()?),
                8 => Constant::String(reader.u16()?),
                9 | 10 | 11 => {
                    let class = reader.u16()?;
                    let name_and_type = reader.u16()?;
                    match tag {
                        9 => Constant::FieldRef { class, name_and_type },
                        10 => Constant::MethodRef { class, name_and_type },
                        _ => Constant::InterfaceMethodRef { class, name_and_type },
                    }
                }
                12 => Constant::NameAndType {
                    name: reader.u16()?,
                    descriptor: reader.u16()?,
                },
                15 => Constant::MethodHandle {
                    kind: reader.u8()?,
                    reference: reader.u16()?,
                },
                16 => Constant::MethodType(reader.u16()?),
                17 => {
                    reader.skip(4)?;
                    Constant::Dynamic
                }
                18 => Constant::InvokeDynamic {
                    bootstrap: reader.u16()?,
                    name_and_type: reader.u16()?,
                },
                19 => {
                    reader.skip(2)?;
                    Constant::Module
                }
                20 => {
                    reader.skip(2)?;
                    Constant::Package
                }
                other => return Err(ClassFileError::InvalidConstantTag { tag: other, index }),
            };
            entries.push(constant);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&Constant, ClassFileError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFileError::BadConstantIndex { index }),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(self.mismatch(index, "Utf8")),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(self.mismatch(index, "Class")),
        }
    }

    /// Class reference where index 0 means "absent" (super_class of java/lang/Object, outer_class_info)
    pub fn optional_class_name(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    pub fn optional_utf8(&self, index: u16) -> Result<Option<&str>, ClassFileError> {
        if index == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(Some)
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFileError> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(self.mismatch(index, "NameAndType")),
        }
    }

    /// Decode a field/method/interface-method reference. The flag is true for interface methods.
    pub fn member_ref(&self, index: u16) -> Result<(MemberRef, bool), ClassFileError> {
        let (class, name_and_type, interface) = match self.get(index)? {
            Constant::FieldRef { class, name_and_type }
            | Constant::MethodRef { class, name_and_type } => (*class, *name_and_type, false),
            Constant::InterfaceMethodRef { class, name_and_type } => {
                (*class, *name_and_type, true)
            }
            _ => return Err(self.mismatch(index, "member reference")),
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        let member = MemberRef {
            owner: self.class_name(class)?.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        };
        Ok((member, interface))
    }

    pub fn method_handle(&self, index: u16) -> Result<MethodHandle, ClassFileError> {
        match self.get(index)? {
            Constant::MethodHandle { kind, reference } => {
                let (target, interface) = self.member_ref(*reference)?;
                Ok(MethodHandle {
                    kind: *kind,
                    target,
                    interface,
                })
            }
            _ => Err(self.mismatch(index, "MethodHandle")),
        }
    }

    /// Loadable constants that name program symbols. Numeric and string constants yield None.
    pub fn loadable(&self, index: u16) -> Result<Option<LoadableConstant>, ClassFileError> {
        Ok(match self.get(index)? {
            Constant::Class(name) => Some(LoadableConstant::Class(self.utf8(*name)?.to_string())),
            Constant::MethodHandle { .. } => {
                Some(LoadableConstant::MethodHandle(self.method_handle(index)?))
            }
            Constant::MethodType(descriptor) => Some(LoadableConstant::MethodType(
                self.utf8(*descriptor)?.to_string(),
            )),
            _ => None,
        })
    }

    pub fn invoke_dynamic(&self, index: u16) -> Result<(u16, &str, &str), ClassFileError> {
        match self.get(index)? {
            Constant::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok((*bootstrap, name, descriptor))
            }
            _ => Err(self.mismatch(index, "InvokeDynamic")),
        }
    }

    fn mismatch(&self, index: u16, expected: &'static str) -> ClassFileError {
        ClassFileError::ConstantMismatch { index, expected }
    }
}

/// Decode the JVM's modified UTF-8 (encoded NUL, CESU-8 surrogate pairs).
/// Invalid sequences decode to U+FFFD.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push((((b & 0x1F) as u16) << 6) | (bytes[i + 1] & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(
                (((b & 0x0F) as u16) << 12)
                    | (((bytes[i + 1] & 0x3F) as u16) << 6)
                    | (bytes[i + 2] & 0x3F) as u16,
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
