// Attribute decoding: signatures, annotations, inner classes, code, bootstrap methods

use super::constant_pool::ConstantPool;
use super::reader::ByteReader;
use super::{Annotation, ClassFileError, ElementValue, EnclosingMethod, InnerClass};

/// Undecoded method body plus its exception-table catch types
#[derive(Debug, Clone)]
pub(crate) struct RawCode {
    pub bytecode: Vec<u8>,
    pub catch_types: Vec<u16>,
}

#[derive(Debug, Clone)]
pub(crate) struct BootstrapMethod {
    pub method: u16,
    pub arguments: Vec<u16>,
}

/// Attributes of interest found on a class, field or method.
/// Unrecognized attributes are skipped.
#[derive(Debug, Default)]
pub(crate) struct AttributeSet {
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,
    pub annotation_default: Option<ElementValue>,
    pub exceptions: Vec<String>,
    pub code: Option<RawCode>,
    pub inner_classes: Vec<InnerClass>,
    pub enclosing_method: Option<EnclosingMethod>,
    pub bootstrap_methods: Vec<BootstrapMethod>,
}

impl AttributeSet {
    pub fn parse(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFileError> {
        let mut set = AttributeSet::default();
        let count = reader.u16()?;
        for _ in 0..count {
            let name = pool.utf8(reader.u16()?)?;
            let mut body = reader.length_prefixed()?;
            match name {
                "Signature" => {
                    set.signature = Some(pool.utf8(body.u16()?)?.to_string());
                }
                "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                    let count = body.u16()?;
                    for _ in 0..count {
                        set.annotations.push(parse_annotation(&mut body, pool)?);
                    }
                }
                "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                    let params = body.u8()?;
                    for _ in 0..params {
                        let count = body.u16()?;
                        for _ in 0..count {
                            set.annotations.push(parse_annotation(&mut body, pool)?);
                        }
                    }
                }
                "AnnotationDefault" => {
                    set.annotation_default = Some(parse_element_value(&mut body, pool)?);
                }
                "Exceptions" => {
                    let count = body.u16()?;
                    for _ in 0..count {
                        set.exceptions.push(pool.class_name(body.u16()?)?.to_string());
                    }
                }
                "Code" => {
                    set.code = Some(parse_code(&mut body)?);
                }
                "InnerClasses" => {
                    let count = body.u16()?;
                    for _ in 0..count {
                        let inner = pool.class_name(body.u16()?)?.to_string();
                        let outer = pool.optional_class_name(body.u16()?)?.map(str::to_string);
                        let simple_name = pool.optional_utf8(body.u16()?)?.map(str::to_string);
                        let access = body.u16()?;
                        set.inner_classes.push(InnerClass {
                            inner,
                            outer,
                            simple_name,
                            access,
                        });
                    }
                }
                "EnclosingMethod" => {
                    let class = pool.class_name(body.u16()?)?.to_string();
                    let method_index = body.u16()?;
                    let method = if method_index == 0 {
                        None
                    } else {
                        let (name, descriptor) = pool.name_and_type(method_index)?;
                        Some((name.to_string(), descriptor.to_string()))
                    };
                    set.enclosing_method = Some(EnclosingMethod { class, method });
                }
                "BootstrapMethods" => {
                    let count = body.u16()?;
                    for _ in 0..count {
                        let method = body.u16()?;
                        let argc = body.u16()?;
                        let mut arguments = Vec::with_capacity(argc as usize);
                        for _ in 0..argc {
                            arguments.push(body.u16()?);
                        }
                        set.bootstrap_methods.push(BootstrapMethod { method, arguments });
                    }
                }
                _ => {}
            }
        }
        Ok(set)
    }
}

fn parse_code(body: &mut ByteReader<'_>) -> Result<RawCode, ClassFileError> {
    body.u16()?; // max_stack
    body.u16()?; // max_locals
    let length = body.u32()? as usize;
    let bytecode = body.bytes(length)?.to_vec();

    let handlers = body.u16()?;
    let mut catch_types = Vec::with_capacity(handlers as usize);
    for _ in 0..handlers {
        body.skip(6)?; // start_pc, end_pc, handler_pc
        let catch_type = body.u16()?;
        if catch_type != 0 {
            catch_types.push(catch_type);
        }
    }
    // Nested attributes (LineNumberTable, StackMapTable, ...) carry no references we need

    Ok(RawCode {
        bytecode,
        catch_types,
    })
}

pub(crate) fn parse_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Annotation, ClassFileError> {
    let type_descriptor = pool.utf8(reader.u16()?)?.to_string();
    let pairs = reader.u16()?;
    let mut elements = Vec::with_capacity(pairs as usize);
    for _ in 0..pairs {
        let name = pool.utf8(reader.u16()?)?.to_string();
        let value = parse_element_value(reader, pool)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

fn parse_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<ElementValue, ClassFileError> {
    let tag = reader.u8()? as char;
    Ok(match tag {
        'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' => {
            reader.u16()?;
            ElementValue::Const(tag)
        }
        'e' => ElementValue::Enum {
            type_descriptor: pool.utf8(reader.u16()?)?.to_string(),
            const_name: pool.utf8(reader.u16()?)?.to_string(),
        },
        'c' => ElementValue::Class(pool.utf8(reader.u16()?)?.to_string()),
        '@' => ElementValue::Annotation(parse_annotation(reader, pool)?),
        '[' => {
            let count = reader.u16()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(parse_element_value(reader, pool)?);
            }
            ElementValue::Array(values)
        }
        other => return Err(ClassFileError::BadElementTag { tag: other }),
    })
}
