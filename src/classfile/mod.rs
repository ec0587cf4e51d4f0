//! Binary class-file decoding
//!
//! Only the parts of the format the shrinker needs are decoded: the class
//! header, member tables, the attributes that carry type references
//! (signatures, annotations, inner classes, exceptions) and the bytecode of
//! method bodies, which is walked into a list of [`CodeReference`]s.

mod attributes;
mod code;
mod constant_pool;
pub mod descriptor;
mod reader;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use attributes::{AttributeSet, RawCode};
use constant_pool::ConstantPool;
use reader::ByteReader;

pub const MAGIC: u32 = 0xCAFE_BABE;

/// Access flags the shrinker inspects
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error("bad magic number 0x{found:08x}")]
    BadMagic { found: u32 },

    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag { tag: u8, index: usize },

    #[error("constant pool index {index} is out of range or unusable")]
    BadConstantIndex { index: u16 },

    #[error("constant pool index {index} is not a {expected}")]
    ConstantMismatch { index: u16, expected: &'static str },

    #[error("unknown opcode 0x{opcode:02x} at pc {pc}")]
    UnknownOpcode { opcode: u8, pc: usize },

    #[error("malformed descriptor or signature '{value}'")]
    BadDescriptor { value: String },

    #[error("invalid annotation element tag '{tag}'")]
    BadElementTag { tag: char },

    #[error("bootstrap method {index} is not defined")]
    MissingBootstrap { index: u16 },

    #[error("class declares name '{declared}' but was supplied as '{expected}'")]
    NameMismatch { declared: String, expected: String },
}

/// Symbolic reference to a field or method as it appears in the constant pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn is_method(&self) -> bool {
        self.descriptor.starts_with('(')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldOp {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldOp {
    pub fn is_static(&self) -> bool {
        matches!(self, FieldOp::GetStatic | FieldOp::PutStatic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeKind {
    /// Calls whose target is chosen at runtime from the receiver type
    pub fn is_dispatched(&self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHandle {
    /// JVMS reference_kind (1..=9)
    pub kind: u8,
    pub target: MemberRef,
    pub interface: bool,
}

impl MethodHandle {
    pub fn is_field(&self) -> bool {
        (1..=4).contains(&self.kind)
    }

    /// REF_getStatic, REF_putStatic and REF_invokeStatic touch class initialization
    pub fn is_static(&self) -> bool {
        matches!(self.kind, 2 | 4 | 6)
    }
}

/// Constant-pool values that name classes or members
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadableConstant {
    Class(String),
    MethodHandle(MethodHandle),
    MethodType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BootstrapCall {
    pub method: MethodHandle,
    pub arguments: Vec<LoadableConstant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCheckOp {
    CheckCast,
    InstanceOf,
}

/// A symbolic reference found while walking a method body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeReference {
    Field {
        op: FieldOp,
        target: MemberRef,
    },
    Invoke {
        kind: InvokeKind,
        target: MemberRef,
    },
    InvokeDynamic {
        name: String,
        descriptor: String,
        bootstrap: BootstrapCall,
    },
    New(String),
    /// anewarray / multianewarray; the name may be an array descriptor
    NewArray(String),
    TypeCheck {
        op: TypeCheckOp,
        class: String,
    },
    Constant(LoadableConstant),
    /// Catch type of an exception-table entry
    CatchType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Ltest/MyAnnotation;`
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementValue {
    /// Primitive or string constant; only the tag is kept
    Const(char),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Return descriptor of a class literal, e.g. `Ltest/Foo;` or `V`
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner: String,
    pub outer: Option<String>,
    pub simple_name: Option<String>,
    pub access: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: String,
    pub method: Option<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Code {
    pub references: Vec<CodeReference>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    /// Method and parameter annotations, flattened
    pub annotations: Vec<Annotation>,
    pub annotation_default: Option<ElementValue>,
    pub exceptions: Vec<String>,
    pub code: Option<Code>,
}

impl MethodInfo {
    pub fn is_abstract(&self) -> bool {
        self.access & access::ABSTRACT != 0
    }
}

/// A decoded class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub major_version: u16,
    pub minor_version: u16,
    pub access: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub signature: Option<String>,
    pub annotations: Vec<Annotation>,
    pub inner_classes: Vec<InnerClass>,
    pub enclosing_method: Option<EnclosingMethod>,
}

struct PendingMethod {
    info: MethodInfo,
    code: Option<RawCode>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ByteReader::new(bytes);
        let (minor_version, major_version) = read_header(&mut reader)?;
        let pool = ConstantPool::parse(&mut reader)?;

        let access = reader.u16()?;
        let name = pool.class_name(reader.u16()?)?.to_string();
        let super_name = pool.optional_class_name(reader.u16()?)?.map(str::to_string);

        let interface_count = reader.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(reader.u16()?)?.to_string());
        }

        let field_count = reader.u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let access = reader.u16()?;
            let name = pool.utf8(reader.u16()?)?.to_string();
            let descriptor = pool.utf8(reader.u16()?)?.to_string();
            let attrs = AttributeSet::parse(&mut reader, &pool)?;
            fields.push(FieldInfo {
                access,
                name,
                descriptor,
                signature: attrs.signature,
                annotations: attrs.annotations,
            });
        }

        // Method bodies are walked after the class attributes, since
        // invokedynamic needs the BootstrapMethods table at the end of the file.
        let method_count = reader.u16()?;
        let mut pending = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let access = reader.u16()?;
            let name = pool.utf8(reader.u16()?)?.to_string();
            let descriptor = pool.utf8(reader.u16()?)?.to_string();
            let attrs = AttributeSet::parse(&mut reader, &pool)?;
            pending.push(PendingMethod {
                info: MethodInfo {
                    access,
                    name,
                    descriptor,
                    signature: attrs.signature,
                    annotations: attrs.annotations,
                    annotation_default: attrs.annotation_default,
                    exceptions: attrs.exceptions,
                    code: None,
                },
                code: attrs.code,
            });
        }

        let class_attrs = AttributeSet::parse(&mut reader, &pool)?;

        let mut methods = Vec::with_capacity(pending.len());
        for PendingMethod { mut info, code } in pending {
            if let Some(raw) = code {
                info.code = Some(code::walk(&raw, &pool, &class_attrs.bootstrap_methods)?);
            }
            methods.push(info);
        }

        Ok(Self {
            major_version,
            minor_version,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            signature: class_attrs.signature,
            annotations: class_attrs.annotations,
            inner_classes: class_attrs.inner_classes,
            enclosing_method: class_attrs.enclosing_method,
        })
    }

    /// Read only as far as `this_class`, for inputs whose name is not known up front
    pub fn peek_name(bytes: &[u8]) -> Result<String, ClassFileError> {
        let mut reader = ByteReader::new(bytes);
        read_header(&mut reader)?;
        let pool = ConstantPool::parse(&mut reader)?;
        reader.u16()?;
        Ok(pool.class_name(reader.u16()?)?.to_string())
    }

    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<(u16, u16), ClassFileError> {
    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic { found: magic });
    }
    let minor = reader.u16()?;
    let major = reader.u16()?;
    Ok((minor, major))
}
