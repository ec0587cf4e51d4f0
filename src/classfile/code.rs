// Bytecode walker
//
// Visits every instruction of a method body and records the symbolic
// references it makes. Operand values other than constant-pool indices are
// skipped using the instruction length table.

use super::attributes::{BootstrapMethod, RawCode};
use super::constant_pool::ConstantPool;
use super::reader::ByteReader;
use super::{
    BootstrapCall, ClassFileError, Code, CodeReference, FieldOp, InvokeKind, TypeCheckOp,
};

const LDC: u8 = 0x12;
const LDC_W: u8 = 0x13;
const LDC2_W: u8 = 0x14;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const GETSTATIC: u8 = 0xb2;
const PUTSTATIC: u8 = 0xb3;
const GETFIELD: u8 = 0xb4;
const PUTFIELD: u8 = 0xb5;
const INVOKEVIRTUAL: u8 = 0xb6;
const INVOKESPECIAL: u8 = 0xb7;
const INVOKESTATIC: u8 = 0xb8;
const INVOKEINTERFACE: u8 = 0xb9;
const INVOKEDYNAMIC: u8 = 0xba;
const NEW: u8 = 0xbb;
const ANEWARRAY: u8 = 0xbd;
const CHECKCAST: u8 = 0xc0;
const INSTANCEOF: u8 = 0xc1;
const WIDE: u8 = 0xc4;
const MULTIANEWARRAY: u8 = 0xc5;
const IINC: u8 = 0x84;

pub(crate) fn walk(
    raw: &RawCode,
    pool: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<Code, ClassFileError> {
    let mut references = Vec::new();
    let code = raw.bytecode.as_slice();
    let mut pc = 0usize;

    while pc < code.len() {
        let opcode = code[pc];
        let length = instruction_length(code, pc)?;
        if pc + length > code.len() {
            return Err(ClassFileError::UnexpectedEof { offset: pc });
        }
        let operands = &code[pc + 1..pc + length];
        let index = || u16::from_be_bytes([operands[0], operands[1]]);

        match opcode {
            LDC => {
                if let Some(constant) = pool.loadable(operands[0] as u16)? {
                    references.push(CodeReference::Constant(constant));
                }
            }
            LDC_W | LDC2_W => {
                if let Some(constant) = pool.loadable(index())? {
                    references.push(CodeReference::Constant(constant));
                }
            }
            GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD => {
                let op = match opcode {
                    GETSTATIC => FieldOp::GetStatic,
                    PUTSTATIC => FieldOp::PutStatic,
                    GETFIELD => FieldOp::GetField,
                    _ => FieldOp::PutField,
                };
                let (target, _) = pool.member_ref(index())?;
                references.push(CodeReference::Field { op, target });
            }
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
                let kind = match opcode {
                    INVOKEVIRTUAL => InvokeKind::Virtual,
                    INVOKESPECIAL => InvokeKind::Special,
                    INVOKESTATIC => InvokeKind::Static,
                    _ => InvokeKind::Interface,
                };
                let (target, _) = pool.member_ref(index())?;
                references.push(CodeReference::Invoke { kind, target });
            }
            INVOKEDYNAMIC => {
                let (bootstrap_index, name, descriptor) = pool.invoke_dynamic(index())?;
                let bootstrap = resolve_bootstrap(pool, bootstrap_methods, bootstrap_index)?;
                references.push(CodeReference::InvokeDynamic {
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                    bootstrap,
                });
            }
            NEW => {
                references.push(CodeReference::New(pool.class_name(index())?.to_string()));
            }
            ANEWARRAY | MULTIANEWARRAY => {
                references.push(CodeReference::NewArray(
                    pool.class_name(index())?.to_string(),
                ));
            }
            CHECKCAST | INSTANCEOF => {
                let op = if opcode == CHECKCAST {
                    TypeCheckOp::CheckCast
                } else {
                    TypeCheckOp::InstanceOf
                };
                references.push(CodeReference::TypeCheck {
                    op,
                    class: pool.class_name(index())?.to_string(),
                });
            }
            _ => {}
        }

        pc += length;
    }

    for catch_type in &raw.catch_types {
        references.push(CodeReference::CatchType(
            pool.class_name(*catch_type)?.to_string(),
        ));
    }

    Ok(Code { references })
}

fn resolve_bootstrap(
    pool: &ConstantPool,
    bootstrap_methods: &[BootstrapMethod],
    index: u16,
) -> Result<BootstrapCall, ClassFileError> {
    let entry = bootstrap_methods
        .get(index as usize)
        .ok_or(ClassFileError::MissingBootstrap { index })?;
    let method = pool.method_handle(entry.method)?;
    let mut arguments = Vec::new();
    for arg in &entry.arguments {
        if let Some(constant) = pool.loadable(*arg)? {
            arguments.push(constant);
        }
    }
    Ok(BootstrapCall { method, arguments })
}

/// Total length in bytes of the instruction at `pc`, opcode included
fn instruction_length(code: &[u8], pc: usize) -> Result<usize, ClassFileError> {
    let opcode = code[pc];
    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2, // bipush
        0x11 => 3, // sipush
        LDC => 2,
        LDC_W | LDC2_W => 3,
        0x15..=0x19 => 2, // xload index
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2, // xstore index
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3, // branches, goto, jsr
        0xa9 => 2,        // ret
        TABLESWITCH => {
            let pad = switch_padding(pc);
            let mut reader = operand_reader(code, pc + 1 + pad)?;
            reader.skip(4)?; // default
            let low = reader.i32()?;
            let high = reader.i32()?;
            let entries = (high as i64 - low as i64 + 1).max(0) as usize;
            1 + pad + 12 + 4 * entries
        }
        LOOKUPSWITCH => {
            let pad = switch_padding(pc);
            let mut reader = operand_reader(code, pc + 1 + pad)?;
            reader.skip(4)?; // default
            let pairs = reader.i32()?.max(0) as usize;
            1 + pad + 8 + 8 * pairs
        }
        0xac..=0xb1 => 1, // returns
        GETSTATIC..=INVOKESPECIAL | INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        NEW => 3,
        0xbc => 2, // newarray
        ANEWARRAY => 3,
        0xbe | 0xbf => 1, // arraylength, athrow
        CHECKCAST | INSTANCEOF => 3,
        0xc2 | 0xc3 => 1, // monitorenter, monitorexit
        WIDE => {
            let next = *code
                .get(pc + 1)
                .ok_or(ClassFileError::UnexpectedEof { offset: pc + 1 })?;
            if next == IINC {
                6
            } else {
                4
            }
        }
        MULTIANEWARRAY => 4,
        0xc6 | 0xc7 => 3, // ifnull, ifnonnull
        0xc8 | 0xc9 => 5, // goto_w, jsr_w
        other => return Err(ClassFileError::UnknownOpcode { opcode: other, pc }),
    };
    Ok(length)
}

/// Switch operands start at the next multiple of four after the opcode
fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}

fn operand_reader(code: &[u8], start: usize) -> Result<ByteReader<'_>, ClassFileError> {
    code.get(start..)
        .map(ByteReader::new)
        .ok_or(ClassFileError::UnexpectedEof { offset: start })
}
