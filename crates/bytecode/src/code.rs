//! On-demand decoding of `Code` attributes into typed instructions.

use crate::classfile::RawAttribute;
use crate::constant_pool::{ConstantPool, LoadableConstant, MemberRef};
use crate::error::{DecodeError, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionHandler>,
    /// LineNumberTable, LocalVariableTable, StackMapTable and friends, kept verbatim.
    pub attributes: Vec<RawAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` catches everything (`finally`).
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub operand: Operand,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        opcode_name(self.opcode)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    /// Local variable slot (loads, stores, `ret`).
    Local(u16),
    /// `bipush`/`sipush` immediate.
    Int(i32),
    Constant(LoadableConstant),
    /// Absolute branch target.
    Branch(u32),
    Field(MemberRef),
    Method(MemberRef),
    InvokeDynamic { name: String, descriptor: String },
    /// Internal class name or array descriptor (`new`, `checkcast`, `instanceof`, `anewarray`).
    Type(String),
    /// `newarray` element type code.
    PrimitiveArray(u8),
    Iinc { index: u16, delta: i16 },
    MultiANewArray { class: String, dimensions: u8 },
    /// `tableswitch`/`lookupswitch` as absolute targets.
    Switch { default: u32, targets: Vec<(i32, u32)> },
}

pub mod opcodes {
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const IINC: u8 = 0x84;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const NEWARRAY: u8 = 0xbc;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;
    pub const ACONST_NULL: u8 = 0x01;
    pub const ALOAD_0: u8 = 0x2a;
    pub const RETURN: u8 = 0xb1;
    pub const ARETURN: u8 = 0xb0;
}

/// Decodes the body of a `Code` attribute (the bytes after the attribute header).
pub fn decode_code(data: &[u8], cp: &ConstantPool) -> Result<Code> {
    let mut r = Reader::new(data);
    let max_stack = r.read_u2("Code max_stack")?;
    let max_locals = r.read_u2("Code max_locals")?;
    let code_length = r.read_u4("Code code_length")? as usize;
    let code = r.read_bytes(code_length, "Code code")?;
    let instructions = decode_instructions(code, cp)?;

    let handlers = r.read_u2("Code exception_table_length")? as usize;
    let mut exception_table = Vec::with_capacity(handlers);
    for _ in 0..handlers {
        let start_pc = r.read_u2("exception_table start_pc")?;
        let end_pc = r.read_u2("exception_table end_pc")?;
        let handler_pc = r.read_u2("exception_table handler_pc")?;
        let catch_type = cp
            .optional_class_name(r.read_u2("exception_table catch_type")?)?
            .map(str::to_string);
        exception_table.push(ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    let count = r.read_u2("Code attributes_count")? as usize;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name = cp.utf8(r.read_u2("Code attribute_name_index")?)?.to_string();
        let len = r.read_u4("Code attribute_length")? as usize;
        let data = r.read_bytes(len, "Code attribute_info")?.to_vec();
        attributes.push(RawAttribute { name, data });
    }
    r.ensure_empty("Code attribute")?;

    Ok(Code {
        max_stack,
        max_locals,
        instructions,
        exception_table,
        attributes,
    })
}

fn decode_instructions(code: &[u8], cp: &ConstantPool) -> Result<Vec<Instruction>> {
    use opcodes::*;

    let mut r = Reader::new(code);
    let mut out = Vec::new();
    while r.remaining() > 0 {
        let offset = r.position();
        let opcode = r.read_u1("opcode")?;
        let target = |delta: i32| -> Result<u32> {
            let target = offset as i64 + delta as i64;
            if target < 0 || target as usize >= code.len() {
                return Err(invalid(offset, format!("branch target {target} out of range")));
            }
            Ok(target as u32)
        };

        let operand = match opcode {
            0x00..=0x0f => Operand::None,
            0x10 => Operand::Int(r.read_i1("bipush")? as i32),
            0x11 => Operand::Int(r.read_i2("sipush")? as i32),
            LDC => Operand::Constant(cp.loadable(r.read_u1("ldc")? as u16)?),
            LDC_W | LDC2_W => Operand::Constant(cp.loadable(r.read_u2("ldc_w")?)?),
            0x15..=0x19 | 0xa9 => Operand::Local(r.read_u1("local index")? as u16),
            0x1a..=0x35 => Operand::None,
            0x36..=0x3a => Operand::Local(r.read_u1("local index")? as u16),
            0x3b..=0x83 => Operand::None,
            IINC => Operand::Iinc {
                index: r.read_u1("iinc index")? as u16,
                delta: r.read_i1("iinc const")? as i16,
            },
            0x85..=0x98 => Operand::None,
            0x99..=0xa8 | 0xc6 | 0xc7 => Operand::Branch(target(r.read_i2("branch offset")? as i32)?),
            TABLESWITCH | LOOKUPSWITCH => {
                // Operands are aligned to a multiple of four from the method start.
                let pad = (4 - (r.position() % 4)) % 4;
                r.skip(pad, "switch padding")?;
                let default = target(r.read_i4("switch default")?)?;
                let mut targets = Vec::new();
                if opcode == TABLESWITCH {
                    let low = r.read_i4("tableswitch low")?;
                    let high = r.read_i4("tableswitch high")?;
                    if high < low {
                        return Err(invalid(offset, "tableswitch high < low".into()));
                    }
                    for key in low..=high {
                        targets.push((key, target(r.read_i4("tableswitch offset")?)?));
                    }
                } else {
                    let npairs = r.read_i4("lookupswitch npairs")?;
                    if npairs < 0 {
                        return Err(invalid(offset, "negative lookupswitch npairs".into()));
                    }
                    for _ in 0..npairs {
                        let key = r.read_i4("lookupswitch match")?;
                        targets.push((key, target(r.read_i4("lookupswitch offset")?)?));
                    }
                }
                Operand::Switch { default, targets }
            }
            0xac..=0xb1 => Operand::None,
            GETSTATIC..=PUTFIELD => Operand::Field(cp.member_ref(r.read_u2("field ref")?)?),
            INVOKEVIRTUAL..=INVOKESTATIC => {
                Operand::Method(cp.member_ref(r.read_u2("method ref")?)?)
            }
            INVOKEINTERFACE => {
                let m = cp.member_ref(r.read_u2("method ref")?)?;
                r.skip(2, "invokeinterface count")?;
                Operand::Method(m)
            }
            INVOKEDYNAMIC => {
                let idx = r.read_u2("invokedynamic index")?;
                r.skip(2, "invokedynamic zero bytes")?;
                match cp.get(idx)? {
                    crate::constant_pool::Constant::InvokeDynamic {
                        name_and_type_index,
                        ..
                    } => {
                        let (name, descriptor) = cp.name_and_type(*name_and_type_index)?;
                        Operand::InvokeDynamic {
                            name: name.to_string(),
                            descriptor: descriptor.to_string(),
                        }
                    }
                    other => {
                        return Err(DecodeError::ConstantKindMismatch {
                            index: idx,
                            expected: "InvokeDynamic",
                            found: other.kind(),
                        });
                    }
                }
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
                Operand::Type(cp.class_name(r.read_u2("class index")?)?.to_string())
            }
            NEWARRAY => Operand::PrimitiveArray(r.read_u1("newarray atype")?),
            0xbe | 0xbf | 0xc2 | 0xc3 => Operand::None,
            WIDE => {
                let inner = r.read_u1("wide opcode")?;
                let index = r.read_u2("wide index")?;
                let operand = match inner {
                    IINC => Operand::Iinc {
                        index,
                        delta: r.read_i2("wide iinc const")?,
                    },
                    0x15..=0x19 | 0x36..=0x3a | 0xa9 => Operand::Local(index),
                    other => {
                        return Err(invalid(offset, format!("wide cannot modify opcode {other:#04x}")));
                    }
                };
                out.push(Instruction {
                    offset: offset as u32,
                    opcode: inner,
                    operand,
                });
                continue;
            }
            MULTIANEWARRAY => Operand::MultiANewArray {
                class: cp.class_name(r.read_u2("class index")?)?.to_string(),
                dimensions: r.read_u1("multianewarray dimensions")?,
            },
            GOTO_W | JSR_W => Operand::Branch(target(r.read_i4("wide branch offset")?)?),
            other => return Err(invalid(offset, format!("unknown opcode {other:#04x}"))),
        };
        out.push(Instruction {
            offset: offset as u32,
            opcode,
            operand,
        });
    }
    Ok(out)
}

fn invalid(offset: usize, reason: String) -> DecodeError {
    DecodeError::InvalidCode { offset, reason }
}

const OPCODE_NAMES: [&str; 202] = [
    "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3",
    "iconst_4", "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2",
    "dconst_0", "dconst_1", "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload",
    "fload", "dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0",
    "lload_1", "lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0",
    "dload_1", "dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload",
    "laload", "faload", "daload", "aaload", "baload", "caload", "saload", "istore", "lstore",
    "fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3", "lstore_0",
    "lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2", "fstore_3",
    "dstore_0", "dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1", "astore_2",
    "astore_3", "iastore", "lastore", "fastore", "dastore", "aastore", "bastore", "castore",
    "sastore", "pop", "pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap",
    "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub", "imul", "lmul", "fmul",
    "dmul", "idiv", "ldiv", "fdiv", "ddiv", "irem", "lrem", "frem", "drem", "ineg", "lneg",
    "fneg", "dneg", "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land", "ior",
    "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d", "l2i", "l2f", "l2d", "f2i", "f2l",
    "f2d", "d2i", "d2l", "d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl",
    "dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq", "if_icmpne",
    "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto",
    "jsr", "ret", "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn",
    "areturn", "return", "getstatic", "putstatic", "getfield", "putfield", "invokevirtual",
    "invokespecial", "invokestatic", "invokeinterface", "invokedynamic", "new", "newarray",
    "anewarray", "arraylength", "athrow", "checkcast", "instanceof", "monitorenter",
    "monitorexit", "wide", "multianewarray", "ifnull", "ifnonnull", "goto_w", "jsr_w",
];

pub fn opcode_name(opcode: u8) -> &'static str {
    OPCODE_NAMES.get(opcode as usize).copied().unwrap_or("<invalid>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant_pool::Constant;

    fn pool() -> ConstantPool {
        ConstantPool::from_entries(vec![
            Constant::Unusable,
            Constant::Utf8("p/Counter".into()),
            Constant::Class { name_index: 1 },
            Constant::Utf8("count".into()),
            Constant::Utf8("I".into()),
            Constant::NameAndType {
                name_index: 3,
                descriptor_index: 4,
            },
            Constant::FieldRef {
                class_index: 2,
                name_and_type_index: 5,
            },
        ])
    }

    fn code_attribute(code: &[u8]) -> Vec<u8> {
        let mut data = vec![0, 2, 0, 1];
        data.extend_from_slice(&(code.len() as u32).to_be_bytes());
        data.extend_from_slice(code);
        data.extend_from_slice(&[0, 0, 0, 0]);
        data
    }

    #[test]
    fn decodes_field_write_and_branches() {
        // aload_0; dup; getfield #6; iconst_1; iadd; putfield #6; goto +3 (-> return); return
        let code = [
            0x2a, 0x59, 0xb4, 0, 6, 0x04, 0x60, 0xb5, 0, 6, 0xa7, 0, 3, 0xb1, 0xb1,
        ];
        let decoded = decode_code(&code_attribute(&code), &pool()).unwrap();
        assert_eq!(decoded.max_stack, 2);
        let names: Vec<_> = decoded.instructions.iter().map(|i| i.mnemonic()).collect();
        assert_eq!(
            names,
            ["aload_0", "dup", "getfield", "iconst_1", "iadd", "putfield", "goto", "return", "return"]
        );
        let Operand::Field(f) = &decoded.instructions[5].operand else {
            panic!("expected field operand");
        };
        assert_eq!((f.owner.as_str(), f.name.as_str()), ("p/Counter", "count"));
        assert_eq!(decoded.instructions[6].operand, Operand::Branch(13));
    }

    #[test]
    fn tableswitch_padding_is_relative_to_code_start() {
        // iload_1 at 0, tableswitch at 1, pad 2 bytes, default/low/high/1 offset
        let mut code = vec![0x1b, 0xaa, 0, 0];
        for v in [19i32, 0, 0, 19] {
            code.extend_from_slice(&v.to_be_bytes());
        }
        code.extend_from_slice(&[0, 0, 0xb1]);
        let decoded = decode_code(&code_attribute(&code), &pool()).unwrap();
        assert_eq!(
            decoded.instructions[1].operand,
            Operand::Switch {
                default: 20,
                targets: vec![(0, 20)]
            }
        );
    }

    #[test]
    fn truncated_operand_names_instruction_part() {
        let err = decode_code(&code_attribute(&[0xb5, 0]), &pool()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                structure: "field ref",
                ..
            }
        ));
    }
}
