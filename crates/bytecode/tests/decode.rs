use jinspect_bytecode::{
    Annotation, ClassFile, ClassFileBuilder, ConstValue, DecodeError, DecodeOptions, ElementValue,
    FieldEntry, InnerClassInfo, MethodEntry, ModuleAttribute, ModulePackage, ModuleProvides,
    ModuleRequires, Operand, access, code_attribute, decode_code, opcodes, parse_method_signature,
};

fn sample() -> Vec<u8> {
    ClassFileBuilder::new("p/Box")
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Comparable<Lp/Box<TT;>;>;")
        .interface("java/lang/Comparable")
        .source_file("Box.java")
        .field(FieldEntry::new(access::ACC_PRIVATE, "value", "Ljava/lang/Object;").with_signature("TT;"))
        .method(
            MethodEntry::new(access::ACC_PUBLIC, "get", "()Ljava/lang/Object;").with_signature("()TT;"),
        )
        .inner_class(InnerClassInfo {
            inner_class: "p/Box$Entry".into(),
            outer_class: Some("p/Box".into()),
            inner_name: Some("Entry".into()),
            access_flags: access::ACC_PUBLIC | access::ACC_STATIC,
        })
        .annotation(
            Annotation {
                type_descriptor: "Lp/Marker;".into(),
                elements: vec![("value".into(), ElementValue::Const(ConstValue::Int(3)))],
            },
            true,
        )
        .raw_attribute("Vendor", vec![1, 2, 3])
        .build()
}

#[test]
fn builder_output_decodes_to_same_declarations() {
    let class = ClassFile::decode(&sample()).unwrap();
    assert_eq!(class.this_class, "p/Box");
    assert_eq!(class.binary_name(), "p.Box");
    assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
    assert_eq!(class.interfaces, vec!["java/lang/Comparable".to_string()]);
    assert_eq!(class.fields[0].signature.as_deref(), Some("TT;"));
    assert_eq!(
        class.find_method("get", "()Ljava/lang/Object;").unwrap().signature.as_deref(),
        Some("()TT;")
    );
    assert_eq!(class.attributes.source_file.as_deref(), Some("Box.java"));
    assert_eq!(class.attributes.inner_classes[0].inner_name.as_deref(), Some("Entry"));
    let ann = &class.attributes.annotations.visible[0];
    assert_eq!(ann.type_internal_name(), Some("p/Marker"));
    assert_eq!(ann.element("value"), Some(&ElementValue::Const(ConstValue::Int(3))));
}

#[test]
fn unknown_attributes_are_retained() {
    let class = ClassFile::decode(&sample()).unwrap();
    assert_eq!(class.attributes.unknown.len(), 1);
    assert_eq!(class.attributes.unknown[0].name, "Vendor");
    assert_eq!(class.attributes.unknown[0].data, vec![1, 2, 3]);
}

#[test]
fn rebuilding_a_decoded_class_keeps_it_decodable() {
    let class = ClassFile::decode(&sample()).unwrap();
    let again = ClassFile::decode(&ClassFileBuilder::from_class_file(&class).build()).unwrap();
    assert_eq!(again.fields, class.fields);
    assert_eq!(again.methods, class.methods);
    assert_eq!(again.attributes.unknown, class.attributes.unknown);
}

#[test]
fn every_truncation_point_fails_with_truncated() {
    let bytes = sample();
    for len in 0..bytes.len() {
        match ClassFile::decode(&bytes[..len]) {
            Err(DecodeError::Truncated { .. }) | Err(DecodeError::MalformedAttribute { .. }) => {}
            other => panic!("prefix of {len} bytes decoded as {other:?}"),
        }
    }
}

#[test]
fn truncated_header_names_the_structure() {
    let bytes = sample();
    let err = ClassFile::decode(&bytes[..6]).unwrap_err();
    match err {
        DecodeError::Truncated { structure, offset, .. } => {
            assert_eq!(structure, "major_version");
            assert_eq!(offset, 6);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = sample();
    bytes[0] = 0;
    assert!(matches!(ClassFile::decode(&bytes), Err(DecodeError::BadMagic(_))));
}

#[test]
fn version_ceiling_is_configurable() {
    let bytes = ClassFileBuilder::new("p/New").version(70, 0).build();
    assert!(matches!(
        ClassFile::decode(&bytes),
        Err(DecodeError::UnsupportedVersion { major: 70, .. })
    ));
    let opts = DecodeOptions { max_major_version: 70 };
    assert!(ClassFile::decode_with(&bytes, &opts).is_ok());

    let old = ClassFileBuilder::new("p/Old").version(44, 0).build();
    assert!(matches!(
        ClassFile::decode(&old),
        Err(DecodeError::UnsupportedVersion { major: 44, .. })
    ));
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = sample();
    bytes.push(0);
    assert!(matches!(
        ClassFile::decode(&bytes),
        Err(DecodeError::TrailingBytes { .. })
    ));
}

#[test]
fn code_bodies_decode_on_request() {
    let mut builder = ClassFileBuilder::new("p/Calls");
    let println = builder
        .pool_mut()
        .method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let out = builder
        .pool_mut()
        .field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let [o1, o2] = out.to_be_bytes();
    let [m1, m2] = println.to_be_bytes();
    let code = [
        opcodes::GETSTATIC,
        o1,
        o2,
        opcodes::ACONST_NULL,
        opcodes::INVOKEVIRTUAL,
        m1,
        m2,
        opcodes::RETURN,
    ];
    let bytes = builder
        .method(
            MethodEntry::new(access::ACC_PUBLIC | access::ACC_STATIC, "run", "()V")
                .with_code(code_attribute(2, 0, &code)),
        )
        .build();

    let class = ClassFile::decode(&bytes).unwrap();
    let raw = class.methods[0].code.as_ref().unwrap();
    let body = decode_code(raw, &class.constant_pool).unwrap();
    assert_eq!(body.instructions.len(), 4);
    let Operand::Method(target) = &body.instructions[2].operand else {
        panic!("expected method operand");
    };
    assert_eq!(target.owner, "java/io/PrintStream");
    assert_eq!(target.name, "println");
    assert_eq!(body.instructions[3].mnemonic(), "return");
}

#[test]
fn method_signatures_parse_from_decoded_attributes() {
    let class = ClassFile::decode(&sample()).unwrap();
    let sig = parse_method_signature(class.methods[0].signature.as_deref().unwrap()).unwrap();
    assert!(sig.parameters.is_empty());
    assert!(sig.return_type.is_some());
}

fn module_info() -> ModuleAttribute {
    ModuleAttribute {
        name: "com.acme.app".into(),
        flags: access::ACC_OPEN,
        version: Some("1.2".into()),
        requires: vec![
            ModuleRequires {
                module: "java.base".into(),
                flags: access::ACC_MANDATED,
                version: Some("21".into()),
            },
            ModuleRequires {
                module: "com.acme.core".into(),
                flags: access::ACC_TRANSITIVE | access::ACC_STATIC_PHASE,
                version: None,
            },
        ],
        exports: vec![
            ModulePackage {
                package: "com/acme/api".into(),
                flags: 0,
                to: vec![],
            },
            ModulePackage {
                package: "com/acme/spi".into(),
                flags: 0,
                to: vec!["com.acme.plugins".into(), "com.acme.tests".into()],
            },
        ],
        opens: vec![],
        uses: vec!["com/acme/spi/Codec".into()],
        provides: vec![ModuleProvides {
            service: "com/acme/spi/Codec".into(),
            with: vec!["com/acme/impl/JsonCodec".into(), "com/acme/impl/XmlCodec".into()],
        }],
    }
}

#[test]
fn module_info_classes_carry_their_module_attribute() {
    let bytes = ClassFileBuilder::new("module-info").module(module_info()).build();
    let class = ClassFile::decode(&bytes).unwrap();
    assert!(class.is_module());
    assert_eq!(class.super_class, None);
    let module = class.attributes.module.as_ref().unwrap();
    assert!(module.is_open());
    assert_eq!(module, &module_info());
    assert_eq!(module.requires[1].flags & access::ACC_TRANSITIVE, access::ACC_TRANSITIVE);
    assert_eq!(module.exports[1].to, vec!["com.acme.plugins", "com.acme.tests"]);
}

#[test]
fn module_names_must_point_at_module_constants() {
    let mut builder = ClassFileBuilder::new("module-info");
    let class_index = builder.pool_mut().class("com/acme/NotAModule");
    let mut data = class_index.to_be_bytes().to_vec();
    data.extend_from_slice(&[0; 14]);
    let bytes = builder.raw_attribute("Module", data).build();
    match ClassFile::decode(&bytes) {
        Err(DecodeError::ConstantKindMismatch { expected, found, .. }) => {
            assert_eq!(expected, "Module");
            assert_eq!(found, "Class");
        }
        other => panic!("unexpected {other:?}"),
    }
}
