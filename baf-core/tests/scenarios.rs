//! End-to-end build scenarios: one test per documented example, checking
//! the exact output bytes rather than just "it didn't error".

use baf_core::schema::{BlockSchema, IntKind};
use baf_core::{build, BuildContext, Schema, Value};
use baf_core::Block;

fn ctx() -> BuildContext {
    // Surfaces the resolver's trace!/debug! logging (RUST_LOG=baf_core=trace)
    // when a scenario's output doesn't match, instead of only a bytes diff.
    let _ = env_logger::builder().is_test(true).try_init();
    BuildContext::new()
}

#[test]
fn s1_primitive_record() {
    let schema = BlockSchema::builder("Rec")
        .field("a", Schema::int(IntKind::U16))
        .field("b", Schema::int(IntKind::S8))
        .build();
    let data = Value::map([("a", Value::Int(0x1234)), ("b", Value::Int(-1))]);
    let bytes = build(&schema, data, &ctx()).unwrap();
    assert_eq!(bytes, vec![0x34, 0x12, 0xFF]);
}

#[test]
fn s2_array_with_count() {
    let schema = BlockSchema::builder("Rec")
        .field("xs", Schema::array(Schema::int(IntKind::U8), Some(3)))
        .build();

    let ok = Value::map([(
        "xs",
        Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
    )]);
    assert_eq!(build(&schema, ok, &ctx()).unwrap(), vec![1, 2, 3]);

    let short = Value::map([("xs", Value::Seq(vec![Value::Int(1), Value::Int(2)]))]);
    let err = build(&schema, short, &ctx()).unwrap_err();
    assert!(err.is_validation(), "expected Validation, got {err:?}");
}

#[test]
fn s3_optional_present_and_absent() {
    let schema = BlockSchema::builder("Rec")
        .field("opt", Schema::optional(Schema::int(IntKind::U32)))
        .build();

    let present = Value::map([("opt", Value::Int(1))]);
    assert_eq!(build(&schema, present, &ctx()).unwrap(), vec![1, 0, 0, 0]);

    let absent = Value::map(Vec::<(&str, Value)>::new());
    let (mut tree, root) = baf_core::build_tree(&schema, absent, &ctx()).unwrap();
    assert_eq!(tree.bytes(root).unwrap(), Vec::<u8>::new());
    assert_eq!(tree.size(root).unwrap(), 0);
}

#[test]
fn s4_alignment() {
    let schema = BlockSchema::builder("Rec")
        .field("a", Schema::int(IntKind::U8))
        .field("pad", Schema::align(4))
        .field("b", Schema::int(IntKind::U8))
        .build();
    let data = Value::map([("a", Value::Int(0xAA)), ("b", Value::Int(0xBB))]);
    let bytes = build(&schema, data, &ctx()).unwrap();
    assert_eq!(bytes, vec![0xAA, 0x00, 0x00, 0x00, 0xBB]);
}

#[test]
fn s5_dynamic_refinement() {
    let r2 = BlockSchema::builder("R2")
        .field("y", Schema::int(IntKind::U16))
        .family("R")
        .build();
    let abstract_r = BlockSchema::builder("R").family("R").build();

    let schema = BlockSchema::builder("Rec").field("f", abstract_r).build();

    let good = Value::map([(
        "f",
        Value::Packed(
            Box::new(r2),
            Box::new(Value::map([("y", Value::Int(0x0102))])),
        ),
    )]);
    assert_eq!(build(&schema, good, &ctx()).unwrap(), vec![0x02, 0x01]);

    let other_family = BlockSchema::builder("R1b")
        .field("x", Schema::int(IntKind::U8))
        .family("Other")
        .build();
    let bad = Value::map([(
        "f",
        Value::Packed(
            Box::new(other_family),
            Box::new(Value::map([("x", Value::Int(1))])),
        ),
    )]);
    let err = build(&schema, bad, &ctx()).unwrap_err();
    assert!(err.is_build_error(), "expected Build, got {err:?}");
}

#[test]
fn s6_dependency_resolution() {
    let schema = BlockSchema::builder("Rec")
        .field("n", Schema::int(IntKind::U16))
        .field("xs", Schema::bytes(None))
        .setter("n", |tree, block_id, _input| {
            let xs = tree.block_field_node(block_id, "xs").unwrap();
            let size = tree.size(xs)?;
            Ok(Value::Int(size as i128))
        })
        .build();

    let data = Value::map([("xs", Value::Bytes(b"hello".to_vec()))]);
    let bytes = build(&schema, data, &ctx()).unwrap();
    assert_eq!(bytes, vec![0x05, 0x00, b'h', b'e', b'l', b'l', b'o']);
}

#[test]
fn file_field_reads_from_root_dir() {
    let dir = std::env::temp_dir().join(format!("baf-core-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("payload.bin"), b"a chunk of bytes").unwrap();

    let schema = BlockSchema::builder("Rec")
        .field("data", Schema::file())
        .build();
    let data = Value::map([("data", Value::Str("payload.bin".to_string()))]);
    let built = build(&schema, data, &BuildContext::with_root_dir(&dir)).unwrap();
    assert_eq!(built, b"a chunk of bytes");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn file_field_missing_file_is_validation() {
    let dir = std::env::temp_dir().join(format!("baf-core-test-missing-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let schema = BlockSchema::builder("Rec")
        .field("data", Schema::file())
        .build();
    let data = Value::map([("data", Value::Str("nope.bin".to_string()))]);
    let err = build(&schema, data, &BuildContext::with_root_dir(&dir)).unwrap_err();
    assert!(err.is_validation(), "expected Validation, got {err:?}");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn align_below_two_is_a_spec_error() {
    let schema = BlockSchema::builder("Rec").field("pad", Schema::align(1)).build();
    let err = build(&schema, Value::map(Vec::<(&str, Value)>::new()), &ctx()).unwrap_err();
    assert!(
        matches!(err, baf_core::BafError::Spec(_)),
        "expected Spec, got {err:?}"
    );
}

#[test]
fn array_without_declared_count_takes_input_length() {
    let schema = BlockSchema::builder("Rec")
        .field("xs", Schema::array(Schema::int(IntKind::U8), None))
        .build();
    let data = Value::map([(
        "xs",
        Value::Seq(vec![Value::Int(9), Value::Int(8), Value::Int(7), Value::Int(6)]),
    )]);
    assert_eq!(build(&schema, data, &ctx()).unwrap(), vec![9, 8, 7, 6]);
}

#[test]
fn cyclic_setters_report_all_stuck_fields() {
    let schema = BlockSchema::builder("Rec")
        .field("a", Schema::int(IntKind::U8))
        .field("b", Schema::int(IntKind::U8))
        .setter("a", |tree, block_id, _input| {
            let b = tree.block_field_node(block_id, "b").unwrap();
            Ok(Value::Int(tree.int_value(b)? as i128))
        })
        .setter("b", |tree, block_id, _input| {
            let a = tree.block_field_node(block_id, "a").unwrap();
            Ok(Value::Int(tree.int_value(a)? as i128))
        })
        .build();
    let err = build(&schema, Value::map(Vec::<(&str, Value)>::new()), &ctx()).unwrap_err();
    assert!(err.is_build_error(), "expected Build, got {err:?}");
}

#[derive(Block)]
#[baf(name = "Header")]
struct Header {
    #[baf(schema = "Schema::int(IntKind::U16)")]
    magic: (),
    #[baf(schema = "Schema::int(IntKind::U8)")]
    version: (),
}

#[test]
fn derive_block_builds_matching_schema() {
    let data = Value::map([("magic", Value::Int(0xABCD)), ("version", Value::Int(2))]);
    let bytes = build(&Header::schema(), data, &ctx()).unwrap();
    assert_eq!(bytes, vec![0xCD, 0xAB, 0x02]);
}

#[test]
fn missing_required_field_is_validation() {
    let schema = BlockSchema::builder("Rec")
        .field("a", Schema::int(IntKind::U8))
        .build();
    let err = build(&schema, Value::map(Vec::<(&str, Value)>::new()), &ctx()).unwrap_err();
    assert!(err.is_validation(), "expected Validation, got {err:?}");
}
