use mould_core::{FieldRef, Kind, Value, ZeroedInstantiator};
use mould_reflect::{AllocatingBuilder, BuildError, ErrorCategory, RawOffsetBuilder};
use mould_testhelpers::test;

mod common;
use common::{every_kind, field};

fn sample(kind: &str) -> Value {
    match kind {
        "boolean" => Value::Boolean(false),
        "byte" => Value::Byte(1),
        "short" => Value::Short(2),
        "char" => Value::Char(3),
        "int" => Value::Int(4),
        "long" => Value::Long(5),
        "float" => Value::Float(6.0),
        _ => Value::Double(7.0),
    }
}

const KINDS: [&str; 8] = [
    "boolean", "byte", "short", "char", "int", "long", "float", "double",
];

/// (field, kind of the field, kinds it accepts)
const TABLE: [(&str, &str, &[&str]); 8] = [
    ("z", "boolean", &["boolean"]),
    ("b", "byte", &["byte"]),
    ("s", "short", &["byte", "short"]),
    ("c", "char", &["byte", "char"]),
    ("i", "int", &["byte", "short", "char", "int"]),
    ("j", "long", &["byte", "short", "char", "int", "long"]),
    ("f", "float", &["float"]),
    ("d", "double", &["float", "double"]),
];

fn check_table(
    fields: impl Fn(&str) -> eyre::Result<FieldRef>,
    set: impl Fn(FieldRef, Value) -> Result<(), BuildError>,
) -> eyre::Result<()> {
    for (name, target, accepted) in TABLE {
        let f = fields(name)?;
        for source in KINDS {
            let result = set(f, sample(source));
            if accepted.contains(&source) {
                assert!(result.is_ok(), "{source} into {target}: {result:?}");
            } else {
                let err = result.err().ok_or_else(|| eyre::eyre!("{source} into {target}"))?;
                assert_eq!(err.category(), ErrorCategory::TypeMismatch, "{err}");
            }
        }
        let err = set(f, Value::Null).err();
        assert!(
            matches!(err, Some(BuildError::TypeMismatch { .. })),
            "null into {target}"
        );
    }
    Ok(())
}

#[test]
fn allocating_builder_follows_the_table() {
    let class = every_kind("TableAllocating")?;
    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    check_table(|n| field(class, n), |f, v| builder.set_field(f, v))?;
}

#[test]
fn raw_offset_builder_follows_the_table() {
    let class = every_kind("TableRaw")?;
    let builder = RawOffsetBuilder::new(class);
    check_table(|n| field(class, n), |f, v| builder.set_field(f, v))?;
}

#[test]
fn boolean_fields_reject_integers() {
    let class = every_kind("NoBoolInts")?;
    let builder = RawOffsetBuilder::new(class);
    let z = field(class, "z")?;
    let err = builder.set_field(z, 1).unwrap_err();
    assert!(matches!(
        err,
        BuildError::TypeMismatch {
            expected: Kind::Boolean,
            ..
        }
    ));
    assert!(builder.pending_fields().is_empty());
}

#[test]
fn int_fields_accept_shorts() {
    let class = every_kind("IntsTakeShorts")?;
    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    let i = field(class, "i")?;
    builder.set_field(i, -3i16)?;
    assert_eq!(builder.build()?.get(i)?, Value::Int(-3));
}

#[test]
fn reference_fields_check_the_class() {
    let garage = common::Garage::new()?;
    let name = field(garage.car, "name")?;
    let builder = AllocatingBuilder::new(garage.car, ZeroedInstantiator);

    let car = garage.car.allocate_zeroed()?;
    let boat = garage.boat.allocate_zeroed()?;

    builder.set_field(name, car.clone())?;
    builder.set_field(name, Value::Null)?;
    let err = builder.set_field(name, boat).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    assert_eq!(builder.pending_fields().get(name), Some(Value::Null));

    // Object slots take anything
    let class = every_kind("AnyRef")?;
    let r = field(class, "r")?;
    RawOffsetBuilder::new(class).set_field(r, car)?;
}
