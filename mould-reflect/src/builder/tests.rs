use mould_core::{Class, ClassRef, FieldRef, Kind, Value, ZeroedInstantiator};
use mould_testhelpers::test;

use super::*;
use crate::{AllocatingBuilder, ErrorCategory, RawOffsetBuilder};

fn field(class: ClassRef, name: &str) -> eyre::Result<FieldRef> {
    class
        .find_field(name)
        .ok_or_else(|| eyre::eyre!("{} has no field {name}", class.name()))
}

#[test]
fn static_fields_are_a_usage_error() {
    let class = Class::builder("Counter")
        .field("value", Kind::Int)
        .static_field("INSTANCES", Kind::Int)
        .build()?;
    let instances = field(class, "INSTANCES")?;

    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    let err = builder.set_field(instances, 1).unwrap_err();
    assert!(matches!(err, BuildError::StaticField { .. }));
    assert_eq!(err.category(), ErrorCategory::UsageError);
    assert!(builder.pending_fields().is_empty());

    let raw = RawOffsetBuilder::new(class);
    let err = raw.set_field(instances, 1).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UsageError);
}

#[test]
fn foreign_fields_need_punning() {
    let ours = Class::builder("Ours")
        .field("id", Kind::Int)
        .field("flag", Kind::Boolean)
        .build()?;
    let theirs = Class::builder("Theirs")
        .field("id", Kind::Int)
        .field("flag", Kind::Byte)
        .build()?;
    let their_id = field(theirs, "id")?;
    let their_flag = field(theirs, "flag")?;

    let checked = AllocatingBuilder::new(ours, ZeroedInstantiator);
    let err = checked.set_field(their_id, 1).unwrap_err();
    assert!(matches!(err, BuildError::ForeignField { .. }));
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);

    let raw = RawOffsetBuilder::new(ours);
    raw.set_field(their_id, 7)?;
    // same name and position, but a byte cannot stand in for a boolean
    let err = raw.set_field(their_flag, 1i8).unwrap_err();
    assert!(matches!(err, BuildError::ForeignField { .. }));

    let our_id = field(ours, "id")?;
    assert_eq!(raw.pending_fields().get(our_id), Some(Value::Int(7)));
    assert!(raw.unset_field(their_id));
    assert!(raw.pending_fields().is_empty());
}

#[test]
fn values_are_recorded_widened() {
    let class = Class::builder("Wide")
        .field("l", Kind::Long)
        .field("d", Kind::Double)
        .build()?;
    let l = field(class, "l")?;
    let d = field(class, "d")?;

    let builder = RawOffsetBuilder::new(class);
    builder.set_field(l, 'x' as u16 as i16)?;
    builder.set_field(d, 0.5f32)?;

    let pending = builder.pending_fields();
    assert_eq!(pending.get(l), Some(Value::Long('x' as i64)));
    assert_eq!(pending.get(d), Some(Value::Double(0.5)));
}

#[test]
fn rejected_values_leave_the_store_alone() {
    let class = Class::builder("Keep").field("n", Kind::Short).build()?;
    let n = field(class, "n")?;

    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    builder.set_field(n, 3i16)?;
    let err = builder.set_field(n, 70_000).unwrap_err();
    match err {
        BuildError::TypeMismatch {
            slot,
            expected,
            actual,
        } => {
            assert_eq!(slot, Slot::Field(n));
            assert_eq!(expected, Kind::Short);
            assert_eq!(actual, mould_core::ValueType::Int);
        }
        other => eyre::bail!("unexpected error: {other}"),
    }
    assert_eq!(builder.pending_fields().get(n), Some(Value::Short(3)));
}

#[test]
fn phases_display_in_lowercase() {
    assert_eq!(Phase::Configuring.to_string(), "configuring");
    assert_eq!(Phase::Committing.to_string(), "committing");
}

#[test]
fn denied_access_reports_its_phase() {
    let class = Class::builder("Vault")
        .field_with_flags("pin", Kind::Int, mould_core::FieldFlags::RESTRICTED)
        .build()?;
    let pin = field(class, "pin")?;

    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    let err = builder.set_field(pin, 1234).unwrap_err();
    assert!(matches!(
        err,
        BuildError::AccessDenied {
            phase: Phase::Configuring,
            ..
        }
    ));
    assert!(err.to_string().contains("configuring"), "{err}");

    // a build with nothing recorded never reaches the restricted field
    let vault = builder.build()?;
    assert_eq!(vault.class(), class);
}

#[test]
fn builder_debug_lists_pending_fields() {
    let class = Class::builder("Debugged").field("n", Kind::Int).build()?;
    let builder = RawOffsetBuilder::new(class);
    builder.set_field(field(class, "n")?, 1)?;
    let debug = format!("{builder:?}");
    assert!(debug.contains("Debugged"), "{debug}");
    assert!(debug.contains("RawOffset"), "{debug}");
}
