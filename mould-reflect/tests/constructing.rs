use std::error::Error;

use mould_core::{Class, ClassRef, Constructor, InstantiationError, Kind, Value, ValueType};
use mould_reflect::{BuildError, ConstructingBuilder, ErrorCategory, Slot};
use mould_testhelpers::test;

mod common;
use common::{Garage, field};

/// `Account { id: int, balance: long, note: Account }` with an
/// `Account(int, long)` constructor that refuses negative ids.
fn account() -> eyre::Result<ClassRef> {
    Ok(Class::builder("Account")
        .field("id", Kind::Int)
        .field("balance", Kind::Long)
        .field("note", Kind::Reference("Account"))
        .constructor(&[Kind::Int, Kind::Long], |init, args| {
            if args[0] == Value::Int(-1) {
                return Err("negative id".into());
            }
            init.set("id", args[0].clone())?;
            init.set("balance", args[1].clone())?;
            Ok(())
        })
        .build()?)
}

fn only_constructor(class: ClassRef) -> eyre::Result<&'static Constructor> {
    class
        .constructors()
        .first()
        .ok_or_else(|| eyre::eyre!("{} declares no constructor", class.name()))
}

#[test]
fn unbound_parameters_get_defaults() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;

    let empty = builder.build()?;
    assert_eq!(empty.get_named("id")?, Value::Int(0));
    assert_eq!(empty.get_named("balance")?, Value::Long(0));

    builder.set_constructor_param(1, 250)?;
    let partial = builder.build()?;
    assert_eq!(partial.get_named("id")?, Value::Int(0));
    // the int argument was widened to the declared long
    assert_eq!(partial.get_named("balance")?, Value::Long(250));
}

#[test]
fn fields_are_applied_after_the_constructor() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;
    builder.set_constructor_param(0, 7)?;
    builder.set_constructor_param(1, 100i64)?;
    builder.set_field(field(class, "balance")?, 5i64)?;

    let built = builder.build()?;
    assert_eq!(built.get_named("id")?, Value::Int(7));
    assert_eq!(built.get_named("balance")?, Value::Long(5));
}

#[test]
fn unsetting_a_parameter_restores_its_default() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;
    builder.set_constructor_param(0, 42)?;
    assert!(builder.unset_constructor_param(0));
    assert!(!builder.unset_constructor_param(0));
    assert!(!builder.unset_constructor_param(9));

    assert_eq!(builder.build()?.get_named("id")?, Value::Int(0));
}

#[test]
fn parameter_index_out_of_bounds() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;
    let err = builder.set_constructor_param(2, 1).unwrap_err();
    assert!(matches!(
        err,
        BuildError::ParamIndexOutOfBounds { index: 2, arity: 2 }
    ));
    assert_eq!(err.category(), ErrorCategory::UsageError);
}

#[test]
fn parameters_are_type_checked() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;
    builder.set_constructor_param(0, 3)?;

    let err = builder.set_constructor_param(0, 3i64).unwrap_err();
    match err {
        BuildError::TypeMismatch {
            slot,
            expected,
            actual,
        } => {
            assert_eq!(slot, Slot::Param { index: 0 });
            assert_eq!(expected, Kind::Int);
            assert_eq!(actual, ValueType::Long);
        }
        other => eyre::bail!("unexpected error: {other}"),
    }

    // primitives have no null
    let err = builder.set_constructor_param(1, Value::Null).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);

    // the earlier binding survives both rejections
    assert_eq!(builder.build()?.get_named("id")?, Value::Int(3));
}

#[test]
fn constructors_of_other_classes_are_refused() {
    let class = account()?;
    let garage = Garage::new()?;
    let err = ConstructingBuilder::new(garage.boat, only_constructor(class)?).unwrap_err();
    assert!(matches!(
        err,
        BuildError::ForeignConstructor {
            declaring: "Account",
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::UsageError);
}

#[test]
fn constructor_failures_are_instantiation_failures() {
    let class = account()?;
    let builder = ConstructingBuilder::new(class, only_constructor(class)?)?;
    builder.set_constructor_param(0, -1)?;

    let err = builder.build().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InstantiationFailure);
    let BuildError::InstantiationFailure { cause, .. } = &err else {
        eyre::bail!("unexpected error: {err}");
    };
    assert!(matches!(cause, InstantiationError::Raised { .. }));

    let root = err
        .source()
        .and_then(|cause| cause.source())
        .map(ToString::to_string);
    assert_eq!(root.as_deref(), Some("negative id"));

    // the configuration survives a failed build
    builder.set_constructor_param(0, 1)?;
    assert_eq!(builder.build()?.get_named("id")?, Value::Int(1));
}

#[test]
fn restricted_fields_are_denied() {
    let garage = Garage::new()?;
    let car = Class::builder("Roadster")
        .extends(garage.car)
        .constructor(&[], |_, _| Ok(()))
        .build()?;
    let builder = ConstructingBuilder::new(car, only_constructor(car)?)?;

    builder.set_field(field(car, "doors")?, 2i8)?;
    let err = builder.set_field(field(car, "vin")?, 1i64).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::AccessDenied);
    assert_eq!(builder.build()?.get_named("doors")?, Value::Byte(2));
}
