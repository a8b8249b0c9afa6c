use mould_core::{Class, FieldFlags, Kind, Value};
use mould_reflect::{ErrorCategory, Platform, RawOffsetBuilder};
use mould_testhelpers::test;

mod common;
use common::{Garage, every_kind, field};

#[test]
fn restricted_fields_are_writable() {
    let garage = Garage::new()?;
    let vin = field(garage.car, "vin")?;

    let builder = RawOffsetBuilder::new(garage.car);
    builder.set_field(vin, 31337i64)?;
    let car = builder.build()?;

    // the normal accessor still refuses to read it back
    assert!(car.get(vin).is_err());
    let offset = vin.offset.ok_or_else(|| eyre::eyre!("vin is static"))?;
    assert_eq!(car.lock().load(Kind::Long, offset)?, Value::Long(31337));
}

#[test]
fn sibling_booleans_survive_word_only_writes() {
    let class = Class::builder("Switches")
        .field("a", Kind::Boolean)
        .field("b", Kind::Boolean)
        .field("c", Kind::Boolean)
        .field("d", Kind::Boolean)
        .build()?;

    let builder = RawOffsetBuilder::with_platform(class, Platform::WordOnly);
    builder.set_field(field(class, "a")?, true)?;
    builder.set_field(field(class, "b")?, false)?;
    builder.set_field(field(class, "c")?, true)?;
    let switches = builder.build()?;

    let read: Vec<Value> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| switches.get_named(name))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        read,
        [true, false, true, false].map(Value::Boolean).to_vec()
    );
}

#[test]
fn platforms_build_identical_objects() {
    let class = every_kind("Platforms")?;
    let target = class.allocate_zeroed()?;
    let values = [
        ("z", Value::Boolean(true)),
        ("b", Value::Byte(-7)),
        ("s", Value::Short(-300)),
        ("c", Value::Char(0x263a)),
        ("i", Value::Int(i32::MIN)),
        ("j", Value::Long(i64::MAX)),
        ("f", Value::Float(-2.5)),
        ("d", Value::Double(f64::EPSILON)),
        ("r", Value::Object(target)),
    ];

    let mut built = Vec::new();
    for platform in [Platform::Native, Platform::WordOnly] {
        let builder = RawOffsetBuilder::with_platform(class, platform);
        assert_eq!(builder.platform(), platform);
        for (name, value) in &values {
            builder.set_field(field(class, name)?, value.clone())?;
        }
        built.push(builder.build()?);
    }

    for (name, value) in &values {
        for obj in &built {
            assert_eq!(&obj.get_named(name)?, value, "{name}");
        }
    }
    assert_eq!(built[0].lock().block().as_bytes(), built[1].lock().block().as_bytes());
}

#[test]
fn static_fields_are_never_written() {
    let garage = Garage::new()?;
    let builder = RawOffsetBuilder::new(garage.vehicle);
    let err = builder
        .set_field(field(garage.vehicle, "BUILT")?, 1i64)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UsageError);
}

#[test]
fn host_platform_is_native_off_android() {
    let class = Class::builder("Host")
        .field_with_flags("secret", Kind::Int, FieldFlags::RESTRICTED)
        .build()?;
    let builder = RawOffsetBuilder::new(class);
    if cfg!(target_os = "android") {
        assert_eq!(builder.platform(), Platform::WordOnly);
    } else {
        assert_eq!(builder.platform(), Platform::Native);
    }
    assert_eq!(Platform::host(), builder.platform());
}
