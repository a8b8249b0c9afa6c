use std::sync::Arc;
use std::thread;

use mould_core::{ObjectRef, Value, ZeroedInstantiator};
use mould_reflect::{AllocatingBuilder, Platform, RawOffsetBuilder};
use mould_testhelpers::test;

mod common;
use common::{every_kind, field};

const NAMES: [&str; 9] = ["z", "b", "s", "c", "i", "j", "f", "d", "r"];

fn snapshot(obj: &ObjectRef) -> eyre::Result<Vec<Value>> {
    let mut values = Vec::new();
    for name in NAMES {
        values.push(obj.get_named(name)?);
    }
    Ok(values)
}

#[test]
fn unset_fields_build_to_defaults() {
    let class = every_kind("Defaults")?;
    let expected = vec![
        Value::Boolean(false),
        Value::Byte(0),
        Value::Short(0),
        Value::Char(0),
        Value::Int(0),
        Value::Long(0),
        Value::Float(0.0),
        Value::Double(0.0),
        Value::Null,
    ];

    let allocating = AllocatingBuilder::new(class, ZeroedInstantiator).build()?;
    assert_eq!(snapshot(&allocating)?, expected);

    for platform in [Platform::Native, Platform::WordOnly] {
        let raw = RawOffsetBuilder::with_platform(class, platform).build()?;
        assert_eq!(snapshot(&raw)?, expected, "{platform}");
    }
}

#[test]
fn set_then_unset_is_never_set() {
    let class = every_kind("SetUnset")?;
    let i = field(class, "i")?;
    let r = field(class, "r")?;
    let d = field(class, "d")?;

    let pristine = RawOffsetBuilder::new(class);
    pristine.set_field(d, 1.5)?;

    let touched = RawOffsetBuilder::new(class);
    touched.set_field(d, 1.5)?;
    touched.set_field(i, 9)?;
    touched.set_field(r, Value::Null)?;
    assert!(touched.unset_field(i));
    assert!(touched.unset_field(r));
    assert!(!touched.unset_field(i));

    let a = pristine.build()?;
    let b = touched.build()?;
    assert_eq!(snapshot(&a)?, snapshot(&b)?);
    assert_eq!(touched.pending_fields().len(), pristine.pending_fields().len());
}

#[test]
fn every_build_is_a_new_instance() {
    let class = every_kind("Repeat")?;
    let i = field(class, "i")?;
    let builder = AllocatingBuilder::new(class, ZeroedInstantiator);
    builder.set_field(i, 41)?;

    let first = builder.build()?;
    let second = builder.build()?;
    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(first.id(), second.id());
    assert_eq!(snapshot(&first)?, snapshot(&second)?);

    first.set(i, Value::Int(42))?;
    assert_eq!(second.get(i)?, Value::Int(41));
    assert_eq!(builder.pending_fields().get(i), Some(Value::Int(41)));
}

#[test]
fn builds_see_whole_clones() {
    let class = every_kind("Concurrent")?;
    let i = field(class, "i")?;
    let j = field(class, "j")?;

    let sources: Vec<ObjectRef> = (1..=2)
        .map(|n| -> eyre::Result<ObjectRef> {
            let obj = class.allocate_zeroed()?;
            obj.set(i, Value::Int(n))?;
            obj.set(j, Value::Long(n.into()))?;
            Ok(obj)
        })
        .collect::<eyre::Result<_>>()?;

    let builder = Arc::new(RawOffsetBuilder::new(class));
    builder.clone_fields_from(&sources[0])?;

    // a clone records all of its fields under one lock, and a build
    // snapshots under the same lock, so i and j always come from one source
    let cloners: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || -> eyre::Result<()> {
                for _ in 0..200 {
                    builder.clone_fields_from(&source)?;
                }
                Ok(())
            })
        })
        .collect();

    for _ in 0..200 {
        let obj = builder.build()?;
        assert_eq!(obj.get(i)?.as_i64(), obj.get(j)?.as_i64());
    }

    for cloner in cloners {
        cloner.join().map_err(|_| eyre::eyre!("cloner panicked"))??;
    }
}

#[test]
fn configuration_from_many_threads() {
    let class = every_kind("ManyThreads")?;
    let builder = Arc::new(AllocatingBuilder::new(class, ZeroedInstantiator));

    let handles: Vec<_> = ["b", "s", "i", "j"]
        .into_iter()
        .enumerate()
        .map(|(n, name)| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || -> eyre::Result<()> {
                let f = field(class, name)?;
                builder.set_field(f, n as i8)?;
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| eyre::eyre!("setter panicked"))??;
    }

    let obj = builder.build()?;
    assert_eq!(obj.get_named("b")?, Value::Byte(0));
    assert_eq!(obj.get_named("s")?, Value::Short(1));
    assert_eq!(obj.get_named("i")?, Value::Int(2));
    assert_eq!(obj.get_named("j")?, Value::Long(3));
}
