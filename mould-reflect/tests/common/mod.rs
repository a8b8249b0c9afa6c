#![allow(dead_code)]

use mould_core::{Class, ClassRef, FieldFlags, FieldRef, Kind};

pub fn field(class: ClassRef, name: &str) -> eyre::Result<FieldRef> {
    class
        .find_field(name)
        .ok_or_else(|| eyre::eyre!("{} has no field {name}", class.name()))
}

/// `Vehicle { wheels: int, name: Vehicle, electric: boolean }` with a
/// `Car extends Vehicle { doors: byte, vin: long (restricted) }` and an
/// unrelated `Boat { wheels: int }`.
pub struct Garage {
    pub vehicle: ClassRef,
    pub car: ClassRef,
    pub boat: ClassRef,
}

impl Garage {
    pub fn new() -> eyre::Result<Self> {
        let vehicle = Class::builder("Vehicle")
            .field("wheels", Kind::Int)
            .field("name", Kind::Reference("Vehicle"))
            .field("electric", Kind::Boolean)
            .static_field("BUILT", Kind::Long)
            .build()?;
        let car = Class::builder("Car")
            .extends(vehicle)
            .field("doors", Kind::Byte)
            .field_with_flags("vin", Kind::Long, FieldFlags::RESTRICTED)
            .build()?;
        let boat = Class::builder("Boat").field("wheels", Kind::Int).build()?;
        Ok(Self { vehicle, car, boat })
    }
}

/// One field of every kind.
pub fn every_kind(name: &'static str) -> eyre::Result<ClassRef> {
    Ok(Class::builder(name)
        .field("z", Kind::Boolean)
        .field("b", Kind::Byte)
        .field("s", Kind::Short)
        .field("c", Kind::Char)
        .field("i", Kind::Int)
        .field("j", Kind::Long)
        .field("f", Kind::Float)
        .field("d", Kind::Double)
        .field("r", Kind::Reference(mould_core::OBJECT))
        .build()?)
}
