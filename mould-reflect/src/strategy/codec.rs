use core::fmt;

use mould_core::{Kind, PackedSlot, RawAccessError, Storage, Value};

/// Reads and writes field values directly in instance storage, bypassing
/// access control.
pub trait FieldCodec: Send + Sync + fmt::Debug {
    /// Reads the `kind` slot at byte `offset`.
    fn read(&self, storage: &Storage, kind: Kind, offset: usize) -> Result<Value, RawAccessError>;

    /// Writes `value`, which must be exactly of `kind`, to the slot at byte
    /// `offset`. Neighbouring slots are left untouched.
    fn write(
        &self,
        storage: &mut Storage,
        kind: Kind,
        offset: usize,
        value: &Value,
    ) -> Result<(), RawAccessError>;
}

/// One native store or load of each kind's own width.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCodec;

impl FieldCodec for DirectCodec {
    fn read(&self, storage: &Storage, kind: Kind, offset: usize) -> Result<Value, RawAccessError> {
        storage.load(kind, offset)
    }

    fn write(
        &self,
        storage: &mut Storage,
        kind: Kind,
        offset: usize,
        value: &Value,
    ) -> Result<(), RawAccessError> {
        storage.store(kind, offset, value)
    }
}

/// Word-or-larger accesses only.
///
/// Sub-word fields are reached through their containing 4-byte word with a
/// masked read-modify-write, and floating-point fields through their raw bit
/// patterns.
///
/// The read-modify-write is not atomic: two writers updating different
/// sub-word fields of the same word at the same time can lose one of the
/// updates. Builders only ever write into storage they exclusively own.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedCodec;

impl PackedCodec {
    fn mismatch(kind: Kind, value: &Value) -> RawAccessError {
        RawAccessError::KindMismatch {
            expected: kind,
            actual: value.value_type(),
        }
    }

    /// The `kind` slot at `offset`, shifted down out of its containing word.
    fn load_bits(storage: &Storage, kind: Kind, offset: usize) -> Result<u32, RawAccessError> {
        let slot = PackedSlot::within_word(kind.size(), offset);
        let word = storage.block().load::<u32>(slot.word_offset)?;
        Ok((word & slot.mask()) >> slot.shift)
    }

    /// Replaces the `kind` slot at `offset` inside its containing word.
    fn store_bits(
        storage: &mut Storage,
        kind: Kind,
        offset: usize,
        bits: u32,
    ) -> Result<(), RawAccessError> {
        let slot = PackedSlot::within_word(kind.size(), offset);
        let block = storage.block_mut();
        let mask = slot.mask();
        let old = block.load::<u32>(slot.word_offset)?;
        let new = (old & !mask) | ((bits << slot.shift) & mask);
        block.store::<u32>(slot.word_offset, new)
    }
}

impl FieldCodec for PackedCodec {
    fn read(&self, storage: &Storage, kind: Kind, offset: usize) -> Result<Value, RawAccessError> {
        let bits = || Self::load_bits(storage, kind, offset);
        let block = storage.block();
        match kind {
            Kind::Boolean => Ok(Value::Boolean(bits()? != 0)),
            Kind::Byte => Ok(Value::Byte(bits()? as u8 as i8)),
            Kind::Short => Ok(Value::Short(bits()? as u16 as i16)),
            Kind::Char => Ok(Value::Char(bits()? as u16)),
            Kind::Float => Ok(Value::Float(f32::from_bits(block.load(offset)?))),
            Kind::Double => Ok(Value::Double(f64::from_bits(block.load(offset)?))),
            Kind::Int | Kind::Long | Kind::Reference(_) => storage.load(kind, offset),
        }
    }

    fn write(
        &self,
        storage: &mut Storage,
        kind: Kind,
        offset: usize,
        value: &Value,
    ) -> Result<(), RawAccessError> {
        match (kind, value) {
            (Kind::Boolean, Value::Boolean(v)) => {
                Self::store_bits(storage, kind, offset, u32::from(*v))
            }
            (Kind::Byte, Value::Byte(v)) => Self::store_bits(storage, kind, offset, *v as u8 as u32),
            (Kind::Short, Value::Short(v)) => {
                Self::store_bits(storage, kind, offset, *v as u16 as u32)
            }
            (Kind::Char, Value::Char(v)) => Self::store_bits(storage, kind, offset, u32::from(*v)),
            (Kind::Float, Value::Float(v)) => storage.block_mut().store::<u32>(offset, v.to_bits()),
            (Kind::Double, Value::Double(v)) => {
                storage.block_mut().store::<u64>(offset, v.to_bits())
            }
            (Kind::Int | Kind::Long | Kind::Reference(_), _) => storage.store(kind, offset, value),
            _ => Err(Self::mismatch(kind, value)),
        }
    }
}
