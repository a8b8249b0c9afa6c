//! Objects and their storage
//!
//! An [`Object`] pairs its runtime class with a [`Storage`]: a [`RawBlock`]
//! laid out by the class, plus a table of the objects its reference slots
//! point to. Reference slots only ever hold a 4-byte handle into that table,
//! so copying a reference never copies the referenced object.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use owo_colors::OwoColorize;
use parking_lot::{Mutex, MutexGuard};

use crate::{ClassRef, Field, FieldRef, Kind, RawAccessError, RawBlock, Value, ValueType};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a live object. Equality of references is identity.
pub type ObjectRef = Arc<Object>;

/// A live instance of a class.
pub struct Object {
    id: u64,
    class: ClassRef,
    /// The object's monitor: every access to its storage goes through it
    storage: Mutex<Storage>,
}

impl Object {
    /// Wraps storage laid out for `class` into a new object
    pub fn from_storage(class: ClassRef, storage: Storage) -> ObjectRef {
        debug_assert_eq!(storage.block().len(), class.instance_size());
        Arc::new(Self {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            class,
            storage: Mutex::new(storage),
        })
    }

    /// Identity of this object, unique for the lifetime of the process
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The runtime class
    pub fn class(&self) -> ClassRef {
        self.class
    }

    /// Enters this object's monitor.
    ///
    /// Holding the guard excludes every other reader and writer of the
    /// object's fields.
    pub fn lock(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock()
    }

    fn check_access(&self, field: FieldRef) -> Result<(), FieldAccessError> {
        if field.is_static() {
            return Err(FieldAccessError::Static { field });
        }
        if !self.class.has_field(field) {
            return Err(FieldAccessError::NotAMember {
                class: self.class,
                field,
            });
        }
        if field.is_restricted() {
            return Err(FieldAccessError::Denied { field });
        }
        Ok(())
    }

    /// Reads `field` with normal accessor semantics: the field must belong to
    /// this object's class hierarchy and must not be restricted.
    pub fn get(&self, field: FieldRef) -> Result<Value, FieldAccessError> {
        self.check_access(field)?;
        self.lock().read(field)
    }

    /// Writes `field` with normal accessor semantics. The value must be of
    /// exactly the field's kind; no conversion is applied.
    pub fn set(&self, field: FieldRef, value: Value) -> Result<(), FieldAccessError> {
        self.check_access(field)?;
        if !value.is_exactly(field.kind) {
            return Err(FieldAccessError::IllegalArgument {
                field,
                actual: value.value_type(),
            });
        }
        self.lock().write(field, &value)
    }

    /// Reads the field named `name`, searched from the runtime class upward
    pub fn get_named(&self, name: &str) -> Result<Value, FieldAccessError> {
        match self.class.find_field(name) {
            Some(field) => self.get(field),
            None => Err(FieldAccessError::NoSuchField {
                class: self.class,
                name: String::from(name),
            }),
        }
    }

    /// Writes the field named `name`, searched from the runtime class upward
    pub fn set_named(&self, name: &str, value: impl Into<Value>) -> Result<(), FieldAccessError> {
        match self.class.find_field(name) {
            Some(field) => self.set(field, value.into()),
            None => Err(FieldAccessError::NoSuchField {
                class: self.class,
                name: String::from(name),
            }),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {{", self.class, self.id)?;
        let storage = self.lock();
        for (i, field) in self.class.instance_fields().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match storage.read(field) {
                Ok(value) => write!(f, " {}: {}", field.name.yellow(), value)?,
                Err(_) => write!(f, " {}: {}", field.name.yellow(), "<unreadable>".red())?,
            }
        }
        write!(f, " }}")
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The memory behind one object.
#[derive(Debug)]
pub struct Storage {
    block: RawBlock,
    refs: RefTable,
}

impl Storage {
    /// Zeroed storage of `len` bytes with an empty reference table
    pub fn zeroed(len: usize) -> Result<Self, RawAccessError> {
        Ok(Self {
            block: RawBlock::zeroed(len)?,
            refs: RefTable::default(),
        })
    }

    /// The raw bytes
    pub fn block(&self) -> &RawBlock {
        &self.block
    }

    /// The raw bytes, mutably
    pub fn block_mut(&mut self) -> &mut RawBlock {
        &mut self.block
    }

    /// Loads a value of `kind` from `offset` using a native access of the
    /// kind's own width.
    pub fn load(&self, kind: Kind, offset: usize) -> Result<Value, RawAccessError> {
        let b = &self.block;
        Ok(match kind {
            Kind::Boolean => Value::Boolean(b.load::<u8>(offset)? != 0),
            Kind::Byte => Value::Byte(b.load::<i8>(offset)?),
            Kind::Short => Value::Short(b.load::<i16>(offset)?),
            Kind::Char => Value::Char(b.load::<u16>(offset)?),
            Kind::Int => Value::Int(b.load::<i32>(offset)?),
            Kind::Long => Value::Long(b.load::<i64>(offset)?),
            Kind::Float => Value::Float(b.load::<f32>(offset)?),
            Kind::Double => Value::Double(b.load::<f64>(offset)?),
            Kind::Reference(_) => self.load_reference(offset)?.into(),
        })
    }

    /// Stores `value` at `offset` using a native access of `kind`'s width.
    ///
    /// `value` must be exactly of `kind`.
    pub fn store(&mut self, kind: Kind, offset: usize, value: &Value) -> Result<(), RawAccessError> {
        match (kind, value) {
            (Kind::Boolean, Value::Boolean(v)) => self.block.store::<u8>(offset, *v as u8),
            (Kind::Byte, Value::Byte(v)) => self.block.store::<i8>(offset, *v),
            (Kind::Short, Value::Short(v)) => self.block.store::<i16>(offset, *v),
            (Kind::Char, Value::Char(v)) => self.block.store::<u16>(offset, *v),
            (Kind::Int, Value::Int(v)) => self.block.store::<i32>(offset, *v),
            (Kind::Long, Value::Long(v)) => self.block.store::<i64>(offset, *v),
            (Kind::Float, Value::Float(v)) => self.block.store::<f32>(offset, *v),
            (Kind::Double, Value::Double(v)) => self.block.store::<f64>(offset, *v),
            (Kind::Reference(_), Value::Null) => self.store_reference(offset, None),
            (Kind::Reference(_), Value::Object(obj)) => {
                self.store_reference(offset, Some(obj.clone()))
            }
            (kind, value) => Err(RawAccessError::KindMismatch {
                expected: kind,
                actual: value.value_type(),
            }),
        }
    }

    /// Loads the reference whose handle sits at `offset`
    pub fn load_reference(&self, offset: usize) -> Result<Option<ObjectRef>, RawAccessError> {
        let handle = self.block.load::<u32>(offset)?;
        self.refs.get(handle)
    }

    /// Points the reference slot at `offset` to `target` (or to null)
    pub fn store_reference(
        &mut self,
        offset: usize,
        target: Option<ObjectRef>,
    ) -> Result<(), RawAccessError> {
        let current = self.block.load::<u32>(offset)?;
        let handle = self.refs.put(current, target)?;
        self.block.store::<u32>(offset, handle)
    }

    /// Reads an instance field at its declared offset
    pub fn read(&self, field: &'static Field) -> Result<Value, FieldAccessError> {
        let offset = field.offset.ok_or(FieldAccessError::Static { field })?;
        Ok(self.load(field.kind, offset)?)
    }

    /// Writes an instance field at its declared offset
    pub fn write(&mut self, field: &'static Field, value: &Value) -> Result<(), FieldAccessError> {
        let offset = field.offset.ok_or(FieldAccessError::Static { field })?;
        Ok(self.store(field.kind, offset, value)?)
    }
}

/// Objects referenced from one instance's reference slots. Handle `0` is
/// null; handle `n` is entry `n - 1`.
#[derive(Debug, Default)]
struct RefTable {
    entries: Vec<Option<ObjectRef>>,
}

impl RefTable {
    fn get(&self, handle: u32) -> Result<Option<ObjectRef>, RawAccessError> {
        if handle == 0 {
            return Ok(None);
        }
        match self.entries.get(handle as usize - 1) {
            Some(Some(obj)) => Ok(Some(obj.clone())),
            _ => Err(RawAccessError::DanglingHandle { handle }),
        }
    }

    /// Replaces whatever the slot holding `current` pointed to, returning the
    /// handle the slot must now hold.
    fn put(&mut self, current: u32, target: Option<ObjectRef>) -> Result<u32, RawAccessError> {
        let live = current != 0 && (current as usize) <= self.entries.len();
        match (live, target) {
            (false, None) => Ok(0),
            (true, None) => {
                self.entries[current as usize - 1] = None;
                Ok(0)
            }
            (true, Some(obj)) => {
                self.entries[current as usize - 1] = Some(obj);
                Ok(current)
            }
            (false, Some(obj)) => {
                let index = match self.entries.iter().position(Option::is_none) {
                    Some(free) => {
                        self.entries[free] = Some(obj);
                        free
                    }
                    None => {
                        self.entries.push(Some(obj));
                        self.entries.len() - 1
                    }
                };
                u32::try_from(index + 1).map_err(|_| RawAccessError::HandlesExhausted)
            }
        }
    }
}

/// A field could not be read or written through the normal accessor.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldAccessError {
    /// The host refuses reflective access to the field
    Denied {
        /// The field
        field: FieldRef,
    },
    /// The field is not declared anywhere in the object's class hierarchy
    NotAMember {
        /// Class of the object
        class: ClassRef,
        /// The field
        field: FieldRef,
    },
    /// Static fields are not part of an instance
    Static {
        /// The field
        field: FieldRef,
    },
    /// The value is not exactly of the field's kind
    IllegalArgument {
        /// The field
        field: FieldRef,
        /// What was supplied instead
        actual: ValueType,
    },
    /// No field of that name exists in the class hierarchy
    NoSuchField {
        /// Class searched
        class: ClassRef,
        /// Requested name
        name: String,
    },
    /// The underlying storage access failed
    Raw(RawAccessError),
}

impl From<RawAccessError> for FieldAccessError {
    fn from(err: RawAccessError) -> Self {
        FieldAccessError::Raw(err)
    }
}

impl fmt::Display for FieldAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAccessError::Denied { field } => {
                write!(f, "Access to field {} is denied", field.red())
            }
            FieldAccessError::NotAMember { class, field } => {
                write!(f, "Class {} has no field {}", class, field.red())
            }
            FieldAccessError::Static { field } => {
                write!(f, "Field {} is static", field.yellow())
            }
            FieldAccessError::IllegalArgument { field, actual } => write!(
                f,
                "Field {} of type {} cannot hold a {}",
                field.yellow(),
                field.kind.green(),
                actual.red()
            ),
            FieldAccessError::NoSuchField { class, name } => {
                write!(f, "Class {} has no field named {}", class, name.red())
            }
            FieldAccessError::Raw(err) => write!(f, "Raw storage access failed: {err}"),
        }
    }
}

impl core::error::Error for FieldAccessError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            FieldAccessError::Raw(err) => Some(err),
            _ => None,
        }
    }
}
