//! Declared kinds and runtime values

use alloc::sync::Arc;
use core::fmt;

use crate::{ClassRef, ObjectRef};

/// The declared type of a field or a constructor parameter.
///
/// The eight primitive kinds mirror the usual fixed-width primitives; anything
/// else is a reference to an instance of a named class (or of one of its
/// subclasses).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
    /// `true` or `false`, one byte of storage
    Boolean,
    /// Signed 8-bit integer
    Byte,
    /// Signed 16-bit integer
    Short,
    /// Unsigned 16-bit code unit
    Char,
    /// Signed 32-bit integer
    Int,
    /// Signed 64-bit integer
    Long,
    /// 32-bit IEEE 754 float
    Float,
    /// 64-bit IEEE 754 float
    Double,
    /// Reference to an instance of the named class, or null
    Reference(&'static str),
}

impl Kind {
    /// Size in bytes of a slot of this kind inside an instance.
    ///
    /// References are stored as 4-byte handles into the owning object's
    /// reference table.
    pub const fn size(self) -> usize {
        match self {
            Kind::Boolean | Kind::Byte => 1,
            Kind::Short | Kind::Char => 2,
            Kind::Int | Kind::Float | Kind::Reference(_) => 4,
            Kind::Long | Kind::Double => 8,
        }
    }

    /// Returns true if this kind is narrower than a machine word and may share
    /// its containing word with neighbouring fields.
    pub const fn is_sub_word(self) -> bool {
        self.size() < crate::WORD_SIZE
    }

    /// The value a freshly zeroed slot of this kind reads as.
    pub fn default_value(self) -> Value {
        match self {
            Kind::Boolean => Value::Boolean(false),
            Kind::Byte => Value::Byte(0),
            Kind::Short => Value::Short(0),
            Kind::Char => Value::Char(0),
            Kind::Int => Value::Int(0),
            Kind::Long => Value::Long(0),
            Kind::Float => Value::Float(0.0),
            Kind::Double => Value::Double(0.0),
            Kind::Reference(_) => Value::Null,
        }
    }

    /// Whether a slot of this kind can stand in for a slot of `other` when two
    /// layouts are punned onto each other: identical primitives, or any two
    /// references.
    pub fn is_layout_compatible(self, other: Kind) -> bool {
        match (self, other) {
            (Kind::Reference(_), Kind::Reference(_)) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Boolean => f.write_str("boolean"),
            Kind::Byte => f.write_str("byte"),
            Kind::Short => f.write_str("short"),
            Kind::Char => f.write_str("char"),
            Kind::Int => f.write_str("int"),
            Kind::Long => f.write_str("long"),
            Kind::Float => f.write_str("float"),
            Kind::Double => f.write_str("double"),
            Kind::Reference(name) => f.write_str(name),
        }
    }
}

/// A runtime value, as stored in a field or passed to a constructor.
#[derive(Clone)]
pub enum Value {
    /// The null reference
    Null,
    /// A `boolean`
    Boolean(bool),
    /// A `byte`
    Byte(i8),
    /// A `short`
    Short(i16),
    /// A `char` (UTF-16 code unit)
    Char(u16),
    /// An `int`
    Int(i32),
    /// A `long`
    Long(i64),
    /// A `float`
    Float(f32),
    /// A `double`
    Double(f64),
    /// A reference to a live object
    Object(ObjectRef),
}

impl Value {
    /// Describes what this value is, without holding on to it.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Byte(_) => ValueType::Byte,
            Value::Short(_) => ValueType::Short,
            Value::Char(_) => ValueType::Char,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Object(obj) => ValueType::Object(obj.class()),
        }
    }

    /// Returns true for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is exactly of `kind`, with no conversion.
    /// Null is exactly of every reference kind.
    pub fn is_exactly(&self, kind: Kind) -> bool {
        match (kind, self) {
            (Kind::Boolean, Value::Boolean(_))
            | (Kind::Byte, Value::Byte(_))
            | (Kind::Short, Value::Short(_))
            | (Kind::Char, Value::Char(_))
            | (Kind::Int, Value::Int(_))
            | (Kind::Long, Value::Long(_))
            | (Kind::Float, Value::Float(_))
            | (Kind::Double, Value::Double(_))
            | (Kind::Reference(_), Value::Null) => true,
            (Kind::Reference(name), Value::Object(obj)) => obj.class().is_subclass_of(name),
            _ => false,
        }
    }

    /// The integer inside, if this is an `int` or narrower integral value
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Byte(v) => Some(*v as i32),
            Value::Short(v) => Some(*v as i32),
            Value::Char(v) => Some(*v as i32),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer inside, if this is any integral value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            other => other.as_i32().map(i64::from),
        }
    }
}

/// Floats compare by bit pattern and objects by identity, so a value read
/// back from storage always equals the value that was written.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}i8"),
            Value::Short(v) => write!(f, "{v}i16"),
            Value::Char(v) => match char::from_u32(*v as u32) {
                Some(c) => write!(f, "{c:?}"),
                None => write!(f, "'\\u{{{v:04x}}}'"),
            },
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}L"),
            Value::Float(v) => write!(f, "{v}f"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Object(obj) => write!(f, "<{}@{}>", obj.class().name(), obj.id()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl From<Option<ObjectRef>> for Value {
    fn from(v: Option<ObjectRef>) -> Self {
        v.map_or(Value::Null, Value::Object)
    }
}

/// The runtime type of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueType {
    /// The null reference
    Null,
    /// A `boolean`
    Boolean,
    /// A `byte`
    Byte,
    /// A `short`
    Short,
    /// A `char`
    Char,
    /// An `int`
    Int,
    /// A `long`
    Long,
    /// A `float`
    Float,
    /// A `double`
    Double,
    /// An instance of the given class
    Object(ClassRef),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Null => f.write_str("null"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::Byte => f.write_str("byte"),
            ValueType::Short => f.write_str("short"),
            ValueType::Char => f.write_str("char"),
            ValueType::Int => f.write_str("int"),
            ValueType::Long => f.write_str("long"),
            ValueType::Float => f.write_str("float"),
            ValueType::Double => f.write_str("double"),
            ValueType::Object(class) => f.write_str(class.name()),
        }
    }
}
