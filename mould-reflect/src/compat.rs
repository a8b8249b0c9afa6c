//! Assignment compatibility between declared kinds and runtime values

use mould_core::{Kind, Value};

/// Returns true if `value` may be assigned to a slot declared as `kind`.
///
/// Follows the rules of ordinary assignment: primitive slots accept their own
/// kind and any narrower kind that widens into them without loss, reference
/// slots accept null or an instance of the declared class or a subclass.
/// Booleans and floats never widen, and nothing is ever narrowed.
pub fn is_assignable(kind: Kind, value: &Value) -> bool {
    use Value as V;

    match (kind, value) {
        (Kind::Reference(_), V::Null) => true,
        (_, V::Null) => false,
        (Kind::Reference(name), V::Object(obj)) => obj.class().is_subclass_of(name),

        (Kind::Boolean, V::Boolean(_)) => true,
        (Kind::Byte, V::Byte(_)) => true,
        (Kind::Short, V::Byte(_) | V::Short(_)) => true,
        (Kind::Char, V::Byte(_) | V::Char(_)) => true,
        (Kind::Int, V::Byte(_) | V::Short(_) | V::Char(_) | V::Int(_)) => true,
        (Kind::Long, V::Byte(_) | V::Short(_) | V::Char(_) | V::Int(_) | V::Long(_)) => true,
        (Kind::Float, V::Float(_)) => true,
        (Kind::Double, V::Float(_) | V::Double(_)) => true,

        _ => false,
    }
}

/// Converts an assignable value into a value of exactly `kind`.
///
/// Returns `None` when `value` is not assignable to `kind`. Bytes and shorts
/// are sign-extended, chars are zero-extended, and a byte assigned to a char
/// keeps its two's-complement bit pattern (`-1` becomes `'\u{ffff}'`).
pub fn widen(kind: Kind, value: Value) -> Option<Value> {
    if !is_assignable(kind, &value) {
        return None;
    }

    Some(match (kind, value) {
        (Kind::Short, Value::Byte(v)) => Value::Short(v.into()),
        (Kind::Char, Value::Byte(v)) => Value::Char(v as i16 as u16),
        (Kind::Int, v @ (Value::Byte(_) | Value::Short(_) | Value::Char(_))) => {
            Value::Int(v.as_i32()?)
        }
        (Kind::Long, v @ (Value::Byte(_) | Value::Short(_) | Value::Char(_) | Value::Int(_))) => {
            Value::Long(v.as_i64()?)
        }
        (Kind::Double, Value::Float(v)) => Value::Double(v.into()),
        (_, v) => v,
    })
}
