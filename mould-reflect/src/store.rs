use indexmap::{IndexMap, IndexSet};
use mould_core::{FieldRef, Value};

/// Pending field assignments of a builder.
///
/// Each field is either assigned a non-null value, explicitly assigned null,
/// or absent. The two recorded states are mutually exclusive. Assignments
/// are replayed in the order they were first recorded: values first, then
/// explicit nulls.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    values: IndexMap<FieldRef, Value>,
    nulls: IndexSet<FieldRef>,
}

impl FieldStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `field`, replacing any earlier record.
    ///
    /// The value must already be of exactly the field's kind.
    pub fn record(&mut self, field: FieldRef, value: Value) {
        if value.is_null() {
            self.values.shift_remove(field);
            self.nulls.insert(field);
        } else {
            self.nulls.shift_remove(field);
            self.values.insert(field, value);
        }
    }

    /// Forgets any record for `field`. Returns true if there was one.
    pub fn unset(&mut self, field: FieldRef) -> bool {
        // both sides must be cleared, so no short-circuit
        let had_value = self.values.shift_remove(field).is_some();
        let had_null = self.nulls.shift_remove(field);
        had_value | had_null
    }

    /// The recorded value for `field`: `Some(Value::Null)` for an explicit
    /// null, `None` if nothing is recorded.
    pub fn get(&self, field: FieldRef) -> Option<Value> {
        if self.nulls.contains(field) {
            return Some(Value::Null);
        }
        self.values.get(field).cloned()
    }

    /// Returns true if anything is recorded for `field`
    pub fn contains(&self, field: FieldRef) -> bool {
        self.values.contains_key(field) || self.nulls.contains(field)
    }

    /// Number of recorded fields
    pub fn len(&self) -> usize {
        self.values.len() + self.nulls.len()
    }

    /// Returns true if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.nulls.is_empty()
    }

    /// Every record in replay order
    pub fn iter(&self) -> impl Iterator<Item = (FieldRef, Value)> + '_ {
        let values = self.values.iter().map(|(f, v)| (*f, v.clone()));
        let nulls = self.nulls.iter().map(|f| (*f, Value::Null));
        values.chain(nulls)
    }
}
