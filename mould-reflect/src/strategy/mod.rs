//! How a [`Builder`](crate::Builder) reads source fields, allocates the
//! instance, and writes recorded values into it

use mould_core::{ClassRef, FieldRef, Object, ObjectRef, Value};

use crate::{BuildError, Phase};

mod allocating;
pub use allocating::*;

mod codec;
pub use codec::*;

mod constructing;
pub use constructing::*;

mod raw_offset;
pub use raw_offset::*;

/// The pluggable half of a builder.
///
/// A [`Builder`](crate::Builder) owns configuration and validation; its
/// strategy decides how fields are reached and how the instance comes to
/// exist. `build` drives a strategy through `allocate`, one `commit` per
/// recorded field, then `finish`.
pub trait Strategy: Send + Sync {
    /// Per-session state the strategy needs besides the field store
    type Binding: Clone + Send;

    /// An instance that has been allocated but not yet handed out
    type Draft;

    /// Whether fields of unrelated classes may be assigned when the target
    /// has a layout-compatible field at the same position
    fn allows_type_punning(&self) -> bool {
        false
    }

    /// Refuses fields the strategy cannot reach. Called for every assignment
    /// before it is recorded.
    fn check_access(&self, field: FieldRef, phase: Phase) -> Result<(), BuildError>;

    /// Reads `field` of `source` under `source`'s monitor.
    fn read_field(&self, source: &Object, field: FieldRef) -> Result<Value, BuildError>;

    /// Creates the instance that recorded values will be written into.
    fn allocate(&self, class: ClassRef, binding: &Self::Binding) -> Result<Self::Draft, BuildError>;

    /// Writes one recorded value. `value` is exactly of `field`'s kind.
    fn commit(
        &self,
        draft: &mut Self::Draft,
        field: FieldRef,
        value: &Value,
    ) -> Result<(), BuildError>;

    /// Turns a fully committed draft into the built object.
    fn finish(&self, class: ClassRef, draft: Self::Draft) -> ObjectRef;
}

/// Access checks shared by the strategies that go through the normal field
/// accessor.
pub(crate) mod checked {
    use super::*;

    pub(crate) fn check_access(field: FieldRef, phase: Phase) -> Result<(), BuildError> {
        if field.is_restricted() {
            return Err(BuildError::AccessDenied { field, phase });
        }
        Ok(())
    }

    pub(crate) fn read_field(source: &Object, field: FieldRef) -> Result<Value, BuildError> {
        source
            .get(field)
            .map_err(|err| BuildError::from_access(field, Phase::Configuring, err))
    }

    pub(crate) fn commit(draft: &ObjectRef, field: FieldRef, value: &Value) -> Result<(), BuildError> {
        draft
            .set(field, value.clone())
            .map_err(|err| BuildError::from_access(field, Phase::Committing, err))
    }
}
