use alloc::format;
use core::fmt;

use mould_core::{
    ClassRef, FieldRef, InstantiationError, Instantiator, Object, ObjectRef, Value,
};

use super::checked;
use crate::{BuildError, Builder, Phase, Strategy, trace};

/// Asks an injected [`Instantiator`] for a zeroed instance.
pub struct Allocating<I> {
    instantiator: I,
}

impl<I> Allocating<I> {
    /// The instantiator this strategy allocates with
    pub fn instantiator(&self) -> &I {
        &self.instantiator
    }
}

impl<I> fmt::Debug for Allocating<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocating")
            .field("instantiator", &core::any::type_name::<I>())
            .finish()
    }
}

impl<I: Instantiator> Strategy for Allocating<I> {
    type Binding = ();
    type Draft = ObjectRef;

    fn check_access(&self, field: FieldRef, phase: Phase) -> Result<(), BuildError> {
        checked::check_access(field, phase)
    }

    fn read_field(&self, source: &Object, field: FieldRef) -> Result<Value, BuildError> {
        checked::read_field(source, field)
    }

    fn allocate(&self, class: ClassRef, _binding: &()) -> Result<ObjectRef, BuildError> {
        let instance = self
            .instantiator
            .new_instance(class)
            .map_err(|cause| BuildError::InstantiationFailure { class, cause })?;

        // fields are written by handle, so anything else would be misbuilt
        if instance.class() != class {
            let cause = InstantiationError::Refused {
                class,
                reason: format!("instantiator produced a {}", instance.class().name()),
            };
            return Err(BuildError::InstantiationFailure { class, cause });
        }
        trace!("Allocated {} #{}", class, instance.id());
        Ok(instance)
    }

    fn commit(&self, draft: &mut ObjectRef, field: FieldRef, value: &Value) -> Result<(), BuildError> {
        checked::commit(draft, field, value)
    }

    fn finish(&self, _class: ClassRef, draft: ObjectRef) -> ObjectRef {
        draft
    }
}

/// Builds on a zeroed instance from an injected instantiator, setting
/// recorded fields through the normal accessor. No constructor runs.
pub type AllocatingBuilder<I = mould_core::ZeroedInstantiator> = Builder<Allocating<I>>;

impl<I: Instantiator> Builder<Allocating<I>> {
    /// Creates a builder that allocates instances of `class` with
    /// `instantiator`.
    pub fn new(class: ClassRef, instantiator: I) -> Self {
        Self::from_parts(class, Allocating { instantiator }, ())
    }

    /// The instantiator this builder allocates with
    pub fn instantiator(&self) -> &I {
        self.strategy.instantiator()
    }
}
