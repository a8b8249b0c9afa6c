use alloc::vec;
use alloc::vec::Vec;

use mould_core::{ClassRef, Constructor, FieldRef, Kind, Object, ObjectRef, Value};

use super::checked;
use crate::{BuildError, Builder, Phase, Slot, Strategy, trace, widen};

/// Runs one constructor with bound arguments.
#[derive(Debug)]
pub struct Constructing {
    constructor: &'static Constructor,
}

impl Constructing {
    /// The constructor this strategy runs
    pub fn constructor(&self) -> &'static Constructor {
        self.constructor
    }
}

impl Strategy for Constructing {
    /// One slot per parameter; `None` until bound
    type Binding = Vec<Option<Value>>;
    type Draft = ObjectRef;

    fn check_access(&self, field: FieldRef, phase: Phase) -> Result<(), BuildError> {
        checked::check_access(field, phase)
    }

    fn read_field(&self, source: &Object, field: FieldRef) -> Result<Value, BuildError> {
        checked::read_field(source, field)
    }

    fn allocate(&self, class: ClassRef, binding: &Self::Binding) -> Result<ObjectRef, BuildError> {
        let args: Vec<Value> = self
            .constructor
            .params()
            .iter()
            .zip(binding)
            .map(|(kind, slot)| slot.clone().unwrap_or_else(|| kind.default_value()))
            .collect();
        trace!("Invoking {} with {:?}", self.constructor, args);
        class
            .instantiate(self.constructor, &args)
            .map_err(|cause| BuildError::InstantiationFailure { class, cause })
    }

    fn commit(&self, draft: &mut ObjectRef, field: FieldRef, value: &Value) -> Result<(), BuildError> {
        checked::commit(draft, field, value)
    }

    fn finish(&self, _class: ClassRef, draft: ObjectRef) -> ObjectRef {
        draft
    }
}

/// Builds by running a constructor, then setting recorded fields through the
/// normal accessor.
pub type ConstructingBuilder = Builder<Constructing>;

impl Builder<Constructing> {
    /// Creates a builder that runs `constructor`, which must be declared by
    /// `class` itself.
    pub fn new(class: ClassRef, constructor: &'static Constructor) -> Result<Self, BuildError> {
        if constructor.declaring() != class.name() {
            return Err(BuildError::ForeignConstructor {
                class,
                declaring: constructor.declaring(),
            });
        }
        let slots = vec![None; constructor.arity()];
        Ok(Self::from_parts(class, Constructing { constructor }, slots))
    }

    /// The constructor this builder runs
    pub fn constructor(&self) -> &'static Constructor {
        self.strategy.constructor
    }

    fn param_kind(&self, index: usize) -> Result<Kind, BuildError> {
        let params = self.strategy.constructor.params();
        params
            .get(index)
            .copied()
            .ok_or(BuildError::ParamIndexOutOfBounds {
                index,
                arity: params.len(),
            })
    }

    /// Binds constructor parameter `index`. [`Value::Null`] binds an
    /// explicit null, which differs from leaving the slot unbound only for
    /// primitive parameters, where it is rejected.
    pub fn set_constructor_param(
        &self,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), BuildError> {
        let kind = self.param_kind(index)?;
        let value = value.into();
        let actual = value.value_type();
        let value = widen(kind, value).ok_or(BuildError::TypeMismatch {
            slot: Slot::Param { index },
            expected: kind,
            actual,
        })?;
        trace!("Bound parameter {} of {} to {}", index, self.constructor(), value);
        self.session.lock().binding[index] = Some(value);
        Ok(())
    }

    /// Unbinds constructor parameter `index`, so builds pass the parameter
    /// kind's default. Returns true if it was bound.
    pub fn unset_constructor_param(&self, index: usize) -> bool {
        let mut session = self.session.lock();
        session
            .binding
            .get_mut(index)
            .and_then(Option::take)
            .is_some()
    }
}
