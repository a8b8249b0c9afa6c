//! Field-by-field object construction
//!
//! A [`Builder`] is bound to one class. Callers record field values on it
//! (individually, or by copying them from an existing object), then call
//! [`Builder::build`] to materialize a new instance. How the instance comes
//! to exist, and how fields are reached, is decided by the builder's
//! [`Strategy`]:
//!
//! - [`ConstructingBuilder`] runs one of the class's constructors with bound
//!   arguments, then sets the recorded fields through the normal accessor.
//! - [`AllocatingBuilder`] asks an injected [`Instantiator`] for a zeroed
//!   instance, then sets the recorded fields through the normal accessor.
//! - [`RawOffsetBuilder`] allocates zeroed storage and writes every recorded
//!   value at its field's byte offset, bypassing access control.
//!
//! # Example
//!
//! ```
//! # use mould_core::{Class, Kind, Value};
//! # use mould_reflect::{AllocatingBuilder, BuildError};
//! # use mould_core::ZeroedInstantiator;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let point = Class::builder("DocPoint")
//!     .field("x", Kind::Int)
//!     .field("y", Kind::Long)
//!     .build()?;
//! let x = point.field("x").ok_or("no x")?;
//! let y = point.field("y").ok_or("no y")?;
//!
//! let builder = AllocatingBuilder::new(point, ZeroedInstantiator);
//! builder.set_field(x, 3)?;
//! // ints widen into longs
//! builder.set_field(y, 4)?;
//! // longs never narrow into ints
//! assert!(matches!(
//!     builder.set_field(x, 5i64),
//!     Err(BuildError::TypeMismatch { .. })
//! ));
//!
//! let p = builder.build()?;
//! assert_eq!(p.get(y)?, Value::Long(4));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration and builds
//!
//! Recording is validated immediately: a rejected value leaves the builder
//! exactly as it was. `build` never changes what was recorded, so one
//! builder can produce any number of independent instances. A build steps
//! through the phases named by [`Phase`] without recording them on the
//! builder, and the configuration is snapshotted
//! under the builder's lock before allocation starts, so a build never
//! observes half of a concurrent change.
//!
//! [`Instantiator`]: mould_core::Instantiator

use alloc::vec::Vec;
use core::fmt;

use mould_core::{ClassRef, Field, FieldRef, Object, ObjectRef, Value};
#[cfg(feature = "log")]
use owo_colors::OwoColorize;
use parking_lot::Mutex;

use crate::{BuildError, FieldStore, Slot, Strategy, trace, widen};

#[cfg(test)]
mod tests;

/// What a build is doing.
///
/// Builders do not store a phase. A build logs each phase it enters, and
/// access errors carry the phase they were raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Recording field values and constructor arguments
    Configuring,
    /// Creating the instance
    Allocating,
    /// Writing recorded values into the new instance
    Committing,
    /// The instance has been handed out
    Built,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configuring => f.write_str("configuring"),
            Phase::Allocating => f.write_str("allocating"),
            Phase::Committing => f.write_str("committing"),
            Phase::Built => f.write_str("built"),
        }
    }
}

/// Everything a builder records, behind one lock.
#[derive(Debug)]
pub(crate) struct Session<B> {
    pub(crate) store: FieldStore,
    pub(crate) binding: B,
}

/// Assembles instances of one class from recorded field values.
///
/// See the [module documentation](self) for an overview.
pub struct Builder<S: Strategy> {
    pub(crate) class: ClassRef,
    pub(crate) strategy: S,
    pub(crate) session: Mutex<Session<S::Binding>>,
}

impl<S: Strategy> Builder<S> {
    pub(crate) fn from_parts(class: ClassRef, strategy: S, binding: S::Binding) -> Self {
        trace!("New builder for {}", class);
        Self {
            class,
            strategy,
            session: Mutex::new(Session {
                store: FieldStore::new(),
                binding,
            }),
        }
    }

    /// The class this builder builds
    pub fn class(&self) -> ClassRef {
        self.class
    }

    /// A snapshot of the recorded field values
    pub fn pending_fields(&self) -> FieldStore {
        self.session.lock().store.clone()
    }

    /// The field of the target class that an assignment to `field` lands in.
    fn resolve(&self, field: FieldRef) -> Result<FieldRef, BuildError> {
        if field.is_static() {
            return Err(BuildError::StaticField { field });
        }
        if self.class.has_field(field) {
            return Ok(field);
        }
        if self.strategy.allows_type_punning() {
            if let Some(target) = self.punned(field) {
                trace!("Punning {} onto {}", field.yellow(), target.blue());
                return Ok(target);
            }
        }
        Err(BuildError::ForeignField {
            class: self.class,
            field,
        })
    }

    /// An instance field of the target class that occupies exactly the same
    /// storage as the foreign `field` and can hold the same values.
    fn punned(&self, field: FieldRef) -> Option<FieldRef> {
        let offset = field.offset?;
        let class: ClassRef = self.class;
        class.instance_fields().find(|candidate| {
            candidate.name == field.name
                && candidate.offset == Some(offset)
                && candidate.size() == field.size()
                && candidate.kind.is_layout_compatible(field.kind)
        })
    }

    /// Validates an assignment without recording it.
    fn prepare(&self, field: FieldRef, value: Value) -> Result<(FieldRef, Value), BuildError> {
        let target = self.resolve(field)?;
        self.strategy.check_access(target, Phase::Configuring)?;
        let actual = value.value_type();
        match widen(target.kind, value) {
            Some(value) => Ok((target, value)),
            None => Err(BuildError::TypeMismatch {
                slot: Slot::Field(target),
                expected: target.kind,
                actual,
            }),
        }
    }

    /// Records `value` for `field`. [`Value::Null`] records an explicit
    /// null, which is written to the instance on build like any other value.
    ///
    /// The value is widened to the field's exact kind. Nothing is recorded
    /// if the value is rejected.
    pub fn set_field(&self, field: FieldRef, value: impl Into<Value>) -> Result<(), BuildError> {
        let (target, value) = match self.prepare(field, value.into()) {
            Ok(prepared) => prepared,
            Err(err) => {
                trace!("{} {}: {}", "Rejected".red(), field, err);
                return Err(err);
            }
        };
        trace!("{} {} = {}", "Set".green(), target.yellow(), value);
        self.session.lock().store.record(target, value);
        Ok(())
    }

    /// Forgets any value recorded for `field`. Returns true if there was one.
    pub fn unset_field(&self, field: FieldRef) -> bool {
        let target = self.resolve(field).unwrap_or(field);
        let removed = self.session.lock().store.unset(target);
        trace!("{} {} (was set: {})", "Unset".yellow(), target, removed);
        removed
    }

    /// Records every instance field of `source`, including inherited ones.
    ///
    /// Each field is read under `source`'s monitor. Either every field is
    /// recorded or, if any of them is rejected, none is.
    pub fn clone_fields_from(&self, source: &Object) -> Result<(), BuildError> {
        let class: ClassRef = source.class();
        trace!("Cloning every field of {}", class);
        self.copy_fields(source, class.instance_fields())
    }

    /// Records the fields of `source` that are declared by classes both
    /// `source` and the target class descend from.
    ///
    /// Fields that only exist in the more specific of the two classes are
    /// never copied. Like [`Builder::clone_fields_from`], either every field is
    /// recorded or none is.
    pub fn clone_shared_fields(&self, source: &Object) -> Result<(), BuildError> {
        let target = self.class;
        let class: ClassRef = source.class();
        let mut shared = class
            .ancestors()
            .skip_while(|ancestor| !target.is_subclass_of(ancestor.name()))
            .peekable();

        #[cfg(feature = "log")]
        match shared.peek() {
            Some(common) => trace!("Cloning fields of {} shared through {}", class, common),
            None => trace!("{} and {} share no fields", class, target),
        }

        let fields = shared
            .by_ref()
            .flat_map(|ancestor| ancestor.declared_fields())
            .filter(|field| !field.is_static());
        self.copy_fields(source, fields)
    }

    fn copy_fields(
        &self,
        source: &Object,
        fields: impl Iterator<Item = &'static Field>,
    ) -> Result<(), BuildError> {
        let mut prepared = Vec::new();
        for field in fields {
            let value = self.strategy.read_field(source, field)?;
            prepared.push(self.prepare(field, value)?);
        }

        let mut session = self.session.lock();
        for (field, value) in prepared {
            trace!("{} {} = {}", "Copied".green(), field.yellow(), value);
            session.store.record(field, value);
        }
        Ok(())
    }

    /// Materializes a new instance from the recorded configuration.
    ///
    /// The configuration is left as it was, whether the build succeeds or
    /// not, and each call produces a distinct instance.
    pub fn build(&self) -> Result<ObjectRef, BuildError> {
        let (binding, assignments) = {
            let session = self.session.lock();
            (session.binding.clone(), session.store.clone())
        };

        trace!("{} {}: {}", self.class, "phase".dimmed(), Phase::Allocating);
        let mut draft = self.strategy.allocate(self.class, &binding)?;

        trace!(
            "{} {}: {} ({} fields)",
            self.class,
            "phase".dimmed(),
            Phase::Committing,
            assignments.len()
        );
        for (field, value) in assignments.iter() {
            self.strategy.commit(&mut draft, field, &value)?;
        }

        let built = self.strategy.finish(self.class, draft);
        trace!("{} {}: {}", self.class, "phase".dimmed(), Phase::Built);
        Ok(built)
    }
}

impl<S: Strategy + fmt::Debug> fmt::Debug for Builder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.lock();
        f.debug_struct("Builder")
            .field("class", &self.class.name())
            .field("strategy", &self.strategy)
            .field("pending", &session.store)
            .finish()
    }
}
