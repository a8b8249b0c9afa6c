use core::fmt;

use mould_core::{
    ClassRef, FieldAccessError, FieldRef, InstantiationError, Kind, RawAccessError, ValueType,
};
use owo_colors::OwoColorize;

use crate::Phase;

/// Where a rejected value was headed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A field of the class being built
    Field(FieldRef),
    /// A constructor parameter
    Param {
        /// Position of the parameter
        index: usize,
    },
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Field(field) => write!(f, "field {}", field.yellow()),
            Slot::Param { index } => write!(f, "parameter {}", index.yellow()),
        }
    }
}

/// The four kinds of failure a builder reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A value does not fit its declared type, or a field does not belong to
    /// the class being built. Raised at the point of assignment; nothing is
    /// recorded.
    TypeMismatch,
    /// The host refused access to a field.
    AccessDenied,
    /// Allocation or construction of the instance failed.
    InstantiationFailure,
    /// The builder was used incorrectly, regardless of the data involved.
    UsageError,
}

/// Errors raised while configuring or building an object.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum BuildError {
    /// A value is not assignable to the declared type of its slot
    TypeMismatch {
        /// Where the value was headed
        slot: Slot,
        /// Declared type of the slot
        expected: Kind,
        /// Type of the rejected value
        actual: ValueType,
    },

    /// The field is declared outside the class hierarchy being built, and no
    /// layout-compatible field can stand in for it
    ForeignField {
        /// Class being built
        class: ClassRef,
        /// The foreign field
        field: FieldRef,
    },

    /// The host denies reflective access to the field
    AccessDenied {
        /// The restricted field
        field: FieldRef,
        /// What the builder was doing when access was refused
        phase: Phase,
    },

    /// The host rejected a field access for a reason of its own
    AccessRejected {
        /// The field
        field: FieldRef,
        /// What the host reported
        source: FieldAccessError,
    },

    /// The instance could not be allocated or its constructor failed
    InstantiationFailure {
        /// Class being built
        class: ClassRef,
        /// The underlying failure
        cause: InstantiationError,
    },

    /// A raw read or write of instance storage failed
    RawAccess {
        /// Field being read or written
        field: FieldRef,
        /// The underlying failure
        source: RawAccessError,
    },

    /// A constructor parameter index past the end of the parameter list
    ParamIndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of parameters the constructor declares
        arity: usize,
    },

    /// The constructor is not declared by the class being built
    ForeignConstructor {
        /// Class being built
        class: ClassRef,
        /// Class that declares the constructor
        declaring: &'static str,
    },

    /// Static fields are not part of an instance
    StaticField {
        /// The static field
        field: FieldRef,
    },
}

impl BuildError {
    /// Which of the four failure kinds this is
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::TypeMismatch { .. } | BuildError::ForeignField { .. } => {
                ErrorCategory::TypeMismatch
            }
            BuildError::AccessDenied { .. } | BuildError::AccessRejected { .. } => {
                ErrorCategory::AccessDenied
            }
            BuildError::InstantiationFailure { .. } | BuildError::RawAccess { .. } => {
                ErrorCategory::InstantiationFailure
            }
            BuildError::ParamIndexOutOfBounds { .. }
            | BuildError::ForeignConstructor { .. }
            | BuildError::StaticField { .. } => ErrorCategory::UsageError,
        }
    }

    /// Maps a refusal of the normal field accessor onto a build error.
    pub(crate) fn from_access(field: FieldRef, phase: Phase, err: FieldAccessError) -> Self {
        match err {
            FieldAccessError::Denied { field } => BuildError::AccessDenied { field, phase },
            FieldAccessError::NotAMember { class, field } => {
                BuildError::ForeignField { class, field }
            }
            FieldAccessError::Static { field } => BuildError::StaticField { field },
            FieldAccessError::IllegalArgument { field, actual } => BuildError::TypeMismatch {
                slot: Slot::Field(field),
                expected: field.kind,
                actual,
            },
            FieldAccessError::Raw(source) => BuildError::RawAccess { field, source },
            source => BuildError::AccessRejected { field, source },
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TypeMismatch {
                slot,
                expected,
                actual,
            } => write!(
                f,
                "Cannot assign a {} to {} of type {}",
                actual.red(),
                slot,
                expected.green()
            ),
            BuildError::ForeignField { class, field } => write!(
                f,
                "Class {} has no field {} and no compatible field at its position",
                class,
                field.red()
            ),
            BuildError::AccessDenied { field, phase } => write!(
                f,
                "Access to field {} denied while {}",
                field.red(),
                phase.yellow()
            ),
            BuildError::AccessRejected { field, source } => {
                write!(f, "Access to field {} rejected: {}", field.red(), source)
            }
            BuildError::InstantiationFailure { class, cause } => {
                write!(f, "Failed to instantiate {class}: {cause}")
            }
            BuildError::RawAccess { field, source } => {
                write!(f, "Raw access to field {} failed: {}", field.yellow(), source)
            }
            BuildError::ParamIndexOutOfBounds { index, arity } => write!(
                f,
                "Parameter index {} out of bounds for a constructor of {} parameters",
                index.red(),
                arity.yellow()
            ),
            BuildError::ForeignConstructor { class, declaring } => write!(
                f,
                "Constructor of {} cannot build {}",
                declaring.red(),
                class
            ),
            BuildError::StaticField { field } => write!(
                f,
                "Field {} is static and not part of an instance",
                field.red()
            ),
        }
    }
}

impl core::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            BuildError::AccessRejected { source, .. } => Some(source),
            BuildError::InstantiationFailure { cause, .. } => Some(cause),
            BuildError::RawAccess { source, .. } => Some(source),
            _ => None,
        }
    }
}
