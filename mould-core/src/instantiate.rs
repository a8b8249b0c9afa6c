//! Creating instances without running a constructor

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use owo_colors::OwoColorize;

use crate::{ClassRef, Kind, ObjectRef, RawAccessError, ValueType};

/// Produces zero-initialized instances of a class without running any of its
/// constructors.
///
/// Implementations are handed to the code that needs them; there is no global
/// registry.
pub trait Instantiator: Send + Sync {
    /// Creates a new instance of `class` with every field at its default.
    fn new_instance(&self, class: ClassRef) -> Result<ObjectRef, InstantiationError>;
}

/// The host's own allocator: zeroed storage, no constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroedInstantiator;

impl Instantiator for ZeroedInstantiator {
    fn new_instance(&self, class: ClassRef) -> Result<ObjectRef, InstantiationError> {
        class.allocate_zeroed()
    }
}

impl<F> Instantiator for F
where
    F: Fn(ClassRef) -> Result<ObjectRef, InstantiationError> + Send + Sync,
{
    fn new_instance(&self, class: ClassRef) -> Result<ObjectRef, InstantiationError> {
        self(class)
    }
}

/// An instance could not be created.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum InstantiationError {
    /// The constructor body returned an error
    Raised {
        /// Class being constructed
        class: ClassRef,
        /// What the constructor reported
        source: Arc<dyn core::error::Error + Send + Sync>,
    },
    /// The constructor was given the wrong number of arguments
    ArgumentCount {
        /// Class being constructed
        class: ClassRef,
        /// Declared arity
        expected: usize,
        /// Supplied arity
        actual: usize,
    },
    /// An argument is not exactly of its parameter's kind
    IllegalArgument {
        /// Class being constructed
        class: ClassRef,
        /// Parameter position
        index: usize,
        /// Declared parameter kind
        expected: Kind,
        /// What was supplied
        actual: ValueType,
    },
    /// The constructor belongs to another class
    ForeignConstructor {
        /// Class asked to construct
        class: ClassRef,
        /// Class declaring the constructor
        declaring: &'static str,
    },
    /// Storage for the instance could not be allocated
    Storage {
        /// Class being allocated
        class: ClassRef,
        /// Underlying failure
        source: RawAccessError,
    },
    /// An instantiator declined to create the instance
    Refused {
        /// Class requested
        class: ClassRef,
        /// Why
        reason: String,
    },
}

impl InstantiationError {
    /// The class that could not be instantiated
    pub fn class(&self) -> ClassRef {
        match self {
            InstantiationError::Raised { class, .. }
            | InstantiationError::ArgumentCount { class, .. }
            | InstantiationError::IllegalArgument { class, .. }
            | InstantiationError::ForeignConstructor { class, .. }
            | InstantiationError::Storage { class, .. }
            | InstantiationError::Refused { class, .. } => class,
        }
    }
}

impl fmt::Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiationError::Raised { class, source } => {
                write!(f, "Constructor of {} failed: {}", class, source.red())
            }
            InstantiationError::ArgumentCount {
                class,
                expected,
                actual,
            } => write!(
                f,
                "Constructor of {} takes {} arguments, got {}",
                class,
                expected.green(),
                actual.red()
            ),
            InstantiationError::IllegalArgument {
                class,
                index,
                expected,
                actual,
            } => write!(
                f,
                "Argument {} of constructor of {} must be {}, got {}",
                index,
                class,
                expected.green(),
                actual.red()
            ),
            InstantiationError::ForeignConstructor { class, declaring } => write!(
                f,
                "Cannot construct {} with a constructor of {}",
                class,
                declaring.red()
            ),
            InstantiationError::Storage { class, source } => {
                write!(f, "Cannot allocate storage for {class}: {source}")
            }
            InstantiationError::Refused { class, reason } => {
                write!(f, "Instantiator refused {}: {}", class, reason.red())
            }
        }
    }
}

impl core::error::Error for InstantiationError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            InstantiationError::Raised { source, .. } => Some(source.as_ref()),
            InstantiationError::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}
