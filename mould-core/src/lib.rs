#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

// Declared kinds and runtime values
mod kind;
pub use kind::*;

// Checked byte-offset storage
pub mod raw;
pub use raw::{Primitive, RawAccessError, RawBlock};

// Classes, fields, constructors and layout
mod class;
pub use class::*;

// Live objects and their monitors
mod object;
pub use object::*;

// Constructor-less instantiation
mod instantiate;
pub use instantiate::*;
