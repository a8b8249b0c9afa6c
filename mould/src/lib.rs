#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

pub use mould_core::*;

#[cfg(feature = "reflect")]
pub use mould_reflect::*;
