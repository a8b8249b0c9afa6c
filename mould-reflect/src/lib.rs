#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod error;
pub use error::*;

mod compat;
pub use compat::*;

mod store;
pub use store::*;

mod builder;
pub use builder::*;

mod strategy;
pub use strategy::*;

#[cfg(feature = "log")]
#[allow(unused_imports)]
pub(crate) use log::trace;

#[cfg(not(feature = "log"))]
/// Forwards to log::trace when the log feature is enabled
macro_rules! trace {
    ($($tt:tt)*) => {};
}
#[cfg(not(feature = "log"))]
pub(crate) use trace;
