//! Raw instance storage
//!
//! A [`RawBlock`] is a zero-initialized, 8-byte aligned heap allocation that is
//! addressed by byte offset. Every load and store is bounds- and
//! alignment-checked, so the rest of the workspace can treat instance memory as
//! an arena of typed slots without touching a raw pointer.
//!
//! This is the only module in the workspace that contains `unsafe` code.

use alloc::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use core::fmt;
use core::ptr::NonNull;

use crate::{Kind, ValueType};

/// Alignment of every block; large enough for the widest primitive.
pub const BLOCK_ALIGN: usize = 8;

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width primitives that can be loaded from and stored into a
/// [`RawBlock`]. Sealed: the set of widths is part of the storage contract.
pub trait Primitive: Copy + sealed::Sealed {
    /// Size (and required alignment) in bytes
    const SIZE: usize;
}

macro_rules! impl_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl Primitive for $t {
                const SIZE: usize = core::mem::size_of::<$t>();
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// A zero-initialized block of instance memory.
pub struct RawBlock {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: a RawBlock exclusively owns its allocation; shared access only ever
// reads, and mutation requires `&mut self`.
unsafe impl Send for RawBlock {}
// SAFETY: see above, `&RawBlock` only permits reads.
unsafe impl Sync for RawBlock {}

impl RawBlock {
    /// Allocates `len` zeroed bytes.
    pub fn zeroed(len: usize) -> Result<Self, RawAccessError> {
        if len == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len: 0,
            });
        }

        let layout = Self::layout_for(len)?;
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok(Self { ptr, len }),
            None => handle_alloc_error(layout),
        }
    }

    fn layout_for(len: usize) -> Result<Layout, RawAccessError> {
        Layout::from_size_align(len, BLOCK_ALIGN).map_err(|_| RawAccessError::TooLarge { len })
    }

    /// Number of addressable bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the block has no addressable bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole block as bytes
    pub fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: ptr is valid for `len` initialized (zeroed or written) bytes
        // for as long as `self` is borrowed.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn check<P: Primitive>(&self, offset: usize) -> Result<(), RawAccessError> {
        let end = offset
            .checked_add(P::SIZE)
            .ok_or(RawAccessError::OutOfBounds {
                offset,
                size: P::SIZE,
                len: self.len,
            })?;
        if end > self.len {
            return Err(RawAccessError::OutOfBounds {
                offset,
                size: P::SIZE,
                len: self.len,
            });
        }
        if offset % P::SIZE != 0 {
            return Err(RawAccessError::Misaligned {
                offset,
                align: P::SIZE,
            });
        }
        Ok(())
    }

    /// Loads a `P` from `offset`.
    pub fn load<P: Primitive>(&self, offset: usize) -> Result<P, RawAccessError> {
        self.check::<P>(offset)?;
        // SAFETY: `check` guarantees `offset..offset + size_of::<P>()` lies
        // inside the allocation and that the address is aligned for `P` (the
        // block itself is `BLOCK_ALIGN`-aligned). Every bit pattern is a valid
        // `P` for the sealed set of primitives.
        Ok(unsafe { self.ptr.as_ptr().add(offset).cast::<P>().read() })
    }

    /// Stores `value` at `offset`.
    pub fn store<P: Primitive>(&mut self, offset: usize, value: P) -> Result<(), RawAccessError> {
        self.check::<P>(offset)?;
        // SAFETY: same bounds and alignment argument as `load`; `&mut self`
        // guarantees nobody else is reading the block.
        unsafe { self.ptr.as_ptr().add(offset).cast::<P>().write(value) };
        Ok(())
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        if let Ok(layout) = Self::layout_for(self.len) {
            // SAFETY: ptr was returned by `alloc_zeroed` with this exact layout.
            unsafe { dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

impl fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("len", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// A raw load or store could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RawAccessError {
    /// The access would touch bytes past the end of the block
    OutOfBounds {
        /// Byte offset of the access
        offset: usize,
        /// Width of the access
        size: usize,
        /// Length of the block
        len: usize,
    },
    /// The offset is not a multiple of the access width
    Misaligned {
        /// Byte offset of the access
        offset: usize,
        /// Required alignment
        align: usize,
    },
    /// The requested block cannot be described by a `Layout`
    TooLarge {
        /// Requested length
        len: usize,
    },
    /// A reference slot holds a handle with no entry in the reference table
    DanglingHandle {
        /// The handle read from the slot
        handle: u32,
    },
    /// The reference table cannot hand out more handles
    HandlesExhausted,
    /// A typed store was handed a value of another kind
    KindMismatch {
        /// Kind of the slot
        expected: Kind,
        /// What was supplied
        actual: ValueType,
    },
}

impl fmt::Display for RawAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAccessError::OutOfBounds { offset, size, len } => write!(
                f,
                "{size}-byte access at offset {offset} is out of bounds for a {len}-byte block"
            ),
            RawAccessError::Misaligned { offset, align } => {
                write!(f, "offset {offset} is not aligned to {align} bytes")
            }
            RawAccessError::TooLarge { len } => write!(f, "cannot allocate a {len}-byte block"),
            RawAccessError::DanglingHandle { handle } => {
                write!(f, "reference slot holds unknown handle {handle}")
            }
            RawAccessError::HandlesExhausted => write!(f, "reference table is full"),
            RawAccessError::KindMismatch { expected, actual } => {
                write!(f, "cannot store a {actual} into a {expected} slot")
            }
        }
    }
}

impl core::error::Error for RawAccessError {}
