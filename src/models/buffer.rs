//! Shared-ownership byte regions.
//!
//! A [`SharedBytes`] is a window `[offset, offset + len)` into an owner that
//! dereferences to bytes: a `Vec64<u8>` produced by the encoder, a file read
//! into memory, or a memory map. Slicing is O(1) and keeps the owner alive, so
//! every decoded column view can outlive the decoder but never the buffer.
//!
//! Owned bytes always start on a 64-byte boundary. File offsets are aligned
//! relative to the first byte, so an aligned base is what makes them aligned
//! in memory as well.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use minarrow::Vec64;

use crate::constants::SIMD_ALIGN;

/// Owner of the underlying bytes.
pub type ByteOwner = Arc<dyn AsRef<[u8]> + Send + Sync>;

#[derive(Clone)]
pub struct SharedBytes {
    owner: ByteOwner,
    offset: usize,
    len: usize,
}

impl SharedBytes {
    /// Wrap any byte owner, viewing all of it.
    pub fn from_owner<T>(owner: T) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(owner))
    }

    /// Wrap an already shared owner, viewing all of it.
    pub fn from_arc(owner: ByteOwner) -> Self {
        let len = (*owner).as_ref().len();
        Self {
            owner,
            offset: 0,
            len,
        }
    }

    /// Copy `bytes` into a fresh 64-byte aligned owner.
    pub fn copy_aligned(bytes: &[u8]) -> Self {
        Self::from_owner(Vec64::from_slice(bytes))
    }

    /// Empty region with its own (empty) owner.
    pub fn empty() -> Self {
        Self::from_owner(Vec64::<u8>::new())
    }

    /// True when the first byte sits on a 64-byte boundary.
    #[inline]
    pub fn is_simd_aligned(&self) -> bool {
        self.as_slice().as_ptr() as usize % SIMD_ALIGN == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &(*self.owner).as_ref()[self.offset..self.offset + self.len]
    }

    /// Sub-window relative to this one. `None` when out of range.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        if range.start > range.end || range.end > self.len {
            return None;
        }
        Some(Self {
            owner: self.owner.clone(),
            offset: self.offset + range.start,
            len: range.end - range.start,
        })
    }

    /// True when both regions are backed by the same owner allocation.
    pub fn shares_owner(&self, other: &SharedBytes) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner)
    }

    /// True when this region's bytes lie inside `outer`'s address range.
    pub fn is_within(&self, outer: &[u8]) -> bool {
        let start = outer.as_ptr() as usize;
        let end = start + outer.len();
        let ptr = self.as_slice().as_ptr() as usize;
        ptr >= start && ptr + self.len <= end
    }
}

impl Deref for SharedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Kept as is when the allocator already placed it on a 64-byte boundary,
/// otherwise copied once into an aligned owner.
impl From<Vec<u8>> for SharedBytes {
    fn from(v: Vec<u8>) -> Self {
        if v.as_ptr() as usize % SIMD_ALIGN == 0 {
            Self::from_owner(v)
        } else {
            Self::copy_aligned(&v)
        }
    }
}

impl From<Vec64<u8>> for SharedBytes {
    fn from(v: Vec64<u8>) -> Self {
        Self::from_owner(v)
    }
}

impl From<&[u8]> for SharedBytes {
    fn from(v: &[u8]) -> Self {
        Self::copy_aligned(v)
    }
}

impl PartialEq for SharedBytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBytes")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
