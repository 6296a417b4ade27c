use crate::constants::{HEAP_ALIGN, SIMD_ALIGN};
use crate::error::ErrorKind;

/// Byte order of every multi-byte field in a bintable file.
///
/// Recorded in the header as a single flag byte. Readers on a host of the
/// same order get zero-copy column views; the opposite order is byte-swapped
/// into owned buffers during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Flag value `0`.
    Little,

    /// Flag value `1`.
    Big,
}

impl ByteOrder {
    /// Byte order of the running host.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// The other byte order.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }

    #[inline]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }

    pub(crate) fn flag(self) -> u8 {
        match self {
            ByteOrder::Little => 0,
            ByteOrder::Big => 1,
        }
    }

    pub(crate) fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(ByteOrder::Little),
            1 => Some(ByteOrder::Big),
            _ => None,
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// Column placement strategy for the layout planner.
///
/// Stored in header flag bit 0 so the decoder re-derives the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentPolicy {
    /// Natural element alignment, tightest packing.
    #[default]
    Natural,

    /// Every column footprint, payload and the heap start on a 64-byte boundary,
    /// so payload views are ready for SIMD kernels.
    Simd64,
}

impl AlignmentPolicy {
    /// Lower bound applied to every column boundary.
    #[inline]
    pub fn min_alignment(self) -> usize {
        match self {
            AlignmentPolicy::Natural => 1,
            AlignmentPolicy::Simd64 => SIMD_ALIGN,
        }
    }

    /// Alignment of the heap segment.
    #[inline]
    pub fn heap_alignment(self) -> usize {
        HEAP_ALIGN.max(self.min_alignment())
    }
}

/// Decoder state machine.
///
/// Decoding is all-or-nothing: there is no partially populated table in any
/// state other than `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// No bytes inspected yet.
    Unopened,

    /// Magic, version, flags and section bounds accepted.
    HeaderValidated,

    /// Directory parsed and its layout re-derived and matched.
    DirectoryValidated,

    /// Column views constructed.
    Ready,

    /// A stage failed; all partial state was discarded.
    Failed(ErrorKind),
}
