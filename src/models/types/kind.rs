//! # Type Registry
//!
//! Maps every abstract column kind to its on-disk representation: bytes per
//! element, required alignment, whether values live in the shared heap, the
//! directory tag, and the granularity used when byte-swapping payloads.
//!
//! | Kind | Tag | Size | Align | Swap width |
//! |------|-----|------|-------|------------|
//! | `Int8` / `UInt8` | 1 / 5 | 1 | 1 | - |
//! | `Int16` / `UInt16` | 2 / 6 | 2 | 2 | 2 |
//! | `Int32` / `UInt32` | 3 / 7 | 4 | 4 | 4 |
//! | `Int64` / `UInt64` | 4 / 8 | 8 | 8 | 8 |
//! | `Float32` / `Float64` | 9 / 10 | 4 / 8 | 4 / 8 | 4 / 8 |
//! | `Bool` | 11 | 1 | 1 | - |
//! | `FixedBytes(w)` | 12 | w | 1 | - |
//! | `VarString` / `VarBytes` | 13 / 14 | heap | 8 | entry fields |

use std::fmt;
use std::str::FromStr;

use crate::error::BintableError;

/// Closed set of column element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// One byte per element, `0` or `1`.
    Bool,
    /// Opaque fixed-width byte strings.
    FixedBytes(u32),
    /// UTF-8 text stored in the heap.
    VarString,
    /// Arbitrary bytes stored in the heap.
    VarBytes,
}

impl ColumnKind {
    /// Bytes per element, or `None` for heap-backed kinds.
    #[inline]
    pub fn size_of(self) -> Option<usize> {
        use ColumnKind::*;
        match self {
            Int8 | UInt8 | Bool => Some(1),
            Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Float32 => Some(4),
            Int64 | UInt64 | Float64 => Some(8),
            FixedBytes(width) => Some(width as usize),
            VarString | VarBytes => None,
        }
    }

    /// Required payload alignment, always a power of two.
    #[inline]
    pub fn alignment_of(self) -> usize {
        use ColumnKind::*;
        match self {
            Bool | FixedBytes(_) => 1,
            VarString | VarBytes => 8,
            other => other.size_of().unwrap_or(1),
        }
    }

    #[inline]
    pub fn is_variable(self) -> bool {
        matches!(self, ColumnKind::VarString | ColumnKind::VarBytes)
    }

    /// Element width to reverse when the file byte order differs from the host.
    /// `1` means the payload is byte-order independent.
    #[inline]
    pub fn swap_width(self) -> usize {
        match self {
            ColumnKind::Bool | ColumnKind::FixedBytes(_) => 1,
            other => other.size_of().unwrap_or(1),
        }
    }

    /// Directory tag.
    pub fn tag(self) -> u8 {
        use ColumnKind::*;
        match self {
            Int8 => 1,
            Int16 => 2,
            Int32 => 3,
            Int64 => 4,
            UInt8 => 5,
            UInt16 => 6,
            UInt32 => 7,
            UInt64 => 8,
            Float32 => 9,
            Float64 => 10,
            Bool => 11,
            FixedBytes(_) => 12,
            VarString => 13,
            VarBytes => 14,
        }
    }

    /// Width stored alongside the tag; only `FixedBytes` uses it.
    pub fn width_param(self) -> u32 {
        match self {
            ColumnKind::FixedBytes(width) => width,
            _ => 0,
        }
    }

    /// Reverse of [`tag`](Self::tag) and [`width_param`](Self::width_param).
    pub fn from_tag(tag: u8, width: u32) -> Option<Self> {
        use ColumnKind::*;
        let kind = match tag {
            1 => Int8,
            2 => Int16,
            3 => Int32,
            4 => Int64,
            5 => UInt8,
            6 => UInt16,
            7 => UInt32,
            8 => UInt64,
            9 => Float32,
            10 => Float64,
            11 => Bool,
            12 => FixedBytes(width),
            13 => VarString,
            14 => VarBytes,
            _ => return None,
        };
        // Only FixedBytes may carry a width.
        if width != 0 && !matches!(kind, FixedBytes(_)) {
            return None;
        }
        Some(kind)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ColumnKind::*;
        match self {
            Int8 => write!(f, "int8"),
            Int16 => write!(f, "int16"),
            Int32 => write!(f, "int32"),
            Int64 => write!(f, "int64"),
            UInt8 => write!(f, "uint8"),
            UInt16 => write!(f, "uint16"),
            UInt32 => write!(f, "uint32"),
            UInt64 => write!(f, "uint64"),
            Float32 => write!(f, "float32"),
            Float64 => write!(f, "float64"),
            Bool => write!(f, "bool"),
            FixedBytes(w) => write!(f, "bytes[{w}]"),
            VarString => write!(f, "string"),
            VarBytes => write!(f, "binary"),
        }
    }
}

impl FromStr for ColumnKind {
    type Err = BintableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ColumnKind::*;
        let kind = match s {
            "int8" => Int8,
            "int16" => Int16,
            "int32" => Int32,
            "int64" => Int64,
            "uint8" => UInt8,
            "uint16" => UInt16,
            "uint32" => UInt32,
            "uint64" => UInt64,
            "float32" => Float32,
            "float64" => Float64,
            "bool" => Bool,
            "string" => VarString,
            "binary" => VarBytes,
            other => {
                let width = other
                    .strip_prefix("bytes[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .and_then(|w| w.parse::<u32>().ok())
                    .ok_or_else(|| {
                        BintableError::invalid_schema(format!("unrecognised column kind '{other}'"))
                    })?;
                FixedBytes(width)
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ColumnKind; 14] = [
        ColumnKind::Int8,
        ColumnKind::Int16,
        ColumnKind::Int32,
        ColumnKind::Int64,
        ColumnKind::UInt8,
        ColumnKind::UInt16,
        ColumnKind::UInt32,
        ColumnKind::UInt64,
        ColumnKind::Float32,
        ColumnKind::Float64,
        ColumnKind::Bool,
        ColumnKind::FixedBytes(16),
        ColumnKind::VarString,
        ColumnKind::VarBytes,
    ];

    #[test]
    fn test_alignment_is_power_of_two() {
        for kind in ALL {
            assert!(kind.alignment_of().is_power_of_two(), "{kind}");
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(ColumnKind::Int16.size_of(), Some(2));
        assert_eq!(ColumnKind::Float64.size_of(), Some(8));
        assert_eq!(ColumnKind::FixedBytes(3).size_of(), Some(3));
        assert_eq!(ColumnKind::VarString.size_of(), None);
        assert!(ColumnKind::VarBytes.is_variable());
        assert!(!ColumnKind::Bool.is_variable());
        assert_eq!(ColumnKind::FixedBytes(3).swap_width(), 1);
        assert_eq!(ColumnKind::UInt32.swap_width(), 4);
    }

    #[test]
    fn test_tag_and_name_are_reversible() {
        for kind in ALL {
            assert_eq!(ColumnKind::from_tag(kind.tag(), kind.width_param()), Some(kind));
            assert_eq!(kind.to_string().parse::<ColumnKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_tags_and_names_rejected() {
        assert_eq!(ColumnKind::from_tag(0, 0), None);
        assert_eq!(ColumnKind::from_tag(99, 0), None);
        assert_eq!(ColumnKind::from_tag(3, 4), None);
        let err = "complex128".parse::<ColumnKind>().unwrap_err();
        assert!(matches!(err, BintableError::InvalidSchema(_)));
    }
}
