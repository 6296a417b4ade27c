// --- Constants for the bintable container format ---

pub const BINTABLE_MAGIC: &[u8; 4] = b"BTBL"; // opening magic
pub const FORMAT_VERSION: u16 = 1; // newest version this crate reads and writes

pub const HEADER_LEN: usize = 72; // fixed header, see `models::frames::header`
pub const DIRECTORY_RECORD_LEN: usize = 128; // one record per column
pub const MAX_NAME_LEN: usize = 64; // bytes, UTF-8
pub const MAX_RANK: usize = 4; // per-row shape dimensions

pub const VAR_ENTRY_LEN: usize = 12; // u64 heap offset + u32 length
pub const HEAP_ALIGN: usize = 8;
pub const SIMD_ALIGN: usize = 64;

pub const NO_MASK: u64 = u64::MAX; // directory sentinel for non-nullable columns

pub const FLAG_SIMD64: u8 = 0b0000_0001; // header layout flag bits
pub const KNOWN_FLAGS: u8 = FLAG_SIMD64;

pub const UNIT_METADATA_KEY: &str = "unit"; // host field metadata key for physical units
