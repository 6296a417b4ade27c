pub mod traits {
    pub mod native_type;
    pub mod table_source;
}

pub mod models {
    pub mod types {
        pub mod kind;
    }
    pub mod encoders {
        pub mod csv;
        pub mod table;
    }
    pub mod decoders {
        pub mod csv;
        pub mod table;
    }
    pub mod frames {
        pub mod directory;
        pub mod fields;
        pub mod header;
        pub mod metadata;
    }
    pub mod adapters {
        pub mod minarrow;
    }
    pub mod readers {
        pub mod csv_reader;
        pub mod file_table_reader;
        #[cfg(feature = "mmap")]
        pub mod mmap_table_reader;
    }
    pub mod writers {
        pub mod csv_writer;
        pub mod table_writer;
    }
    pub mod bitmap;
    pub mod buffer;
    pub mod column;
    pub mod layout;
    #[cfg(feature = "mmap")]
    pub mod mmap;
    pub mod schema;
    pub mod table;
}

pub mod constants;
pub mod enums;
pub mod error;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::enums::{AlignmentPolicy, ByteOrder, DecodeState};
pub use crate::error::{BintableError, ErrorKind, Result};
pub use crate::models::bitmap::Bitmap;
pub use crate::models::buffer::SharedBytes;
pub use crate::models::column::{Column, ColumnBuilder, ColumnData};
pub use crate::models::decoders::table::{
    decode, decode_with, inspect, ColumnSummary, DecodeOptions, FileSummary, TableDecoder,
};
pub use crate::models::encoders::table::{encode, encode_aligned, encode_with, EncodeOptions};
pub use crate::models::layout::{plan_layout, ColumnLayout, Layout};
pub use crate::models::readers::file_table_reader::{read_table_from_file, FileTableReader};
#[cfg(feature = "mmap")]
pub use crate::models::readers::mmap_table_reader::MmapTableReader;
pub use crate::models::schema::{ColumnDescriptor, Schema};
pub use crate::models::table::{Table, TableMeta};
pub use crate::models::types::kind::ColumnKind;
pub use crate::models::writers::table_writer::write_table_to_file;
pub use crate::traits::table_source::{FromTable, TableSource};
