#![allow(non_snake_case)]

// Кодеки (формат v1/v2 и общий контракт)
pub mod table; // src/table/{mod,common,header,fixed,check,chunked/{mod,chunk}}.rs
pub mod error;

// Окружение: конфиг, счётчики, файловый слой для CLI
pub mod config;
pub mod metrics;
pub mod file;

// Удобные реэкспорты
pub use error::{HeaderError, Result, SstError};
pub use config::SstConfig;
pub use table::{
    detect_format, new_table, open_table, ChunkedRecord, ChunkedTable, FixedPayloadTable,
    FixedRecord, FormatVersion, Nearest, SortedTable,
};
