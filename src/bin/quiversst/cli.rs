use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use QuiverSST::FormatVersion;

/// CLI для QuiverSST: работа с файлом таблицы (v1 fixed / v2 chunked)
#[derive(Parser, Debug)]
#[command(name = "quiversst", version, about = "QuiverSST table CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    /// v1: fixed payload size
    Fixed,
    /// v2: variable key/payload in fixed-size chunks
    Chunked,
}

impl From<FormatArg> for FormatVersion {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Fixed => FormatVersion::Fixed,
            FormatArg::Chunked => FormatVersion::Chunked,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create an empty table file
    ///
    /// Пример:
    ///   quiversst init --path ./t.sst --format chunked --size 64
    Init {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Chunked)]
        format: FormatArg,
        /// payload_size (fixed) or chunk_size (chunked).
        /// Defaults from SST_PAYLOAD_SIZE / SST_CHUNK_SIZE
        #[arg(long)]
        size: Option<u16>,
    },
    /// Insert key/value (value as literal, hex:.., @file or - for stdin)
    Put {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// Value argument. Ignored if --value-file is set.
        #[arg(long)]
        value: Option<String>,
        /// Read value bytes from a file
        #[arg(long)]
        value_file: Option<PathBuf>,
        /// Replace the payload of an existing key
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        /// Zero-pad short values up to the fixed payload size (fixed tables only)
        #[arg(long, default_value_t = false)]
        pad: bool,
    },
    /// Get key
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// Optional file to write raw payload into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete key
    Del {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
    },
    /// List records in storage order with optional prefix. --json prints a JSON array.
    Scan {
        #[arg(long)]
        path: PathBuf,
        /// Optional UTF-8 prefix
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print header summary (format, sizes, counts)
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Full structural check: layout, counters, strict key order
    Check {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Cli as Parser>::parse()
    }
}
