use anyhow::Result;
use std::path::PathBuf;

use QuiverSST::file::create_table_file;
use QuiverSST::{new_table, FormatVersion, SstConfig};

pub fn exec(
    cfg: &SstConfig,
    path: PathBuf,
    format: FormatVersion,
    size: Option<u16>,
) -> Result<()> {
    let size = size.unwrap_or(match format {
        FormatVersion::Fixed => cfg.payload_size,
        FormatVersion::Chunked => cfg.chunk_size,
    });

    let table = new_table(format, size)?;
    create_table_file(&path, table.as_bytes())?;

    let what = match format {
        FormatVersion::Fixed => "payload_size",
        FormatVersion::Chunked => "chunk_size",
    };
    println!(
        "OK init: {} {}, {}={}, {} B",
        path.display(),
        format,
        what,
        size,
        table.as_bytes().len()
    );
    Ok(())
}
