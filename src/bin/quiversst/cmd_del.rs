use anyhow::Result;
use std::path::PathBuf;

use QuiverSST::file::{open_table_file, write_table_file};
use QuiverSST::{SstConfig, SstError};

pub fn exec(cfg: &SstConfig, path: PathBuf, key: String) -> Result<()> {
    let mut table = open_table_file(&path, cfg)?;
    match table.remove(key.as_bytes()) {
        Ok(()) => {
            write_table_file(&path, table.as_bytes())?;
            println!("OK del: key='{}', records={}", key, table.len());
        }
        // Файл не трогаем: буфер не изменился.
        Err(SstError::KeyNotFound) => println!("NOT FOUND '{}'", key),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
