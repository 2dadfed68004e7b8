use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use QuiverSST::file::open_table_file;
use QuiverSST::{SstConfig, SstError};

use super::util::{display_text, hex_preview};

pub fn exec(cfg: &SstConfig, path: PathBuf, key: String, out: Option<PathBuf>) -> Result<()> {
    let table = open_table_file(&path, cfg)?;
    match table.get(key.as_bytes()) {
        Ok((_, v)) => {
            if let Some(out_path) = out {
                let mut f = OpenOptions::new()
                    .create(true)
                    .truncate(true)
                    .write(true)
                    .open(&out_path)?;
                f.write_all(&v)?;
                f.sync_all()?;
                println!(
                    "FOUND '{}': {} B -> wrote to {}",
                    key,
                    v.len(),
                    out_path.display()
                );
            } else {
                println!("FOUND '{}': {} B", key, v.len());
                println!("text: {}", display_text(&v));
                println!("hex:  {}", hex_preview(&v));
            }
        }
        Err(SstError::KeyNotFound) => println!("NOT FOUND '{}'", key),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
