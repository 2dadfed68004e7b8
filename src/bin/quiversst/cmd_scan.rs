use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use QuiverSST::file::open_table_file;
use QuiverSST::SstConfig;

use super::util::{display_text, to_hex};

#[derive(Serialize)]
struct ScanItem {
    key: String,
    key_hex: String,
    payload_len: usize,
    payload_hex: String,
}

pub fn exec(cfg: &SstConfig, path: PathBuf, prefix: Option<String>, json: bool) -> Result<()> {
    let table = open_table_file(&path, cfg)?;
    let prefix = prefix.unwrap_or_default();

    let items: Vec<(Vec<u8>, Vec<u8>)> = table
        .entries()?
        .into_iter()
        .filter(|(k, _)| k.starts_with(prefix.as_bytes()))
        .collect();

    if json {
        let out: Vec<ScanItem> = items
            .iter()
            .map(|(k, v)| ScanItem {
                key: String::from_utf8_lossy(k).into_owned(),
                key_hex: to_hex(k),
                payload_len: v.len(),
                payload_hex: to_hex(v),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (k, v) in &items {
            println!("{} = {} ({} B)", display_text(k), display_text(v), v.len());
        }
        println!("-- {} record(s)", items.len());
    }
    Ok(())
}
