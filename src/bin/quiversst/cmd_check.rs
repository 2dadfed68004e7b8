use anyhow::{anyhow, Result};
use std::path::PathBuf;

use QuiverSST::file::read_table_bytes;
use QuiverSST::table::open_table;
use QuiverSST::SstConfig;

pub fn exec(cfg: &SstConfig, path: PathBuf, json: bool) -> Result<()> {
    // Без strict_load: отчёт нужен даже для повреждённой структуры.
    let buf = read_table_bytes(&path, cfg)?;
    let table = open_table(buf)?;
    let report = table.check();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("check: {}", path.display());
        println!("  format:  {}", report.format);
        println!("  records: {}", report.records);
        if let Some(c) = report.chunks {
            println!("  chunks:  {}", c);
        }
        println!("  bytes:   {}", report.bytes);
        if report.ok() {
            println!("  OK");
        } else {
            for p in &report.problems {
                println!("  PROBLEM: {}", p);
            }
        }
    }

    if !report.ok() {
        return Err(anyhow!(
            "table {} has {} problem(s)",
            path.display(),
            report.problems.len()
        ));
    }
    Ok(())
}
