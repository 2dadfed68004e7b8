use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;

use QuiverSST::file::open_table_file;
use QuiverSST::metrics;
use QuiverSST::table::peek_header;
use QuiverSST::{FormatVersion, SstConfig};

pub fn exec(cfg: &SstConfig, path: PathBuf, json: bool) -> Result<()> {
    let table = open_table_file(&path, cfg)?;
    let h = peek_header(table.as_bytes())?;
    let format = table.format();

    let (size_name, count_name) = match format {
        FormatVersion::Fixed => ("payload_size", "records"),
        FormatVersion::Chunked => ("chunk_size", "chunks"),
    };

    // Каждый ключ из обхода должен находиться бинарным поиском.
    let entries = table.entries()?;
    let searchable = entries
        .iter()
        .filter(|(k, _)| table.get(k).is_ok())
        .count();

    let ms = metrics::snapshot();

    if json {
        let v = json!({
            "path": path.display().to_string(),
            "format": format,
            "version": h.version,
            size_name: h.size,
            count_name: h.count,
            "records": table.len(),
            "searchable": searchable,
            "bytes": table.as_bytes().len(),
            "metrics": ms,
            "hit_ratio": ms.hit_ratio(),
            "avg_rebuild_bytes": ms.avg_rebuild_bytes(),
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("table:   {}", path.display());
        println!("format:  {}", format);
        println!("{}: {}", size_name, h.size);
        println!("header {}: {}", count_name, h.count);
        println!("records: {} ({} searchable)", table.len(), searchable);
        println!("bytes:   {}", table.as_bytes().len());

        println!("Metrics snapshot:");
        println!("  searches_total     = {}", ms.searches_total);
        println!("  search_hits        = {}", ms.search_hits);
        println!("  search_misses      = {}", ms.search_misses);
        println!("  search_hit_ratio   = {:.2}%", ms.hit_ratio() * 100.0);
        println!("  inserts_total      = {}", ms.inserts_total);
        println!("  overwrites_total   = {}", ms.overwrites_total);
        println!("  deletes_total      = {}", ms.deletes_total);
        println!("  rebuilds_total     = {}", ms.rebuilds_total);
        println!("  rebuild_bytes      = {}", ms.rebuild_bytes);
        println!("  avg_rebuild_bytes  = {:.1}", ms.avg_rebuild_bytes());
    }
    Ok(())
}
