// src/file.rs: чтение/запись табличного буфера в файл (внешний слой над кодеками).
//
// Политика:
// - Кодеки не делают I/O: файл читается целиком в Vec<u8> и передаётся в load/open_table.
// - Атомарная запись: tmp+rename, затем fsync родительского каталога (best‑effort на Windows).
// - Размер читаемого файла ограничен SstConfig::max_table_bytes.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::fs::{self, OpenOptions};
#[cfg(unix)]
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::SstConfig;
use crate::table::{open_table, SortedTable};

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[inline]
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Прочитать файл таблицы целиком (с проверкой max_table_bytes).
pub fn read_table_bytes(path: &Path, cfg: &SstConfig) -> Result<Vec<u8>> {
    let mut f = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open table {}", path.display()))?;

    let len = f.metadata()?.len();
    if len > cfg.max_table_bytes as u64 {
        return Err(anyhow!(
            "table file {} is {} B, exceeds max_table_bytes {} (see SST_MAX_TABLE_BYTES)",
            path.display(),
            len,
            cfg.max_table_bytes
        ));
    }

    let mut buf = Vec::with_capacity(len as usize);
    f.read_to_end(&mut buf)
        .with_context(|| format!("read table {}", path.display()))?;
    debug!("read_table_bytes: {} ({} B)", path.display(), buf.len());
    Ok(buf)
}

/// Открыть файл таблицы подходящим кодеком. При strict_load дополнительно
/// выполняется полная проверка структуры.
pub fn open_table_file(path: &Path, cfg: &SstConfig) -> Result<Box<dyn SortedTable>> {
    let buf = read_table_bytes(path, cfg)?;
    let table = open_table(buf).with_context(|| format!("load table {}", path.display()))?;

    if cfg.strict_load {
        let report = table.check();
        if !report.ok() {
            for p in &report.problems {
                warn!("strict load {}: {}", path.display(), p);
            }
            return Err(anyhow!(
                "table {} failed strict check: {} problem(s)",
                path.display(),
                report.problems.len()
            ));
        }
    }
    Ok(table)
}

/// Записать буфер таблицы через tmp+rename.
pub fn write_table_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    let _ = fs::remove_file(&tmp); // best‑effort

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("open table tmp {}", tmp.display()))?;
    f.write_all(bytes)?;
    f.sync_all()?;

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    let _ = fsync_dir(path);

    debug!("write_table_file: {} ({} B)", path.display(), bytes.len());
    Ok(())
}

/// Создать новый файл таблицы. Ошибка, если файл уже существует.
pub fn create_table_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.exists() {
        return Err(anyhow!("table already exists at {}", path.display()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }
    write_table_file(path, bytes)
}
