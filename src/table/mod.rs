//! table: SSTable-кодеки поверх одного непрерывного буфера.
//!
//! Разделение по подмодулям:
//! - common.rs : MAGIC/версии/offset'ы заголовков, размеры.
//! - header.rs : общий 16-байтовый заголовок (encode/decode + валидация).
//! - fixed.rs  : v1: фиксированный payload + плоский индекс offset'ов.
//! - chunked/  : v2: записи переменной длины в чанках фиксированного размера.
//! - check.rs  : отчёт структурной проверки.
//!
//! Оба кодека реализуют общий контракт [`SortedTable`]; [`open_table`] выбирает
//! кодек по полю version заголовка.

pub mod check;
pub mod chunked;
pub mod common;
pub mod fixed;
pub mod header;

use serde::Serialize;
use std::fmt;

use crate::error::{HeaderError, Result};

pub use check::CheckReport;
pub use chunked::{ChunkedRecord, ChunkedTable, Nearest};
pub use common::{TABLE_MAGIC, VERSION_CHUNKED, VERSION_FIXED};
pub use fixed::{FixedPayloadTable, FixedRecord};
pub use header::{peek_header, read_header, TableHeader};

/// Формат таблицы (поле version заголовка).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    Fixed,
    Chunked,
}

impl FormatVersion {
    pub fn version(self) -> u16 {
        match self {
            Self::Fixed => VERSION_FIXED,
            Self::Chunked => VERSION_CHUNKED,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed (v{})", VERSION_FIXED),
            Self::Chunked => write!(f, "chunked (v{})", VERSION_CHUNKED),
        }
    }
}

/// Общий контракт кодеков v1/v2.
pub trait SortedTable {
    fn format(&self) -> FormatVersion;

    /// Число записей.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Точный поиск; возвращает копии ключа и payload.
    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    fn put(&mut self, key: &[u8], payload: &[u8], overwrite: bool) -> Result<()>;

    fn remove(&mut self, key: &[u8]) -> Result<()>;

    /// Все записи в порядке хранения.
    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    fn check(&self) -> CheckReport;

    /// Текущий буфер (то же, что `save()` у конкретного кодека).
    fn as_bytes(&self) -> &[u8];
}

impl SortedTable for FixedPayloadTable {
    fn format(&self) -> FormatVersion {
        FormatVersion::Fixed
    }

    fn len(&self) -> usize {
        FixedPayloadTable::len(self)
    }

    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let rec = self.search(key)?;
        Ok((rec.key.to_vec(), rec.payload.to_vec()))
    }

    fn put(&mut self, key: &[u8], payload: &[u8], overwrite: bool) -> Result<()> {
        self.insert(key, payload, overwrite)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.delete(key)
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .iter()
            .map(|r| (r.key.to_vec(), r.payload.to_vec()))
            .collect())
    }

    fn check(&self) -> CheckReport {
        FixedPayloadTable::check(self)
    }

    fn as_bytes(&self) -> &[u8] {
        self.save()
    }
}

impl SortedTable for ChunkedTable {
    fn format(&self) -> FormatVersion {
        FormatVersion::Chunked
    }

    fn len(&self) -> usize {
        ChunkedTable::len(self)
    }

    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let rec = self.search(key)?;
        Ok((rec.key, rec.payload))
    }

    fn put(&mut self, key: &[u8], payload: &[u8], overwrite: bool) -> Result<()> {
        self.insert(key, payload, overwrite)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.delete(key)
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.iter()
            .map(|r| r.map(|r| (r.key, r.payload)))
            .collect()
    }

    fn check(&self) -> CheckReport {
        ChunkedTable::check(self)
    }

    fn as_bytes(&self) -> &[u8] {
        self.save()
    }
}

/// Определить формат буфера по MAGIC и полю version.
pub fn detect_format(buf: &[u8]) -> Result<FormatVersion> {
    let h = peek_header(buf)?;
    match h.version {
        VERSION_FIXED => Ok(FormatVersion::Fixed),
        VERSION_CHUNKED => Ok(FormatVersion::Chunked),
        other => Err(HeaderError::UnknownVersion(other).into()),
    }
}

/// Загрузить буфер подходящим кодеком.
pub fn open_table(buf: Vec<u8>) -> Result<Box<dyn SortedTable>> {
    Ok(match detect_format(&buf)? {
        FormatVersion::Fixed => Box::new(FixedPayloadTable::from_bytes(buf)?),
        FormatVersion::Chunked => Box::new(ChunkedTable::from_bytes(buf)?),
    })
}

/// Создать пустую таблицу заданного формата.
/// `size`: payload_size (v1) или chunk_size (v2).
pub fn new_table(format: FormatVersion, size: u16) -> Result<Box<dyn SortedTable>> {
    Ok(match format {
        FormatVersion::Fixed => Box::new(FixedPayloadTable::new(size)),
        FormatVersion::Chunked => Box::new(ChunkedTable::new(size)?),
    })
}
