//! table/header: общий 16-байтовый заголовок таблицы (v1/v2): encode/decode + валидация.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{HeaderError, Result};
use crate::table::common::{
    HEADER_SIZE, OFF_COUNT, OFF_MAGIC, OFF_SIZE, OFF_VERSION, TABLE_MAGIC,
};

/// Заголовок таблицы.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u16,
    /// payload_size (v1) или chunk_size (v2).
    pub size: u16,
    /// Число записей (v1) или чанков (v2).
    pub count: u32,
}

impl TableHeader {
    pub fn new(version: u16, size: u16, count: u32) -> Self {
        Self { version, size, count }
    }

    /// Закодировать заголовок в фиксированный 16-байтовый массив.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[OFF_MAGIC..OFF_MAGIC + 8].copy_from_slice(TABLE_MAGIC);
        LittleEndian::write_u16(&mut out[OFF_VERSION..OFF_VERSION + 2], self.version);
        LittleEndian::write_u16(&mut out[OFF_SIZE..OFF_SIZE + 2], self.size);
        LittleEndian::write_u32(&mut out[OFF_COUNT..OFF_COUNT + 4], self.count);
        out
    }

    /// Дописать заголовок в конец буфера сборки.
    #[inline]
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.encode());
    }
}

/// Прочитать заголовок без проверки версии (проверяется только MAGIC).
/// Используется для определения формата буфера.
pub fn peek_header(buf: &[u8]) -> Result<TableHeader> {
    if buf.len() < HEADER_SIZE {
        return Err(HeaderError::Truncated {
            need: HEADER_SIZE,
            have: buf.len(),
        }
        .into());
    }
    if &buf[OFF_MAGIC..OFF_MAGIC + 8] != TABLE_MAGIC {
        let mut found = [0u8; 8];
        found.copy_from_slice(&buf[OFF_MAGIC..OFF_MAGIC + 8]);
        return Err(HeaderError::BadMagic {
            expected: *TABLE_MAGIC,
            found,
        }
        .into());
    }
    Ok(TableHeader {
        version: LittleEndian::read_u16(&buf[OFF_VERSION..OFF_VERSION + 2]),
        size: LittleEndian::read_u16(&buf[OFF_SIZE..OFF_SIZE + 2]),
        count: LittleEndian::read_u32(&buf[OFF_COUNT..OFF_COUNT + 4]),
    })
}

/// Прочитать заголовок и потребовать точного совпадения версии.
pub fn read_header(buf: &[u8], expected_version: u16) -> Result<TableHeader> {
    let h = peek_header(buf)?;
    if h.version != expected_version {
        return Err(HeaderError::BadVersion {
            expected: expected_version,
            found: h.version,
        }
        .into());
    }
    Ok(h)
}
