//! table/fixed: формат v1: фиксированный размер payload + плоский индекс offset'ов.
//!
//! Layout (LE):
//! ```text
//! [magic 8]["version" u16 = 1][payload_size u16][count u32]
//! [offset u32] × (count + 1)      -- offset[0] = 0, offset[count] = длина области строк
//! [key ‖ payload] × count          -- отсортировано по key (байтовое сравнение)
//! ```
//! Длина записи i = offset[i+1] - offset[i]; длина ключа = длина записи - payload_size.
//!
//! Индекс offset'ов зеркалируется в памяти (`index`), чтобы бинарный поиск не
//! декодировал u32 из буфера на каждом шаге. Любая мутация собирает новый буфер
//! целиком (одна аллокация нужного размера) и только потом подменяет текущий.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use std::cmp::Ordering;

use crate::error::{HeaderError, Result, SstError};
use crate::metrics;
use crate::table::check::CheckReport;
use crate::table::common::{HEADER_SIZE, OFFSET_SIZE, VERSION_FIXED};
use crate::table::header::{read_header, TableHeader};
use crate::table::FormatVersion;

/// Запись v1: позиция в индексе, ключ и payload (срезы текущего буфера).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRecord<'a> {
    pub index: usize,
    pub key: &'a [u8],
    pub payload: &'a [u8],
}

/// Таблица v1 с фиксированным размером payload.
#[derive(Debug, Clone)]
pub struct FixedPayloadTable {
    buf: Vec<u8>,
    index: Vec<u32>,
    payload_size: u16,
}

impl FixedPayloadTable {
    /// Пустая таблица с заданным размером payload.
    pub fn new(payload_size: u16) -> Self {
        let mut t = Self {
            buf: Vec::new(),
            index: Vec::new(),
            payload_size,
        };
        t.init(payload_size);
        t
    }

    /// Разобрать существующий буфер.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        let mut t = Self::new(0);
        t.load(buf)?;
        Ok(t)
    }

    /// Сбросить таблицу в пустое состояние: заголовок + один sentinel offset (0).
    pub fn init(&mut self, payload_size: u16) {
        let mut buf = Vec::with_capacity(HEADER_SIZE + OFFSET_SIZE);
        TableHeader::new(VERSION_FIXED, payload_size, 0).write_to(&mut buf);
        buf.extend_from_slice(&[0u8; OFFSET_SIZE]);

        self.buf = buf;
        self.index = vec![0];
        self.payload_size = payload_size;
    }

    /// Загрузить таблицу из буфера. При ошибке текущее состояние не меняется.
    pub fn load(&mut self, buf: Vec<u8>) -> Result<()> {
        let h = read_header(&buf, VERSION_FIXED)?;
        let count = h.count as usize;

        let index_end = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(OFFSET_SIZE))
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| SstError::Corrupt(format!("record count {} overflows", count)))?;
        if buf.len() < index_end {
            return Err(HeaderError::Truncated {
                need: index_end,
                have: buf.len(),
            }
            .into());
        }

        let mut index = vec![0u32; count + 1];
        LittleEndian::read_u32_into(&buf[HEADER_SIZE..index_end], &mut index);

        if index[0] != 0 {
            return Err(SstError::Corrupt(format!(
                "first offset must be 0, got {}",
                index[0]
            )));
        }
        let ps = h.size as u32;
        for (i, w) in index.windows(2).enumerate() {
            if w[1] < w[0] || w[1] - w[0] < ps {
                return Err(SstError::Corrupt(format!(
                    "record {} has invalid bounds [{}, {}) for payload_size {}",
                    i, w[0], w[1], ps
                )));
            }
        }

        let region_end = index_end + index[count] as usize;
        if buf.len() < region_end {
            return Err(HeaderError::Truncated {
                need: region_end,
                have: buf.len(),
            }
            .into());
        }
        if buf.len() > region_end {
            return Err(SstError::Corrupt(format!(
                "{} trailing byte(s) after string region",
                buf.len() - region_end
            )));
        }

        debug!(
            "fixed: loaded {} record(s), payload_size={}, {} B",
            count,
            h.size,
            buf.len()
        );

        self.buf = buf;
        self.index = index;
        self.payload_size = h.size;
        Ok(())
    }

    // ---------- accessors ----------

    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload_size as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Начало области строк (сразу после индекса).
    #[inline]
    pub fn strings_start(&self) -> usize {
        HEADER_SIZE + self.index.len() * OFFSET_SIZE
    }

    /// Текущий буфер как есть.
    #[inline]
    pub fn save(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Абсолютные границы записи i в буфере.
    #[inline]
    fn record_bounds(&self, i: usize) -> (usize, usize) {
        let base = self.strings_start();
        (
            base + self.index[i] as usize,
            base + self.index[i + 1] as usize,
        )
    }

    #[inline]
    fn key_at(&self, i: usize) -> &[u8] {
        let (start, end) = self.record_bounds(i);
        &self.buf[start..end - self.payload_size()]
    }

    fn record_at(&self, i: usize) -> FixedRecord<'_> {
        let (start, end) = self.record_bounds(i);
        let split = end - self.payload_size();
        FixedRecord {
            index: i,
            key: &self.buf[start..split],
            payload: &self.buf[split..end],
        }
    }

    /// Бинарный поиск по [0, count): Ok(i): точное совпадение,
    /// Err(pos): позиция, в которую ключ должен быть вставлен.
    fn locate(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        let mut lo = 0usize;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.key_at(mid).cmp(key) {
                Ordering::Equal => return Ok(mid),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Err(lo)
    }

    // ---------- operations ----------

    /// Найти запись по ключу.
    pub fn search(&self, key: &[u8]) -> Result<FixedRecord<'_>> {
        match self.locate(key) {
            Ok(i) => {
                metrics::record_search(true);
                Ok(self.record_at(i))
            }
            Err(_) => {
                metrics::record_search(false);
                Err(SstError::KeyNotFound)
            }
        }
    }

    /// Вставить запись. С `rewrite=true` существующий ключ получает новый payload.
    pub fn insert(&mut self, key: &[u8], payload: &[u8], rewrite: bool) -> Result<()> {
        if payload.len() != self.payload_size() {
            return Err(SstError::PayloadSizeMismatch {
                expected: self.payload_size(),
                actual: payload.len(),
            });
        }

        let pos = match self.locate(key) {
            Ok(i) => {
                if !rewrite {
                    return Err(SstError::DuplicateKey);
                }
                // Длина записи не меняется: ключ тот же, payload фиксированного размера.
                let (_, end) = self.record_bounds(i);
                let split = end - self.payload_size();
                self.buf[split..end].copy_from_slice(payload);
                metrics::record_overwrite();
                debug!("fixed: rewrite payload at idx={}", i);
                return Ok(());
            }
            Err(pos) => pos,
        };

        let rec_len = key.len() + payload.len();
        check_region_limit(self.index[self.len()] as usize, rec_len, self.len())?;

        // Новый индекс: offset[pos] остаётся на месте, всё после сдвигается на rec_len.
        let at = self.index[pos];
        let mut index = Vec::with_capacity(self.index.len() + 1);
        index.extend_from_slice(&self.index[..pos]);
        index.push(at);
        index.extend(self.index[pos..].iter().map(|o| o + rec_len as u32));

        let region = &self.buf[self.strings_start()..];
        let (before, after) = region.split_at(at as usize);
        let buf = build_buffer(self.payload_size, &index, &[before, key, payload, after]);

        debug!(
            "fixed: insert key_len={} at idx={} (count={}), rebuilt {} B",
            key.len(),
            pos,
            index.len() - 1,
            buf.len()
        );
        metrics::record_insert();
        metrics::record_rebuild(buf.len());

        self.buf = buf;
        self.index = index;
        Ok(())
    }

    /// Удалить запись по ключу.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let i = match self.locate(key) {
            Ok(i) => i,
            Err(_) => {
                metrics::record_search(false);
                return Err(SstError::KeyNotFound);
            }
        };

        let start = self.index[i];
        let end = self.index[i + 1];
        let rec_len = end - start;

        let mut index = Vec::with_capacity(self.index.len() - 1);
        index.extend_from_slice(&self.index[..i]);
        index.extend(self.index[i + 1..].iter().map(|o| o - rec_len));

        let region = &self.buf[self.strings_start()..];
        let before = &region[..start as usize];
        let after = &region[end as usize..];
        let buf = build_buffer(self.payload_size, &index, &[before, after]);

        debug!(
            "fixed: delete idx={} (rec_len={}), rebuilt {} B",
            i,
            rec_len,
            buf.len()
        );
        metrics::record_delete();
        metrics::record_rebuild(buf.len());

        self.buf = buf;
        self.index = index;
        Ok(())
    }

    /// Обход записей в порядке хранения (он же порядок ключей).
    pub fn iter(&self) -> FixedIter<'_> {
        FixedIter { table: self, next: 0 }
    }

    /// Полная проверка структуры и порядка ключей.
    pub fn check(&self) -> CheckReport {
        let mut report = CheckReport::new(FormatVersion::Fixed, self.buf.len());
        report.records = self.len();

        match read_header(&self.buf, VERSION_FIXED) {
            Ok(h) => {
                if h.count as usize != self.len() {
                    report.problem(format!(
                        "header count {} != index entries {}",
                        h.count,
                        self.len()
                    ));
                }
                if h.size != self.payload_size {
                    report.problem(format!(
                        "header payload_size {} != table payload_size {}",
                        h.size, self.payload_size
                    ));
                }
            }
            Err(e) => {
                report.problem(format!("header: {}", e));
                return report;
            }
        }

        if self.index[0] != 0 {
            report.problem(format!("first offset is {}", self.index[0]));
        }
        for (i, w) in self.index.windows(2).enumerate() {
            if w[1] < w[0] || ((w[1] - w[0]) as usize) < self.payload_size() {
                report.problem(format!("record {} has bounds [{}, {})", i, w[0], w[1]));
            }
        }
        let expected_len = self.strings_start() + self.index[self.len()] as usize;
        if expected_len != self.buf.len() {
            report.problem(format!(
                "buffer is {} B, layout requires {} B",
                self.buf.len(),
                expected_len
            ));
            return report;
        }
        if !report.ok() {
            return report;
        }

        let mut prev: Option<&[u8]> = None;
        for rec in self.iter() {
            if let Some(p) = prev {
                if p >= rec.key {
                    report.problem(format!("keys out of order at idx={}", rec.index));
                }
            }
            prev = Some(rec.key);
        }
        report
    }
}

/// Область строк и число записей v1 адресуются u32.
fn check_region_limit(region_len: usize, rec_len: usize, count: usize) -> Result<()> {
    let new_region_len = region_len.saturating_add(rec_len);
    if new_region_len > u32::MAX as usize || count >= u32::MAX as usize {
        return Err(SstError::TooLarge(format!(
            "string region would reach {} B with {} record(s) (max {})",
            new_region_len,
            count + 1,
            u32::MAX
        )));
    }
    Ok(())
}

/// Собрать буфер v1: заголовок, индекс и куски области строк по порядку.
fn build_buffer(payload_size: u16, index: &[u32], pieces: &[&[u8]]) -> Vec<u8> {
    let region_len: usize = pieces.iter().map(|p| p.len()).sum();
    let index_bytes = index.len() * OFFSET_SIZE;
    let mut out = Vec::with_capacity(HEADER_SIZE + index_bytes + region_len);

    TableHeader::new(VERSION_FIXED, payload_size, (index.len() - 1) as u32).write_to(&mut out);
    out.resize(HEADER_SIZE + index_bytes, 0);
    LittleEndian::write_u32_into(index, &mut out[HEADER_SIZE..]);
    for p in pieces {
        out.extend_from_slice(p);
    }
    out
}

/// Итератор по записям v1.
pub struct FixedIter<'a> {
    table: &'a FixedPayloadTable,
    next: usize,
}

impl<'a> Iterator for FixedIter<'a> {
    type Item = FixedRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.table.len() {
            return None;
        }
        let rec = self.table.record_at(self.next);
        self.next += 1;
        Some(rec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.table.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FixedIter<'_> {}
