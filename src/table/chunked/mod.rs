//! table/chunked: формат v2: ключи и payload переменной длины, нарезанные на чанки.
//!
//! Layout (LE):
//! ```text
//! [magic 8][version u16 = 2][chunk_size u16][chunk_count u32]
//! [chunk] × chunk_count            -- записи подряд, отсортированы по key
//! ```
//! Подмодули:
//! - chunk.rs: геометрия чанков, заголовок чанка, encode/decode записи.
//!
//! Бинарный поиск идёт по номерам чанков: проба `mid` может попасть в середину записи,
//! поэтому каждая проба сначала перематывается к первому чанку записи
//! (`rewind_to_record_start`).

pub mod chunk;

use log::debug;
use std::cmp::Ordering;
use std::ops::Range;

use crate::error::{HeaderError, Result, SstError};
use crate::metrics;
use crate::table::check::CheckReport;
use crate::table::common::{HEADER_SIZE, VERSION_CHUNKED};
use crate::table::header::{read_header, TableHeader};
use crate::table::FormatVersion;

pub use chunk::{ChunkHeader, ChunkLayout, RecordSpan};

/// Собранная запись v2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedRecord {
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
    /// Абсолютное смещение первого чанка записи в буфере.
    pub offset: usize,
    /// Число чанков записи.
    pub chunks: usize,
}

/// Результат неточного поиска.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nearest {
    /// Ключ найден.
    Exact(ChunkedRecord),
    /// Ключа нет; последняя проверенная запись: якорь для вставки
    /// (новый ключ идёт перед ней, если он меньше, иначе сразу после неё).
    Anchor(ChunkedRecord),
    /// Таблица пуста: вставка в начало области чанков.
    EmptyTable,
}

/// Внутренний результат бинарного поиска (без сборки payload).
enum Lookup {
    Hit(RecordSpan),
    Miss { anchor: RecordSpan, anchor_key: Vec<u8> },
    Empty,
}

/// Таблица v2 с чанками фиксированного размера.
#[derive(Debug, Clone)]
pub struct ChunkedTable {
    buf: Vec<u8>,
    layout: ChunkLayout,
    chunk_count: u32,
    records: usize,
}

impl ChunkedTable {
    /// Пустая таблица. `chunk_size` должен быть больше 8 (заголовок чанка).
    pub fn new(chunk_size: u16) -> Result<Self> {
        let layout = ChunkLayout::new(chunk_size)?;
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        TableHeader::new(VERSION_CHUNKED, chunk_size, 0).write_to(&mut buf);
        Ok(Self {
            buf,
            layout,
            chunk_count: 0,
            records: 0,
        })
    }

    /// Разобрать существующий буфер.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        let h = read_header(&buf, VERSION_CHUNKED)?;
        let mut t = Self::new(h.size)?;
        t.load(buf)?;
        Ok(t)
    }

    /// Сбросить таблицу в пустое состояние.
    pub fn init(&mut self, chunk_size: u16) -> Result<()> {
        *self = Self::new(chunk_size)?;
        Ok(())
    }

    /// Загрузить таблицу из буфера. При ошибке текущее состояние не меняется.
    ///
    /// Помимо заголовка проверяется разбиение области на записи (заголовки чанков),
    /// но не порядок ключей: для этого есть `check()`.
    pub fn load(&mut self, buf: Vec<u8>) -> Result<()> {
        let h = read_header(&buf, VERSION_CHUNKED)?;
        let layout = ChunkLayout::new(h.size)?;

        let region_end = (h.count as usize)
            .checked_mul(layout.chunk_size())
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| SstError::Corrupt(format!("chunk count {} overflows", h.count)))?;
        if buf.len() < region_end {
            return Err(HeaderError::Truncated {
                need: region_end,
                have: buf.len(),
            }
            .into());
        }
        if buf.len() > region_end {
            return Err(SstError::Corrupt(format!(
                "{} trailing byte(s) after chunk region",
                buf.len() - region_end
            )));
        }

        let region = HEADER_SIZE..region_end;
        let mut records = 0usize;
        let mut off = region.start;
        while off < region.end {
            let span = layout.read_span(&buf, &region, off)?;
            off = layout.span_end(&span);
            records += 1;
        }

        debug!(
            "chunked: loaded {} record(s) in {} chunk(s), chunk_size={}, {} B",
            records,
            h.count,
            h.size,
            buf.len()
        );

        self.buf = buf;
        self.layout = layout;
        self.chunk_count = h.count;
        self.records = records;
        Ok(())
    }

    // ---------- accessors ----------

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.layout.chunk_size()
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count as usize
    }

    /// Число записей (не чанков).
    #[inline]
    pub fn len(&self) -> usize {
        self.records
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    #[inline]
    pub fn strings_start(&self) -> usize {
        HEADER_SIZE
    }

    #[inline]
    fn region(&self) -> Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.chunk_count() * self.chunk_size()
    }

    /// Текущий буфер как есть.
    #[inline]
    pub fn save(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Сколько чанков займёт запись из `size` байт (key + payload).
    #[inline]
    pub fn chunks_needed(&self, size: usize) -> usize {
        self.layout.chunks_needed(size)
    }

    /// Закодировать запись в чанки текущего размера. Возвращает (байты, число чанков).
    pub fn encode_record(&self, key: &[u8], payload: &[u8]) -> Result<(Vec<u8>, usize)> {
        self.layout.encode_record(key, payload)
    }

    /// Прочитать запись по смещению любого её чанка.
    pub fn get_record_at_chunk_offset(&self, offset: usize) -> Result<ChunkedRecord> {
        let region = self.region();
        let start = self.layout.rewind_to_record_start(&self.buf, &region, offset)?;
        let span = self.layout.read_span(&self.buf, &region, start)?;
        Ok(self.materialize(&span))
    }

    fn materialize(&self, span: &RecordSpan) -> ChunkedRecord {
        ChunkedRecord {
            key: self.layout.read_key(&self.buf, span),
            payload: self.layout.read_payload(&self.buf, span),
            offset: span.offset,
            chunks: span.chunks,
        }
    }

    /// Бинарный поиск по номерам чанков [lo, hi). После сравнения с записью
    /// граница сдвигается за весь её span, а не только за пробный чанк.
    fn locate(&self, key: &[u8]) -> Result<Lookup> {
        let region = self.region();
        let cs = self.chunk_size();

        let mut lo = 0usize;
        let mut hi = self.chunk_count();
        let mut last: Option<(RecordSpan, Vec<u8>)> = None;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mid_off = region.start + mid * cs;
            let start = self.layout.rewind_to_record_start(&self.buf, &region, mid_off)?;
            let span = self.layout.read_span(&self.buf, &region, start)?;
            let rec_key = self.layout.read_key(&self.buf, &span);

            let first_chunk = (span.offset - region.start) / cs;
            match key.cmp(rec_key.as_slice()) {
                Ordering::Equal => return Ok(Lookup::Hit(span)),
                Ordering::Less => hi = first_chunk,
                Ordering::Greater => lo = first_chunk + span.chunks,
            }
            last = Some((span, rec_key));
        }

        Ok(match last {
            Some((anchor, anchor_key)) => Lookup::Miss { anchor, anchor_key },
            None => Lookup::Empty,
        })
    }

    // ---------- operations ----------

    /// Точный поиск.
    pub fn search(&self, key: &[u8]) -> Result<ChunkedRecord> {
        if key.is_empty() {
            return Err(SstError::EmptyKey);
        }
        match self.locate(key)? {
            Lookup::Hit(span) => {
                metrics::record_search(true);
                Ok(self.materialize(&span))
            }
            _ => {
                metrics::record_search(false);
                Err(SstError::KeyNotFound)
            }
        }
    }

    /// Неточный поиск: найденная запись, якорь для вставки или признак пустой таблицы.
    pub fn search_nearest(&self, key: &[u8]) -> Result<Nearest> {
        if key.is_empty() {
            return Err(SstError::EmptyKey);
        }
        Ok(match self.locate(key)? {
            Lookup::Hit(span) => Nearest::Exact(self.materialize(&span)),
            Lookup::Miss { anchor, .. } => Nearest::Anchor(self.materialize(&anchor)),
            Lookup::Empty => Nearest::EmptyTable,
        })
    }

    /// Вставить запись. С `overwrite=true` существующая запись заменяется целиком
    /// (число её чанков может измениться).
    pub fn insert(&mut self, key: &[u8], payload: &[u8], overwrite: bool) -> Result<()> {
        if key.is_empty() {
            return Err(SstError::EmptyKey);
        }
        let region = self.region();

        // [at, tail): вырезаемый диапазон (пустой, если ничего не заменяем).
        let (at, tail, removed) = match self.locate(key)? {
            Lookup::Empty => (region.start, region.start, 0),
            Lookup::Hit(span) => {
                if !overwrite {
                    return Err(SstError::DuplicateKey);
                }
                (span.offset, self.layout.span_end(&span), span.chunks)
            }
            Lookup::Miss { anchor, anchor_key } => {
                let at = if anchor_key.as_slice() < key {
                    self.layout.span_end(&anchor)
                } else {
                    anchor.offset
                };
                (at, at, 0)
            }
        };

        let added = self.layout.chunks_needed(key.len() + payload.len());
        let total = chunk_total(self.chunk_count() - removed, added)?;

        let mut out = Vec::with_capacity(HEADER_SIZE + total as usize * self.chunk_size());
        TableHeader::new(VERSION_CHUNKED, self.chunk_size() as u16, total).write_to(&mut out);
        out.extend_from_slice(&self.buf[region.start..at]);
        self.layout.encode_record_into(key, payload, &mut out)?;
        out.extend_from_slice(&self.buf[tail..region.end]);

        debug!(
            "chunked: {} key_len={} payload_len={} at off={} (+{} / -{} chunks), rebuilt {} B",
            if removed > 0 { "overwrite" } else { "insert" },
            key.len(),
            payload.len(),
            at,
            added,
            removed,
            out.len()
        );
        if removed > 0 {
            metrics::record_overwrite();
        } else {
            metrics::record_insert();
            self.records += 1;
        }
        metrics::record_rebuild(out.len());

        self.buf = out;
        self.chunk_count = total;
        Ok(())
    }

    /// Удалить запись по ключу.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(SstError::EmptyKey);
        }
        let span = match self.locate(key)? {
            Lookup::Hit(span) => span,
            _ => {
                metrics::record_search(false);
                return Err(SstError::KeyNotFound);
            }
        };

        let region = self.region();
        let end = self.layout.span_end(&span);
        let total = self.chunk_count() - span.chunks;

        let mut out = Vec::with_capacity(HEADER_SIZE + total * self.chunk_size());
        TableHeader::new(VERSION_CHUNKED, self.chunk_size() as u16, total as u32)
            .write_to(&mut out);
        out.extend_from_slice(&self.buf[region.start..span.offset]);
        out.extend_from_slice(&self.buf[end..region.end]);

        debug!(
            "chunked: delete at off={} (-{} chunks), rebuilt {} B",
            span.offset,
            span.chunks,
            out.len()
        );
        metrics::record_delete();
        metrics::record_rebuild(out.len());

        self.buf = out;
        self.chunk_count = total as u32;
        self.records -= 1;
        Ok(())
    }

    /// Обход записей в порядке хранения.
    pub fn iter(&self) -> ChunkedIter<'_> {
        ChunkedIter {
            table: self,
            off: HEADER_SIZE,
            failed: false,
        }
    }

    /// Полная проверка: разбиение на записи, счётчики и строгий порядок ключей.
    pub fn check(&self) -> CheckReport {
        let mut report = CheckReport::new(FormatVersion::Chunked, self.buf.len());
        report.chunks = Some(self.chunk_count());

        match read_header(&self.buf, VERSION_CHUNKED) {
            Ok(h) => {
                if h.count != self.chunk_count {
                    report.problem(format!(
                        "header chunk_count {} != table chunk_count {}",
                        h.count, self.chunk_count
                    ));
                }
                if h.size as usize != self.chunk_size() {
                    report.problem(format!(
                        "header chunk_size {} != table chunk_size {}",
                        h.size,
                        self.chunk_size()
                    ));
                }
            }
            Err(e) => {
                report.problem(format!("header: {}", e));
                return report;
            }
        }
        if self.region().end != self.buf.len() {
            report.problem(format!(
                "buffer is {} B, layout requires {} B",
                self.buf.len(),
                self.region().end
            ));
            return report;
        }

        let mut prev: Option<Vec<u8>> = None;
        let mut records = 0usize;
        let mut chunks = 0usize;
        for rec in self.iter() {
            let rec = match rec {
                Ok(r) => r,
                Err(e) => {
                    report.problem(e.to_string());
                    break;
                }
            };
            if rec.key.is_empty() {
                report.problem(format!("empty key at off={}", rec.offset));
            }
            if let Some(p) = &prev {
                if p.as_slice() >= rec.key.as_slice() {
                    report.problem(format!("keys out of order at off={}", rec.offset));
                }
            }
            records += 1;
            chunks += rec.chunks;
            prev = Some(rec.key);
        }

        report.records = records;
        if records != self.records {
            report.problem(format!(
                "walked {} record(s), table tracks {}",
                records, self.records
            ));
        }
        if report.ok() && chunks != self.chunk_count() {
            report.problem(format!(
                "records cover {} chunk(s), header declares {}",
                chunks,
                self.chunk_count()
            ));
        }
        report
    }
}

/// Число чанков таблицы после вставки; поле count заголовка v2 имеет ширину u32.
fn chunk_total(kept: usize, added: usize) -> Result<u32> {
    let total = kept.saturating_add(added);
    u32::try_from(total).map_err(|_| {
        SstError::TooLarge(format!("table would hold {} chunks (max {})", total, u32::MAX))
    })
}

/// Итератор по записям v2. После первой ошибки разбора останавливается.
pub struct ChunkedIter<'a> {
    table: &'a ChunkedTable,
    off: usize,
    failed: bool,
}

impl Iterator for ChunkedIter<'_> {
    type Item = Result<ChunkedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let region = self.table.region();
        if self.failed || self.off >= region.end {
            return None;
        }
        match self.table.layout.read_span(&self.table.buf, &region, self.off) {
            Ok(span) => {
                self.off = self.table.layout.span_end(&span);
                Some(Ok(self.table.materialize(&span)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
