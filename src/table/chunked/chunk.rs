//! table/chunked/chunk: геометрия чанков v2, заголовок чанка, кодирование и сборка записей.
//!
//! Чанк: [total_chunks u16][chunk_index u16][key_len u16][payload_len u16][data (chunk_size-8)].
//! Данные записи: поток key ‖ payload, нарезанный по (chunk_size-8) байт; хвост последнего
//! чанка заполняется нулями. key_len/payload_len повторяются в каждом чанке записи.

use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

use crate::error::{Result, SstError};
use crate::table::common::{
    CHUNK_HDR_SIZE, CHUNK_OFF_INDEX, CHUNK_OFF_KEY_LEN, CHUNK_OFF_PAYLOAD_LEN, CHUNK_OFF_TOTAL,
};

/// Заголовок одного чанка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub total: u16,
    pub index: u16,
    pub key_len: u16,
    pub payload_len: u16,
}

impl ChunkHeader {
    #[inline]
    fn decode(b: &[u8]) -> Self {
        Self {
            total: LittleEndian::read_u16(&b[CHUNK_OFF_TOTAL..CHUNK_OFF_TOTAL + 2]),
            index: LittleEndian::read_u16(&b[CHUNK_OFF_INDEX..CHUNK_OFF_INDEX + 2]),
            key_len: LittleEndian::read_u16(&b[CHUNK_OFF_KEY_LEN..CHUNK_OFF_KEY_LEN + 2]),
            payload_len: LittleEndian::read_u16(
                &b[CHUNK_OFF_PAYLOAD_LEN..CHUNK_OFF_PAYLOAD_LEN + 2],
            ),
        }
    }

    #[inline]
    fn encode(&self, b: &mut [u8]) {
        LittleEndian::write_u16(&mut b[CHUNK_OFF_TOTAL..CHUNK_OFF_TOTAL + 2], self.total);
        LittleEndian::write_u16(&mut b[CHUNK_OFF_INDEX..CHUNK_OFF_INDEX + 2], self.index);
        LittleEndian::write_u16(&mut b[CHUNK_OFF_KEY_LEN..CHUNK_OFF_KEY_LEN + 2], self.key_len);
        LittleEndian::write_u16(
            &mut b[CHUNK_OFF_PAYLOAD_LEN..CHUNK_OFF_PAYLOAD_LEN + 2],
            self.payload_len,
        );
    }
}

/// Положение записи в буфере: первый чанк, число чанков и длины ключа/payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    pub offset: usize,
    pub chunks: usize,
    pub key_len: usize,
    pub payload_len: usize,
}

/// Геометрия чанков для заданного chunk_size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    chunk_size: usize,
}

impl ChunkLayout {
    /// chunk_size обязан быть больше заголовка чанка, иначе в чанк не помещаются данные.
    pub fn new(chunk_size: u16) -> Result<Self> {
        let cs = chunk_size as usize;
        if cs <= CHUNK_HDR_SIZE {
            return Err(SstError::InvalidChunkSize(cs));
        }
        Ok(Self { chunk_size: cs })
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Байт данных в одном чанке.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunk_size - CHUNK_HDR_SIZE
    }

    /// Сколько чанков займёт запись из `size` байт данных.
    /// Пустая запись всё равно занимает один чанк (в нём живёт заголовок).
    #[inline]
    pub fn chunks_needed(&self, size: usize) -> usize {
        size.div_ceil(self.capacity()).max(1)
    }

    #[inline]
    pub fn span_end(&self, span: &RecordSpan) -> usize {
        span.offset + span.chunks * self.chunk_size
    }

    /// Закодировать запись в отдельный буфер. Возвращает (байты, число чанков).
    pub fn encode_record(&self, key: &[u8], payload: &[u8]) -> Result<(Vec<u8>, usize)> {
        let chunks = self.chunks_needed(key.len() + payload.len());
        let mut out = Vec::with_capacity(chunks * self.chunk_size);
        let n = self.encode_record_into(key, payload, &mut out)?;
        Ok((out, n))
    }

    /// Дописать чанки записи в конец `out`. Возвращает число чанков.
    pub fn encode_record_into(
        &self,
        key: &[u8],
        payload: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<usize> {
        if key.len() > u16::MAX as usize || payload.len() > u16::MAX as usize {
            return Err(SstError::TooLarge(format!(
                "key_len={} / payload_len={} exceed {}",
                key.len(),
                payload.len(),
                u16::MAX
            )));
        }
        let total_len = key.len() + payload.len();
        let n = self.chunks_needed(total_len);
        if n > u16::MAX as usize {
            return Err(SstError::TooLarge(format!(
                "record needs {} chunks (max {})",
                n,
                u16::MAX
            )));
        }

        let cs = self.chunk_size;
        let cap = self.capacity();
        let base = out.len();
        out.resize(base + n * cs, 0);

        // Поток данных key ‖ payload режется на куски по cap байт.
        let mut pos = 0usize;
        for i in 0..n {
            let chunk = &mut out[base + i * cs..base + (i + 1) * cs];
            ChunkHeader {
                total: n as u16,
                index: i as u16,
                key_len: key.len() as u16,
                payload_len: payload.len() as u16,
            }
            .encode(&mut chunk[..CHUNK_HDR_SIZE]);

            let take = cap.min(total_len - pos);
            let data = &mut chunk[CHUNK_HDR_SIZE..CHUNK_HDR_SIZE + take];
            copy_stream(key, payload, pos, data);
            pos += take;
        }
        Ok(n)
    }

    /// Прочитать заголовок чанка по смещению `off` (выравнивание и границы региона проверяются).
    pub fn read_header(
        &self,
        buf: &[u8],
        region: &Range<usize>,
        off: usize,
    ) -> Result<ChunkHeader> {
        if off < region.start
            || off + self.chunk_size > region.end
            || (off - region.start) % self.chunk_size != 0
        {
            return Err(SstError::Corrupt(format!(
                "offset {} is not a chunk boundary inside [{}, {})",
                off, region.start, region.end
            )));
        }
        Ok(ChunkHeader::decode(&buf[off..off + CHUNK_HDR_SIZE]))
    }

    /// Перемотать смещение любого чанка записи к её первому чанку:
    /// off - chunk_index * chunk_size.
    pub fn rewind_to_record_start(
        &self,
        buf: &[u8],
        region: &Range<usize>,
        off: usize,
    ) -> Result<usize> {
        let h = self.read_header(buf, region, off)?;
        let back = h.index as usize * self.chunk_size;
        if back > off - region.start {
            return Err(SstError::Corrupt(format!(
                "chunk at {} claims index {} before region start",
                off, h.index
            )));
        }
        Ok(off - back)
    }

    /// Разобрать границы записи, начинающейся ровно в `start`.
    /// Проверяет заголовки всех чанков записи.
    pub fn read_span(&self, buf: &[u8], region: &Range<usize>, start: usize) -> Result<RecordSpan> {
        let first = self.read_header(buf, region, start)?;
        if first.index != 0 || first.total == 0 {
            return Err(SstError::Corrupt(format!(
                "chunk at {} is not a record start (index={}, total={})",
                start, first.index, first.total
            )));
        }

        let chunks = first.total as usize;
        let data_len = first.key_len as usize + first.payload_len as usize;
        if self.chunks_needed(data_len) != chunks {
            return Err(SstError::Corrupt(format!(
                "record at {} spans {} chunks, {} B of data needs {}",
                start,
                chunks,
                data_len,
                self.chunks_needed(data_len)
            )));
        }
        let end = start + chunks * self.chunk_size;
        if end > region.end {
            return Err(SstError::Corrupt(format!(
                "record at {} runs past region end {}",
                start, region.end
            )));
        }

        for i in 1..chunks {
            let h = self.read_header(buf, region, start + i * self.chunk_size)?;
            if h.total != first.total
                || h.index as usize != i
                || h.key_len != first.key_len
                || h.payload_len != first.payload_len
            {
                return Err(SstError::Corrupt(format!(
                    "chunk {} of record at {} has inconsistent header {:?}",
                    i, start, h
                )));
            }
        }

        Ok(RecordSpan {
            offset: start,
            chunks,
            key_len: first.key_len as usize,
            payload_len: first.payload_len as usize,
        })
    }

    /// Собрать ключ записи.
    pub fn read_key(&self, buf: &[u8], span: &RecordSpan) -> Vec<u8> {
        self.gather(buf, span, 0..span.key_len)
    }

    /// Собрать payload записи (начинается сразу после последнего байта ключа).
    pub fn read_payload(&self, buf: &[u8], span: &RecordSpan) -> Vec<u8> {
        self.gather(buf, span, span.key_len..span.key_len + span.payload_len)
    }

    /// Скопировать диапазон потока данных записи из чанков.
    fn gather(&self, buf: &[u8], span: &RecordSpan, range: Range<usize>) -> Vec<u8> {
        let cap = self.capacity();
        let mut out = Vec::with_capacity(range.len());
        let mut pos = range.start;
        while pos < range.end {
            let chunk = pos / cap;
            let within = pos % cap;
            let take = (cap - within).min(range.end - pos);
            let abs = span.offset + chunk * self.chunk_size + CHUNK_HDR_SIZE + within;
            out.extend_from_slice(&buf[abs..abs + take]);
            pos += take;
        }
        out
    }
}

/// Скопировать в `dst` кусок потока key ‖ payload, начиная с позиции `pos`.
fn copy_stream(key: &[u8], payload: &[u8], pos: usize, dst: &mut [u8]) {
    let mut written = 0;
    if pos < key.len() {
        let n = (key.len() - pos).min(dst.len());
        dst[..n].copy_from_slice(&key[pos..pos + n]);
        written = n;
    }
    if written < dst.len() {
        let p = pos + written - key.len();
        let n = dst.len() - written;
        dst[written..].copy_from_slice(&payload[p..p + n]);
    }
}
