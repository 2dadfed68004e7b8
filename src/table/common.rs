//! table/common: общие константы и offset'ы заголовков v1 (fixed) и v2 (chunked).
//!
//! Все целые в обоих форматах: little-endian (включая массив offset'ов v1).

// ---------- Общий заголовок ----------

/// 8-байтовая магия семейства форматов (общая для v1 и v2, различаются версией).
pub const TABLE_MAGIC: &[u8; 8] = b"YPySSTbl";

/// Версия формата с фиксированным размером payload.
pub const VERSION_FIXED: u16 = 1;

/// Версия формата с чанками.
pub const VERSION_CHUNKED: u16 = 2;

/// Размер заголовка таблицы: [magic 8][version u16][size u16][count u32].
pub const HEADER_SIZE: usize = 16;

/// Смещение magic (8 байт).
pub const OFF_MAGIC: usize = 0;
/// Смещение version (u16).
pub const OFF_VERSION: usize = 8;
/// Смещение size (u16): payload_size для v1, chunk_size для v2.
pub const OFF_SIZE: usize = 10;
/// Смещение count (u32): число записей для v1, число чанков для v2.
pub const OFF_COUNT: usize = 12;

// ---------- v1 (fixed) ----------

/// Размер одного offset'а в индексе v1.
pub const OFFSET_SIZE: usize = 4;

// ---------- v2 (chunked) ----------

/// Заголовок чанка: [total_chunks u16][chunk_index u16][key_len u16][payload_len u16].
pub const CHUNK_HDR_SIZE: usize = 8;

/// Смещения полей внутри заголовка чанка.
pub const CHUNK_OFF_TOTAL: usize = 0;
pub const CHUNK_OFF_INDEX: usize = 2;
pub const CHUNK_OFF_KEY_LEN: usize = 4;
pub const CHUNK_OFF_PAYLOAD_LEN: usize = 6;
