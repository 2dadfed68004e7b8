//! table/check: отчёт структурной проверки таблицы (аналог doctor/check для страниц).

use serde::Serialize;

use crate::table::FormatVersion;

/// Результат `check()`: сводка по таблице и список найденных проблем.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub format: FormatVersion,
    pub records: usize,
    /// Только для v2.
    pub chunks: Option<usize>,
    pub bytes: usize,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn new(format: FormatVersion, bytes: usize) -> Self {
        Self {
            format,
            records: 0,
            chunks: None,
            bytes,
            problems: Vec::new(),
        }
    }

    #[inline]
    pub fn ok(&self) -> bool {
        self.problems.is_empty()
    }

    pub(crate) fn problem(&mut self, msg: String) {
        self.problems.push(msg);
    }
}
