//! Lightweight global metrics for QuiverSST.
//!
//! Потокобезопасные атомарные счётчики (Relaxed) для обоих кодеков:
//! - поиск (hit/miss)
//! - вставки / перезаписи / удаления
//! - пересборки буфера (количество и суммарный объём)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Search -----
static SEARCHES_TOTAL: AtomicU64 = AtomicU64::new(0);
static SEARCH_HITS: AtomicU64 = AtomicU64::new(0);
static SEARCH_MISSES: AtomicU64 = AtomicU64::new(0);

// ----- Mutations -----
static INSERTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static OVERWRITES_TOTAL: AtomicU64 = AtomicU64::new(0);
static DELETES_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- Rebuilds -----
static REBUILDS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REBUILD_BYTES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub searches_total: u64,
    pub search_hits: u64,
    pub search_misses: u64,

    pub inserts_total: u64,
    pub overwrites_total: u64,
    pub deletes_total: u64,

    pub rebuilds_total: u64,
    pub rebuild_bytes: u64,
}

impl MetricsSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        if self.searches_total == 0 {
            0.0
        } else {
            self.search_hits as f64 / self.searches_total as f64
        }
    }

    pub fn avg_rebuild_bytes(&self) -> f64 {
        if self.rebuilds_total == 0 {
            0.0
        } else {
            self.rebuild_bytes as f64 / self.rebuilds_total as f64
        }
    }
}

// ----- Recorders -----
pub fn record_search(hit: bool) {
    SEARCHES_TOTAL.fetch_add(1, Ordering::Relaxed);
    if hit {
        SEARCH_HITS.fetch_add(1, Ordering::Relaxed);
    } else {
        SEARCH_MISSES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_insert() {
    INSERTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_overwrite() {
    OVERWRITES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_delete() {
    DELETES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rebuild(bytes: usize) {
    REBUILDS_TOTAL.fetch_add(1, Ordering::Relaxed);
    REBUILD_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        searches_total: SEARCHES_TOTAL.load(Ordering::Relaxed),
        search_hits: SEARCH_HITS.load(Ordering::Relaxed),
        search_misses: SEARCH_MISSES.load(Ordering::Relaxed),

        inserts_total: INSERTS_TOTAL.load(Ordering::Relaxed),
        overwrites_total: OVERWRITES_TOTAL.load(Ordering::Relaxed),
        deletes_total: DELETES_TOTAL.load(Ordering::Relaxed),

        rebuilds_total: REBUILDS_TOTAL.load(Ordering::Relaxed),
        rebuild_bytes: REBUILD_BYTES.load(Ordering::Relaxed),
    }
}
