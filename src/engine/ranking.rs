//! Top-K Ranking
//!
//! Exact brute-force similarity scan over the full vocabulary. Large
//! vocabularies are sharded across scoped worker threads; per-shard
//! winners merge under the same ordering as the sequential scan, so both
//! paths return identical rankings.

use std::cmp::Ordering;

use tracing::debug;

use crate::store::VectorStore;

use super::similarity::dot_product;

/// Vocabularies below this size always take the sequential path
const PARALLEL_MIN_ENTRIES: usize = 8192;

/// One scored vocabulary entry
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub index: usize,
    pub score: f32,
}

/// Descending score; equal scores fall back to ascending insertion index
fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.index.cmp(&b.index))
}

/// Score every entry outside `exclude` against `query` and keep the top
/// `k` under [`rank_order`].
pub(crate) fn top_k(
    store: &VectorStore,
    query: &[f32],
    exclude: &[usize],
    k: usize,
    scan_workers: usize,
) -> Vec<Candidate> {
    if k == 0 || store.is_empty() {
        return Vec::new();
    }

    let workers = effective_workers(scan_workers, store.len());
    let mut candidates = if workers <= 1 {
        scan_range(store, query, exclude, 0, store.len())
    } else {
        sharded_scan(store, query, exclude, k, workers)
    };

    select_top(&mut candidates, k);
    candidates
}

fn effective_workers(configured: usize, entries: usize) -> usize {
    if entries < PARALLEL_MIN_ENTRIES {
        return 1;
    }
    if configured == 0 {
        num_cpus::get()
    } else {
        configured
    }
}

fn sharded_scan(
    store: &VectorStore,
    query: &[f32],
    exclude: &[usize],
    k: usize,
    workers: usize,
) -> Vec<Candidate> {
    let len = store.len();
    let chunk = (len + workers - 1) / workers;
    debug!("sharded scan: {} workers over {} entries", workers, len);

    crossbeam::thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for w in 0..workers {
            let lo = w * chunk;
            let hi = ((w + 1) * chunk).min(len);
            if lo >= hi {
                break;
            }
            handles.push(s.spawn(move |_| {
                let mut local = scan_range(store, query, exclude, lo, hi);
                select_top(&mut local, k);
                local
            }));
        }

        let mut merged = Vec::with_capacity(handles.len() * k);
        for handle in handles {
            merged.extend(handle.join().expect("scan worker panicked"));
        }
        merged
    })
    .expect("scan scope panicked")
}

fn scan_range(
    store: &VectorStore,
    query: &[f32],
    exclude: &[usize],
    lo: usize,
    hi: usize,
) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(hi - lo);
    for index in lo..hi {
        if exclude.contains(&index) {
            continue;
        }
        out.push(Candidate {
            index,
            score: dot_product(query, store.row(index)),
        });
    }
    out
}

fn select_top(candidates: &mut Vec<Candidate>, k: usize) {
    candidates.sort_by(rank_order);
    candidates.truncate(k);
}
