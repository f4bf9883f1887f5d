//! Binary Vector Dump Loader
//!
//! Parser for the word2vec binary format: a text header line with the
//! vocabulary size and dimension, then one record per word holding the
//! raw little-endian floats.

use std::io::{self, BufRead, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Buf;
use hashbrown::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::l2_norm;

use super::vector_store::VectorStore;

/// Upper bound on the header line, delimiter included. Two decimal
/// integers never come close.
const HEADER_LIMIT: u64 = 128;

/// Errors raised while parsing a binary vector dump.
///
/// All of them abort the load; the store keeps its pre-load state.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Header line is not two positive whitespace-separated integers
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A record broke the word-token/separator/terminator framing
    #[error("malformed record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// The stream ended inside a record's float block
    #[error("truncated vector for word '{word}': expected {expected} bytes, read {got}")]
    TruncatedVector {
        word: String,
        expected: usize,
        got: usize,
    },

    /// The load's cancel token tripped
    #[error("load cancelled")]
    Cancelled,

    /// Non-format stream failure
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// Cooperative cancellation flag for a long-running load.
///
/// Clones share the same flag, so one clone can be handed to the loading
/// call while another cancels it from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new un-tripped token
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token; the load fails with `Cancelled` at the next record
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether the token has tripped
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Parse a complete dump into a fresh store.
///
/// Builds everything locally and only hands the store back on success,
/// so a failure can never publish partial state.
pub(crate) fn parse<R: BufRead>(
    mut reader: R,
    cancel: Option<&CancelToken>,
) -> Result<VectorStore, LoadError> {
    let start = Instant::now();

    let (vocab, dimension) = read_header(&mut reader)?;
    debug!("dump header: {} records, dimension {}", vocab, dimension);

    vocab
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            LoadError::MalformedHeader(format!("matrix size {}x{} overflows", vocab, dimension))
        })?;

    let mut words: Vec<String> = Vec::with_capacity(vocab);
    let mut index: HashMap<String, usize> = HashMap::with_capacity(vocab);
    let mut matrix: Vec<f32> = Vec::with_capacity(vocab * dimension);

    let mut word_buf: Vec<u8> = Vec::new();
    let mut float_buf = vec![0u8; dimension * 4];
    let mut row = vec![0.0f32; dimension];

    for record in 0..vocab {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
        }

        let word = read_word(&mut reader, &mut word_buf, record)?;

        let got = read_full(&mut reader, &mut float_buf)?;
        if got < float_buf.len() {
            return Err(LoadError::TruncatedVector {
                word,
                expected: float_buf.len(),
                got,
            });
        }
        let mut cursor = &float_buf[..];
        for slot in row.iter_mut() {
            *slot = cursor.get_f32_le();
        }

        read_terminator(&mut reader, record)?;

        // Unit-normalize up front so cosine similarity is a plain dot
        // product at query time. A zero-norm input stays a zero vector.
        let norm = l2_norm(&row);
        if norm == 0.0 {
            row.fill(0.0);
        } else {
            for x in row.iter_mut() {
                *x /= norm;
            }
        }

        // Duplicate words keep their first index; the last vector wins.
        match index.get(&word) {
            Some(&at) => {
                matrix[at * dimension..(at + 1) * dimension].copy_from_slice(&row);
            }
            None => {
                index.insert(word.clone(), words.len());
                words.push(word);
                matrix.extend_from_slice(&row);
            }
        }
    }

    if !reader.fill_buf()?.is_empty() {
        return Err(LoadError::MalformedRecord {
            index: vocab,
            reason: "trailing bytes after final record".to_string(),
        });
    }

    info!(
        "loaded {} vectors of dimension {} in {:?}",
        words.len(),
        dimension,
        start.elapsed()
    );

    Ok(VectorStore::from_parts(words, index, matrix, dimension))
}

/// Read and validate the `"<vocab> <dimension>\n"` header line
fn read_header<R: BufRead>(reader: &mut R) -> Result<(usize, usize), LoadError> {
    let mut limited = reader.take(HEADER_LIMIT);
    let mut line: Vec<u8> = Vec::new();
    limited.read_until(b'\n', &mut line)?;

    if line.last() != Some(&b'\n') {
        return Err(LoadError::MalformedHeader(
            "header line is not newline-terminated".to_string(),
        ));
    }
    line.pop();

    let text = std::str::from_utf8(&line)
        .map_err(|_| LoadError::MalformedHeader("header is not valid UTF-8".to_string()))?;

    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(LoadError::MalformedHeader(format!(
            "expected two integers, got '{}'",
            text
        )));
    }

    let vocab: usize = fields[0]
        .parse()
        .map_err(|_| LoadError::MalformedHeader(format!("bad vocabulary count '{}'", fields[0])))?;
    let dimension: usize = fields[1]
        .parse()
        .map_err(|_| LoadError::MalformedHeader(format!("bad dimension '{}'", fields[1])))?;

    if vocab == 0 || dimension == 0 {
        return Err(LoadError::MalformedHeader(
            "vocabulary count and dimension must be positive".to_string(),
        ));
    }

    Ok((vocab, dimension))
}

/// Read one space-terminated word token
fn read_word<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    record: usize,
) -> Result<String, LoadError> {
    buf.clear();
    let n = reader.read_until(b' ', buf)?;

    if n == 0 {
        return Err(LoadError::MalformedRecord {
            index: record,
            reason: "stream ended before word token".to_string(),
        });
    }
    if buf.last() != Some(&b' ') {
        return Err(LoadError::MalformedRecord {
            index: record,
            reason: "word token missing separator".to_string(),
        });
    }
    buf.pop();

    if buf.is_empty() {
        return Err(LoadError::MalformedRecord {
            index: record,
            reason: "empty word token".to_string(),
        });
    }

    String::from_utf8(buf.clone()).map_err(|_| LoadError::MalformedRecord {
        index: record,
        reason: "word token is not valid UTF-8".to_string(),
    })
}

/// Consume the record's trailing newline byte
fn read_terminator<R: BufRead>(reader: &mut R, record: usize) -> Result<(), LoadError> {
    let mut terminator = [0u8; 1];
    let got = read_full(reader, &mut terminator)?;

    if got == 0 {
        return Err(LoadError::MalformedRecord {
            index: record,
            reason: "stream ended before record terminator".to_string(),
        });
    }
    if terminator[0] != b'\n' {
        return Err(LoadError::MalformedRecord {
            index: record,
            reason: format!("record terminator is 0x{:02x}, not newline", terminator[0]),
        });
    }
    Ok(())
}

/// Fill `buf` from the reader, returning how many bytes actually arrived
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(word: &str, components: &[f32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(word.as_bytes());
        buf.push(b' ');
        for c in components {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        buf.push(b'\n');
        buf
    }

    fn dump(vocab: usize, dimension: usize, records: &[(&str, &[f32])]) -> Vec<u8> {
        let mut buf = format!("{} {}\n", vocab, dimension).into_bytes();
        for (word, components) in records {
            buf.extend_from_slice(&record(word, components));
        }
        buf
    }

    #[test]
    fn test_round_trip_normalized() {
        let buf = dump(2, 2, &[("dog", &[3.0, 4.0]), ("cat", &[1.0, 0.0])]);
        let store = VectorStore::from_reader(&buf[..]).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);

        let dog = store.get_vector("dog").unwrap();
        assert!((dog[0] - 0.6).abs() < 1e-6);
        assert!((dog[1] - 0.8).abs() < 1e-6);

        let cat = store.get_vector("cat").unwrap();
        assert!((cat[0] - 1.0).abs() < 1e-6);
        assert!(cat[1].abs() < 1e-6);

        let words: Vec<&str> = store.entries().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["dog", "cat"]);
    }

    #[test]
    fn test_zero_norm_stays_zero() {
        let buf = dump(1, 3, &[("void", &[0.0, 0.0, 0.0])]);
        let store = VectorStore::from_reader(&buf[..]).unwrap();
        assert_eq!(store.get_vector("void"), Some(&[0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_duplicate_word_last_wins() {
        let buf = dump(
            3,
            2,
            &[
                ("dog", &[1.0, 0.0]),
                ("cat", &[0.0, 1.0]),
                ("dog", &[0.0, 2.0]),
            ],
        );
        let store = VectorStore::from_reader(&buf[..]).unwrap();

        // One entry per unique word, first-insertion order kept
        assert_eq!(store.len(), 2);
        let words: Vec<&str> = store.entries().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["dog", "cat"]);

        // The later vector replaced the earlier one at the same index
        let dog = store.get_vector("dog").unwrap();
        assert!(dog[0].abs() < 1e-6);
        assert!((dog[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_headers() {
        let cases: &[&[u8]] = &[
            b"",
            b"2\n",
            b"a 5\n",
            b"2 b\n",
            b"0 5\n",
            b"5 0\n",
            b"-2 5\n",
            b"2 3 4\n",
            b"2 3", // no newline
        ];
        for case in cases {
            let err = VectorStore::from_reader(*case).unwrap_err();
            assert!(
                matches!(err, LoadError::MalformedHeader(_)),
                "case {:?} gave {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn test_missing_records_is_truncation() {
        // Header promises 3 records, stream holds 2
        let buf = dump(3, 5, &[("a", &[1.0; 5]), ("b", &[2.0; 5])]);
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 2, .. }));
    }

    #[test]
    fn test_truncated_vector_names_word() {
        let mut buf = b"1 4\n".to_vec();
        buf.extend_from_slice(b"cat ");
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.extend_from_slice(&2.0f32.to_le_bytes()); // 8 of 16 bytes

        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        match err {
            LoadError::TruncatedVector {
                word,
                expected,
                got,
            } => {
                assert_eq!(word, "cat");
                assert_eq!(expected, 16);
                assert_eq!(got, 8);
            }
            other => panic!("expected TruncatedVector, got {:?}", other),
        }
    }

    #[test]
    fn test_word_without_separator() {
        let mut buf = b"1 2\n".to_vec();
        buf.extend_from_slice(b"danglingword");
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_missing_record_terminator() {
        let mut buf = b"1 1\n".to_vec();
        buf.extend_from_slice(b"dog ");
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        // no trailing newline
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_wrong_record_terminator() {
        let mut buf = b"1 1\n".to_vec();
        buf.extend_from_slice(b"dog ");
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.push(b'\t');
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut buf = dump(1, 2, &[("dog", &[1.0, 0.0])]);
        buf.extend_from_slice(b"junk");
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn test_invalid_utf8_word() {
        let mut buf = b"1 1\n".to_vec();
        buf.extend_from_slice(&[0xFF, 0xFE, b' ']);
        buf.extend_from_slice(&1.0f32.to_le_bytes());
        buf.push(b'\n');
        let err = VectorStore::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn test_failed_load_leaves_store_empty_and_retryable() {
        let mut store = VectorStore::new();

        let bad = dump(2, 2, &[("dog", &[1.0, 0.0])]);
        assert!(store.load(&bad[..]).is_err());
        assert!(store.is_empty());

        let good = dump(1, 2, &[("dog", &[1.0, 0.0])]);
        store.load(&good[..]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failed_load_keeps_previous_contents() {
        let good = dump(1, 2, &[("dog", &[1.0, 0.0])]);
        let mut store = VectorStore::new();
        store.load(&good[..]).unwrap();

        let bad = dump(2, 2, &[("cat", &[1.0, 0.0])]);
        assert!(store.load(&bad[..]).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.contains("dog"));
    }

    #[test]
    fn test_cancelled_load() {
        let buf = dump(1, 2, &[("dog", &[1.0, 0.0])]);
        let token = CancelToken::new();
        token.cancel();

        let mut store = VectorStore::new();
        let err = store.load_with_cancel(&buf[..], &token).unwrap_err();
        assert!(matches!(err, LoadError::Cancelled));
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
