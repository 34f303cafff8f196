//! Multi-pattern signature scanning over layers.
//!
//! A [`PatternSet`] compiles a finite set of byte signatures into one
//! Aho-Corasick automaton and walks a [`Layer`] in bounded chunks, yielding
//! [`ScanHit`]s in non-decreasing offset order. The scan is a pull-based
//! iterator: a consumer that has what it needs simply stops, and the rest
//! of the image is never read.
//!
//! Unreadable chunks are skipped, not fatal. Progress reporting is an
//! advisory callback and has no effect on the scan itself.

use std::collections::VecDeque;

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::debug;

use crate::error::{Result, VestigeError};
use crate::layer::Layer;

/// Bytes scanned per chunk.
pub const CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Longest trailing field a key-value signature may carry, including room
/// for the terminating newline. A field that has not terminated within the
/// window is treated as no match.
pub const VALUE_WINDOW: usize = 32;

/// Advisory completion callback, called with a fraction in `0.0..=1.0`.
pub type ProgressFn<'a> = dyn FnMut(f64) + 'a;

/// A byte signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Fixed byte string, e.g. an OS build banner.
    Literal(Vec<u8>),
    /// Fixed prefix followed by `=`, a non-empty run of non-newline bytes,
    /// and a terminating `\n`. The run is extracted as the hit's value.
    KeyValue { prefix: Vec<u8> },
}

impl Pattern {
    /// The literal bytes fed to the automaton.
    pub fn needle(&self) -> &[u8] {
        match self {
            Pattern::Literal(bytes) => bytes,
            Pattern::KeyValue { prefix } => prefix,
        }
    }

    /// Longest span a match of this pattern can occupy in the layer.
    fn max_span(&self) -> usize {
        match self {
            Pattern::Literal(bytes) => bytes.len(),
            Pattern::KeyValue { prefix } => prefix.len() + 1 + VALUE_WINDOW,
        }
    }
}

/// One match: the offset where the signature begins, the index of the
/// pattern within its [`PatternSet`], and the extracted trailing field for
/// key-value patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub offset: u64,
    pub pattern: usize,
    pub value: Option<Vec<u8>>,
}

/// A compiled, immutable set of signatures.
///
/// Overlap policy: matches are non-overlapping and leftmost; where several
/// patterns match at one offset the longest needle wins, and among equal
/// lengths the pattern added to the set first wins. The policy is
/// deterministic for any fixed pattern order.
#[derive(Debug)]
pub struct PatternSet {
    ac: AhoCorasick,
    patterns: Vec<Pattern>,
    overlap: usize,
}

impl PatternSet {
    /// Compile `patterns`. An empty set (or an empty signature) is a
    /// programmer error, not a scannable input.
    pub fn new(patterns: Vec<Pattern>) -> Result<Self> {
        if patterns.is_empty() {
            return Err(VestigeError::EmptyPatternSet);
        }
        if patterns.iter().any(|p| p.needle().is_empty()) {
            return Err(VestigeError::PatternBuild(
                "empty signature in pattern set".to_string(),
            ));
        }
        let ac = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(patterns.iter().map(|p| p.needle()))
            .map_err(|e| VestigeError::PatternBuild(e.to_string()))?;
        let overlap = patterns
            .iter()
            .map(Pattern::max_span)
            .max()
            .unwrap_or(0);
        Ok(Self {
            ac,
            patterns,
            overlap,
        })
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Begin a lazy scan of `layer`.
    ///
    /// Each call re-reads from offset zero; the returned iterator is not
    /// restartable. Dropping it aborts the scan.
    pub fn scan<'s>(
        &'s self,
        layer: &'s dyn Layer,
        progress: Option<Box<ProgressFn<'s>>>,
    ) -> Scan<'s> {
        Scan {
            set: self,
            layer,
            progress,
            chunk_size: CHUNK_SIZE,
            chunk_base: 0,
            buf: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

/// Lazy hit sequence produced by [`PatternSet::scan`].
pub struct Scan<'s> {
    set: &'s PatternSet,
    layer: &'s dyn Layer,
    progress: Option<Box<ProgressFn<'s>>>,
    chunk_size: usize,
    chunk_base: u64,
    buf: Vec<u8>,
    pending: VecDeque<ScanHit>,
    done: bool,
}

impl Scan<'_> {
    fn report(&mut self, fraction: f64) {
        if let Some(cb) = self.progress.as_mut() {
            cb(fraction.clamp(0.0, 1.0));
        }
    }

    /// Read and scan the next chunk, queueing its hits.
    ///
    /// Each chunk owns matches *starting* in `[chunk_base, limit)`; the read
    /// extends past `limit` by the pattern-set overlap so a match straddling
    /// the seam is still seen whole, while matches starting at or after
    /// `limit` are left for the next chunk. That keeps the emitted sequence
    /// strictly non-decreasing and free of duplicates.
    fn advance_chunk(&mut self) {
        let layer_len = self.layer.len();
        if self.chunk_base >= layer_len {
            self.done = true;
            self.report(1.0);
            return;
        }

        let limit = layer_len.min(self.chunk_base + self.chunk_size as u64);
        let read_end = layer_len.min(limit + self.set.overlap as u64);
        let size = (read_end - self.chunk_base) as usize;
        self.buf.resize(size, 0);

        match self.layer.read(self.chunk_base, &mut self.buf) {
            Ok(()) => self.queue_chunk_hits(limit),
            Err(e) => {
                debug!(
                    layer = self.layer.name(),
                    offset = self.chunk_base,
                    size,
                    %e,
                    "skipping unreadable chunk"
                );
            }
        }

        self.chunk_base = limit;
        self.report(limit as f64 / layer_len as f64);
    }

    fn queue_chunk_hits(&mut self, limit: u64) {
        let base = self.chunk_base;
        for m in self.set.ac.find_iter(&self.buf) {
            let offset = base + m.start() as u64;
            if offset >= limit {
                break;
            }
            let index = m.pattern().as_usize();
            let value = match &self.set.patterns[index] {
                Pattern::Literal(_) => None,
                Pattern::KeyValue { prefix } => {
                    match extract_value(&self.buf[m.start()..], prefix.len()) {
                        Some(v) => Some(v),
                        // Field did not parse: no match at this offset.
                        None => continue,
                    }
                }
            };
            self.pending.push_back(ScanHit {
                offset,
                pattern: index,
                value,
            });
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = ScanHit;

    fn next(&mut self) -> Option<ScanHit> {
        loop {
            if let Some(hit) = self.pending.pop_front() {
                return Some(hit);
            }
            if self.done {
                return None;
            }
            self.advance_chunk();
        }
    }
}

/// Extract the trailing field of a key-value match.
///
/// `window` starts at the match offset. The grammar is the prefix, a `=`
/// delimiter, one or more non-newline bytes, and a terminating `\n` within
/// [`VALUE_WINDOW`].
fn extract_value(window: &[u8], prefix_len: usize) -> Option<Vec<u8>> {
    let rest = window.get(prefix_len..)?;
    if rest.first() != Some(&b'=') {
        return None;
    }
    let field = &rest[1..rest.len().min(1 + VALUE_WINDOW)];
    let end = memchr::memchr(b'\n', field)?;
    if end == 0 {
        return None;
    }
    Some(field[..end].to_vec())
}
