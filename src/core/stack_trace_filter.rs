//! Stack trace deduplication
//!
//! Repeated exceptions (retry loops, hot error paths) are recognised with a
//! shared bloom filter keyed by the shape of their stack traces. The first
//! occurrence of a shape is serialized in full; later ones are elided.
//!
//! The filter never yields false negatives. False positives only cost
//! fidelity: an unseen trace may be elided.
//!
//! # Example
//!
//! ```
//! use rust_json_logger::core::{Fingerprint, StackFrame, StackTraceFilter};
//!
//! let filter = StackTraceFilter::bloom(1024, 0.01);
//! let frames = [StackFrame::new("orders.Service", "place", Some("service.rs"), Some(42))];
//! let fingerprint = Fingerprint::of_frames(&frames);
//!
//! assert!(!filter.check(&fingerprint));
//! filter.mark(&fingerprint);
//! assert!(filter.check(&fingerprint));
//! ```

use super::throwable::{StackFrame, Throwable};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use xxhash_rust::xxh3::Xxh3;

const SEED_PRIMARY: u64 = 0x9E37_79B9_7F4A_7C15;
const SEED_SECONDARY: u64 = 0xC2B2_AE3D_27D4_EB4F;
const FRAME_SEPARATOR: u8 = 0x1F;
const THROWABLE_SEPARATOR: u8 = 0x1E;
const MAX_HASHES: u32 = 16;
/// The filter clears once its estimated false positive rate exceeds the target by this factor
const SATURATION_FACTOR: f64 = 4.0;
/// Upper bound on the fill fraction that triggers a clear
const MAX_FILL: f64 = 0.75;

/// Default number of distinct traces the shared filter is sized for
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default target false positive rate at capacity
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Hash of a stack shape, expanded into `k` bit positions by each filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    primary: u64,
    secondary: u64,
}

struct FingerprintHasher {
    primary: Xxh3,
    secondary: Xxh3,
}

impl FingerprintHasher {
    fn new() -> Self {
        Self {
            primary: Xxh3::with_seed(SEED_PRIMARY),
            secondary: Xxh3::with_seed(SEED_SECONDARY),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        self.primary.update(bytes);
        self.secondary.update(bytes);
    }

    fn frame(&mut self, frame: &StackFrame) {
        self.update(frame.class.as_bytes());
        self.update(&[FRAME_SEPARATOR]);
        self.update(frame.method.as_bytes());
        self.update(&[FRAME_SEPARATOR]);
        if let Some(file) = &frame.file {
            self.update(file.as_bytes());
        }
        self.update(&[FRAME_SEPARATOR]);
        self.update(&frame.line.unwrap_or(0).to_le_bytes());
    }

    fn finish(self) -> Fingerprint {
        Fingerprint {
            primary: self.primary.digest(),
            // odd step so double hashing visits distinct positions in a 2^n table
            secondary: self.secondary.digest() | 1,
        }
    }
}

impl Fingerprint {
    /// Fingerprint of a plain frame sequence
    pub fn of_frames<'a, I>(frames: I) -> Self
    where
        I: IntoIterator<Item = &'a StackFrame>,
    {
        let mut hasher = FingerprintHasher::new();
        for frame in frames {
            hasher.frame(frame);
        }
        hasher.finish()
    }

    /// Fingerprint of a throwable's shape: the first `max_depth` frames of the
    /// throwable and of up to `traverse_depth` chained causes.
    ///
    /// Returns `None` when no frame is visible, since there is nothing to elide.
    pub fn of_throwable(throwable: &Throwable, max_depth: usize, traverse_depth: usize) -> Option<Self> {
        let mut hasher = FingerprintHasher::new();
        let mut seen_frames = false;

        for current in throwable.chain().take(traverse_depth.saturating_add(1)) {
            hasher.update(&[THROWABLE_SEPARATOR]);
            for frame in current.frames.iter().take(max_depth) {
                hasher.frame(frame);
                seen_frames = true;
            }
        }

        seen_frames.then(|| hasher.finish())
    }
}

/// Fixed-size bloom filter over atomic words
///
/// Set bits are counted. Once the fill implies a false positive rate above
/// four times the target (`fill^k > 4 * rate`), the filter clears itself so
/// precision does not decay toward "everything seen". A filter filled to its
/// design capacity sits well below that limit, so no mark is lost before then.
#[derive(Debug)]
pub struct BloomFilter {
    words: Box<[AtomicU64]>,
    mask: u64,
    num_hashes: u32,
    set_bits: AtomicUsize,
    saturation_limit: usize,
}

impl BloomFilter {
    /// Size a filter for `capacity` distinct traces at `false_positive_rate`.
    ///
    /// The bit count is rounded up to a power of two (minimum 64) and the
    /// number of hashes is the optimum for the resulting size, capped at 16.
    pub fn with_capacity(capacity: usize, false_positive_rate: f64) -> Self {
        let capacity = capacity.max(1) as f64;
        let rate = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let ideal_bits = (-capacity * rate.ln() / (ln2 * ln2)).ceil() as usize;
        let num_bits = ideal_bits.max(64).next_power_of_two();
        let num_hashes = ((num_bits as f64 / capacity) * ln2).round() as u32;

        Self::build(num_bits, num_hashes, rate)
    }

    /// Build a filter with an explicit bit count (rounded up to a power of two) and hash count.
    ///
    /// Saturation is judged against [`DEFAULT_FALSE_POSITIVE_RATE`].
    pub fn with_size(num_bits: usize, num_hashes: u32) -> Self {
        Self::build(num_bits, num_hashes, DEFAULT_FALSE_POSITIVE_RATE)
    }

    fn build(num_bits: usize, num_hashes: u32, false_positive_rate: f64) -> Self {
        let num_bits = num_bits.max(64).next_power_of_two();
        let num_hashes = num_hashes.clamp(1, MAX_HASHES);
        let words = (0..num_bits / 64).map(|_| AtomicU64::new(0)).collect();

        Self {
            words,
            mask: (num_bits - 1) as u64,
            num_hashes,
            set_bits: AtomicUsize::new(0),
            saturation_limit: Self::saturation_limit_for(num_bits, num_hashes, false_positive_rate),
        }
    }

    /// Set-bit count whose fill fraction `f` satisfies `f^k = SATURATION_FACTOR * rate`
    fn saturation_limit_for(num_bits: usize, num_hashes: u32, false_positive_rate: f64) -> usize {
        let ceiling = (false_positive_rate * SATURATION_FACTOR).min(1.0);
        let fill = ceiling.powf(1.0 / f64::from(num_hashes)).min(MAX_FILL);
        (num_bits as f64 * fill) as usize
    }

    pub fn num_bits(&self) -> usize {
        self.words.len() * 64
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Set-bit count above which the filter clears itself
    pub fn saturation_limit(&self) -> usize {
        self.saturation_limit
    }

    /// Number of bits currently set (approximate under concurrent clears)
    pub fn set_bits(&self) -> usize {
        self.set_bits.load(Ordering::Relaxed)
    }

    /// Bit positions for a fingerprint
    pub fn positions(&self, fingerprint: &Fingerprint) -> impl Iterator<Item = usize> + '_ {
        let Fingerprint { primary, secondary } = *fingerprint;
        (0..u64::from(self.num_hashes)).map(move |i| {
            (primary.wrapping_add(i.wrapping_mul(secondary)) & self.mask) as usize
        })
    }

    #[inline]
    fn locate(position: usize) -> (usize, u64) {
        (position / 64, 1u64 << (position % 64))
    }

    pub fn check(&self, fingerprint: &Fingerprint) -> bool {
        self.positions(fingerprint).all(|position| {
            let (word, bit) = Self::locate(position);
            self.words[word].load(Ordering::Relaxed) & bit != 0
        })
    }

    pub fn mark(&self, fingerprint: &Fingerprint) {
        self.check_and_mark(fingerprint);
    }

    /// Set the fingerprint's bits, reporting whether all were already set
    pub fn check_and_mark(&self, fingerprint: &Fingerprint) -> bool {
        let mut seen = true;
        let mut newly_set = 0usize;

        for position in self.positions(fingerprint) {
            let (word, bit) = Self::locate(position);
            let previous = self.words[word].fetch_or(bit, Ordering::Relaxed);
            if previous & bit == 0 {
                seen = false;
                newly_set += 1;
            }
        }

        if newly_set > 0 {
            let total = self.set_bits.fetch_add(newly_set, Ordering::Relaxed) + newly_set;
            if total > self.saturation_limit {
                self.reset();
            }
        }

        seen
    }

    pub fn reset(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
        self.set_bits.store(0, Ordering::Relaxed);
    }
}

/// Filter consulted when serializing throwables
#[derive(Debug)]
pub enum StackTraceFilter {
    Bloom(BloomFilter),
    /// Never reports a trace as seen
    PassThrough,
}

impl StackTraceFilter {
    pub fn bloom(capacity: usize, false_positive_rate: f64) -> Self {
        StackTraceFilter::Bloom(BloomFilter::with_capacity(capacity, false_positive_rate))
    }

    pub fn check(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            StackTraceFilter::Bloom(filter) => filter.check(fingerprint),
            StackTraceFilter::PassThrough => false,
        }
    }

    pub fn mark(&self, fingerprint: &Fingerprint) {
        if let StackTraceFilter::Bloom(filter) = self {
            filter.mark(fingerprint);
        }
    }

    pub fn check_and_mark(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            StackTraceFilter::Bloom(filter) => filter.check_and_mark(fingerprint),
            StackTraceFilter::PassThrough => false,
        }
    }

    pub fn reset(&self) {
        if let StackTraceFilter::Bloom(filter) = self {
            filter.reset();
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, StackTraceFilter::PassThrough)
    }
}

impl Default for StackTraceFilter {
    fn default() -> Self {
        Self::bloom(DEFAULT_CAPACITY, DEFAULT_FALSE_POSITIVE_RATE)
    }
}
