//! Rolling hashers and the Count-Min-Sketch fingerprint builder (`spec.md` §4.F).
//!
//! Three hasher families are exposed, as `spec.md` asks implementers to
//! offer all three while defaulting to one ("the utility of ... floating
//! variants is explicitly flagged as educational"): integer Rabin-Karp
//! ([`RabinKarpHasher`], the default), BuzHash ([`BuzHasher`]), and a
//! double-precision floating Rabin-Karp ([`FloatingRabinKarpHasher`]).
//! Grounded on `multiplying_rolling_hasher` / `polynomial_rolling_hasher` /
//! `buz_rolling_hasher` / `floating_rolling_hasher<double>` in
//! `examples/original_source/include/stringzillas/fingerprint.hpp`. The
//! multi-dimension builder mirrors `basic_rolling_hashers::operator()` in
//! `examples/original_source/include/stringzillas/fingerprints.hpp`,
//! including its branchless running-min/tie-count update.

use crate::error::{CoreError, CoreResult};
use crate::executor::Executor;
use crate::sequence::StringSequence;

/// Sentinel minimum hash for a dimension whose window never completed
/// (`spec.md` §3/§4.F: "count = 0 ⇔ minimum = u32::MAX").
pub const UNSET_MIN: u32 = u32::MAX;

/// A rolling hash over a fixed-width sliding window of bytes.
///
/// `push` folds in the first `window_width()` bytes of a stream; `roll`
/// advances the window by one byte once it has `window_width()` bytes of
/// history, per `spec.md` §4.F's push/roll/digest contract.
pub trait RollingHasher {
    /// Opaque per-stream state (the "current polynomial value").
    type State: Copy;

    fn window_width(&self) -> usize;

    /// Initial state before any bytes are pushed.
    fn init(&self) -> Self::State;

    /// Fold in one of the first `window_width()` bytes.
    fn push(&self, state: Self::State, new_byte: u8) -> Self::State;

    /// Advance the window by one byte once it is full.
    fn roll(&self, state: Self::State, old_byte: u8, new_byte: u8) -> Self::State;

    /// Truncate the state to a 32-bit output digest.
    fn digest(&self, state: Self::State) -> u32;
}

/// Integer Rabin-Karp rolling hash: `state <- state*A + (byte+1) mod p`.
/// The default hasher family per `spec.md` §9's Open Question on floating
/// variants being educational.
pub struct RabinKarpHasher {
    window_width: usize,
    multiplier: u64,
    modulus: u64,
    /// Precomputed `-(multiplier^(window_width-1)) mod modulus`, the term
    /// subtracted for the byte leaving the window.
    neg_high_power: u64,
}

impl RabinKarpHasher {
    /// Build a hasher over `window_width` bytes with the given multiplier
    /// and prime modulus.
    pub fn new(window_width: usize, multiplier: u64, modulus: u64) -> Self {
        assert!(window_width > 0, "window width must be positive");
        let mut high_power = 1u64;
        for _ in 0..window_width.saturating_sub(1) {
            high_power = high_power.wrapping_mul(multiplier) % modulus;
        }
        let neg_high_power = (modulus - high_power % modulus) % modulus;
        Self { window_width, multiplier, modulus, neg_high_power }
    }

    /// A reasonable default: a 4-byte window, a small prime multiplier,
    /// and a 61-bit Mersenne prime modulus.
    pub fn default_for_window(window_width: usize) -> Self {
        Self::new(window_width, 257, (1u64 << 61) - 1)
    }
}

impl RollingHasher for RabinKarpHasher {
    type State = u64;

    fn window_width(&self) -> usize {
        self.window_width
    }

    fn init(&self) -> u64 {
        0
    }

    fn push(&self, state: u64, new_byte: u8) -> u64 {
        (state.wrapping_mul(self.multiplier) + new_byte as u64 + 1) % self.modulus
    }

    fn roll(&self, state: u64, old_byte: u8, new_byte: u8) -> u64 {
        let advanced = state.wrapping_mul(self.multiplier) + new_byte as u64 + 1;
        let removed = (old_byte as u64 + 1).wrapping_mul(self.neg_high_power) % self.modulus;
        // `removed` already encodes subtraction via `neg_high_power`, so we add.
        (advanced + removed) % self.modulus
    }

    fn digest(&self, state: u64) -> u32 {
        state as u32
    }
}

/// BuzHash rolling hash: a 256-entry table keyed by byte value, combined
/// via XOR and a cyclic rotation by the window width, per
/// `buz_rolling_hasher`.
pub struct BuzHasher {
    window_width: usize,
    table: [u64; 256],
}

impl BuzHasher {
    /// Build a BuzHash table deterministically from `seed` (splitmix64),
    /// matching the original's "fixed-size lookup table" without requiring
    /// a runtime dependency on an RNG crate.
    pub fn new(window_width: usize, seed: u64) -> Self {
        assert!(window_width > 0, "window width must be positive");
        let mut table = [0u64; 256];
        let mut state = seed;
        for slot in table.iter_mut() {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            *slot = z ^ (z >> 31);
        }
        Self { window_width, table }
    }

    pub fn default_for_window(window_width: usize) -> Self {
        Self::new(window_width, 0x9E37_79B9_7F4A_7C15)
    }

    #[inline]
    fn rotate_left(value: u64, bits: u32) -> u64 {
        value.rotate_left(bits % 64)
    }
}

impl RollingHasher for BuzHasher {
    type State = u64;

    fn window_width(&self) -> usize {
        self.window_width
    }

    fn init(&self) -> u64 {
        0
    }

    fn push(&self, state: u64, new_byte: u8) -> u64 {
        Self::rotate_left(state, 1) ^ self.table[new_byte as usize]
    }

    fn roll(&self, state: u64, old_byte: u8, new_byte: u8) -> u64 {
        let leaving = Self::rotate_left(self.table[old_byte as usize], self.window_width as u32);
        Self::rotate_left(state, 1) ^ leaving ^ self.table[new_byte as usize]
    }

    fn digest(&self, state: u64) -> u32 {
        (state ^ (state >> 32)) as u32
    }
}

/// Double-precision floating Rabin-Karp, using a Barrett-style reduction
/// `x - floor(x * (1/p)) * p` in place of integer modulo, per
/// `floating_rolling_hasher<double>`. The `|state*A + byte+1| < 2^52`
/// constraint from `spec.md` §4.F bounds valid (multiplier, modulus)
/// choices; `new` panics if the supplied pair can't honor it for byte
/// values up to 255.
pub struct FloatingRabinKarpHasher {
    window_width: usize,
    multiplier: f64,
    modulus: f64,
    inverse_modulus: f64,
    neg_high_power: f64,
}

impl FloatingRabinKarpHasher {
    pub fn new(window_width: usize, multiplier: f64, modulus: f64) -> Self {
        assert!(window_width > 0, "window width must be positive");
        let bound = modulus * multiplier + 256.0;
        assert!(bound.abs() < (1u64 << 52) as f64, "(multiplier, modulus) would exceed the 2^52 FMA bound");

        let mut high_power = 1.0f64;
        for _ in 0..window_width.saturating_sub(1) {
            high_power = Self::reduce(high_power * multiplier, modulus, 1.0 / modulus);
        }
        Self {
            window_width,
            multiplier,
            modulus,
            inverse_modulus: 1.0 / modulus,
            neg_high_power: modulus - high_power,
        }
    }

    pub fn default_for_window(window_width: usize) -> Self {
        Self::new(window_width, 257.0, (1u64 << 31) as f64 - 1.0)
    }

    #[inline]
    fn reduce(x: f64, modulus: f64, inverse_modulus: f64) -> f64 {
        let reduced = x - (x * inverse_modulus).floor() * modulus;
        if reduced >= modulus {
            reduced - modulus
        } else {
            reduced
        }
    }
}

impl RollingHasher for FloatingRabinKarpHasher {
    type State = f64;

    fn window_width(&self) -> usize {
        self.window_width
    }

    fn init(&self) -> f64 {
        0.0
    }

    fn push(&self, state: f64, new_byte: u8) -> f64 {
        Self::reduce(state * self.multiplier + new_byte as f64 + 1.0, self.modulus, self.inverse_modulus)
    }

    fn roll(&self, state: f64, old_byte: u8, new_byte: u8) -> f64 {
        let advanced = state * self.multiplier + new_byte as f64 + 1.0;
        let removed = (old_byte as f64 + 1.0) * self.neg_high_power;
        Self::reduce(advanced + removed, self.modulus, self.inverse_modulus)
    }

    fn digest(&self, state: f64) -> u32 {
        (state as u64) as u32
    }
}

/// Configuration for one dimension of a [`FingerprintBuilder`]: its window
/// width and which hasher family backs it. The builder owns boxed
/// trait-object state so dimensions with different hasher families and
/// widths can coexist, per `spec.md` §4.F's "owns D independent hashers,
/// possibly at different W".
pub enum HasherKind {
    RabinKarp(RabinKarpHasher),
    Buz(BuzHasher),
    FloatingRabinKarp(FloatingRabinKarpHasher),
}

impl HasherKind {
    fn window_width(&self) -> usize {
        match self {
            HasherKind::RabinKarp(h) => h.window_width(),
            HasherKind::Buz(h) => h.window_width(),
            HasherKind::FloatingRabinKarp(h) => h.window_width(),
        }
    }
}

/// Per-dimension rolling state, erased to a `u64`/`f64`-capable carrier via
/// a small enum (avoids a generic explosion across hasher families).
#[derive(Clone, Copy)]
enum RollState {
    Int(u64),
    Float(f64),
}

struct DimensionRunner<'a> {
    kind: &'a HasherKind,
}

impl<'a> DimensionRunner<'a> {
    fn init(&self) -> RollState {
        match self.kind {
            HasherKind::RabinKarp(h) => RollState::Int(h.init()),
            HasherKind::Buz(h) => RollState::Int(h.init()),
            HasherKind::FloatingRabinKarp(h) => RollState::Float(h.init()),
        }
    }

    fn push(&self, state: RollState, byte: u8) -> RollState {
        match (self.kind, state) {
            (HasherKind::RabinKarp(h), RollState::Int(s)) => RollState::Int(h.push(s, byte)),
            (HasherKind::Buz(h), RollState::Int(s)) => RollState::Int(h.push(s, byte)),
            (HasherKind::FloatingRabinKarp(h), RollState::Float(s)) => RollState::Float(h.push(s, byte)),
            _ => unreachable!("RollState variant always matches its HasherKind"),
        }
    }

    fn roll(&self, state: RollState, old: u8, new: u8) -> RollState {
        match (self.kind, state) {
            (HasherKind::RabinKarp(h), RollState::Int(s)) => RollState::Int(h.roll(s, old, new)),
            (HasherKind::Buz(h), RollState::Int(s)) => RollState::Int(h.roll(s, old, new)),
            (HasherKind::FloatingRabinKarp(h), RollState::Float(s)) => RollState::Float(h.roll(s, old, new)),
            _ => unreachable!("RollState variant always matches its HasherKind"),
        }
    }

    fn digest(&self, state: RollState) -> u32 {
        match (self.kind, state) {
            (HasherKind::RabinKarp(h), RollState::Int(s)) => h.digest(s),
            (HasherKind::Buz(h), RollState::Int(s)) => h.digest(s),
            (HasherKind::FloatingRabinKarp(h), RollState::Float(s)) => h.digest(s),
            _ => unreachable!("RollState variant always matches its HasherKind"),
        }
    }
}

/// A Count-Min-Sketch fingerprint: two parallel D-length arrays holding,
/// per dimension, the minimum rolling hash observed and the number of
/// windows tied with that minimum (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub min_hashes: Vec<u32>,
    pub min_counts: Vec<u32>,
}

impl Fingerprint {
    /// Allocate the two parallel D-length arrays through the fallible
    /// scratch path, surfacing exhaustion as [`CoreError::BadAlloc`] rather
    /// than aborting (`spec.md` §4.F/§5).
    fn try_unset(dimensions: usize) -> CoreResult<Self> {
        Ok(Self {
            min_hashes: crate::alloc::try_filled_vec(dimensions, UNSET_MIN, "fingerprint min_hashes")?,
            min_counts: crate::alloc::try_filled_vec(dimensions, 0u32, "fingerprint min_counts")?,
        })
    }

    /// Merge two fingerprints of the same dimensionality: per-dim smaller
    /// minimum wins, counts add on ties, per `merge_count_min_sketches` in
    /// `examples/original_source/include/stringzillas/fingerprints.hpp`.
    pub fn merge(a: &Fingerprint, b: &Fingerprint) -> CoreResult<Fingerprint> {
        if a.min_hashes.len() != b.min_hashes.len() {
            return Err(CoreError::UnexpectedDimensions);
        }
        let dims = a.min_hashes.len();
        let mut out = Fingerprint::try_unset(dims)?;
        for d in 0..dims {
            out.min_hashes[d] = a.min_hashes[d].min(b.min_hashes[d]);
            out.min_counts[d] = match a.min_hashes[d].cmp(&b.min_hashes[d]) {
                std::cmp::Ordering::Less => a.min_counts[d],
                std::cmp::Ordering::Greater => b.min_counts[d],
                std::cmp::Ordering::Equal => a.min_counts[d] + b.min_counts[d],
            };
        }
        Ok(out)
    }
}

/// Owns D independent rolling hashers (possibly at different window
/// widths) and produces a [`Fingerprint`] for a text chunk (`spec.md` §4.F).
pub struct FingerprintBuilder {
    dimensions: Vec<HasherKind>,
}

impl FingerprintBuilder {
    pub fn new(dimensions: Vec<HasherKind>) -> Self {
        Self { dimensions }
    }

    /// A builder with `count` dimensions of the default Rabin-Karp hasher,
    /// windows spread across `widths` round-robin.
    pub fn with_rabin_karp_windows(widths: &[usize]) -> Self {
        Self::new(widths.iter().map(|&w| HasherKind::RabinKarp(RabinKarpHasher::default_for_window(w))).collect())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Fingerprint a single chunk of text in isolation (no carried-over
    /// rolling state). Dimensions whose window exceeds `text.len()` emit
    /// `(u32::MAX, 0)`, per `spec.md` §4.F/§8. Fails with
    /// [`CoreError::BadAlloc`] if the output arrays can't be allocated.
    pub fn fingerprint(&self, text: &[u8]) -> CoreResult<Fingerprint> {
        let mut result = Fingerprint::try_unset(self.dimensions.len())?;
        for (dim_idx, kind) in self.dimensions.iter().enumerate() {
            let width = kind.window_width();
            if text.len() < width {
                continue;
            }
            let runner = DimensionRunner { kind };
            let mut state = runner.init();
            for &byte in &text[..width] {
                state = runner.push(state, byte);
            }
            let mut min_hash = runner.digest(state);
            let mut min_count = 1u32;

            for i in width..text.len() {
                state = runner.roll(state, text[i - width], text[i]);
                let new_hash = runner.digest(state);
                // Branchless running min/tie-count, per `spec.md` §4.F step 2.
                min_count = min_count * (new_hash >= min_hash) as u32 + (new_hash <= min_hash) as u32;
                min_hash = min_hash.min(new_hash);
            }

            result.min_hashes[dim_idx] = min_hash;
            result.min_counts[dim_idx] = min_count;
        }
        Ok(result)
    }

    /// Fingerprint a large document in parallel. The text is sliced into
    /// chunks via `executor`, each overlapping its neighbor by
    /// `max_window_width - 1` bytes so no cross-boundary window is lost,
    /// then the per-chunk fingerprints are tree-reduced, per `spec.md` §4.F's
    /// parallelism contract. Both reduction orders (tree or sequential)
    /// are required to agree, which [`Fingerprint::merge`]'s commutative,
    /// associative definition guarantees.
    pub fn fingerprint_parallel(&self, text: &[u8], executor: &dyn Executor) -> CoreResult<Fingerprint> {
        if self.dimensions.is_empty() {
            return Fingerprint::try_unset(0);
        }
        let max_window = self.dimensions.iter().map(|d| d.window_width()).max().unwrap_or(1);
        let overlap = max_window.saturating_sub(1);

        let chunk_count = executor.threads_count().max(1);
        if text.len() < max_window * 2 || chunk_count == 1 {
            return self.fingerprint(text);
        }

        let base_chunk = text.len() / chunk_count;
        let mut bounds = crate::alloc::try_vec_with_capacity(chunk_count, "fingerprint_parallel chunk bounds")?;
        for i in 0..chunk_count {
            let start = i * base_chunk;
            let end = if i + 1 == chunk_count { text.len() } else { ((i + 1) * base_chunk + overlap).min(text.len()) };
            if start < end {
                bounds.push((start, end));
            }
        }

        let partials: Vec<CoreResult<Fingerprint>> = crate::executor::map_indices(executor, bounds.len(), |idx| {
            self.fingerprint(&text[bounds[idx].0..bounds[idx].1])
        });
        let partials: Vec<Fingerprint> = partials.into_iter().collect::<CoreResult<Vec<_>>>()?;

        let mut acc = partials[0].clone();
        for p in &partials[1..] {
            acc = Fingerprint::merge(&acc, p)?;
        }
        Ok(acc)
    }

    /// Fingerprint every element of `sequence` independently, distributing
    /// documents across `executor`'s threads rather than splitting any one
    /// document into chunks. `spec.md` §4.F reserves this strategy for
    /// documents "below an L2-sized threshold"; each thread owns its own
    /// hasher state by construction since [`FingerprintBuilder::fingerprint`]
    /// allocates fresh rolling state per call.
    pub fn fingerprint_many(&self, sequence: &dyn StringSequence, executor: &dyn Executor) -> CoreResult<Vec<Fingerprint>> {
        let results: Vec<CoreResult<Fingerprint>> =
            crate::executor::map_indices(executor, sequence.len(), |i| self.fingerprint(sequence.get(i)));
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Serial;

    #[test]
    fn end_to_end_scenario_aaaa_count_two() {
        let builder = FingerprintBuilder::with_rabin_karp_windows(&[3]);
        let fp = builder.fingerprint(b"aaaa").unwrap();
        assert_ne!(fp.min_hashes[0], UNSET_MIN);
        assert_eq!(fp.min_counts[0], 2);
    }

    #[test]
    fn window_wider_than_text_is_sentinel() {
        let builder = FingerprintBuilder::with_rabin_karp_windows(&[8]);
        let fp = builder.fingerprint(b"short").unwrap();
        assert_eq!(fp.min_hashes[0], UNSET_MIN);
        assert_eq!(fp.min_counts[0], 0);
    }

    #[test]
    fn monotonicity_extending_text_lowers_or_keeps_minimum() {
        let builder = FingerprintBuilder::with_rabin_karp_windows(&[4]);
        let base = b"the quick brown fox";
        let extended = b"the quick brown fox jumps over lazy dogs repeatedly";
        let fp_base = builder.fingerprint(base).unwrap();
        let fp_ext = builder.fingerprint(extended).unwrap();
        assert!(fp_ext.min_hashes[0] <= fp_base.min_hashes[0]);
    }

    #[test]
    fn buzhash_and_floating_hashers_roll_without_panicking() {
        let builder = FingerprintBuilder::new(vec![
            HasherKind::Buz(BuzHasher::default_for_window(5)),
            HasherKind::FloatingRabinKarp(FloatingRabinKarpHasher::default_for_window(5)),
        ]);
        let fp = builder.fingerprint(b"the quick brown fox jumps over the lazy dog").unwrap();
        assert_ne!(fp.min_hashes[0], UNSET_MIN);
        assert_ne!(fp.min_hashes[1], UNSET_MIN);
    }

    #[test]
    fn merge_adds_counts_on_tied_minimum() {
        let a = Fingerprint { min_hashes: vec![5], min_counts: vec![2] };
        let b = Fingerprint { min_hashes: vec![5], min_counts: vec![3] };
        let merged = Fingerprint::merge(&a, &b).unwrap();
        assert_eq!(merged.min_hashes, vec![5]);
        assert_eq!(merged.min_counts, vec![5]);
    }

    #[test]
    fn merge_dimension_mismatch_is_an_error() {
        let a = Fingerprint { min_hashes: vec![5], min_counts: vec![1] };
        let b = Fingerprint { min_hashes: vec![5, 6], min_counts: vec![1, 1] };
        assert_eq!(Fingerprint::merge(&a, &b), Err(CoreError::UnexpectedDimensions));
    }

    #[test]
    fn parallel_fingerprint_matches_serial_on_one_big_document() {
        let builder = FingerprintBuilder::with_rabin_karp_windows(&[4, 8]);
        let text = "the quick brown fox jumps over the lazy dog ".repeat(64);
        let serial = builder.fingerprint(text.as_bytes()).unwrap();
        let parallel = builder.fingerprint_parallel(text.as_bytes(), &Serial).unwrap();
        assert_eq!(serial, parallel);
    }

    /// An executor that reports a fixed `threads_count()` but otherwise runs
    /// everything on the calling thread. `Serial::threads_count() == 1`
    /// always takes `fingerprint_parallel`'s `chunk_count == 1` early-return
    /// path, so this is what actually forces the chunk-bounds/overlap/merge
    /// logic to run deterministically in a test.
    struct FixedThreadCount(usize);

    impl Executor for FixedThreadCount {
        fn threads_count(&self) -> usize {
            self.0
        }

        fn for_each_static(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
            for i in 0..count {
                f(i);
            }
        }

        fn for_each_dynamic(&self, count: usize, f: &(dyn Fn(usize) + Sync)) {
            for i in 0..count {
                f(i);
            }
        }

        fn for_each_slice(&self, count: usize, f: &(dyn Fn(usize, usize) + Sync)) {
            if count > 0 {
                f(0, count);
            }
        }
    }

    #[test]
    fn parallel_fingerprint_with_multiple_chunks_matches_serial() {
        let builder = FingerprintBuilder::with_rabin_karp_windows(&[4, 8]);
        let text = "the quick brown fox jumps over the lazy dog ".repeat(64);
        let serial = builder.fingerprint(text.as_bytes()).unwrap();

        let executor = FixedThreadCount(4);
        assert!(executor.threads_count() > 1, "test must actually exercise chunk_count > 1");
        let chunked = builder.fingerprint_parallel(text.as_bytes(), &executor).unwrap();

        assert_eq!(serial, chunked);
    }

    #[test]
    fn fingerprint_many_matches_per_document_fingerprint() {
        use crate::executor::ForkJoin;
        use crate::sequence::Tape32;

        let builder = FingerprintBuilder::with_rabin_karp_windows(&[3]);
        let docs = Tape32::from_strings(["aaaa", "the quick brown fox", "short"]).unwrap();
        let expected: Vec<Fingerprint> =
            (0..docs.len()).map(|i| builder.fingerprint(docs.get(i)).unwrap()).collect();
        let got = builder.fingerprint_many(&docs, &ForkJoin).unwrap();
        assert_eq!(got, expected);
    }
}
