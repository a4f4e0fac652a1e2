//! Hardware-accelerated primitives for byte and UTF-8 string processing.
//!
//! `simdstr` exposes a set of engines built on a process-wide capability
//! detector and dispatch table:
//!
//! - [`search`] — length-specialized exact substring search, byte-set
//!   scanning (`find_any_of`/`find_none_of`), and CRC32.
//! - [`similarity`] — Levenshtein edit distance and Needleman-Wunsch /
//!   Smith-Waterman affine-gap alignment, both byte- and UTF-8-oriented,
//!   plus bulk drivers (`levenshtein_bulk`, `affine_bulk`) for scoring many
//!   pairs at once.
//! - [`fingerprint`] — rolling hashers and Count-Min-Sketch document
//!   fingerprinting, single-document (`fingerprint_parallel`) and
//!   multi-document (`fingerprint_many`).
//! - [`sort`] — radix-assisted introsort argument-sort over a
//!   [`sequence::StringSequence`].
//!
//! Every engine accepts any of the three [`sequence::StringSequence`]
//! shapes (index-callback, 32-bit tape, 64-bit tape) and reports failure
//! through [`error::CoreError`] rather than panicking. Bulk drivers are
//! generic over [`executor::Executor`], so callers choose between the
//! [`executor::Serial`] and [`executor::ForkJoin`] execution strategies.
//!
//! Capability detection and dispatch-table construction happen once, on
//! first use, cached behind a [`std::sync::OnceLock`]; see [`capability`]
//! and [`dispatch`] for the mechanism and [`dispatch::reset`] for
//! constraining dispatch to a capability subset (useful for benchmarking
//! or reproducing results across machines).

pub mod alloc;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod owned;
pub mod search;
pub mod sequence;
pub mod similarity;
pub mod simd;
pub mod sort;

pub use capability::Capability;
pub use error::{CoreError, CoreResult};
pub use owned::OwnedString;
pub use sequence::{IndexCallbackSequence, StringSequence, Tape32, Tape64};

/// Runs capability detection and dispatch-table initialization if they
/// haven't already happened, then returns the active capability tier.
///
/// Every public engine does this lazily on first call, so reaching for
/// this function directly is optional; it exists for callers who want to
/// pay the one-time detection cost at a predictable point (e.g. at
/// process start) rather than on the first search or sort.
pub fn ensure_initialized() -> Capability {
    dispatch::current().active_tier
}
