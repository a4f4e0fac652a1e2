//! Error and status types shared by every engine entry point.
//!
//! The C core (see `spec.md` §6-§7) returns a status enum plus an
//! out-parameter pointer to a static error-detail string. In Rust that
//! shape collapses into a single `Result<T, CoreError>` — the `Display`
//! impl on [`CoreError`] *is* the error-detail channel, and callers who
//! want to ignore it can simply discard the `Err` payload.

use thiserror::Error;

/// Everything that can go wrong inside a `simdstr` engine invocation.
///
/// Mirrors the status family from `spec.md` §6: `Success` is represented
/// by `Ok(_)`, everything else is a variant here. The device-mismatch
/// family is reserved for GPU backends that live outside this crate; it
/// is kept here only so the enum is forward-compatible with code written
/// against the wider StringCuZilla ABI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Scratch or output allocation failed.
    #[error("allocation failed: {context}")]
    BadAlloc {
        /// What the allocation was for, e.g. "levenshtein scratch".
        context: &'static str,
    },

    /// A byte sequence was not valid UTF-8 where a rune parse was required.
    #[error("invalid UTF-8 input")]
    InvalidUtf8,

    /// The chosen integer cell width cannot represent the worst-case score.
    #[error("scoring cell width would overflow; retry with a wider cell type or smaller bound")]
    OverflowRisk,

    /// Paired input sequences disagree in length, or an output buffer is
    /// too small for the requested operation.
    #[error("sequence dimensions do not match the operation's expectations")]
    UnexpectedDimensions,

    /// A GPU backend was requested but none is available in this process.
    #[error("no GPU backend is available")]
    MissingGpu,

    /// A GPU backend is available but its device code does not match the host build.
    #[error("GPU device code does not match the host build")]
    DeviceCodeMismatch,

    /// A GPU backend is available but its memory layout does not match the host build.
    #[error("GPU device memory layout does not match the host build")]
    DeviceMemoryMismatch,
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
