//! Process-wide dispatch table (`spec.md` §4.B).
//!
//! Installed once at first use by scanning [`crate::capability::detect`]
//! from strongest to weakest and wiring each slot to the first available
//! implementation, falling back to the scalar tier. Reads take a cheap
//! `parking_lot` read-lock rather than being fully lock-free, which is the
//! honest Rust shape of "read without synchronization thereafter": the
//! table is still read-mostly and a reset is the only writer, but nothing
//! here promises atomics-free reads the way the original C global did.
//! [`reset`] lets callers constrain dispatch to a capability subset (e.g.
//! for benchmarking or reproducibility), per `spec.md` §6's "Process
//! lifecycle" note.

use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::capability::{self, Capability};
use crate::simd::scalar::Scalar;
use crate::simd::BytePrimitives;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use crate::simd::haswell::Haswell;
#[cfg(target_arch = "aarch64")]
use crate::simd::neon::Neon;

type EqualFn = fn(&[u8], &[u8]) -> bool;
type OrderFn = fn(&[u8], &[u8]) -> std::cmp::Ordering;
type FillFn = fn(&mut [u8], u8);
type CopyFn = fn(&mut [u8], &[u8]);
type FindByteFn = fn(&[u8], u8) -> Option<usize>;

/// A record of function pointers, one per externally-visible byte
/// primitive, exactly mirroring `spec.md` §4.B's "one per externally-
/// visible operation" slot table.
#[derive(Clone, Copy)]
pub struct DispatchTable {
    pub(crate) equal: EqualFn,
    pub(crate) order: OrderFn,
    pub(crate) fill: FillFn,
    pub(crate) copy: CopyFn,
    pub(crate) copy_overlapping: CopyFn,
    pub(crate) find_byte: FindByteFn,
    pub(crate) rfind_byte: FindByteFn,
    /// The capability tier this table was built from, for diagnostics.
    pub active_tier: Capability,
}

impl DispatchTable {
    fn for_capability(mask: Capability) -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if mask.contains(Capability::HASWELL) {
            return DispatchTable {
                equal: Haswell::equal,
                order: Haswell::order,
                fill: Haswell::fill,
                copy: Haswell::copy,
                copy_overlapping: Haswell::copy_overlapping,
                find_byte: Haswell::find_byte,
                rfind_byte: Haswell::rfind_byte,
                active_tier: Capability::HASWELL,
            };
        }

        #[cfg(target_arch = "aarch64")]
        if mask.contains(Capability::NEON) {
            return DispatchTable {
                equal: Neon::equal,
                order: Neon::order,
                fill: Neon::fill,
                copy: Neon::copy,
                copy_overlapping: Neon::copy_overlapping,
                find_byte: Neon::find_byte,
                rfind_byte: Neon::rfind_byte,
                active_tier: Capability::NEON,
            };
        }

        let _ = mask;
        DispatchTable {
            equal: Scalar::equal,
            order: Scalar::order,
            fill: Scalar::fill,
            copy: Scalar::copy,
            copy_overlapping: Scalar::copy_overlapping,
            find_byte: Scalar::find_byte,
            rfind_byte: Scalar::rfind_byte,
            active_tier: Capability::SERIAL,
        }
    }
}

static TABLE: OnceLock<RwLock<DispatchTable>> = OnceLock::new();

fn table() -> &'static RwLock<DispatchTable> {
    TABLE.get_or_init(|| {
        let detected = capability::detect();
        let built = DispatchTable::for_capability(detected);
        log::info!("dispatch table initialized at tier {:?}", built.active_tier);
        RwLock::new(built)
    })
}

/// Read-only access to the current dispatch table.
pub fn current() -> DispatchTable {
    *table().read()
}

/// Constrain dispatch to `requested` intersected with detected hardware
/// capabilities; falls back to serial if the intersection is empty.
///
/// Updates the table atomically from the caller's perspective — last
/// writer wins. Callers resetting concurrently with in-flight calls must
/// synchronize externally, per `spec.md` §4.B.
pub fn reset(requested: Capability) -> Capability {
    let allowed = requested.intersection(capability::detect());
    let effective = if allowed.is_empty() { Capability::SERIAL } else { allowed };
    let built = DispatchTable::for_capability(effective);
    log::info!("dispatch table reset to tier {:?}", built.active_tier);
    *table().write() = built;
    built.active_tier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_never_empty_tier() {
        assert!(!current().active_tier.is_empty());
    }

    #[test]
    fn reset_to_empty_falls_back_to_serial() {
        reset(Capability::NONE);
        assert_eq!(current().active_tier, Capability::SERIAL);
        // Restore full detection for any tests that run after this one.
        reset(capability::detect());
    }
}
