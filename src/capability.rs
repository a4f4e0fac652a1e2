//! Runtime CPU capability detection (`spec.md` §4.A).
//!
//! Detection runs once behind a [`std::sync::OnceLock`] and is side-effect
//! free after the first call — repeated calls to [`detect`] return the
//! cached bitmask. This mirrors `tac-k-lib`'s `is_x86_feature_detected!` /
//! `is_aarch64_feature_detected!` guards in `search_auto`, generalized from
//! a single on/off branch into an ordered capability bitmask.

use std::sync::OnceLock;

/// Minimal bitflags-style macro, avoiding a dependency purely for nine
/// constants and a names<->bits round trip: the tiers are fixed, not
/// user-extensible.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name($repr);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            /// Empty bitmask.
            pub const NONE: $name = $name(0);

            /// Raw bits, for FFI/ABI round-tripping.
            pub const fn bits(self) -> $repr { self.0 }

            /// Build from raw bits, e.g. received across an ABI boundary.
            pub const fn from_bits(bits: $repr) -> Self { $name(bits) }

            /// Bitwise union.
            pub const fn union(self, other: Self) -> Self { $name(self.0 | other.0) }

            /// Bitwise intersection.
            pub const fn intersection(self, other: Self) -> Self { $name(self.0 & other.0) }

            /// Whether `self` has every bit set in `other`.
            pub const fn contains(self, other: Self) -> bool { (self.0 & other.0) == other.0 }

            /// Whether no bits are set.
            pub const fn is_empty(self) -> bool { self.0 == 0 }

            /// All named tiers, strongest first — the order dispatch scans in.
            pub const ORDERED_TIERS: &'static [(&'static str, $name)] = &[
                $((stringify!($variant), $name::$variant),)*
            ];

            /// Convert to an ordered list of tier names present in the mask,
            /// strongest first.
            pub fn to_names(self) -> Vec<&'static str> {
                Self::ORDERED_TIERS
                    .iter()
                    .rev()
                    .filter(|(_, bit)| self.contains(*bit))
                    .map(|(name, _)| *name)
                    .collect()
            }

            /// Parse a list of tier names back into a bitmask; unknown names are ignored.
            pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
                let mut mask = $name::NONE;
                for name in names {
                    if let Some((_, bit)) = Self::ORDERED_TIERS.iter().find(|(n, _)| *n == name) {
                        mask = mask.union(*bit);
                    }
                }
                mask
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self { self.union(rhs) }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self { self.intersection(rhs) }
        }
    };
}

bitflags_like! {
    /// Named capability bits, encoding dispatch *tiers* rather than an
    /// arbitrary feature set (`spec.md` §6). Dispatch always scans from the
    /// strongest bit set to the weakest.
    pub struct Capability: u32 {
        const SERIAL  = 0b0000_0001;
        const HASWELL = 0b0000_0010; // AVX2
        const SKYLAKE = 0b0000_0100; // AVX-512 F/BW/VL/DQ + VAES
        const ICE     = 0b0000_1000; // adds VBMI/VBMI2
        const NEON    = 0b0001_0000;
        const SVE     = 0b0010_0000;
        const SVE2    = 0b0100_0000;
        const SVE2P1  = 0b1000_0000;
        const CUDA    = 0b1_0000_0000;
    }
}

static DETECTED: OnceLock<Capability> = OnceLock::new();

/// Probe the CPU once and return the cached capability bitmask.
///
/// Always includes [`Capability::SERIAL`]. Idempotent and side-effect free
/// after the first call, per `spec.md` §4.A.
pub fn detect() -> Capability {
    *DETECTED.get_or_init(|| {
        let mask = detect_uncached();
        log::debug!("detected CPU capabilities: {:?}", mask.to_names());
        mask
    })
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_uncached() -> Capability {
    let mut mask = Capability::SERIAL;
    if is_x86_feature_detected!("avx2") {
        mask = mask.union(Capability::HASWELL);
    }
    if is_x86_feature_detected!("avx512f")
        && is_x86_feature_detected!("avx512bw")
        && is_x86_feature_detected!("avx512vl")
        && is_x86_feature_detected!("avx512dq")
        && is_x86_feature_detected!("vaes")
    {
        mask = mask.union(Capability::SKYLAKE);
    }
    if mask.contains(Capability::SKYLAKE)
        && is_x86_feature_detected!("avx512vbmi")
        && is_x86_feature_detected!("avx512vbmi2")
    {
        mask = mask.union(Capability::ICE);
    }
    mask
}

#[cfg(target_arch = "aarch64")]
fn detect_uncached() -> Capability {
    let mut mask = Capability::SERIAL;
    if std::arch::is_aarch64_feature_detected!("neon") {
        mask = mask.union(Capability::NEON);
    }
    // SVE/SVE2/SVE2.1 detection on Linux goes through the `sve`/`sve2` target
    // features once stabilized upstream; macOS has no SVE hardware at all as
    // of this writing. Both report unavailable rather than guessing.
    if std::arch::is_aarch64_feature_detected!("sve") {
        mask = mask.union(Capability::SVE);
    }
    mask
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_uncached() -> Capability {
    Capability::SERIAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_includes_serial() {
        assert!(detect().contains(Capability::SERIAL));
    }

    #[test]
    fn detect_is_idempotent() {
        assert_eq!(detect(), detect());
    }

    #[test]
    fn names_round_trip() {
        let mask = Capability::HASWELL | Capability::SERIAL;
        let names = mask.to_names();
        let parsed = Capability::from_names(names.iter().copied());
        assert_eq!(mask, parsed);
    }
}
