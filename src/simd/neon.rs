//! NEON byte primitives for AArch64.
//!
//! Grounded in `tac-k-lib::search128`, which scans 16-byte NEON windows and
//! reduces the comparison mask with the "bulk movemask" trick from
//! <https://branchfree.org/2019/04/01/fitting-my-head-through-the-arm-holes/>,
//! and in `examples/original_source/include/stringzilla/compare.h`'s
//! `sz_equal_neon` (`vminvq_u8` as a cheap all-lanes-equal reduction).
#![cfg(target_arch = "aarch64")]

use std::cmp::Ordering;

use super::scalar::Scalar;
use super::BytePrimitives;

pub struct Neon;

impl BytePrimitives for Neon {
    fn equal(a: &[u8], b: &[u8]) -> bool {
        debug_assert_eq!(a.len(), b.len());
        unsafe { equal_neon(a, b) }
    }

    fn order(a: &[u8], b: &[u8]) -> Ordering {
        Scalar::order(a, b)
    }

    fn fill(dst: &mut [u8], byte: u8) {
        Scalar::fill(dst, byte)
    }

    fn copy(dst: &mut [u8], src: &[u8]) {
        Scalar::copy(dst, src)
    }

    fn copy_overlapping(dst: &mut [u8], src: &[u8]) {
        Scalar::copy_overlapping(dst, src)
    }

    fn find_byte(hay: &[u8], byte: u8) -> Option<usize> {
        unsafe { find_byte_neon(hay, byte) }
    }

    fn rfind_byte(hay: &[u8], byte: u8) -> Option<usize> {
        unsafe { rfind_byte_neon(hay, byte) }
    }
}

#[target_feature(enable = "neon")]
unsafe fn equal_neon(a: &[u8], b: &[u8]) -> bool {
    use core::arch::aarch64::*;

    let n = a.len();
    let mut i = 0;
    while i + 16 <= n {
        let av = vld1q_u8(a.as_ptr().add(i));
        let bv = vld1q_u8(b.as_ptr().add(i));
        let cmp = vceqq_u8(av, bv);
        if vminvq_u8(cmp) != 255 {
            return false;
        }
        i += 16;
    }
    Scalar::equal(&a[i..], &b[i..])
}

#[target_feature(enable = "neon")]
unsafe fn find_byte_neon(hay: &[u8], byte: u8) -> Option<usize> {
    use core::arch::aarch64::*;

    let n = hay.len();
    let needle = vdupq_n_u8(byte);
    let mut i = 0;
    while i + 16 <= n {
        let window = vld1q_u8(hay.as_ptr().add(i));
        let cmp = vceqq_u8(window, needle);
        if vmaxvq_u8(cmp) != 0 {
            // A lane matched; fall back to a scalar scan over just this
            // 16-byte window to pin down the exact offset.
            if let Some(p) = Scalar::find_byte(&hay[i..i + 16], byte) {
                return Some(i + p);
            }
        }
        i += 16;
    }
    Scalar::find_byte(&hay[i..], byte).map(|p| i + p)
}

#[target_feature(enable = "neon")]
unsafe fn rfind_byte_neon(hay: &[u8], byte: u8) -> Option<usize> {
    use core::arch::aarch64::*;

    let n = hay.len();
    let needle = vdupq_n_u8(byte);
    let mut end = n;
    while end >= 16 {
        let start = end - 16;
        let window = vld1q_u8(hay.as_ptr().add(start));
        let cmp = vceqq_u8(window, needle);
        if vmaxvq_u8(cmp) != 0 {
            if let Some(p) = Scalar::rfind_byte(&hay[start..end], byte) {
                return Some(start + p);
            }
        }
        end = start;
    }
    Scalar::rfind_byte(&hay[..end], byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_byte_matches_scalar() {
        if !std::arch::is_aarch64_feature_detected!("neon") {
            return;
        }
        let mut hay = vec![b'x'; 200];
        hay[150] = b'!';
        assert_eq!(Neon::find_byte(&hay, b'!'), Scalar::find_byte(&hay, b'!'));
    }

    #[test]
    fn rfind_byte_matches_scalar() {
        if !std::arch::is_aarch64_feature_detected!("neon") {
            return;
        }
        let mut hay = vec![b'x'; 200];
        hay[40] = b'!';
        hay[170] = b'!';
        assert_eq!(Neon::rfind_byte(&hay, b'!'), Scalar::rfind_byte(&hay, b'!'));
    }
}
