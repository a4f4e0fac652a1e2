//! Argument-sort over a [`StringSequence`] (`spec.md` §4.G).
//!
//! Combines a most-significant-bit radix pass over a 4-byte prefix of each
//! string with introsort (median-of-three quicksort, capped depth, heapsort
//! fallback, insertion sort below length 16) for the remainder, following
//! `sz_sort_recursion` / `sz_sort_introsort_recursion` /
//! `_sz_heapsort` / `sz_sort_insertion` in
//! `examples/original_source/include/stringzilla/sort.h`. Reworked to
//! recurse over index ranges of an owned key buffer rather than raw
//! pointers into the sequence's `order` array, which is both the safe
//! idiomatic shape and easier to hand-verify without a compiler in the loop.
//!
//! Stability is not guaranteed, matching the original.

use crate::sequence::StringSequence;

/// Sort `sequence.order_mut()` so that `sequence.get(order[i])` is
/// lexicographically ascending for all `i`.
pub fn arg_sort(sequence: &mut dyn StringSequence) {
    let count = sequence.len();
    arg_sort_partial(sequence, count);
}

/// Sort only enough of `sequence.order_mut()` that the first `limit`
/// positions are in their final, fully sorted place; positions beyond
/// `limit` are left in an unspecified but valid permutation order,
/// per `spec.md` §4.G's partial-sort variant.
pub fn arg_sort_partial(sequence: &mut dyn StringSequence, limit: usize) {
    let count = sequence.len();
    if count <= 1 {
        return;
    }
    let limit = limit.min(count);

    // Pack each element as `(4-byte big-endian prefix << 32) | original index`,
    // matching `spec.md` §4.G step 1.
    let mut keys: Vec<u64> = (0..count as u32)
        .map(|original_index| {
            let bytes = sequence.get(original_index as usize);
            let prefix = pack_prefix(bytes);
            ((prefix as u64) << 32) | original_index as u64
        })
        .collect();

    radix_recursion(&mut keys, sequence, 0, 32, limit);

    let order = sequence.order_mut();
    for (slot, key) in order.iter_mut().zip(keys.iter()) {
        *slot = (*key & 0xFFFF_FFFF) as u32;
    }
}

fn pack_prefix(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[..n].copy_from_slice(&bytes[..n]);
    u32::from_be_bytes(buf)
}

/// Radix-partition `keys` by successive bits of the packed prefix, from MSB
/// (`bit_idx == 0`) down to `bit_max` bits deep, then hand each same-prefix
/// partition to [`introsort`] for a full lexicographic tie-break.
fn radix_recursion(keys: &mut [u64], sequence: &dyn StringSequence, bit_idx: u32, bit_max: u32, limit: usize) {
    if keys.len() <= 1 || limit == 0 {
        return;
    }

    let mask = 1u64 << (63 - bit_idx);
    let with_bit_set = keys.iter().filter(|k| *k & mask != 0).count();
    let split = keys.len() - with_bit_set;

    if split != 0 && split != keys.len() {
        let mut left = 0usize;
        let mut right = keys.len() - 1;
        loop {
            while left < split && keys[left] & mask == 0 {
                left += 1;
            }
            while right >= split && keys[right] & mask != 0 {
                if right == 0 {
                    break;
                }
                right -= 1;
            }
            if left < split && right >= split {
                keys.swap(left, right);
                left += 1;
                if right == 0 {
                    break;
                }
                right -= 1;
            } else {
                break;
            }
        }
    }

    let (left_keys, right_keys) = keys.split_at_mut(split);

    if bit_idx + 1 < bit_max {
        radix_recursion(left_keys, sequence, bit_idx + 1, bit_max, limit.min(left_keys.len()));
        if limit > split {
            radix_recursion(right_keys, sequence, bit_idx + 1, bit_max, limit - split);
        }
    } else {
        let get = |idx: u32| sequence.get(idx as usize);
        introsort(left_keys, &get, limit.min(left_keys.len()));
        if limit > split {
            introsort(right_keys, &get, limit - split);
        }
    }
}

#[inline]
fn less(get: &impl Fn(u32) -> &[u8], a: u64, b: u64) -> bool {
    get(index_of(a)) < get(index_of(b))
}

#[inline]
fn index_of(key: u64) -> u32 {
    (key & 0xFFFF_FFFF) as u32
}

/// Introsort over a range of packed keys, comparing by the full string each
/// key's low 32 bits index into `sequence`. `limit` bounds how much of the
/// final order must be correct: partitions entirely beyond `limit` (all of
/// whose elements compare greater than everything already placed) are left
/// unsorted, per the partial-sort contract.
fn introsort(keys: &mut [u64], get: &impl Fn(u32) -> &[u8], limit: usize) {
    if limit == 0 {
        return;
    }
    // ceil(log2(n)) + 1, a depth budget before falling back to heapsort.
    // Off by at most one from the original's exact floor(log2(n)) + (n
    // not a power of two) — harmless, since it only bounds worst-case
    // quicksort recursion depth, never correctness.
    let depth_limit = if keys.len() <= 1 {
        0
    } else {
        (usize::BITS - keys.len().leading_zeros()) as usize
    };
    introsort_recursion(keys, get, depth_limit, limit);
}

fn introsort_recursion(keys: &mut [u64], get: &impl Fn(u32) -> &[u8], depth: usize, limit: usize) {
    if limit == 0 {
        return;
    }
    match keys.len() {
        0 | 1 => return,
        2 => {
            if less(get, keys[1], keys[0]) {
                keys.swap(0, 1);
            }
            return;
        }
        3 => {
            if less(get, keys[1], keys[0]) {
                keys.swap(0, 1);
            }
            if less(get, keys[2], keys[1]) {
                keys.swap(1, 2);
            }
            if less(get, keys[1], keys[0]) {
                keys.swap(0, 1);
            }
            return;
        }
        _ => {}
    }

    if keys.len() <= 16 {
        insertion_sort(keys, get);
        return;
    }

    if depth == 0 {
        heapsort(keys, get);
        return;
    }
    let depth = depth - 1;

    let last = keys.len() - 1;
    let median = keys.len() / 2;
    if less(get, keys[median], keys[0]) {
        keys.swap(0, median);
    }
    if less(get, keys[last], keys[0]) {
        keys.swap(0, last);
    }
    if less(get, keys[last], keys[median]) {
        keys.swap(median, last);
    }
    let pivot = keys[median];

    let mut left = 0usize;
    let mut right = last;
    loop {
        while less(get, keys[left], pivot) {
            left += 1;
        }
        while less(get, pivot, keys[right]) {
            right -= 1;
        }
        if left >= right {
            break;
        }
        keys.swap(left, right);
        left += 1;
        if right == 0 {
            break;
        }
        right -= 1;
    }

    let (first_half, second_half) = keys.split_at_mut(left);
    introsort_recursion(first_half, get, depth, limit.min(first_half.len()));
    if limit > left {
        introsort_recursion(second_half, get, depth, limit - left);
    }
}

/// Insertion sort, used below length 16 (`sz_sort_insertion`).
fn insertion_sort(keys: &mut [u64], get: &impl Fn(u32) -> &[u8]) {
    for i in 1..keys.len() {
        let current = keys[i];
        let mut j = i;
        while j > 0 && less(get, current, keys[j - 1]) {
            keys[j] = keys[j - 1];
            j -= 1;
        }
        keys[j] = current;
    }
}

fn heapsort(keys: &mut [u64], get: &impl Fn(u32) -> &[u8]) {
    let count = keys.len();
    if count < 2 {
        return;
    }
    let mut start = (count - 2) / 2;
    loop {
        sift_down(keys, get, start, count - 1);
        if start == 0 {
            break;
        }
        start -= 1;
    }
    let mut end = count - 1;
    while end > 0 {
        keys.swap(0, end);
        end -= 1;
        sift_down(keys, get, 0, end);
    }
}

fn sift_down(keys: &mut [u64], get: &impl Fn(u32) -> &[u8], start: usize, end: usize) {
    let mut root = start;
    while 2 * root + 1 <= end {
        let mut child = 2 * root + 1;
        if child + 1 <= end && less(get, keys[child], keys[child + 1]) {
            child += 1;
        }
        if !less(get, keys[root], keys[child]) {
            return;
        }
        keys.swap(root, child);
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Tape32;

    fn sorted_strings(sequence: &Tape32) -> Vec<Vec<u8>> {
        sequence.order().iter().map(|&i| sequence.get(i as usize).to_vec()).collect()
    }

    #[test]
    fn arg_sort_orders_lexicographically() {
        let mut seq = Tape32::from_strings(["banana", "apple", "cherry", "apricot"]).unwrap();
        arg_sort(&mut seq);
        assert_eq!(sorted_strings(&seq), vec![b"apple".to_vec(), b"apricot".to_vec(), b"banana".to_vec(), b"cherry".to_vec()]);
    }

    #[test]
    fn arg_sort_handles_empty_and_singleton() {
        let mut empty = Tape32::from_strings(Vec::<&str>::new()).unwrap();
        arg_sort(&mut empty);
        assert_eq!(empty.len(), 0);

        let mut one = Tape32::from_strings(["solo"]).unwrap();
        arg_sort(&mut one);
        assert_eq!(one.order(), &[0]);
    }

    #[test]
    fn arg_sort_handles_shared_prefixes() {
        let mut seq = Tape32::from_strings(["prefix_zzz", "prefix_aaa", "prefix_mmm", "prefix_aaaa"]).unwrap();
        arg_sort(&mut seq);
        let sorted = sorted_strings(&seq);
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn arg_sort_matches_std_sort_on_random_like_input() {
        let words = ["zebra", "apple", "mango", "kiwi", "banana", "date", "elderberry", "fig", "grape", "honeydew", "apple"];
        let mut seq = Tape32::from_strings(words).unwrap();
        arg_sort(&mut seq);
        let got = sorted_strings(&seq);
        let mut expected: Vec<Vec<u8>> = words.iter().map(|s| s.as_bytes().to_vec()).collect();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn arg_sort_partial_sorts_prefix_correctly() {
        let words = ["zebra", "apple", "mango", "kiwi", "banana", "date", "elderberry", "fig", "grape", "honeydew"];
        let mut seq = Tape32::from_strings(words).unwrap();
        arg_sort_partial(&mut seq, 3);
        let got = sorted_strings(&seq);
        let mut expected: Vec<Vec<u8>> = words.iter().map(|s| s.as_bytes().to_vec()).collect();
        expected.sort();
        assert_eq!(&got[..3], &expected[..3]);
    }

    #[test]
    fn arg_sort_is_a_valid_permutation() {
        let words = ["one", "two", "three", "four", "five", "six", "seven"];
        let mut seq = Tape32::from_strings(words).unwrap();
        arg_sort(&mut seq);
        let mut order = seq.order().to_vec();
        order.sort();
        assert_eq!(order, (0..words.len() as u32).collect::<Vec<_>>());
    }
}
