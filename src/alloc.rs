//! Allocator capability (`spec.md` §5/§6's Allocator ABI).
//!
//! The C ABI's `{allocate, free, handle}` triple becomes a small trait so
//! engines can be generic over where their scratch buffers come from. Only
//! the system allocator is implemented here; a unified-memory allocator for
//! GPU backends is named in `spec.md` but those backends are themselves a
//! Non-goal, so no such implementation is provided.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{CoreError, CoreResult};

/// A source of raw, unmanaged memory. Mirrors `spec.md`'s allocator ABI:
/// callers pair every successful `allocate` with exactly one `deallocate`
/// using the same layout.
pub trait AllocatorLike {
    /// Allocate memory satisfying `layout`, or `None` on failure. Never
    /// panics or aborts; out-of-memory is the caller's to handle as a
    /// typed error (`crate::error::CoreError::BadAlloc`).
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Free memory previously returned by `allocate` with the same layout.
    ///
    /// # Safety
    /// `ptr` must have come from this allocator's `allocate` with exactly
    /// `layout`, and must not be freed more than once.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process's global system allocator, the default `spec.md` names.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl AllocatorLike for System {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Allocate a `len`-element scratch buffer filled with `value`, reporting
/// failure as [`CoreError::BadAlloc`] rather than aborting the process,
/// per `spec.md` §5 ("Out-of-memory is propagated as a typed error, never
/// as an exception escaping the core") and the `sz_bad_alloc_k` checks in
/// `examples/original_source/include/stringcuzilla/similarities.hpp`.
///
/// Goes through `Vec::try_reserve_exact` rather than `vec![value; len]`,
/// which aborts the process via `handle_alloc_error` on OOM instead of
/// giving the caller a chance to report it.
///
/// `context` names what the scratch is for, surfaced through
/// [`CoreError::BadAlloc`]'s `Display` impl.
pub fn try_filled_vec<T: Clone>(len: usize, value: T, context: &'static str) -> CoreResult<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|_| CoreError::BadAlloc { context })?;
    v.resize(len, value);
    Ok(v)
}

/// Reserve exactly `capacity` elements of scratch in a fresh `Vec` through
/// the system allocator's fallible path, for callers that push incrementally
/// rather than filling with a single value. See [`try_scratch_vec`].
pub fn try_vec_with_capacity<T>(capacity: usize, context: &'static str) -> CoreResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity).map_err(|_| CoreError::BadAlloc { context })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_round_trips() {
        let layout = Layout::array::<u8>(64).unwrap();
        let ptr = System.allocate(layout).expect("allocation should succeed");
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0xAB, 64);
            assert_eq!(*ptr.as_ptr(), 0xAB);
            System.deallocate(ptr, layout);
        }
    }

    #[test]
    fn zero_sized_allocation_is_well_defined() {
        let layout = Layout::array::<u8>(0).unwrap();
        let ptr = System.allocate(layout).expect("zero-sized allocation should succeed");
        unsafe { System.deallocate(ptr, layout) };
    }

    #[test]
    fn try_filled_vec_produces_requested_length_and_value() {
        let v = try_filled_vec(16, -1i64, "test scratch").unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&x| x == -1));
    }

    #[test]
    fn try_vec_with_capacity_starts_empty() {
        let v: Vec<u32> = try_vec_with_capacity(8, "test scratch").unwrap();
        assert!(v.is_empty());
        assert!(v.capacity() >= 8);
    }
}
