//! Binary min-heap primitives over caller-owned slices.
//!
//! The heap is not an owning container: every function operates on a
//! caller-provided slice under a caller-supplied strict weak ordering
//! (`less(a, b)` ⇔ `*a < *b`). A slice is a heap when for every index
//! `i > 0`, `¬less(&arr[i's parent], &arr[i])` does not hold in reverse,
//! i.e. no element is less than its parent.
//!
//! [`heapify`] and [`sift_down`] use the bottom-up ("Floyd") sift-down:
//! walk the min-child path all the way to a leaf, then sift the moved
//! element back up. For random inputs this roughly halves the number of
//! comparisons versus the textbook top-down variant.
//!
//! [`delete`] and [`delete_first`] swap the removed element to the end of
//! the slice rather than overwriting it, so the slice always holds every
//! element exactly once; [`sort`] exploits exactly that.

use crate::fortify_check;

#[inline(always)]
fn parent(index: usize) -> usize {
    (index - 1) / 2
}

#[inline(always)]
fn left_child(index: usize) -> usize {
    2 * index + 1
}

#[inline(always)]
fn right_child(index: usize) -> usize {
    2 * index + 2
}

fn sift_up_from<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], start: usize, mut i: usize, less: &mut F) {
    while i != start {
        let p = parent(i);
        if less(&arr[p], &arr[i]) {
            break;
        }
        arr.swap(i, p);
        i = p;
    }
}

fn sift_down_bottom_up<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], n: usize, mut i: usize, less: &mut F) {
    let start = i;
    loop {
        let left = left_child(i);
        let right = right_child(i);
        if right >= n {
            if left == n - 1 && less(&arr[left], &arr[i]) {
                arr.swap(left, i);
                return;
            }
            break;
        }
        let smallest = if less(&arr[right], &arr[left]) { right } else { left };
        arr.swap(i, smallest);
        i = smallest;
    }
    sift_up_from(arr, start, i, less);
}

/// Establish the min-heap invariant over the whole slice, bottom-up.
pub fn heapify<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], mut less: F) {
    let n = arr.len();
    for i in (0..n / 2).rev() {
        sift_down_bottom_up(arr, n, i, &mut less);
    }
}

/// Restore the invariant after `arr[i]` was made smaller (or written fresh
/// on top of a valid heap `arr[..i]`), by moving it up toward the root.
pub fn sift_up<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], i: usize, mut less: F) {
    fortify_check!(i < arr.len());
    sift_up_from(arr, 0, i, &mut less);
}

/// Restore the invariant after `arr[i]` was made larger, by moving it down
/// toward the leaves (bottom-up variant).
pub fn sift_down<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], i: usize, mut less: F) {
    fortify_check!(i < arr.len());
    let n = arr.len();
    sift_down_bottom_up(arr, n, i, &mut less);
}

/// Incremental heap construction: `arr[..i]` is a heap and `arr[i]` has
/// just been written; sift it up.
pub fn insert<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], i: usize, mut less: F) {
    sift_up_from(arr, 0, i, &mut less);
}

/// Delete the element at index `i`: it is swapped to `arr[n-1]` and the
/// remaining `n-1` elements are a heap again on return.
pub fn delete<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], i: usize, mut less: F) {
    let n = arr.len();
    fortify_check!(i < n);
    if i == n - 1 {
        return;
    }
    arr.swap(i, n - 1);
    sift_down_bottom_up(arr, n - 1, i, &mut less);
    sift_up_from(arr, 0, i, &mut less);
}

/// Delete the minimum: it is swapped to `arr[n-1]` and the remaining
/// `n-1` elements are a heap again on return.
pub fn delete_first<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], mut less: F) {
    let n = arr.len();
    fortify_check!(n != 0);
    arr.swap(0, n - 1);
    if n > 1 {
        sift_down_bottom_up(arr, n - 1, 0, &mut less);
    }
}

/// Remove and return the minimum; the remaining `n-1` elements are a heap.
pub fn extract_first<T: Copy, F: FnMut(&T, &T) -> bool>(arr: &mut [T], less: F) -> T {
    fortify_check!(!arr.is_empty());
    let result = arr[0];
    delete_first(arr, less);
    result
}

/// Index of the first element that violates the heap invariant, or `n`.
pub fn is_heap_until<T, F: FnMut(&T, &T) -> bool>(arr: &[T], mut less: F) -> usize {
    for i in 1..arr.len() {
        if less(&arr[i], &arr[parent(i)]) {
            return i;
        }
    }
    arr.len()
}

/// Does the whole slice satisfy the heap invariant?
pub fn is_heap<T, F: FnMut(&T, &T) -> bool>(arr: &[T], less: F) -> bool {
    is_heap_until(arr, less) == arr.len()
}

/// Heap-sort the slice into descending order (repeated minimum
/// extraction writes each minimum to the vacated tail).
pub fn sort<T, F: FnMut(&T, &T) -> bool>(arr: &mut [T], mut less: F) {
    let n = arr.len();
    for i in 0..n {
        delete_first(&mut arr[..n - i], &mut less);
    }
}
