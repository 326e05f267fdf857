//! In-place merges used by the run drivers.
//!
//! The normal path streams merged elements through a scratch buffer allocated once per sort.
//! When that allocation fails the merges fall back to a rotation scheme that needs no memory at
//! all, at the cost of O(n log² n) work, and the sort still completes.

use core::mem::MaybeUninit;
use core::ptr;

/// Scratch space for the buffered merge, at most half the input length. An empty scratch (after
/// a failed allocation, or for tiny inputs) selects the rotation path.
pub(crate) struct MergeScratch<T> {
    buf: Vec<MaybeUninit<T>>,
}

impl<T> MergeScratch<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut buf = Vec::new();
        if buf.try_reserve_exact(capacity).is_ok() {
            buf.resize_with(capacity, MaybeUninit::uninit);
        }

        Self { buf }
    }
}

/// Merges the sorted halves `v[..mid]` and `v[mid..]` so that `v` ends up sorted.
pub(crate) fn inplace_merge<T, F>(
    v: &mut [T],
    mid: usize,
    scratch: &mut MergeScratch<T>,
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if mid == 0 || mid == len {
        return;
    }

    // The halves are often already in order, e.g. when a detected run continues a previously
    // merged region. One comparison settles it.
    if !is_less(&v[mid], &v[mid - 1]) {
        return;
    }

    if scratch.buf.is_empty() {
        merge_by_rotation(v, mid, is_less);
    } else {
        merge_buffered(v, mid, &mut scratch.buf, is_less);
    }
}

/// Merges three consecutive sorted ranges `v[..m1]`, `v[m1..m2]` and `v[m2..]`, doing the two
/// binary merges in the order that should result in the smallest number of comparisons: the
/// shorter outer side gets merged twice.
pub(crate) fn inplace_merge3<T, F>(
    v: &mut [T],
    m1: usize,
    m2: usize,
    scratch: &mut MergeScratch<T>,
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    if m1 < v.len() - m2 {
        inplace_merge(&mut v[..m2], m1, scratch, is_less);
        inplace_merge(v, m2, scratch, is_less);
    } else {
        inplace_merge(&mut v[m1..], m2 - m1, scratch, is_less);
        inplace_merge(v, m1, scratch, is_less);
    }
}

/// Merges non-decreasing runs `v[..mid]` and `v[mid..]` through `scratch`. Does O(len)
/// comparisons and O(len * (1 + len / scratch.len())) moves.
fn merge_buffered<T, F>(
    v: &mut [T],
    mid: usize,
    scratch: &mut [MaybeUninit<T>],
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    let v_base = v.as_mut_ptr();
    let scratch_len = scratch.len();
    let scratch_base = scratch.as_mut_ptr().cast::<T>();

    debug_assert!(scratch_len > 0 && mid > 0 && mid < len);

    // SAFETY
    // The scratch and the element array respectively have the following layouts:
    //
    //     |     merged elements    |    free space    |
    //     ^ scratch_base           ^ scratch_out      ^ scratch_end
    //
    //     | merged elements |    gap    | unmerged left |   gap   | unmerged right |
    //     ^ v_base          ^ merged_out  ^ left        ^ left_end  ^ right        ^ v_end
    //
    // The 'gaps' are purely logical: elements are strictly copied from the array into the
    // scratch, and the array stays untouched should a panic occur. Only when the merge is done
    // or the scratch is full do the merged elements get copied back, closing the gaps, and that
    // copy-back cannot panic. No element is compared again after it was copied, so interior
    // mutability stays observable.
    unsafe {
        let scratch_end = scratch_base.add(scratch_len);
        let v_end = v_base.add(len);

        let mut left = v_base;
        let mut left_end = left.add(mid);
        let mut right = left_end;
        let mut scratch_out = scratch_base;
        let mut merged_out = v_base;
        let mut merge_done = false;

        while !merge_done {
            // Fill the scratch space with merged elements.
            let free_scratch_space = scratch_end.offset_from(scratch_out) as usize;
            let left_len = left_end.offset_from(left) as usize;
            let right_len = v_end.offset_from(right) as usize;
            let safe_iters = free_scratch_space.min(left_len).min(right_len);

            for _ in 0..safe_iters {
                let right_less = is_less(&*right, &*left);
                let src = if right_less { right } else { left };
                ptr::copy_nonoverlapping(src, scratch_out, 1);

                scratch_out = scratch_out.add(1);
                left = left.add((!right_less) as usize);
                right = right.add(right_less as usize);
            }

            merge_done = left == left_end || right == v_end;
            if scratch_out == scratch_end || merge_done {
                // Move the remaining left elements next to the right elements.
                let new_left_len = left_end.offset_from(left) as usize;
                let new_left = right.sub(new_left_len);
                ptr::copy(left, new_left, new_left_len);
                left = new_left;
                left_end = left.add(new_left_len);

                // Move merged elements in scratch back to v and reset the scratch.
                let merged_n = scratch_out.offset_from(scratch_base) as usize;
                ptr::copy_nonoverlapping(scratch_base, merged_out, merged_n);
                merged_out = merged_out.add(merged_n);
                scratch_out = scratch_base;
            }
        }
    }
}

/// Allocation-free merge: split the longer run at its midpoint, binary-search the matching
/// position in the other run, rotate the two inner pieces into place and recurse on both sides.
/// Every element stays inside `v` the whole time, so there is nothing to restore on a panic.
fn merge_by_rotation<T, F>(v: &mut [T], mid: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if mid == 0 || mid == len {
        return;
    }

    // Ordered halves terminate the recursion. This check also guarantees progress below: with
    // `v[mid] < v[mid - 1]` no split can reproduce the full problem unchanged.
    if !is_less(&v[mid], &v[mid - 1]) {
        return;
    }

    let (split_l, split_r);
    if mid >= len - mid {
        // Halve the left run; everything in the right run smaller than the element at the split
        // point has to end up before it.
        split_l = mid / 2;

        let mut lo = mid;
        let mut hi = len;
        while lo < hi {
            let m = lo + (hi - lo) / 2;
            if is_less(&v[m], &v[split_l]) {
                lo = m + 1;
            } else {
                hi = m;
            }
        }
        split_r = lo;
    } else {
        // Halve the right run; everything in the left run not greater than the element at the
        // split point may stay before it.
        split_r = mid + (len - mid) / 2;

        let mut lo = 0;
        let mut hi = mid;
        while lo < hi {
            let m = lo + (hi - lo) / 2;
            if is_less(&v[split_r], &v[m]) {
                hi = m;
            } else {
                lo = m + 1;
            }
        }
        split_l = lo;
    }

    // [ left_head | left_tail | right_head | right_tail ] becomes
    // [ left_head | right_head | left_tail | right_tail ].
    v[split_l..split_r].rotate_left(mid - split_l);

    let new_mid = split_l + (split_r - mid);
    merge_by_rotation(&mut v[..new_mid], split_l, is_less);
    merge_by_rotation(&mut v[new_mid..], mid - split_l, is_less);
}
