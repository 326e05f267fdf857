//! Three-way quicksort used as the fallback on the sequential path.
//!
//! Unlike pdqsort this never indexes at arbitrary positions: apart from the pivot selection the
//! two partition passes only step their cursors by one, the access pattern a bidirectional
//! sequence supports.

use crate::pivot;
use crate::smallsort;

/// Partitions below this length are sorted with insertion sort.
const INSERTION_SORT_THRESHOLD: usize = 32;

/// Sorts `v` with a median-of-9 quicksort that splits into `< pivot`, `== pivot` and `> pivot`.
/// The equal group needs no recursion, which keeps inputs with few distinct values cheap.
pub(crate) fn quicksort3<T, F>(mut v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    loop {
        let len = v.len();

        if len < INSERTION_SORT_THRESHOLD {
            smallsort::insertion_sort(v, is_less);
            return;
        }

        // Select the pivot and park it at the end of the slice.
        let pivot_pos = pivot::median_of_9(v, is_less);
        let last = len - 1;
        v.swap(pivot_pos, last);

        // First pass: everything before the pivot becomes `< pivot` then `>= pivot`.
        let m1 = {
            let (body, pivot_slot) = v.split_at_mut(last);
            let pivot = &pivot_slot[0];
            partition_converge(body, &mut |elem| is_less(elem, pivot))
        };

        // Put the pivot at the boundary.
        v.swap(m1, last);

        // Second pass: split the `>= pivot` tail into `== pivot` then `> pivot`.
        let m2 = {
            let (head, tail) = v.split_at_mut(m1 + 1);
            let pivot = &head[m1];
            m1 + 1 + partition_converge(tail, &mut |elem| !is_less(pivot, elem))
        };

        // `v[..m1] < pivot <= v[m1..m2] == pivot < v[m2..]`. Recurse into the smaller outer
        // side first to bound the stack, keep looping on the larger one.
        if m1 < len - m2 {
            let (left, rest) = v.split_at_mut(m1);
            let (_equal, right) = rest.split_at_mut(m2 - m1);
            quicksort3(left, is_less);
            v = right;
        } else {
            let (left_and_equal, right) = v.split_at_mut(m2);
            let (left, _equal) = left_and_equal.split_at_mut(m1);
            quicksort3(right, is_less);
            v = left;
        }
    }
}

/// `std::partition`-style converging scan: elements satisfying `pred` end up before the ones
/// that don't. Returns the boundary index. The two cursors only ever move by single steps.
fn partition_converge<T, F>(v: &mut [T], pred: &mut F) -> usize
where
    F: FnMut(&T) -> bool,
{
    let mut l = 0;
    let mut r = v.len();

    loop {
        while l < r && pred(&v[l]) {
            l += 1;
        }
        while l < r && !pred(&v[r - 1]) {
            r -= 1;
        }
        if l >= r {
            return l;
        }

        r -= 1;
        v.swap(l, r);
        l += 1;
    }
}
