//! Pattern-defeating quicksort, the fallback sorter for material without long runs.
//!
//! Based on Orson Peters' pdqsort: median pivots, an equal-element left partition for inputs
//! with many duplicates, detection of already partitioned slices, deliberate shuffles to break
//! adversarial patterns, and heapsort escalation once too many partitions come out lopsided.

use core::cmp;
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ptr;

use crate::heapsort::heapsort;
use crate::pivot;
use crate::smallsort::{self, InsertionHole};

/// Partitions below this length are sorted with insertion sort.
const INSERTION_SORT_THRESHOLD: usize = 24;

/// Partitions above this length use the pseudomedian of nine as pivot.
pub(crate) const NINTHER_THRESHOLD: usize = 80;

/// Number of elements examined per side in one round of the block partition. One block of
/// offsets fills exactly one cache line.
const BLOCK: usize = 64;

/// Offsets of misplaced elements within one block, aligned to a cache line.
#[repr(C, align(64))]
struct Offsets([MaybeUninit<u8>; BLOCK]);

/// Sorts `v` without looking for runs. *O*(*n* \* log(*n*)) worst-case.
pub(crate) fn pdqsort<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if len < 2 {
        return;
    }

    // Tolerated number of highly unbalanced partitions before escalating to heapsort.
    let bad_allowed = len.ilog2();

    pdqsort_loop(v, 0, len, bad_allowed, true, is_less);
}

/// Sorts `v[begin..end]`. Works on indices into the full slice rather than sub-slices so that
/// the element just before `begin` stays reachable: for every partition except the leftmost it
/// holds a pivot from an earlier level, which serves as sentinel for the unguarded insertion
/// sort and powers the equal-pivot shortcut.
fn pdqsort_loop<T, F>(
    v: &mut [T],
    mut begin: usize,
    end: usize,
    mut bad_allowed: u32,
    mut leftmost: bool,
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    loop {
        let size = end - begin;

        if size < INSERTION_SORT_THRESHOLD {
            if leftmost {
                smallsort::insertion_sort(&mut v[begin..end], is_less);
            } else {
                smallsort::unguarded_insertion_sort(&mut v[begin - 1..end], is_less);
            }
            return;
        }

        // Put a pivot candidate at `v[begin]`.
        pivot::choose_pivot(&mut v[begin..end], is_less);

        // If the chosen pivot is equal to the element before this partition, the pivot is the
        // smallest element in the range. Partition the elements equal to it to the left and skip
        // them; the equal group needs no further sorting. This is what keeps inputs with many
        // duplicates at O(n log d) where d is the number of distinct elements.
        if !leftmost && !is_less(&v[begin - 1], &v[begin]) {
            let mid = partition_left(&mut v[begin..end], is_less);
            begin += mid + 1;
            continue;
        }

        let (mid, already_partitioned) = partition_right(&mut v[begin..end], is_less);
        let pivot_pos = begin + mid;

        let l_size = mid;
        let r_size = end - pivot_pos - 1;
        let highly_unbalanced = l_size < size / 8 || r_size < size / 8;

        if highly_unbalanced {
            bad_allowed -= 1;
            if bad_allowed == 0 {
                heapsort(&mut v[begin..end], is_less);
                return;
            }

            // Swap a few elements at quarter offsets to break up the pattern that produced the
            // bad pivot.
            if l_size >= INSERTION_SORT_THRESHOLD {
                v.swap(begin, begin + l_size / 4);
                v.swap(pivot_pos - 1, pivot_pos - l_size / 4);

                if l_size > NINTHER_THRESHOLD {
                    v.swap(begin + 1, begin + (l_size / 4 + 1));
                    v.swap(begin + 2, begin + (l_size / 4 + 2));
                    v.swap(pivot_pos - 2, pivot_pos - (l_size / 4 + 1));
                    v.swap(pivot_pos - 3, pivot_pos - (l_size / 4 + 2));
                }
            }

            if r_size >= INSERTION_SORT_THRESHOLD {
                v.swap(pivot_pos + 1, pivot_pos + (r_size / 4 + 1));
                v.swap(end - 1, end - r_size / 4);

                if r_size > NINTHER_THRESHOLD {
                    v.swap(pivot_pos + 2, pivot_pos + (r_size / 4 + 2));
                    v.swap(pivot_pos + 3, pivot_pos + (r_size / 4 + 3));
                    v.swap(end - 2, end - (r_size / 4 + 1));
                    v.swap(end - 3, end - (r_size / 4 + 2));
                }
            }
        } else {
            // The partition was balanced and did not move anything: the slice is likely nearly
            // sorted, try finishing it with a bounded number of insertion shifts.
            if already_partitioned
                && smallsort::partial_insertion_sort(&mut v[begin..pivot_pos], is_less)
                && smallsort::partial_insertion_sort(&mut v[pivot_pos + 1..end], is_less)
            {
                return;
            }
        }

        // Sort the left partition, then continue with the right one, tail-call style.
        pdqsort_loop(v, begin, pivot_pos, bad_allowed, leftmost, is_less);
        begin = pivot_pos + 1;
        leftmost = false;
    }
}

/// Partitions `v[1..]` around the pivot at `v[0]` into elements smaller than the pivot followed
/// by elements greater than or equal to it, and swaps the pivot in between.
///
/// Returns the final pivot position and whether the slice was already partitioned.
fn partition_right<T, F>(v: &mut [T], is_less: &mut F) -> (usize, bool)
where
    F: FnMut(&T, &T) -> bool,
{
    let (mid, already_partitioned) = {
        let (pivot_slot, rest) = v.split_at_mut(1);

        // Read the pivot into a stack temporary. The hole guard writes it back even when a
        // comparison panics, which also keeps interior mutations done during comparisons
        // observable afterwards.
        // SAFETY: `pivot_slot[0]` is a valid initialized element.
        let tmp = ManuallyDrop::new(unsafe { ptr::read(&pivot_slot[0]) });
        let _pivot_guard = InsertionHole {
            src: &*tmp,
            dest: &mut pivot_slot[0],
        };
        let pivot = &*tmp;

        let mut l = 0;
        let mut r = rest.len();

        // Skip elements that already sit on the correct side. The pivot selection sorted
        // elements around the pivot so both scans find a stopper; the bound checks keep a
        // comparator that violates strict weak ordering memory-safe.
        // SAFETY: `l` and `r - 1` stay within `rest` thanks to the `l < r` checks.
        unsafe {
            let base = rest.as_mut_ptr();

            while l < r && is_less(&*base.add(l), pivot) {
                l += 1;
            }

            while l < r && !is_less(&*base.add(r - 1), pivot) {
                r -= 1;
            }
        }

        (
            l + partition_in_blocks(&mut rest[l..r], pivot, is_less),
            l >= r,
        )

        // The hole guard drops here and restores the pivot into `v[0]`.
    };

    // Place the pivot between the two partitions.
    v.swap(0, mid);

    (mid, already_partitioned)
}

/// Partitions `v[1..]` around the pivot at `v[0]` into elements equal to the pivot followed by
/// elements greater than it, and moves the pivot to the upper end of the equal group. Must only
/// be called when no element of `v[1..]` is less than the pivot.
///
/// Returns the final pivot position.
fn partition_left<T, F>(v: &mut [T], is_less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let pivot_pos = {
        let len = v.len();
        let arr = v.as_mut_ptr();

        // Same temporary-plus-hole-guard scheme as in `partition_right`.
        // SAFETY: `v` is non-empty.
        let tmp = ManuallyDrop::new(unsafe { ptr::read(arr) });
        let _pivot_guard = InsertionHole {
            src: &*tmp,
            dest: arr,
        };
        let pivot = &*tmp;

        let mut l = 1;
        let mut r = len;

        // SAFETY: `l` and `r - 1` stay in bounds thanks to the `l < r` checks, and never drop
        // below index 1, leaving the pivot slot alone.
        unsafe {
            loop {
                while l < r && !is_less(pivot, &*arr.add(l)) {
                    l += 1;
                }
                while l < r && is_less(pivot, &*arr.add(r - 1)) {
                    r -= 1;
                }
                if l >= r {
                    break;
                }

                r -= 1;
                ptr::swap(arr.add(l), arr.add(r));
                l += 1;
            }
        }

        // `v[1..l]` equals the pivot now, `v[l..]` is greater.
        l - 1

        // The hole guard drops here and restores the pivot into `v[0]`.
    };

    v.swap(0, pivot_pos);

    pivot_pos
}

/// Partitions `v` into elements smaller than `pivot`, followed by elements greater than or equal
/// to `pivot`. Returns the number of elements smaller than `pivot`.
///
/// Partitioning is performed block-by-block in order to minimize the cost of branching
/// operations. This idea is presented in the [BlockQuicksort][pdf] paper.
///
/// [pdf]: https://drops.dagstuhl.de/opus/volltexte/2016/6389/pdf/LIPIcs-ESA-2016-38.pdf
fn partition_in_blocks<T, F>(v: &mut [T], pivot: &T, is_less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    // The partitioning algorithm repeats the following steps until completion:
    //
    // 1. Trace a block from the left side to identify elements greater than or equal to the
    //    pivot.
    // 2. Trace a block from the right side to identify elements smaller than the pivot.
    // 3. Exchange the identified elements between the left and the right side.
    //
    // `start` and `end` delimit the still unconsumed entries of `offsets`, the indices of
    // misplaced elements within the current block on each side.

    // The current block on the left side (from `l` to `l.add(block_l)`).
    let mut l = v.as_mut_ptr();
    let mut block_l = BLOCK;
    let mut start_l = ptr::null_mut();
    let mut end_l = ptr::null_mut();
    let mut offsets_l = Offsets([MaybeUninit::uninit(); BLOCK]);

    // The current block on the right side (from `r.sub(block_r)` to `r`).
    // SAFETY: forming a pointer one past the end of the slice is always valid.
    let mut r = unsafe { l.add(v.len()) };
    let mut block_r = BLOCK;
    let mut start_r = ptr::null_mut();
    let mut end_r = ptr::null_mut();
    let mut offsets_r = Offsets([MaybeUninit::uninit(); BLOCK]);

    // Returns the number of elements between pointers `l` (inclusive) and `r` (exclusive).
    fn width<T>(l: *mut T, r: *mut T) -> usize {
        debug_assert!(r as usize >= l as usize);
        // SAFETY: the callers only pass pointers into the same allocated object.
        unsafe { r.offset_from(l) as usize }
    }

    loop {
        // We are done with partitioning block-by-block when `l` and `r` get very close. Then we
        // do some patch-up work in order to partition the remaining elements in between.
        let is_done = width(l, r) <= 2 * BLOCK;

        if is_done {
            // Number of remaining elements (still not compared to the pivot).
            let mut rem = width(l, r);
            if start_l < end_l || start_r < end_r {
                rem -= BLOCK;
            }

            // Adjust block sizes so that the left and right block don't overlap, but get
            // perfectly aligned to cover the whole remaining gap.
            if start_l < end_l {
                block_r = rem;
            } else if start_r < end_r {
                block_l = rem;
            } else {
                // There were the same number of elements to switch on both blocks during the
                // last iteration, so there are no remaining elements on either block. Cover the
                // remaining items with roughly equally-sized blocks.
                block_l = rem / 2;
                block_r = rem - block_l;
            }
            debug_assert!(block_l <= BLOCK && block_r <= BLOCK);
            debug_assert!(width(l, r) == block_l + block_r);
        }

        if start_l == end_l {
            // Trace `block_l` elements from the left side.
            start_l = offsets_l.0.as_mut_ptr().cast::<u8>();
            end_l = start_l;

            // SAFETY: the offset writes stay within `offsets_l`: at most `block_l <= BLOCK`
            // iterations run, `end_l` advances by at most one slot per element and in the worst
            // case ends up one past the buffer, which is never written through. `elem` starts at
            // `l` and advances exactly `block_l` times, staying within the block.
            unsafe {
                let mut elem = l;

                macro_rules! fill_left {
                    ($i:expr) => {
                        *end_l = $i;
                        end_l = end_l.wrapping_add(!is_less(&*elem, pivot) as usize);
                        elem = elem.add(1);
                    };
                }

                if block_l == BLOCK {
                    // A full block has a fixed trip count; eight elements per round keep the
                    // offset bookkeeping branchless.
                    let mut i: u8 = 0;
                    for _ in 0..BLOCK / 8 {
                        fill_left!(i);
                        fill_left!(i + 1);
                        fill_left!(i + 2);
                        fill_left!(i + 3);
                        fill_left!(i + 4);
                        fill_left!(i + 5);
                        fill_left!(i + 6);
                        fill_left!(i + 7);
                        i += 8;
                    }
                } else {
                    for i in 0..block_l as u8 {
                        fill_left!(i);
                    }
                }
            }
        }

        if start_r == end_r {
            // Trace `block_r` elements from the right side.
            start_r = offsets_r.0.as_mut_ptr().cast::<u8>();
            end_r = start_r;

            // SAFETY: mirror image of the left block trace; `elem` is decremented before the
            // read, so it stays within `r.sub(block_r)..r`.
            unsafe {
                let mut elem = r;

                macro_rules! fill_right {
                    ($i:expr) => {
                        elem = elem.sub(1);
                        *end_r = $i;
                        end_r = end_r.wrapping_add(is_less(&*elem, pivot) as usize);
                    };
                }

                if block_r == BLOCK {
                    let mut i: u8 = 0;
                    for _ in 0..BLOCK / 8 {
                        fill_right!(i);
                        fill_right!(i + 1);
                        fill_right!(i + 2);
                        fill_right!(i + 3);
                        fill_right!(i + 4);
                        fill_right!(i + 5);
                        fill_right!(i + 6);
                        fill_right!(i + 7);
                        i += 8;
                    }
                } else {
                    for i in 0..block_r as u8 {
                        fill_right!(i);
                    }
                }
            }
        }

        // Number of out-of-order elements to swap between the left and right side.
        let num_l = width(start_l, end_l);
        let num_r = width(start_r, end_r);
        let count = cmp::min(num_l, num_r);

        if count > 0 {
            macro_rules! left {
                () => {
                    l.add(*start_l as usize)
                };
            }
            macro_rules! right {
                () => {
                    r.sub(*start_r as usize + 1)
                };
            }

            // SAFETY: there are at least `count` unconsumed offsets on both sides, each of them
            // addresses an element within its block, and the two blocks are disjoint.
            unsafe {
                if num_l == num_r {
                    // Both blocks carry the same number of misplaced elements: exchange them with
                    // plain swaps. A strictly descending input becomes strictly ascending this
                    // way and every later partition sees it as already partitioned, which is
                    // what keeps descending input linear.
                    for _ in 0..count {
                        ptr::swap_nonoverlapping(left!(), right!(), 1);
                        start_l = start_l.add(1);
                        start_r = start_r.add(1);
                    }
                } else {
                    // Otherwise perform a cyclic permutation: not equivalent to swapping, but
                    // produces the same partition with one read and one write per element.
                    let tmp = ptr::read(left!());
                    ptr::copy_nonoverlapping(right!(), left!(), 1);

                    for _ in 1..count {
                        start_l = start_l.add(1);
                        ptr::copy_nonoverlapping(left!(), right!(), 1);
                        start_r = start_r.add(1);
                        ptr::copy_nonoverlapping(right!(), left!(), 1);
                    }

                    ptr::copy_nonoverlapping(&tmp, right!(), 1);
                    mem::forget(tmp);
                    start_l = start_l.add(1);
                    start_r = start_r.add(1);
                }
            }
        }

        if start_l == end_l {
            // All out-of-order elements in the left block were moved. Advance to the next block.
            // SAFETY: if `!is_done` the slice is at least `2 * BLOCK` elements wide, otherwise
            // the block sizes were adjusted above to exactly cover the gap between `l` and `r`.
            l = unsafe { l.add(block_l) };
        }

        if start_r == end_r {
            // All out-of-order elements in the right block were moved. Move to the previous
            // block.
            // SAFETY: same argument as above.
            r = unsafe { r.sub(block_r) };
        }

        if is_done {
            break;
        }
    }

    // At most one block with unconsumed offsets remains; rotate its stragglers over the
    // boundary one by one.
    if start_l < end_l {
        // The left block remains. Move its remaining out-of-order elements to the far right.
        debug_assert_eq!(width(l, r), block_l);
        while start_l < end_l {
            // SAFETY: the remaining offsets lie within the last traced left block, which spans
            // exactly `width(l, r)` elements, so `r` retreats at most to `l`.
            unsafe {
                end_l = end_l.sub(1);
                ptr::swap(l.add(*end_l as usize), r.sub(1));
                r = r.sub(1);
            }
        }
        width(v.as_mut_ptr(), r)
    } else if start_r < end_r {
        // The right block remains. Move its remaining out-of-order elements to the far left.
        debug_assert_eq!(width(l, r), block_r);
        while start_r < end_r {
            // SAFETY: same reasoning as for the left block.
            unsafe {
                end_r = end_r.sub(1);
                ptr::swap(l, r.sub(*end_r as usize + 1));
                l = l.add(1);
            }
        }
        width(v.as_mut_ptr(), l)
    } else {
        // Nothing else to do, we're done.
        width(v.as_mut_ptr(), l)
    }
}
