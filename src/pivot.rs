//! Pivot selection for the quicksort fallbacks.

use crate::pdqsort::NINTHER_THRESHOLD;

/// Swaps `v[a]` and `v[b]` so that `v[a] <= v[b]` afterwards.
#[inline]
pub(crate) fn sort2<T, F>(v: &mut [T], a: usize, b: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    if is_less(&v[b], &v[a]) {
        v.swap(a, b);
    }
}

/// Orders the three elements so that `v[a] <= v[b] <= v[c]`.
#[inline]
pub(crate) fn sort3<T, F>(v: &mut [T], a: usize, b: usize, c: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    sort2(v, a, b, is_less);
    sort2(v, b, c, is_less);
    sort2(v, a, b, is_less);
}

/// Moves a pivot candidate to `v[0]`: the median of three for modest sizes, the pseudomedian of
/// nine (median of three medians of three) above the ninther threshold.
///
/// The surrounding sorted triples double as scan guards for the partition: after this call
/// `v[len - 1]` is not less than the pivot.
pub(crate) fn choose_pivot<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    let half = len / 2;

    if len > NINTHER_THRESHOLD {
        sort3(v, 0, half, len - 1, is_less);
        sort3(v, 1, half - 1, len - 2, is_less);
        sort3(v, 2, half + 1, len - 3, is_less);
        sort3(v, half - 1, half, half + 1, is_less);
        v.swap(0, half);
    } else {
        sort3(v, half, 0, len - 1, is_less);
    }
}

/// Median of nine over evenly spaced positions: three sorted triples, then the median of their
/// medians. Returns the index holding the selected pivot. Needs `len >= 16`.
pub(crate) fn median_of_9<T, F>(v: &mut [T], is_less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    let step = len / 8;
    let mid = len / 2;
    let last = len - 1;

    sort3(v, 0, step, 2 * step, is_less);
    sort3(v, mid - step, mid, mid + step, is_less);
    sort3(v, last - 2 * step, last - step, last, is_less);
    sort3(v, step, mid, last - step, is_less);

    mid
}
