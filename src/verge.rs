//! Run detection and merging for the random-access path.
//!
//! The detector walks the slice probing `unstable_limit` positions ahead: a single comparison at
//! the probe point decides whether a run long enough to be worth keeping could straddle it, and
//! only then are the run's true bounds walked out. Everything that is not part of an accepted
//! run collects in an "unstable" region that the pattern-defeating quicksort handles. Detected
//! run boundaries go into a list that a pairwise sweep then merges until one run remains.

use crate::merge::{self, MergeScratch};
use crate::pdqsort;

pub(crate) fn sort<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();

    if len < crate::FALLBACK_THRESHOLD {
        // Run detection cannot pay for itself on small inputs.
        pdqsort::pdqsort(v, is_less);
        return;
    }

    // Runs shorter than this are not worth merging; their elements fold into the unstable
    // region instead. Any run at least this long must straddle a probe point.
    let unstable_limit = len / len.ilog2() as usize;

    // Exclusive ends of the accepted runs, in order. Holds at most
    // `len / unstable_limit ≈ log2(len)` entries.
    let mut runs: Vec<usize> = Vec::new();

    // Start of the unstable region, `None` while every element so far belongs to a run.
    let mut begin_unstable: Option<usize> = None;

    let mut current = 0;
    let mut next = 1;

    loop {
        let begin_range = current;

        // Too close to the end for a run of acceptable length to fit; the tail joins the
        // unstable region.
        if len - next <= unstable_limit {
            begin_unstable.get_or_insert(begin_range);
            break;
        }

        // Jump ahead. A single comparison at the probe point picks the candidate direction.
        current += unstable_limit;
        next += unstable_limit;

        let mut current2 = current;
        let mut next2 = next;

        let decreasing = is_less(&v[next], &v[current]);

        if decreasing {
            // Walk backward to the true start of the decreasing run.
            while current != begin_range {
                current -= 1;
                next -= 1;
                if is_less(&v[current], &v[next]) {
                    break;
                }
            }
            if is_less(&v[current], &v[next]) {
                current += 1;
            }

            // Walk forward to the true end.
            while next2 != len {
                if is_less(&v[current2], &v[next2]) {
                    break;
                }
                current2 += 1;
                next2 += 1;
            }
        } else {
            // Walk backward to the true start of the non-decreasing run.
            while current != begin_range {
                current -= 1;
                next -= 1;
                if is_less(&v[next], &v[current]) {
                    break;
                }
            }
            if is_less(&v[next], &v[current]) {
                current += 1;
            }

            // Walk forward to the true end.
            while next2 != len {
                if is_less(&v[next2], &v[current2]) {
                    break;
                }
                current2 += 1;
                next2 += 1;
            }
        }

        if next2 - current >= unstable_limit {
            // The run is long enough to keep. Normalize its direction, then record it, sorting
            // any unstable material gathered before it first so the boundary list stays a
            // partition of the whole slice into sorted pieces.
            if decreasing {
                v[current..next2].reverse();
            }

            if begin_range < current {
                // The skipped prefix before the run start was not monotonic; it opens (or
                // extends) the unstable region.
                begin_unstable.get_or_insert(begin_range);
            }

            if let Some(begin) = begin_unstable.take() {
                pdqsort::pdqsort(&mut v[begin..current], is_less);
                runs.push(current);
            }

            runs.push(next2);
        } else {
            // Too short to be worth a merge; fold the whole probed span into the unstable
            // region.
            begin_unstable.get_or_insert(begin_range);
        }

        if next2 == len {
            break;
        }
        current = current2 + 1;
        next = next2 + 1;
    }

    if let Some(begin) = begin_unstable {
        pdqsort::pdqsort(&mut v[begin..], is_less);
        runs.push(len);
    }

    // Merge adjacent runs pairwise, left to right, until a single one covers the slice. With
    // k runs this is ceil(log2(k)) passes of O(len) work each.
    if runs.len() > 1 {
        let mut scratch = MergeScratch::new(len / 2);

        while runs.len() > 1 {
            let mut begin = 0;
            let mut read = 0;
            let mut write = 0;

            while read + 1 < runs.len() {
                let mid = runs[read];
                let end = runs[read + 1];

                merge::inplace_merge(&mut v[begin..end], mid - begin, &mut scratch, is_less);

                runs[write] = end;
                write += 1;
                begin = end;
                read += 2;
            }

            if read < runs.len() {
                runs[write] = runs[read];
                write += 1;
            }
            runs.truncate(write);
        }
    }
}
