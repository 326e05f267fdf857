//! End-to-end scenarios and comparison-count budgets for the run-adaptive behavior.

use rand::prelude::*;
use rand_xorshift::XorShiftRng;

use sort_test_tools::patterns;

/// Sorts a copy of `v` while counting comparator invocations. Returns the count and the sorted
/// copy.
fn sort_and_count(v: &[i32]) -> (u64, Vec<i32>) {
    let mut data = v.to_vec();
    let mut count = 0u64;

    vergesort::sort_by(&mut data, |a, b| {
        count += 1;
        a.cmp(b)
    });

    (count, data)
}

fn stdlib_sorted(v: &[i32]) -> Vec<i32> {
    let mut expected = v.to_vec();
    expected.sort_unstable();
    expected
}

#[test]
fn small_mixed() {
    let mut v = [5, 2, 9, 1, 5, 6, 2, 7, 3, 8];
    vergesort::sort(&mut v);
    assert_eq!(v, [1, 2, 2, 3, 5, 5, 6, 7, 8, 9]);
}

#[test]
fn empty_and_single() {
    let mut empty: [i32; 0] = [];
    vergesort::sort(&mut empty);
    assert_eq!(empty, []);

    let mut single = [42];
    vergesort::sort(&mut single);
    assert_eq!(single, [42]);
}

#[test]
fn ascending_comparison_budget() {
    let input = patterns::ascending(1_000);
    let (count, sorted) = sort_and_count(&input);

    assert_eq!(sorted, input);
    assert!(count <= 2_000, "{count} comparisons on sorted input");
}

#[test]
fn descending_comparison_budget() {
    let input = patterns::descending(1_000);
    let (count, sorted) = sort_and_count(&input);

    assert_eq!(sorted, stdlib_sorted(&input));
    assert!(count <= 4_000, "{count} comparisons on reversed input");
}

#[test]
fn presorted_linear_comparisons() {
    // Already sorted and strictly reversed inputs must stay linear: the run detector walks the
    // single run once and no merging happens.
    for n in [80, 128, 1_000, 10_000] {
        for input in [patterns::ascending(n), patterns::descending(n)] {
            let (count, sorted) = sort_and_count(&input);

            assert_eq!(sorted, stdlib_sorted(&input));
            assert!(count as usize <= 6 * n, "{count} comparisons for n = {n}");
        }
    }
}

#[test]
fn pipe_organ() {
    let input: Vec<i32> = (0..500).chain((1..=500).rev()).collect();
    let (_, sorted) = sort_and_count(&input);

    assert_eq!(sorted, stdlib_sorted(&input));
}

#[test]
fn shuffled_16_values() {
    let n = 100_000;
    let mut v: Vec<i32> = (0..n as i32).map(|i| i % 16).collect();

    let mut rng = XorShiftRng::seed_from_u64(0xA3C5_9B1D);
    v.shuffle(&mut rng);

    vergesort::sort(&mut v);

    // Sixteen equivalence classes of n / 16 elements each.
    for (i, &val) in v.iter().enumerate() {
        assert_eq!(val, (i / (n / 16)) as i32);
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn uniform_random_large() {
    let input = patterns::random(1_000_000);
    let (_, sorted) = sort_and_count(&input);

    // Equality against the std sort checks both sortedness and multiset preservation.
    assert_eq!(sorted, stdlib_sorted(&input));
}

#[test]
fn alternating_signs() {
    let input: Vec<i32> = (0..10_000).map(|i| if i % 2 == 0 { i } else { -i }).collect();
    let (_, sorted) = sort_and_count(&input);

    assert_eq!(sorted, stdlib_sorted(&input));
}

#[test]
fn comparison_upper_bound() {
    // Loose regression ceiling: no input may cost more than 40 * n * floor(log2(n))
    // comparisons.
    for n in [100usize, 1_000, 10_000] {
        let inputs = [
            patterns::random(n),
            patterns::random_uniform(n, 0..16),
            patterns::saw_mixed(n, (n as f64).log2().round() as usize),
            patterns::pipe_organ(n),
            patterns::all_equal(n),
        ];

        for input in inputs {
            let (count, sorted) = sort_and_count(&input);

            assert_eq!(sorted, stdlib_sorted(&input));
            let budget = 40 * n as u64 * (n as u64).ilog2() as u64;
            assert!(count <= budget, "{count} > {budget} for n = {n}");
        }
    }
}

#[test]
fn long_run_concatenation() {
    // Inputs made of k runs, each longer than the detection threshold, must sort in
    // O(n * (1 + log k)) comparisons: one detection pass plus log2(k) merge sweeps.
    let n = 16_384usize;

    for k in [2usize, 4, 8] {
        let chunk = n / k;
        assert!(chunk >= n / (n.ilog2() as usize));

        let mut input = patterns::random(n);
        for c in input.chunks_mut(chunk) {
            c.sort_unstable();
        }

        let (count, sorted) = sort_and_count(&input);

        assert_eq!(sorted, stdlib_sorted(&input));
        let budget = 10 * n as u64 * (1 + k.ilog2() as u64);
        assert!(count <= budget, "{count} > {budget} for k = {k}");
    }
}

#[test]
fn idempotent() {
    let mut once = patterns::random(10_000);
    vergesort::sort(&mut once);

    let mut twice = once.clone();
    vergesort::sort(&mut twice);

    assert_eq!(once, twice);
}

#[test]
fn comparator_duality() {
    // Sorting with the reversed comparator must equal the reversed ascending result. For i32
    // this holds element-wise, equal elements being indistinguishable.
    let input = patterns::random(10_000);

    let mut ascending = input.clone();
    vergesort::sort_by(&mut ascending, |a, b| a.cmp(b));

    let mut descending = input;
    vergesort::sort_by(&mut descending, |a, b| b.cmp(a));
    descending.reverse();

    assert_eq!(ascending, descending);
}

#[test]
fn bidirectional_agrees_with_default() {
    for n in [0usize, 1, 50, 79, 80, 1_000, 10_000] {
        let input = patterns::random(n);

        let mut via_default = input.clone();
        vergesort::sort(&mut via_default);

        let mut via_bidirectional = input;
        vergesort::bidirectional::sort(&mut via_bidirectional);

        assert_eq!(via_default, via_bidirectional);
    }
}
