use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::env;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

use rand::prelude::*;

use rand_xorshift::XorShiftRng;

use zipf::ZipfDistribution;

/// Input patterns useful for testing and benchmarking sorting algorithms.
/// Currently limited to i32 values.

// --- Public ---

pub fn random(len: usize) -> Vec<i32> {
    //     .
    // : . : :
    // :.:::.::

    random_vec(len)
}

pub fn random_uniform<R>(len: usize, range: R) -> Vec<i32>
where
    R: Into<rand::distributions::Uniform<i32>> + Hash,
{
    // :.:.:.::

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, range, |len, seed, range| {
        let mut rng: XorShiftRng = rand::SeedableRng::seed_from_u64(seed);

        let dist: rand::distributions::Uniform<i32> = range.into();
        (0..len).map(|_| dist.sample(&mut rng)).collect()
    })
}

pub fn random_zipf(len: usize, exponent: f64) -> Vec<i32> {
    // https://en.wikipedia.org/wiki/Zipf's_law

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, exponent.to_bits(), |len, seed, exponent_bits| {
        let mut rng: XorShiftRng = rand::SeedableRng::seed_from_u64(seed);

        let dist = ZipfDistribution::new(len, f64::from_bits(exponent_bits)).unwrap();
        (0..len).map(|_| dist.sample(&mut rng) as i32).collect()
    })
}

pub fn random_sorted(len: usize, sorted_percent: f64) -> Vec<i32> {
    //     .:
    //   .:::. :
    // .::::::.::
    // [----][--]
    //  ^      ^
    //  |      |
    // sorted  |
    //     unsorted

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, sorted_percent.to_bits(), |len, _seed, spb| {
        // Simulate a pre-existing sorted prefix, where the tail holds the new unsorted values.
        let sorted_percent = f64::from_bits(spb);
        let mut v = random_vec(len);
        let sorted_len = ((len as f64) * (sorted_percent / 100.0)).round() as usize;

        v[0..sorted_len].sort_unstable();

        v
    })
}

pub fn all_equal(len: usize) -> Vec<i32> {
    // ......
    // ::::::

    (0..len).map(|_| 66).collect::<Vec<_>>()
}

pub fn ascending(len: usize) -> Vec<i32> {
    //     .:
    //   .:::
    // .:::::

    (0..len as i32).collect::<Vec<_>>()
}

pub fn descending(len: usize) -> Vec<i32> {
    // :.
    // :::.
    // :::::.

    (0..len as i32).rev().collect::<Vec<_>>()
}

pub fn saw_ascending(len: usize, saw_count: usize) -> Vec<i32> {
    //   .:  .:
    // .:::.:::

    if len == 0 {
        return Vec::new();
    }

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, saw_count, |len, _seed, saw_count| {
        let mut vals = random_vec(len);
        let chunks_size = len / saw_count.max(1);

        for chunk in vals.chunks_mut(chunks_size) {
            chunk.sort_unstable();
        }

        vals
    })
}

pub fn saw_descending(len: usize, saw_count: usize) -> Vec<i32> {
    // :.  :.
    // :::.:::.

    if len == 0 {
        return Vec::new();
    }

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, saw_count, |len, _seed, saw_count| {
        let mut vals = random_vec(len);
        let chunks_size = len / saw_count.max(1);

        for chunk in vals.chunks_mut(chunks_size) {
            chunk.sort_unstable_by_key(|&e| std::cmp::Reverse(e));
        }

        vals
    })
}

pub fn saw_mixed(len: usize, saw_count: usize) -> Vec<i32> {
    // :.  :.    .::.    .:
    // :::.:::..::::::..:::

    if len == 0 {
        return Vec::new();
    }

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, saw_count, |len, _seed, saw_count| {
        let mut vals = random_vec(len);
        let chunks_size = len / saw_count.max(1);
        let saw_directions = random_uniform((len / chunks_size) + 1, 0..=1);

        for (i, chunk) in vals.chunks_mut(chunks_size).enumerate() {
            if saw_directions[i] == 0 {
                chunk.sort_unstable();
            } else if saw_directions[i] == 1 {
                chunk.sort_unstable_by_key(|&e| std::cmp::Reverse(e));
            } else {
                unreachable!();
            }
        }

        vals
    })
}

pub fn saw_mixed_range(len: usize, range: std::ops::Range<usize>) -> Vec<i32> {
    //     :.
    // :.  :::.    .::.      .:
    // :::.:::::..::::::..:.:::

    // Ascending and descending runs randomly picked, with lengths drawn from `range`.

    if len == 0 {
        return Vec::new();
    }

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, range, |len, _seed, range| {
        let mut vals = random_vec(len);

        let max_chunks = len / range.start;
        let saw_directions = random_uniform(max_chunks + 1, 0..=1);
        let chunk_sizes = random_uniform(max_chunks + 1, (range.start as i32)..(range.end as i32));

        let mut i = 0;
        let mut l = 0;
        while l < len {
            let chunk_size = chunk_sizes[i] as usize;
            let chunk_end = std::cmp::min(l + chunk_size, len);
            let chunk = &mut vals[l..chunk_end];

            if saw_directions[i] == 0 {
                chunk.sort_unstable();
            } else if saw_directions[i] == 1 {
                chunk.sort_unstable_by_key(|&e| std::cmp::Reverse(e));
            } else {
                unreachable!();
            }

            i += 1;
            l += chunk_size;
        }

        vals
    })
}

pub fn pipe_organ(len: usize) -> Vec<i32> {
    //   .:.
    // .:::::.

    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, (), |len, _seed, _| {
        let mut vals = random_vec(len);

        let first_half = &mut vals[0..(len / 2)];
        first_half.sort_unstable();

        let second_half = &mut vals[(len / 2)..len];
        second_half.sort_unstable_by_key(|&e| std::cmp::Reverse(e));

        vals
    })
}

pub fn push_front(len: usize) -> Vec<i32> {
    //   .:
    // .:::
    // ::::.

    // Sorted, except the smallest element was appended at the back.

    if len == 0 {
        return Vec::new();
    }

    let mut v: Vec<i32> = (1..len as i32).collect();
    v.push(0);

    v
}

pub fn push_middle(len: usize) -> Vec<i32> {
    //    .:
    //  .:::
    // :::::

    // Sorted, except the median element was appended at the back.

    if len == 0 {
        return Vec::new();
    }

    let mid = (len / 2) as i32;
    let mut v: Vec<i32> = (0..len as i32).filter(|&i| i != mid).collect();
    v.push(mid);

    v
}

pub fn random_init_seed() -> u64 {
    *SEED_VALUE.get_or_init(|| {
        env::var("OVERRIDE_SEED")
            .ok()
            .map(|seed| u64::from_str(&seed).unwrap())
            .unwrap_or_else(rand_root_seed)
    })
}

// --- Private ---

static SEED_VALUE: OnceLock<u64> = OnceLock::new();

#[cfg(not(miri))]
fn rand_root_seed() -> u64 {
    // A new seed per test run explores the input space fuzzer-style, while staying reproducible:
    // the value is derived from the seconds since UNIX epoch / 10 and printed by the harness, so
    // a failing run can be replayed with OVERRIDE_SEED.

    use std::time::{SystemTime, UNIX_EPOCH};

    let epoch_seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    epoch_seconds / 10
}

#[cfg(miri)]
fn rand_root_seed() -> u64 {
    // Miri is usually run with isolation, which gives repeatability but also permutations based
    // on other code that runs before.
    thread_rng().gen()
}

// With a fixed seed, rand will produce the same values in sequence, and lock + memcpy is faster
// than re-generating them, so previous requests are cached per (generator, key) pair. This mainly
// pays off for debug builds.
struct PatternCache {
    cached: Mutex<Option<HashMap<u64, Arc<Vec<i32>>>>>,
}

impl PatternCache {
    const fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    // Uses a fn pointer to avoid accidental captures; anything the generator depends on has to be
    // part of the key.
    fn copy_cached_or_gen<K: Hash>(
        &self,
        len: usize,
        key: K,
        gen_fn: fn(usize, u64, K) -> Vec<i32>,
    ) -> Vec<i32> {
        let seed = random_init_seed();

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let key_hash = hasher.finish();

        {
            let mut cached_lock = self.cached.lock().unwrap();
            let cached = cached_lock.get_or_insert_with(Default::default);

            if let Some(v_cached) = cached.get(&key_hash) {
                if v_cached.len() >= len {
                    // Cheap Arc clone to release the lock as fast as possible.
                    let v_cached_clone = v_cached.clone();
                    drop(cached_lock);

                    return v_cached_clone[..len].to_vec();
                }
            }
        }

        let v_new = Arc::new(gen_fn(len, seed, key));
        let v_new_clone = v_new.clone();

        {
            let mut cached_lock = self.cached.lock().unwrap();
            let v_cached = cached_lock
                .get_or_insert_with(Default::default)
                .entry(key_hash)
                .or_insert_with(Default::default);

            // Only keep the generated value if no longer one was inserted in the meantime by
            // another thread.
            if v_new_clone.len() > v_cached.len() {
                *v_cached = v_new_clone;
            }
        }

        v_new.to_vec()
    }
}

fn random_vec(len: usize) -> Vec<i32> {
    static CACHE: PatternCache = PatternCache::new();

    CACHE.copy_cached_or_gen(len, (), |len, seed, _| {
        let mut rng: XorShiftRng = rand::SeedableRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen::<i32>()).collect()
    })
}
