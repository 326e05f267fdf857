use sort_test_tools::{instantiate_sort_tests, Sort};

struct SortImpl {}

impl Sort for SortImpl {
    fn name() -> String {
        "rust_std_unstable".into()
    }

    fn sort<T>(arr: &mut [T])
    where
        T: Ord,
    {
        arr.sort_unstable();
    }

    fn sort_by<T, F>(arr: &mut [T], compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        arr.sort_unstable_by(compare);
    }
}

instantiate_sort_tests!(SortImpl);
