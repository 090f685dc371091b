//! Property-based tests for the ordering engine.
//!
//! `compare` must be a strict total order over bookmarks with distinct ids, so
//! every replica holding the same rows renders them in the same sequence.

use std::cmp::Ordering;

use kizuna::services::ordering::{compare, sorted, swap_and_renumber};
use kizuna::types::bookmark::Bookmark;
use proptest::prelude::*;

/// Bookmarks with unique ids and deliberately colliding ranks and timestamps.
fn arb_bookmarks(max: usize) -> impl Strategy<Value = Vec<Bookmark>> {
    prop::collection::vec((proptest::option::of(0i64..5), 0i64..5), 0..max).prop_map(|fields| {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (rank, created_at))| Bookmark {
                id: format!("bm-{:03}", i),
                user_id: "owner".to_string(),
                url: format!("https://site{}.io", i),
                title: format!("Site {}", i),
                icon_url: None,
                category: None,
                sort_order: rank,
                created_at,
            })
            .collect()
    })
}

fn ids(items: &[Bookmark]) -> Vec<String> {
    items.iter().map(|b| b.id.clone()).collect()
}

// **Property 1: compare is a strict total order**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn compare_is_antisymmetric_and_never_equal(items in arb_bookmarks(12)) {
        for a in &items {
            prop_assert_eq!(compare(a, a), Ordering::Equal);
            for b in &items {
                if a.id != b.id {
                    prop_assert_ne!(compare(a, b), Ordering::Equal);
                    prop_assert_eq!(compare(a, b), compare(b, a).reverse());
                }
            }
        }
    }

    #[test]
    fn compare_is_transitive(items in arb_bookmarks(8)) {
        for a in &items {
            for b in &items {
                for c in &items {
                    if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                        prop_assert_eq!(compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }
}

// **Property 2: sorting does not depend on input order**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn sort_is_independent_of_arrival_order(
        (items, shuffled) in arb_bookmarks(20).prop_flat_map(|items| {
            let shuffled = Just(items.clone()).prop_shuffle();
            (Just(items), shuffled)
        })
    ) {
        prop_assert_eq!(ids(&sorted(&items)), ids(&sorted(&shuffled)));
    }

    #[test]
    fn unranked_always_precede_ranked(items in arb_bookmarks(20)) {
        let ordered = sorted(&items);
        let first_ranked = ordered.iter().position(|b| b.sort_order.is_some()).unwrap_or(ordered.len());
        prop_assert!(ordered[first_ranked..].iter().all(|b| b.sort_order.is_some()));
    }
}

// **Property 3: a swap renumbers contiguously and exchanges exactly two slots**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn swap_renumbers_one_to_n(
        items in arb_bookmarks(15).prop_filter("need two", |v| v.len() >= 2),
        picks in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
    ) {
        let ordered = sorted(&items);
        let from = picks.0.index(ordered.len());
        let to = picks.1.index(ordered.len());
        let dragged = ordered[from].id.clone();
        let target = ordered[to].id.clone();

        let result = swap_and_renumber(&ordered, &dragged, &target);
        if from == to {
            prop_assert!(result.is_none());
        } else {
            let ranks = result.unwrap();
            prop_assert_eq!(ranks.len(), ordered.len());
            for (index, (id, rank)) in ranks.iter().enumerate() {
                prop_assert_eq!(*rank, index as i64 + 1);
                let expected = if index == from {
                    &target
                } else if index == to {
                    &dragged
                } else {
                    &ordered[index].id
                };
                prop_assert_eq!(id, expected);
            }
        }
    }
}
