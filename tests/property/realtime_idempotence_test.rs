//! Property-based tests for realtime event application.
//!
//! Replicas receive the same events with duplicates and in different orders.
//! Applying an event twice must look like applying it once, and independent
//! events must converge regardless of arrival order.

use std::time::Duration;

use kizuna::managers::reconciler::BookmarkReconciler;
use kizuna::types::bookmark::Bookmark;
use kizuna::types::change_event::ChangeEvent;
use proptest::prelude::*;

const OWNER: &str = "owner-1";

fn reconciler() -> BookmarkReconciler {
    BookmarkReconciler::new(Some(OWNER.to_string()), Duration::from_secs(3))
}

fn arb_row(id: String) -> impl Strategy<Value = Bookmark> {
    (
        "[a-z]{3,10}",
        proptest::option::of(prop_oneof![Just("Dev"), Just("Reading"), Just("  Work  ")]),
        proptest::option::of(1i64..10),
        0i64..1_000,
    )
        .prop_map(move |(host, category, rank, created_at)| Bookmark {
            id: id.clone(),
            user_id: OWNER.to_string(),
            url: format!("https://{}.com", host),
            title: host,
            icon_url: None,
            category: category.map(str::to_string),
            sort_order: rank,
            created_at,
        })
}

fn arb_event(id: String) -> impl Strategy<Value = ChangeEvent> {
    let delete = ChangeEvent::Delete {
        id: id.clone(),
        user_id: Some(OWNER.to_string()),
    };
    prop_oneof![
        arb_row(id.clone()).prop_map(ChangeEvent::Insert),
        arb_row(id).prop_map(ChangeEvent::Update),
        Just(delete),
    ]
}

/// One event per id, so no two events in the batch touch the same row.
fn arb_independent_events(max: usize) -> impl Strategy<Value = Vec<ChangeEvent>> {
    (0..max).prop_flat_map(|n| {
        (0..n)
            .map(|i| arb_event(format!("bm-{:02}", i)))
            .collect::<Vec<_>>()
    })
}

fn arb_seed() -> impl Strategy<Value = Vec<Bookmark>> {
    (0usize..6).prop_flat_map(|n| {
        (0..n)
            .map(|i| arb_row(format!("bm-{:02}", i * 2)))
            .collect::<Vec<_>>()
    })
}

// **Property 1: duplicate delivery is harmless**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn applying_an_event_twice_equals_once(seed in arb_seed(), event in arb_event("bm-02".to_string())) {
        let mut once = reconciler();
        once.replace_all(seed.clone());
        once.apply_realtime_event(event.clone()).unwrap();

        let mut twice = reconciler();
        twice.replace_all(seed);
        twice.apply_realtime_event(event.clone()).unwrap();
        twice.apply_realtime_event(event).unwrap();

        prop_assert_eq!(once.bookmarks(), twice.bookmarks());
        prop_assert_eq!(once.view(), twice.view());
    }
}

// **Property 2: independent events converge in any order**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn arrival_order_does_not_matter(
        seed in arb_seed(),
        (events, shuffled) in arb_independent_events(10).prop_flat_map(|events| {
            let shuffled = Just(events.clone()).prop_shuffle();
            (Just(events), shuffled)
        }),
    ) {
        let mut first = reconciler();
        first.replace_all(seed.clone());
        for event in events {
            first.apply_realtime_event(event).unwrap();
        }

        let mut second = reconciler();
        second.replace_all(seed);
        for event in shuffled {
            second.apply_realtime_event(event).unwrap();
        }

        prop_assert_eq!(first.bookmarks(), second.bookmarks());
        prop_assert_eq!(first.groups(), second.groups());
    }

    #[test]
    fn refetch_overrides_earlier_events(
        events in arb_independent_events(8),
        rows in arb_seed(),
    ) {
        let mut live = reconciler();
        for event in events {
            live.apply_realtime_event(event).unwrap();
        }
        live.replace_all(rows.clone());

        let mut fresh = reconciler();
        fresh.replace_all(rows);

        prop_assert_eq!(live.bookmarks(), fresh.bookmarks());
    }

    #[test]
    fn foreign_events_leave_state_untouched(seed in arb_seed(), row in arb_row("bm-03".to_string())) {
        let mut state = reconciler();
        state.replace_all(seed);
        let before = state.view();

        let foreign = Bookmark { user_id: "owner-2".to_string(), ..row };
        prop_assert!(state.apply_realtime_event(ChangeEvent::Insert(foreign)).is_err());
        prop_assert_eq!(state.view(), before);
    }
}
