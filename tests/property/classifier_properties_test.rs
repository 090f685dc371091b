//! Property-based tests for the category classifier.
//!
//! Classification is total: every bookmark lands in exactly one non-empty
//! category, and a user label always wins over the inferred one.

use std::cmp::Ordering;

use kizuna::services::category_classifier::{
    auto_category, classify, compare_categories, normalize_category_label, KNOWN_CATEGORIES,
};
use kizuna::types::bookmark::Bookmark;
use proptest::prelude::*;

fn bookmark(title: String, url: String, category: Option<String>) -> Bookmark {
    Bookmark {
        id: "b".to_string(),
        user_id: "owner".to_string(),
        url,
        title,
        icon_url: None,
        category,
        sort_order: None,
        created_at: 0,
    }
}

fn arb_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-z][a-z0-9-]{0,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".io"), Just(".dev")],
        proptest::option::of("/[a-zA-Z0-9@._-]{1,20}"),
    )
        .prop_map(|(scheme, host, tld, path)| format!("{}://{}{}{}", scheme, host, tld, path.unwrap_or_default()))
}

// **Property 1: automatic categories come from the fixed list**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn auto_category_is_total(title in ".{0,40}", url in arb_url()) {
        let label = auto_category(&title, &url);
        prop_assert!(KNOWN_CATEGORIES.contains(&label));
        prop_assert_eq!(classify(&bookmark(title, url, None)), label);
    }

    #[test]
    fn auto_category_ignores_case(title in "[a-zA-Z ]{0,30}", url in arb_url()) {
        prop_assert_eq!(
            auto_category(&title.to_uppercase(), &url.to_uppercase()),
            auto_category(&title, &url)
        );
    }
}

// **Property 2: a non-blank user label always wins**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn custom_label_wins(title in ".{0,20}", url in arb_url(), label in "[A-Za-z][A-Za-z0-9]{0,15}") {
        prop_assume!(!label.eq_ignore_ascii_case("all"));
        let b = bookmark(title, url, Some(format!("  {}  ", label)));
        prop_assert_eq!(classify(&b), label);
    }

    #[test]
    fn blank_label_falls_back(title in ".{0,20}", url in arb_url(), blank in "[ \t\n]{0,5}") {
        let b = bookmark(title.clone(), url.clone(), Some(blank));
        prop_assert_eq!(classify(&b), auto_category(&title, &url));
    }

    #[test]
    fn normalized_labels_are_bounded_and_trimmed(raw in "\\PC{0,80}", max in 1usize..40) {
        if let Some(label) = normalize_category_label(&raw, max) {
            prop_assert!(label.chars().count() <= max);
            prop_assert!(!label.is_empty());
            prop_assert_eq!(label.trim(), label.as_str());
            prop_assert!(!label.contains("  "));
        }
    }
}

// **Property 3: category display order is a total order with known labels first**
proptest! {
    #[test]
    fn known_categories_sort_before_custom(custom in "[A-Za-z]{1,12}", known in 0usize..8) {
        let known = KNOWN_CATEGORIES[known];
        prop_assume!(!KNOWN_CATEGORIES.contains(&custom.as_str()));
        prop_assert_eq!(compare_categories(known, &custom), Ordering::Less);
        prop_assert_eq!(compare_categories(&custom, known), Ordering::Greater);
    }
}
