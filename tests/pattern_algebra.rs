use proptest::prelude::*;

use kyrostate::{compare_patterns, intersect_patterns, CompareResult, PathPattern, PathScanner};
use serde_json::json;

const TOKENS: &[&str] = &[
    "a", "b", "c", "*", "*?", "**", "(a|b)", "(b|c)", "!(a)", "!(a|b)", "!()",
];

fn arb_token() -> impl Strategy<Value = &'static str> {
    prop::sample::select(TOKENS)
}

/// Valid patterns of one to four segments, no empty-set segment.
fn arb_pattern() -> impl Strategy<Value = PathPattern> {
    prop::collection::vec(arb_token(), 1..=4)
        .prop_filter_map("at most one variable-length segment", |tokens| {
            PathPattern::parse(&tokens.join("."), ".").ok()
        })
}

/// Valid patterns with an empty-set segment spliced in.
fn arb_nil_pattern() -> impl Strategy<Value = PathPattern> {
    (prop::collection::vec(arb_token(), 0..=3), any::<prop::sample::Index>()).prop_filter_map(
        "at most one variable-length segment",
        |(mut tokens, at)| {
            let at = at.index(tokens.len() + 1);
            tokens.insert(at, "()");
            PathPattern::parse(&tokens.join("."), ".").ok()
        },
    )
}

proptest! {
    #[test]
    fn prop_compare_with_itself_is_identity(p in arb_pattern()) {
        prop_assert_eq!(compare_patterns(&p, &p), CompareResult::Identity);
        let reparsed = PathPattern::parse(p.source(), ".").unwrap();
        prop_assert_eq!(compare_patterns(&p, &reparsed), CompareResult::Identity);
    }

    #[test]
    fn prop_compare_is_inverse_symmetric(a in arb_pattern(), b in arb_pattern()) {
        prop_assert_eq!(compare_patterns(&a, &b), compare_patterns(&b, &a).inverse());
    }

    #[test]
    fn prop_intersect_agrees_with_compare(a in arb_pattern(), b in arb_pattern()) {
        prop_assert_eq!(
            intersect_patterns(&a, &b),
            compare_patterns(&a, &b) != CompareResult::Disjoint
        );
    }

    #[test]
    fn prop_nil_pattern_is_disjoint_from_everything(n in arb_nil_pattern(), p in arb_pattern()) {
        prop_assert_eq!(compare_patterns(&n, &n), CompareResult::Disjoint);
        prop_assert_eq!(compare_patterns(&n, &p), CompareResult::Disjoint);
        prop_assert_eq!(compare_patterns(&p, &n), CompareResult::Disjoint);
        prop_assert!(!intersect_patterns(&n, &p));
        prop_assert!(!n.matches("a.b"));
    }

    #[test]
    fn prop_scanned_paths_match_their_pattern(p in arb_pattern()) {
        let tree = json!({
            "a": {"a": 1, "b": {"c": 2}, "c": [3, {"a": 4}]},
            "b": {"b": {"b": {"b": 5}}},
            "c": 6
        });
        for path in PathScanner::new(&tree).scan(&p).keys() {
            prop_assert!(p.matches(path), "{} scanned {} but does not match it", p, path);
        }
    }
}

#[test]
fn known_relations() {
    let cases = [
        ("a.b", "a.*", CompareResult::Subset),
        ("a.*", "a.b", CompareResult::Superset),
        ("a.(b|c)", "a.!(b)", CompareResult::Intersect),
        ("a.b", "a.c", CompareResult::Disjoint),
        ("a.**", "a.b.c", CompareResult::Superset),
        ("a.b", "a.b.c", CompareResult::Disjoint),
        ("*.b", "a.*", CompareResult::Intersect),
        ("a.*?", "a", CompareResult::Superset),
    ];
    for (left, right, expected) in cases {
        let a = PathPattern::parse(left, ".").unwrap();
        let b = PathPattern::parse(right, ".").unwrap();
        assert_eq!(compare_patterns(&a, &b), expected, "{left} vs {right}");
    }
}
