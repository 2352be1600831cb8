use super::*;

fn tally(counts: &[(&str, u64)]) -> Tally {
    Tally::from_counts(counts.iter().map(|(k, v)| (k.to_string(), *v)).collect())
}

#[test]
fn test_for_options_starts_at_zero() {
    let t = Tally::for_options(["Red", "Blue"]);

    assert_eq!(t, tally(&[("Red", 0), ("Blue", 0)]));
    assert_eq!(t.total(), 0);
}

#[test]
fn test_increment_existing_key() {
    let t = apply_delta(&tally(&[("Red", 2)]), None, Some("Red"));
    assert_eq!(t.get("Red"), 3);
}

#[test]
fn test_increment_missing_key_starts_at_one() {
    let t = apply_delta(&tally(&[("Red", 0)]), None, Some("Blue"));
    assert_eq!(t, tally(&[("Red", 0), ("Blue", 1)]));
}

#[test]
fn test_decrement_existing_key() {
    let t = apply_delta(&tally(&[("Red", 2)]), Some("Red"), None);
    assert_eq!(t.get("Red"), 1);
}

#[test]
fn test_decrement_zero_floors_at_zero() {
    let t = apply_delta(&tally(&[("Red", 0)]), Some("Red"), None);
    assert_eq!(t, tally(&[("Red", 0)]));
}

#[test]
fn test_decrement_missing_key_does_not_create_it() {
    let t = apply_delta(&tally(&[("Red", 1)]), Some("Blue"), None);
    assert_eq!(t, tally(&[("Red", 1)]));
    assert!(!t.contains("Blue"));
}

#[test]
fn test_move_between_options() {
    let t = apply_delta(&tally(&[("Red", 1), ("Blue", 0)]), Some("Red"), Some("Blue"));
    assert_eq!(t, tally(&[("Red", 0), ("Blue", 1)]));
}

#[test]
fn test_move_from_zero_still_increments_target() {
    let t = apply_delta(&tally(&[("Red", 0), ("Blue", 4)]), Some("Red"), Some("Blue"));
    assert_eq!(t, tally(&[("Red", 0), ("Blue", 5)]));
}

#[test]
fn test_same_option_is_noop() {
    for count in [0, 1, 7] {
        let before = tally(&[("Red", count)]);
        assert_eq!(apply_delta(&before, Some("Red"), Some("Red")), before);
    }
}

#[test]
fn test_no_from_no_to_is_noop() {
    let before = tally(&[("Red", 3)]);
    assert_eq!(apply_delta(&before, None, None), before);
}

#[test]
fn test_input_is_not_mutated() {
    let before = tally(&[("Red", 3)]);
    let _ = apply_delta(&before, Some("Red"), None);
    assert_eq!(before.get("Red"), 3);
}

#[test]
fn test_never_negative_under_any_decrement_order() {
    let options = ["A", "B", "C"];
    let mut t = Tally::for_options(options);
    // more decrements than increments, interleaved
    let script: &[(Option<&str>, Option<&str>)] = &[
        (Some("A"), None),
        (None, Some("A")),
        (Some("A"), Some("B")),
        (Some("A"), None),
        (Some("B"), Some("C")),
        (Some("B"), None),
        (Some("C"), None),
        (Some("C"), None),
        (None, Some("C")),
    ];
    for (from, to) in script {
        t = apply_delta(&t, *from, *to);
        assert!(t.iter().all(|(k, _)| options.contains(&k)));
    }
    assert_eq!(t, tally(&[("A", 0), ("B", 0), ("C", 1)]));
}

#[test]
fn test_matches_ledger_count_for_valid_histories() {
    // replay vote histories of three voters and compare to a recount
    let histories: [&[&str]; 3] = [&["A", "B", "A"], &["C"], &["B", "B", "C"]];
    let mut t = Tally::for_options(["A", "B", "C"]);
    for history in histories {
        let mut current: Option<&str> = None;
        for &option in history {
            t = apply_delta(&t, current, Some(option));
            current = Some(option);
        }
    }
    assert_eq!(t, tally(&[("A", 1), ("B", 0), ("C", 2)]));
    assert_eq!(t.total(), 3);
}

#[test]
fn test_add_option_keeps_existing_count() {
    let t = tally(&[("Red", 2)]).add_option("Red").add_option("Blue");
    assert_eq!(t, tally(&[("Red", 2), ("Blue", 0)]));
}

#[test]
fn test_remove_option_drops_key() {
    let t = tally(&[("Red", 2), ("Blue", 1)]).remove_option("Red");
    assert_eq!(t, tally(&[("Blue", 1)]));
}

#[test]
fn test_rename_option_overwrites_target() {
    let t = tally(&[("Red", 2), ("Crimson", 5)]).rename_option("Red", "Crimson");
    assert_eq!(t, tally(&[("Crimson", 2)]));

    let untouched = tally(&[("Blue", 1)]).rename_option("Red", "Crimson");
    assert_eq!(untouched, tally(&[("Blue", 1)]));
}
