use std::ops::RangeInclusive;

use proptest::prelude::*;
use recount::regex::{GroupKind, Tree, match_all, match_leaf, parse, prepare_for_matching};

fn counts(pattern: &str, input: &str) -> Vec<Vec<usize>> {
    let mut tree = parse(pattern);
    prepare_for_matching(&mut tree, input);
    match_all(&tree, input)
        .unwrap()
        .iter()
        .map(|a| a.counts())
        .collect()
}

/// Counts a generated piece may take, capped for the unbounded forms.
fn allowed(quantifier: &str) -> RangeInclusive<usize> {
    match quantifier {
        "?" => 0..=1,
        "*" => 0..=3,
        "+" => 1..=3,
        "{1,2}" => 1..=2,
        _ => 1..=1,
    }
}

fn quantifier() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just("?"), Just("*"), Just("+"), Just("{1,2}")]
}

/// Quantified literal groups, each with a seed for the count it repeats.
fn sequence() -> impl Strategy<Value = Vec<(String, &'static str, usize)>> {
    prop::collection::vec(("[ab]{1,2}", quantifier(), 0usize..4), 1..5)
}

fn count_for(quantifier: &str, seed: usize) -> usize {
    let range = allowed(quantifier);
    range.start() + seed % (range.end() - range.start() + 1)
}

fn build(pieces: &[(String, &'static str, usize)]) -> (String, String) {
    let pattern = pieces.iter().map(|(lit, q, _)| format!("({lit}){q}")).collect();
    let input = pieces
        .iter()
        .map(|(lit, q, seed)| lit.repeat(count_for(q, *seed)))
        .collect();
    (pattern, input)
}

fn assert_spans_round_trip(tree: &Tree<'_>) {
    for id in tree.preorder() {
        let node = tree.node(id);
        if node.is_leaf() {
            continue;
        }
        let rebuilt: String = node
            .children
            .iter()
            .map(|&child| {
                format!(
                    "{}{}{}",
                    tree.link_text(child),
                    tree.group_text(child),
                    tree.quantifier_text(child)
                )
            })
            .collect();
        assert_eq!(rebuilt, tree.text(id), "children of {:?}", tree.text(id));
    }
}

proptest! {
    #[test]
    fn quantifier_soundness(min in 0usize..4, extra in 1usize..4, len in 0usize..9) {
        let max = min + extra;
        let pattern = format!("a{{{min},{max}}}");
        let input = "a".repeat(len);
        let expected = if (min..=max).contains(&len) { vec![vec![len]] } else { vec![] };
        prop_assert_eq!(counts(&pattern, &input), expected);
    }

    #[test]
    fn spans_round_trip(pattern in r"[ab(|)*+?{}1,\\\[\]^:-]{0,10}") {
        assert_spans_round_trip(&parse(&pattern));
    }

    #[test]
    fn active_leaves_match_somewhere(pattern in r"[ab()|*?]{0,8}", input in "[ab]{0,4}") {
        let mut tree = parse(&pattern);
        prepare_for_matching(&mut tree, &input);
        let chars: Vec<char> = input.chars().collect();
        for id in tree.leaves() {
            let node = tree.node(id);
            // Backreferences only get their text while matching, so they stay active.
            if node.group == GroupKind::Backreference {
                continue;
            }
            let found = (0..=chars.len()).any(|pos| match_leaf(tree.text(id), &chars, pos));
            prop_assert_eq!(node.active, found, "{:?} in {:?}", tree.text(id), input);
        }
    }

    #[test]
    fn generated_counts_are_found(pieces in sequence()) {
        let (pattern, input) = build(&pieces);
        let expected: Vec<usize> = pieces
            .iter()
            .filter(|(_, q, _)| !q.is_empty())
            .map(|(_, q, seed)| count_for(q, *seed))
            .collect();

        let found = counts(&pattern, &input);
        prop_assert!(found.contains(&expected), "{pattern} on {input:?}: {found:?}");

        // Every reported assignment rebuilds the input.
        for assignment in &found {
            let mut repeats = assignment.iter();
            let rebuilt: String = pieces
                .iter()
                .map(|(lit, q, _)| {
                    let n = if q.is_empty() { 1 } else { *repeats.next().unwrap() };
                    lit.repeat(n)
                })
                .collect();
            prop_assert_eq!(&rebuilt, &input);
        }
    }

    #[test]
    fn deterministic(pieces in sequence()) {
        let (pattern, input) = build(&pieces);
        prop_assert_eq!(counts(&pattern, &input), counts(&pattern, &input));
    }

    #[test]
    fn below_minimum_never_matches(
        pieces in prop::collection::vec(("[ab]{1,3}", 1usize..3), 1..4),
        input in "[ab]{0,12}",
    ) {
        let floor: usize = pieces.iter().map(|(lit, n)| lit.len() * n).sum();
        prop_assume!(input.len() < floor);
        let pattern: String = pieces.iter().map(|(lit, n)| format!("({lit}){{{n},}}")).collect();
        prop_assert!(counts(&pattern, &input).is_empty());
    }
}
