use log::debug;

use crate::regex::ast::{GroupKind, NodeId, Tree};
use crate::regex::leaf::LeafToken;

/// Depths and activity for matching `input`. Safe to call again for a
/// different input.
pub fn prepare_for_matching(tree: &mut Tree<'_>, input: &str) {
    set_depths(tree);
    optimize_parse_tree(tree, input);
    tree.set_annotated();
}

pub fn set_depths(tree: &mut Tree<'_>) {
    let mut stack = vec![(tree.root(), 0)];
    while let Some((id, depth)) = stack.pop() {
        let node = tree.node_mut(id);
        node.depth = depth;
        stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
    }
}

/// Marks leaves that cannot match anywhere in `input` as inactive and folds
/// activity up the tree.
pub fn optimize_parse_tree(tree: &mut Tree<'_>, input: &str) {
    let chars: Vec<char> = input.chars().collect();
    let order = tree.preorder();
    let mut inactive = 0;
    for &id in &order {
        let active = if tree.node(id).is_leaf() {
            leaf_is_active(tree, id, &chars)
        } else {
            true
        };
        if !active {
            inactive += 1;
        }
        tree.node_mut(id).active = active;
    }
    for &id in order.iter().rev() {
        propagate_activity(tree, id);
    }
    debug!("{inactive} of {} leaves inactive", tree.leaves().len());
}

fn leaf_is_active(tree: &Tree<'_>, id: NodeId, input: &[char]) -> bool {
    let node = tree.node(id);
    match node.group {
        GroupKind::Invalid(_) => false,
        // Its text is only known once the referenced group has matched.
        GroupKind::Backreference => true,
        GroupKind::Empty => LeafToken::default().matches_anywhere(input),
        _ => LeafToken::compile(tree.text(id)).is_ok_and(|token| token.matches_anywhere(input)),
    }
}

/// Concatenation slots need their member active, alternation slots need one
/// active member; a node is active only if every slot is.
fn propagate_activity(tree: &mut Tree<'_>, id: NodeId) {
    if tree.node(id).is_leaf() {
        return;
    }
    let slots_active = tree
        .slots(id)
        .iter()
        .all(|slot| slot.iter().any(|&member| tree.node(member).active));
    let node = tree.node_mut(id);
    node.active = node.active && slots_active;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parser::parse;

    fn active_texts<'p>(tree: &Tree<'p>) -> Vec<(&'p str, bool)> {
        tree.preorder()
            .into_iter()
            .map(|id| (tree.text(id), tree.node(id).active))
            .collect()
    }

    #[test]
    fn depths_follow_nesting() {
        let mut tree = parse("a(b(c))");
        set_depths(&mut tree);
        let depths: Vec<(&str, usize)> = tree
            .preorder()
            .into_iter()
            .map(|id| (tree.text(id), tree.node(id).depth))
            .collect();
        assert_eq!(
            depths,
            vec![("a(b(c))", 0), ("a", 1), ("b(c)", 1), ("b", 2), ("c", 2)]
        );
    }

    #[test]
    fn leaves_without_any_occurrence_are_inactive() {
        let mut tree = parse("ab*c");
        prepare_for_matching(&mut tree, "aac");
        assert_eq!(
            active_texts(&tree),
            vec![("ab*c", false), ("a", true), ("b", false), ("c", true)]
        );
    }

    #[test]
    fn alternation_needs_one_active_member() {
        let mut tree = parse("x|y");
        prepare_for_matching(&mut tree, "y");
        assert_eq!(
            active_texts(&tree),
            vec![("x|y", true), ("x", false), ("y", true)]
        );

        prepare_for_matching(&mut tree, "z");
        assert!(!tree.node(tree.root()).active);
    }

    #[test]
    fn activity_is_recomputed_per_input() {
        let mut tree = parse("ab");
        prepare_for_matching(&mut tree, "xx");
        assert!(!tree.node(tree.root()).active);
        prepare_for_matching(&mut tree, "xab");
        assert!(tree.node(tree.root()).active);
    }

    #[test]
    fn empty_leaves_match_at_the_end_of_any_input() {
        let mut tree = parse("a()");
        prepare_for_matching(&mut tree, "");
        assert_eq!(
            active_texts(&tree),
            vec![("a()", false), ("a", false), ("", true)]
        );
    }

    #[test]
    fn classes_count_as_occurrences() {
        let mut tree = parse(r"[0-9]\s");
        prepare_for_matching(&mut tree, "a 7");
        assert_eq!(
            active_texts(&tree),
            vec![(r"[0-9]\s", true), ("[0-9]", true), (r"\s", true)]
        );
    }
}
