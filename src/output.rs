use recount::ParseError;
use recount::diophantine::{LinearEquation, Solution};
use recount::regex::{Assignment, LinkKind, QuantifierKind, Tree};

const COLOR_START: &str = "\x1b[01;31m";
const COLOR_RESET: &str = "\x1b[m";

pub fn maybe_colorize(s: &str, use_color: bool) -> String {
    if use_color {
        format!("{COLOR_START}{s}{COLOR_RESET}")
    } else {
        s.to_string()
    }
}

/// One line per node in pre-order, indented by depth. Inactive nodes are
/// flagged once the tree has been annotated.
pub fn render_tree(tree: &Tree<'_>, use_color: bool) -> String {
    let mut out = String::new();
    let mut stack = vec![(tree.root(), 0)];
    while let Some((id, depth)) = stack.pop() {
        let node = tree.node(id);
        let alternative = if node.link == LinkKind::Alternation { "| " } else { "" };
        out.push_str(&format!(
            "{}{alternative}{}{}  {}",
            "  ".repeat(depth),
            tree.group_text(id),
            tree.quantifier_text(id),
            node.group.label()
        ));
        if node.quantifier != QuantifierKind::ExactlyOne {
            out.push_str(&format!(" {}", node.bounds));
        }
        if tree.is_annotated() && !node.active {
            out.push(' ');
            out.push_str(&maybe_colorize("inactive", use_color));
        }
        out.push('\n');
        stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
    }
    out
}

/// `group=count` for every repetition, or `-` when nothing repeats.
pub fn render_assignment(tree: &Tree<'_>, assignment: &Assignment) -> String {
    if assignment.repetitions.is_empty() {
        return "-".to_string();
    }
    assignment
        .repetitions
        .iter()
        .map(|r| {
            format!(
                "{}{}={}",
                tree.group_text(r.node),
                tree.quantifier_text(r.node),
                r.count
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The error message followed by the pattern with the offending range
/// underlined.
pub fn render_diagnostic(pattern: &str, err: &ParseError, use_color: bool) -> String {
    let start = pattern[..err.span.start].chars().count();
    let width = err.span.slice(pattern).chars().count().max(1);
    let carets = maybe_colorize(&"^".repeat(width), use_color);
    format!("error: {}\n  {pattern}\n  {}{carets}", err.kind, " ".repeat(start))
}

/// `name = particular + coefficient*tK ...` per unknown.
pub fn render_solution(eq: &LinearEquation, solution: &Solution) -> String {
    let mut lines = Vec::new();
    for (i, name) in eq.unknowns().enumerate() {
        let mut line = format!("{name} = {}", solution.particular[i]);
        for (k, direction) in solution.basis.iter().enumerate() {
            match direction[i] {
                0 => {}
                c if c < 0 => line.push_str(&format!(" - {}*t{}", c.unsigned_abs(), k + 1)),
                c => line.push_str(&format!(" + {c}*t{}", k + 1)),
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use recount::regex::{match_all, parse, prepare_for_matching};

    #[test]
    fn colorize_only_when_asked() {
        assert_eq!(maybe_colorize("x", false), "x");
        assert_eq!(maybe_colorize("x", true), "\x1b[01;31mx\x1b[m");
    }

    #[test]
    fn tree_lines_follow_nesting() {
        let mut tree = parse("a(b|c)*");
        prepare_for_matching(&mut tree, "abb");
        assert_eq!(
            render_tree(&tree, false),
            "a(b|c)*  implicit\n  a  implicit\n  (b|c)*  capture [0, inf)\n    b  implicit\n    | c  implicit inactive\n"
        );
    }

    #[test]
    fn assignments_name_their_groups() {
        let mut tree = parse("x(ab){1,3}y*");
        prepare_for_matching(&mut tree, "xabab");
        let found = match_all(&tree, "xabab").unwrap();
        assert_eq!(render_assignment(&tree, &found[0]), "(ab){1,3}=2 y*=0");
    }

    #[test]
    fn diagnostic_underlines_the_span() {
        let tree = parse("a{3,1}");
        let err = tree.validate().unwrap_err();
        assert_eq!(
            render_diagnostic("a{3,1}", &err, false),
            format!("error: {}\n  a{{3,1}}\n   ^^^^^", err.kind)
        );
    }

    #[test]
    fn general_solution_lines() {
        let eq: LinearEquation = "2*x=4".parse().unwrap();
        let solution = eq.solve().unwrap().unwrap();
        assert_eq!(render_solution(&eq, &solution), "x = 2");
    }
}
