use std::io;
use std::io::IsTerminal;

use clap::{ArgAction, Parser, ValueEnum};
use recount::regex::MatchOptions;
use recount::regex::matcher::DEFAULT_STEP_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    Always,
    Never,
    Auto,
}

#[derive(Debug, Parser)]
#[command(name = "recount", version)]
#[command(about = "Match a whole input against a regex by enumerating repetition counts")]
struct Args {
    /// Pattern that must match the entire input
    pattern: String,
    /// Input text; one line is read from stdin when omitted
    input: Option<String>,
    /// Print the annotated pattern tree
    #[arg(long)]
    tree: bool,
    /// Stop after the first assignment
    #[arg(long)]
    first: bool,
    /// Search step budget, 0 for unlimited
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STEP_LIMIT)]
    max_steps: usize,
    /// Print the length equations and, when they have no alternatives, their
    /// integer solution
    #[arg(long)]
    equations: bool,
    /// Pass the length equations to PROGRAM and print its solutions
    #[arg(long, value_name = "PROGRAM")]
    solver: Option<String>,
    /// Argument given to the solver before the equations (repeatable)
    #[arg(long = "solver-arg", value_name = "ARG", allow_hyphen_values = true)]
    solver_args: Vec<String>,
    #[arg(long, value_enum, value_name = "WHEN", default_value_t = ColorWhen::Never)]
    color: ColorWhen,
    /// More logging on stderr; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pattern: String,
    pub input: Option<String>,
    pub show_tree: bool,
    pub options: MatchOptions,
    pub equations: bool,
    pub solver: Option<String>,
    pub solver_args: Vec<String>,
    pub color: ColorWhen,
    pub verbosity: u8,
}

pub fn parse_args(args: Vec<String>) -> Result<Config, clap::Error> {
    let args = Args::try_parse_from(args)?;
    Ok(Config {
        pattern: args.pattern,
        input: args.input,
        show_tree: args.tree,
        options: MatchOptions {
            step_limit: (args.max_steps > 0).then_some(args.max_steps),
            first_only: args.first,
        },
        equations: args.equations,
        solver: args.solver,
        solver_args: args.solver_args,
        color: args.color,
        verbosity: args.verbose,
    })
}

pub fn resolve_use_color(color: ColorWhen) -> bool {
    match color {
        ColorWhen::Always => true,
        ColorWhen::Never => false,
        ColorWhen::Auto => io::stdout().is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("recount")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults() {
        let cfg = parse_args(args(&["a*", "aaa"])).unwrap();
        assert_eq!(cfg.pattern, "a*");
        assert_eq!(cfg.input.as_deref(), Some("aaa"));
        assert_eq!(cfg.options, MatchOptions::default());
        assert_eq!(cfg.color, ColorWhen::Never);
        assert_eq!(cfg.verbosity, 0);
        assert!(!cfg.show_tree && !cfg.equations);
    }

    #[test]
    fn flags() {
        let cfg = parse_args(args(&[
            "--tree", "--first", "--max-steps", "0", "--color", "always", "-vv", "x+",
        ]))
        .unwrap();
        assert!(cfg.show_tree);
        assert!(cfg.options.first_only);
        assert_eq!(cfg.options.step_limit, None);
        assert_eq!(cfg.color, ColorWhen::Always);
        assert_eq!(cfg.verbosity, 2);
        assert_eq!(cfg.input, None);
    }

    #[test]
    fn solver_arguments() {
        let cfg = parse_args(args(&[
            "--solver", "python3", "--solver-arg", "solver.py", "a*", "aa",
        ]))
        .unwrap();
        assert_eq!(cfg.solver.as_deref(), Some("python3"));
        assert_eq!(cfg.solver_args, vec!["solver.py".to_string()]);
    }

    #[test]
    fn rejects_unknown_color() {
        assert!(parse_args(args(&["--color", "sometimes", "a"])).is_err());
        assert!(parse_args(args(&[])).is_err());
    }

    #[test]
    fn explicit_color_choices() {
        assert!(resolve_use_color(ColorWhen::Always));
        assert!(!resolve_use_color(ColorWhen::Never));
    }
}
