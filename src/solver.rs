//! Bridge to an external numeric solver that enumerates non-negative
//! solutions of an equation system.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::process::Command;

use log::{debug, info};

use crate::error::SolverError;

/// Line after which the solver lists one solution dictionary per line.
pub const SOLUTIONS_MARKER: &str = "Filtered solutions passing binary constraints:";

pub type SolverSolution = BTreeMap<String, u64>;

/// A solver program invoked directly (no shell) as
/// `program [args...] <system>`.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    program: OsString,
    args: Vec<OsString>,
}

impl ExternalSolver {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn solve(&self, system: &str) -> Result<Vec<SolverSolution>, SolverError> {
        info!("running solver {:?} on {system}", self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(system)
            .output()?;
        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let solutions = parse_solver_output(&String::from_utf8_lossy(&output.stdout));
        debug!("solver reported {} solution(s)", solutions.len());
        Ok(solutions)
    }
}

/// Dictionaries listed after [`SOLUTIONS_MARKER`], one per line. Everything
/// before the marker and any line not starting with `{` is ignored.
pub fn parse_solver_output(output: &str) -> Vec<SolverSolution> {
    output
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.contains(SOLUTIONS_MARKER))
        .skip(1)
        .filter(|line| line.starts_with('{'))
        .map(parse_dictionary)
        .filter(|solution| !solution.is_empty())
        .collect()
}

/// Parses `{'key': value, ...}`. Keys lose their quotes and any `:bounds`
/// suffix, so `'{x0:1,3}'` becomes `{x0}`.
pub fn parse_dictionary(text: &str) -> SolverSolution {
    let mut solution = SolverSolution::new();
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return solution;
    };
    if end <= start {
        return solution;
    }
    for entry in split_unquoted(&text[start + 1..end], ',') {
        let Some((key, value)) = split_entry(entry) else {
            continue;
        };
        if let Ok(value) = value.trim().parse() {
            solution.insert(base_key(key), value);
        }
    }
    solution
}

fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, _) if c == sep => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let colons = split_unquoted(entry, ':');
    let (value, key_parts) = colons.split_last()?;
    if key_parts.is_empty() {
        return None;
    }
    let key_len = entry.len() - value.len() - 1;
    Some((&entry[..key_len], value))
}

fn base_key(raw: &str) -> String {
    let key = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    match key.split_once(':') {
        Some((head, _)) if key.starts_with('{') => format!("{head}}}"),
        Some((head, _)) => head.to_string(),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_dictionaries_after_the_marker() {
        let output = "\
Solving 2*{x0}=4
{'ignored': 1}
Filtered solutions passing binary constraints:
{'{x0}': 2}
  {'{x0:1,3}': 1, '{b0}': 0}
not a solution
";
        let solutions = parse_solver_output(output);
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[0].get("{x0}"), Some(&2));
        assert_eq!(solutions[1].get("{x0}"), Some(&1));
        assert_eq!(solutions[1].get("{b0}"), Some(&0));
    }

    #[test]
    fn nothing_without_the_marker() {
        assert!(parse_solver_output("{'x0': 1}\n").is_empty());
    }

    #[test]
    fn plain_keys_lose_their_suffix() {
        let solution = parse_dictionary("{'x0:2': 5, \"y\": 7, 'bad': nope}");
        assert_eq!(solution.len(), 2);
        assert_eq!(solution["x0"], 5);
        assert_eq!(solution["y"], 7);
    }

    #[cfg(unix)]
    #[test]
    fn runs_the_program_without_a_shell() {
        let script = format!("echo '{SOLUTIONS_MARKER}'; echo \"{{'{{x0}}': $0}}\"");
        let solutions = ExternalSolver::new("sh")
            .arg("-c")
            .arg(script)
            .solve("3")
            .unwrap();
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0]["{x0}"], 3);
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_an_error() {
        let err = ExternalSolver::new("sh")
            .arg("-c")
            .arg("echo broken >&2; exit 3")
            .solve("1=1")
            .unwrap_err();
        match err {
            SolverError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
