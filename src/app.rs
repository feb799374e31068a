use std::io::{self, BufRead};

use anyhow::Context;
use log::{info, warn};
use recount::equations;
use recount::regex::{Matcher, Tree, parse, prepare_for_matching};
use recount::solver::ExternalSolver;

use crate::cli::{Config, resolve_use_color};
use crate::output::{
    maybe_colorize, render_assignment, render_diagnostic, render_solution, render_tree,
};

/// Exit status: 0 when at least one assignment matches, 1 when none does, 2
/// for an invalid pattern.
pub fn run(cfg: Config) -> anyhow::Result<i32> {
    let use_color = resolve_use_color(cfg.color);
    let input = match &cfg.input {
        Some(input) => input.clone(),
        None => read_input_line()?,
    };

    let mut tree = parse(&cfg.pattern);
    let invalid = tree.invalid_nodes();
    if !invalid.is_empty() {
        for err in &invalid {
            eprintln!("{}", render_diagnostic(&cfg.pattern, err, use_color));
        }
        return Ok(2);
    }
    prepare_for_matching(&mut tree, &input);

    if cfg.show_tree {
        print!("{}", render_tree(&tree, use_color));
    }
    if cfg.equations {
        print_equations(&tree, &input)?;
    }
    if let Some(program) = &cfg.solver {
        run_solver(program, &cfg.solver_args, &tree, &input)?;
    }

    let found = Matcher::new(cfg.options)
        .run(&tree, &input)
        .with_context(|| format!("matching {:?} against {input:?}", cfg.pattern))?;
    for assignment in &found {
        println!(
            "{}",
            maybe_colorize(&render_assignment(&tree, assignment), use_color)
        );
    }
    info!("{} assignment(s)", found.len());

    Ok(if found.is_empty() { 1 } else { 0 })
}

fn read_input_line() -> anyhow::Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input from stdin")?;
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(line)
}

fn print_equations(tree: &Tree<'_>, input: &str) -> anyhow::Result<()> {
    let system = equations::generate(tree, input.chars().count());
    println!("{system}");
    if !system.constraints.is_empty() {
        return Ok(());
    }
    let linear = system.to_linear().context("building the linear equation")?;
    match linear.solve().with_context(|| format!("solving {linear}"))? {
        Some(solution) => {
            println!("{linear}");
            println!("{}", render_solution(&linear, &solution));
        }
        None => println!("{linear} has no integer solution"),
    }
    Ok(())
}

fn run_solver(program: &str, args: &[String], tree: &Tree<'_>, input: &str) -> anyhow::Result<()> {
    let system = equations::generate(tree, input.chars().count());
    let solver = args
        .iter()
        .fold(ExternalSolver::new(program), |solver, arg| solver.arg(arg));
    let solutions = solver
        .solve(&system.to_string())
        .with_context(|| format!("solver {program:?} failed"))?;
    if solutions.is_empty() {
        warn!("solver {program:?} reported no solutions");
    }
    for solution in &solutions {
        let fields: Vec<String> = solution.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("{{ {} }}", fields.join(" "));
    }
    Ok(())
}
