use anyhow::{Context, bail};
use include_dir::{Dir, include_dir};
use test_sequencing::ProblemError;
use test_sequencing::compare::{Selection, compare};
use test_sequencing::loader::{LoadError, parse_problem};
use test_sequencing::search::annealing::{AnnealingConfig, simulated_annealing};
use test_sequencing::search::exact::exact_optimum;
use test_sequencing::search::greedy::greedy;

// Embed the problems directory at compile time
static PROBLEMS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/problems");

const EPSILON: f64 = 1e-9;

fn json_files<'a>(dir: &'a Dir<'a>) -> Vec<&'a include_dir::File<'a>> {
    dir.files()
        .filter(|file| file.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect()
}

fn config(seed: u64) -> AnnealingConfig {
    AnnealingConfig {
        iters_per_temperature: 50,
        max_steps: 5_000,
        seed,
        ..AnnealingConfig::default()
    }
}

#[test]
fn test_exact_bounds_heuristics_on_all_problems() -> anyhow::Result<()> {
    let files = json_files(&PROBLEMS_DIR);
    if files.is_empty() {
        bail!("No .json files found in problems/ directory");
    }

    for file in files {
        let name = file.path().display().to_string();
        let text = file
            .contents_utf8()
            .context(format!("Failed to read {} as UTF-8", name))?;
        let problem = parse_problem(text).context(format!("Failed to load {}", name))?;

        let exact = exact_optimum(&problem);
        let constructed = greedy(&problem).context(format!("Greedy failed on {}", name))?;
        let annealed = simulated_annealing(&problem, &config(42))
            .context(format!("Annealing failed on {}", name))?;

        for (strategy, solution) in [
            ("exact", &exact),
            ("greedy", &constructed),
            ("annealing", &annealed.solution),
        ] {
            if !problem.is_feasible(&solution.order) {
                bail!("{} returned an infeasible order on {}", strategy, name);
            }
            if solution.cost < 0.0 {
                bail!("{} returned a negative cost on {}", strategy, name);
            }
        }

        if exact.cost > constructed.cost + EPSILON {
            bail!(
                "{}: exact {} worse than greedy {}",
                name,
                exact.cost,
                constructed.cost
            );
        }
        if exact.cost > annealed.solution.cost + EPSILON {
            bail!(
                "{}: exact {} worse than annealing {}",
                name,
                exact.cost,
                annealed.solution.cost
            );
        }
    }

    Ok(())
}

#[test]
fn test_invalid_problems_are_rejected() -> anyhow::Result<()> {
    let invalid = PROBLEMS_DIR
        .get_dir("invalid")
        .context("missing problems/invalid directory")?;

    for file in json_files(invalid) {
        let name = file.path().display().to_string();
        let text = file
            .contents_utf8()
            .context(format!("Failed to read {} as UTF-8", name))?;

        match parse_problem(text) {
            Err(LoadError::Problem(_)) => {}
            Err(e) => bail!("{} failed for the wrong reason: {}", name, e),
            Ok(_) => bail!("{} was accepted", name),
        }
    }

    Ok(())
}

#[test]
fn test_cycle_is_reported_as_cycle() {
    let text = PROBLEMS_DIR
        .get_file("invalid/cycle.json")
        .and_then(|f| f.contents_utf8())
        .unwrap();

    assert!(matches!(
        parse_problem(text),
        Err(LoadError::Problem(ProblemError::Cycle(_)))
    ));
}

#[test]
fn test_chain_costs_six_everywhere() {
    let text = PROBLEMS_DIR
        .get_file("chain.json")
        .and_then(|f| f.contents_utf8())
        .unwrap();
    let problem = parse_problem(text).unwrap();

    assert_eq!(greedy(&problem).unwrap().cost, 6.0);
    assert_eq!(exact_optimum(&problem).cost, 6.0);
    assert_eq!(
        simulated_annealing(&problem, &config(1)).unwrap().solution.cost,
        6.0
    );
}

#[test]
fn test_independent_pair_optimum_differs_from_greedy() {
    let text = PROBLEMS_DIR
        .get_file("independent.json")
        .and_then(|f| f.contents_utf8())
        .unwrap();
    let problem = parse_problem(text).unwrap();

    let exact = exact_optimum(&problem);
    let constructed = greedy(&problem).unwrap();
    let labels: Vec<String> = exact
        .labels(&problem)
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(labels, vec!["a", "b"]);
    assert_eq!(exact.cost, 10.5);
    assert_eq!(constructed.cost, 11.0);
    assert!(exact.cost < constructed.cost);
}

#[test]
fn test_single_test_is_trivial() {
    let text = PROBLEMS_DIR
        .get_file("single.json")
        .and_then(|f| f.contents_utf8())
        .unwrap();
    let problem = parse_problem(text).unwrap();
    let x = problem.node("x").unwrap();

    let annealed = simulated_annealing(&problem, &AnnealingConfig::default()).unwrap();
    for solution in [
        greedy(&problem).unwrap(),
        exact_optimum(&problem),
        annealed.solution,
    ] {
        assert_eq!(solution.order, vec![x]);
        assert_eq!(solution.cost, 4.5);
    }
}

#[test]
fn test_batch_comparison_gaps() -> anyhow::Result<()> {
    let selection = Selection {
        restarts: 2,
        ..Selection::default()
    };

    for file in json_files(&PROBLEMS_DIR) {
        let name = file.path().display().to_string();
        let text = file
            .contents_utf8()
            .context(format!("Failed to read {} as UTF-8", name))?;
        let problem = parse_problem(text).context(format!("Failed to load {}", name))?;
        let comparison = compare(&problem, &selection, &config(7))
            .context(format!("Comparison failed on {}", name))?;

        if comparison.tests != problem.len() || comparison.edges != problem.edge_count() {
            bail!("{}: comparison reports the wrong problem size", name);
        }
        if comparison.exact_skipped {
            bail!("{}: fixtures are small enough for exact search", name);
        }
        for (gap, value) in [
            ("gap_greedy_vs_opt", comparison.gap_greedy_vs_opt()),
            ("gap_sa_vs_opt", comparison.gap_sa_vs_opt()),
        ] {
            match value {
                Some(v) if v >= -EPSILON => {}
                other => bail!("{}: {} is {:?}", name, gap, other),
            }
        }
        if comparison.gap_sa_vs_greedy().is_none() {
            bail!("{}: missing gap_sa_vs_greedy", name);
        }
    }

    Ok(())
}
