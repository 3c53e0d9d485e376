use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use test_sequencing::Problem;
use test_sequencing::compare::{Comparison, Selection, compare};
use test_sequencing::loader::load_problem;
use test_sequencing::search::Solution;
use test_sequencing::search::annealing::{AnnealingConfig, SearchTrace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    All,
    Greedy,
    Annealing,
    Exact,
}

#[derive(Parser)]
#[command(name = "seqtest")]
#[command(about = "Finds a low expected-cost order for precedence-constrained tests.", long_about = None)]
struct Args {
    /// Problem documents with `nodes` and `edges`
    #[arg(required = true)]
    problems: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = Strategy::All)]
    strategy: Strategy,
    /// JSON file with annealing parameters
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the annealing seed
    #[arg(long)]
    seed: Option<u64>,
    /// Independent annealing runs, one seed each
    #[arg(long, default_value_t = 1)]
    restarts: usize,
    /// Largest problem the exact search is run on
    #[arg(long, default_value_t = 12)]
    exact_limit: usize,
    /// Writes the annealing trace as JSON. With several problems this is a directory
    /// that receives one `<name>.trace.json` per problem.
    #[arg(long)]
    trace: Option<PathBuf>,
}

impl Args {
    fn selection(&self) -> Selection {
        let run = |s: Strategy| self.strategy == Strategy::All || self.strategy == s;
        Selection {
            greedy: run(Strategy::Greedy),
            annealing: run(Strategy::Annealing),
            exact: run(Strategy::Exact),
            exact_limit: self.exact_limit,
            restarts: self.restarts,
        }
    }

    fn trace_path(&self, problem: &Path) -> Option<PathBuf> {
        let target = self.trace.as_ref()?;
        if self.problems.len() == 1 {
            return Some(target.clone());
        }
        let stem = problem
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "problem".to_string());
        Some(target.join(format!("{}.trace.json", stem)))
    }
}

fn load_config(args: &Args) -> anyhow::Result<AnnealingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<AnnealingConfig>(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => AnnealingConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn report(problem: &Problem, name: &str, solution: &Solution, elapsed: Duration) {
    let labels: Vec<String> = solution
        .labels(problem)
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    println!(
        "  {:<10} cost {:>12.6}  time {:>10.3}ms  order [{}]",
        name,
        solution.cost,
        elapsed.as_secs_f64() * 1e3,
        labels.join(", ")
    );
}

fn report_gap(name: &str, gap: Option<f64>) {
    if let Some(gap) = gap {
        println!("  {:<18} {:>+10.4}%", name, gap * 100.0);
    }
}

fn print_comparison(problem: &Problem, comparison: &Comparison) {
    if let Some(greedy) = &comparison.greedy {
        match &greedy.value {
            Ok(solution) => report(problem, "greedy", solution, greedy.elapsed),
            Err(e) => println!("  {:<10} failed: {}", "greedy", e),
        }
    }
    if let Some(annealing) = &comparison.annealing {
        report(problem, "annealing", &annealing.value.solution, annealing.elapsed);
    }
    if let Some(exact) = &comparison.exact {
        report(problem, "exact", &exact.value, exact.elapsed);
    } else if comparison.exact_skipped {
        println!("  {:<10} skipped", "exact");
    }

    report_gap("gap_sa_vs_greedy", comparison.gap_sa_vs_greedy());
    report_gap("gap_greedy_vs_opt", comparison.gap_greedy_vs_opt());
    report_gap("gap_sa_vs_opt", comparison.gap_sa_vs_opt());
}

fn write_trace(path: &Path, trace: &SearchTrace) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    trace
        .write_json(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} trace samples to {}", trace.len(), path.display());
    Ok(())
}

fn run_one(args: &Args, path: &Path, config: &AnnealingConfig) -> anyhow::Result<()> {
    let problem =
        load_problem(path).with_context(|| format!("failed to load {}", path.display()))?;
    info!(
        "Loaded {}: {} tests, {} precedence edges",
        path.display(),
        problem.len(),
        problem.edge_count()
    );

    let comparison = compare(&problem, &args.selection(), config)?;
    println!(
        "{} ({} tests, {} edges)",
        path.display(),
        comparison.tests,
        comparison.edges
    );
    print_comparison(&problem, &comparison);

    if let (Some(target), Some(annealing)) = (args.trace_path(path), &comparison.annealing) {
        write_trace(&target, &annealing.value.trace)?;
    } else if args.trace.is_some() {
        warn!("No annealing run for {}, so no trace was written", path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let mut failed = 0usize;
    for path in &args.problems {
        if let Err(e) = run_one(&args, path, &config) {
            failed += 1;
            error!("{:#}", e);
            println!("{} error: {:#}", path.display(), e);
        }
    }

    if failed > 0 {
        bail!("{} of {} problems failed", failed, args.problems.len());
    }
    Ok(())
}
