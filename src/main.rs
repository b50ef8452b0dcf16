use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;

use dsep_eval::compare::{ComparisonConfig, GraphComparison, RunMode};
use dsep_eval::dot::{comparison_dot, DotConfig};
use dsep_eval::graph::Dag;
use dsep_eval::table::EvaluationTable;

#[derive(Debug, Parser)]
#[command(author, version, about = "Compare the d-separations of an estimated DAG against a true DAG")]
struct Cli {
    /// Enable debug logging (one line per trial).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one comparison and append it to the evaluation table.
    Compare(CompareArgs),
    /// Print F1 scores per method for graphs of a given size.
    Summary(SummaryArgs),
}

#[derive(Debug, clap::Args)]
struct CompareArgs {
    /// Target node.
    #[arg(short, long, value_name = "NODE", default_value = "y")]
    target: String,

    /// True graph (JSON).
    #[arg(long, value_name = "FILE", default_value = "results/true_graphs/hepar.json")]
    true_path: PathBuf,

    /// Estimated graph (JSON).
    #[arg(long, value_name = "FILE", default_value = "results/hc/graphs/hepar_l.json")]
    est_path: PathBuf,

    /// Structure-learning method that produced the estimate.
    #[arg(short, long, default_value = "hc")]
    method: String,

    /// Number of Monte-Carlo trials.
    #[arg(long, value_name = "INT", default_value_t = 1000)]
    mc: u64,

    /// Random seed.
    #[arg(long, value_name = "INT", default_value_t = 42)]
    seed: u64,

    /// Graph label in the table (defaults to the true graph's name).
    #[arg(long)]
    graph: Option<String>,

    /// Evaluation table (CSV).
    #[arg(long, value_name = "FILE", default_value = "results/graph_evaluation.csv")]
    table: PathBuf,

    /// Enumerate every statement instead of sampling.
    #[arg(long)]
    exact: bool,

    /// Largest deconfounder count allowed with --exact.
    #[arg(long, value_name = "INT", default_value_t = 20)]
    exact_limit: usize,

    /// Also write a Graphviz overlay of both graphs.
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct SummaryArgs {
    /// Evaluation table (CSV).
    #[arg(long, value_name = "FILE", default_value = "results/graph_evaluation.csv")]
    table: PathBuf,

    /// Number of nodes of the graphs to summarize.
    #[arg(short, long, value_name = "INT")]
    d: usize,
}

fn compare(args: CompareArgs) -> color_eyre::Result<()> {
    let true_graph =
        Dag::load(&args.true_path).wrap_err_with(|| format!("loading true graph {}", args.true_path.display()))?;
    let est_graph =
        Dag::load(&args.est_path).wrap_err_with(|| format!("loading estimated graph {}", args.est_path.display()))?;

    let mut config = ComparisonConfig::new(args.mc)
        .with_seed(args.seed)
        .with_method(args.method)
        .with_exact_limit(args.exact_limit);
    if let Some(graph) = args.graph {
        config = config.with_graph_name(graph);
    }

    let comparison = GraphComparison::new(&true_graph, &est_graph, &args.target, config)?;
    let mode = if args.exact { RunMode::Exact } else { RunMode::Sampled };
    let (metrics, table) = comparison.run_into_table(mode, &args.table)?;

    println!("{}", metrics.counts);
    println!(
        "separated={} connected={} dsep_share={:.4}",
        metrics.separated_total, metrics.connected_total, metrics.dsep_share
    );
    println!("precision={:.4} recall={:.4} F1={:.4}", metrics.precision, metrics.recall, metrics.f1);
    println!("{} runs in {}", table.len(), table.path().display());

    if let Some(path) = args.dot {
        let config = DotConfig {
            highlight: Some(comparison.target().to_string()),
            ..DotConfig::default()
        };
        std::fs::write(&path, comparison_dot(&true_graph, &est_graph, &config)?)?;
        println!("Graphviz overlay written to {}", path.display());
    }

    Ok(())
}

fn summary(args: SummaryArgs) -> color_eyre::Result<()> {
    let table = EvaluationTable::load_or_create(&args.table)?;
    print!("{}", table.summary(args.d));
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();
    match cli.command {
        Command::Compare(args) => compare(args)?,
        Command::Summary(args) => summary(args)?,
    }
    log::info!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());

    Ok(())
}
