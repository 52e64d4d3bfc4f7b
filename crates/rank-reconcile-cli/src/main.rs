use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rank_reconcile_core::hierarchy::{
    adjacency_matrix, hierarchy_relations, parse_edge_list, structural_complexity,
};
use rank_reconcile_core::{reconcile, Variant};
use serde_json::Value;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "rr")]
#[command(about = "Rank reconciliation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile two clustered rankings over the same object set.
    Reconcile(ReconcileArgs),
    Hierarchy {
        #[command(subcommand)]
        command: HierarchyCommand,
    },
    Graph {
        #[command(subcommand)]
        command: GraphCommand,
    },
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    /// First ranking description: JSON file path, or `-` for stdin.
    #[arg(long)]
    a: PathBuf,
    /// Second ranking description: JSON file path, or `-` for stdin.
    #[arg(long)]
    b: PathBuf,
    #[arg(long, value_enum)]
    variant: VariantArg,
}

#[derive(Debug, Subcommand)]
enum HierarchyCommand {
    /// The five organizational relation matrices of one hierarchy.
    Relations(EdgesArgs),
    /// Entropy-based structural complexity of one hierarchy.
    Complexity(EdgesArgs),
}

#[derive(Debug, Subcommand)]
enum GraphCommand {
    /// Adjacency matrix of a positive-integer edge list.
    Adjacency(EdgesArgs),
}

#[derive(Debug, Args)]
struct EdgesArgs {
    /// Edge list file (`parent,child` per line), or `-` for stdin.
    #[arg(long)]
    edges: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Kernel,
    Consistent,
}

impl VariantArg {
    fn into_variant(self) -> Variant {
        match self {
            Self::Kernel => Variant::ContradictionKernel,
            Self::Consistent => Variant::ConsistentRanking,
        }
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Reconcile(args) => run_reconcile(&args),
        Command::Hierarchy { command } => run_hierarchy(&command),
        Command::Graph { command } => run_graph(&command),
    }
}

fn run_reconcile(args: &ReconcileArgs) -> Result<()> {
    if is_stdin(&args.a) && is_stdin(&args.b) {
        return Err(anyhow!("at most one ranking may be read from stdin"));
    }

    let value_a = read_json(&args.a)?;
    let value_b = read_json(&args.b)?;
    let output = reconcile(&value_a, &value_b, args.variant.into_variant())?;
    emit_json(serde_json::to_value(&output).context("failed to serialize reconciliation output")?)
}

fn run_hierarchy(command: &HierarchyCommand) -> Result<()> {
    match command {
        HierarchyCommand::Relations(args) => {
            let edges = parse_edge_list(&read_input(&args.edges)?)?;
            let relations = hierarchy_relations(&edges);
            emit_json(serde_json::json!({
                "nodes": relations.nodes,
                "direct_control": relations.direct_control.rows(),
                "direct_subordination": relations.direct_subordination.rows(),
                "indirect_control": relations.indirect_control.rows(),
                "indirect_subordination": relations.indirect_subordination.rows(),
                "collaboration": relations.collaboration.rows(),
            }))
        }
        HierarchyCommand::Complexity(args) => {
            let edges = parse_edge_list(&read_input(&args.edges)?)?;
            let report = structural_complexity(&hierarchy_relations(&edges));
            emit_json(serde_json::json!({
                "entropy": report.entropy,
                "normalized_complexity": report.normalized,
                "entropy_rounded": round_tenth(report.entropy),
                "normalized_complexity_rounded": round_tenth(report.normalized),
            }))
        }
    }
}

fn run_graph(command: &GraphCommand) -> Result<()> {
    match command {
        GraphCommand::Adjacency(args) => {
            let edges = parse_edge_list(&read_input(&args.edges)?)?;
            let matrix = adjacency_matrix(&edges)?;
            emit_json(serde_json::json!({
                "order": matrix.order(),
                "matrix": matrix.rows(),
            }))
        }
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("failed to read input from stdin")?;
        return Ok(body);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read input {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let body = read_input(path)?;
    serde_json::from_str(&body)
        .with_context(|| format!("input is not valid JSON: {}", path.display()))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
