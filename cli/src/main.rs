//! Arcflow CLI: evaluate failure scenarios described in a network file
//!
//! The network file (JSON or YAML) lists nodes, capacitated arcs, the source,
//! the sink and optional named scenarios.

use anyhow::{Context, Result};
use arcflow::{FlowComputation, Network, ParallelConfig};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arcflow", version, about = "Max-flow failure scenario evaluation")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every scenario in the network file
    Run {
        /// Network description (.json, .yaml, .yml)
        file: PathBuf,

        /// Spread scenarios over worker threads
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (overrides the file's setting)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the max flow value with every arc available
    Baseline {
        /// Network description (.json, .yaml, .yml)
        file: PathBuf,
    },
    /// Rank arcs by the flow lost when each one fails alone
    Critical {
        /// Network description (.json, .yaml, .yml)
        file: PathBuf,

        /// Show only the first N arcs
        #[arg(long)]
        top: Option<usize>,

        /// Spread the sweep over worker threads
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (overrides the file's setting)
        #[arg(long)]
        workers: Option<usize>,
    },
}

/// Rows ready for any output format
struct Report {
    columns: Vec<&'static str>,
    rows: Vec<Vec<Value>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let report = match cli.command {
        Commands::Run { file, parallel, workers } => run_scenarios(&load(&file)?, parallel, workers)?,
        Commands::Baseline { file } => run_baseline(&load(&file)?)?,
        Commands::Critical { file, top, parallel, workers } => {
            run_critical(&load(&file)?, top, parallel, workers)?
        }
    };

    print_report(&report, &cli.format)
}

fn load(file: &Path) -> Result<Network> {
    Network::load(file).with_context(|| format!("loading {}", file.display()))
}

fn engine(network: &Network) -> Result<FlowComputation<&arcflow::DigraphStore>> {
    network.engine().context("binding flow computation")
}

/// `--workers` wins over the network file's `parallel.workers`
fn parallel_config(network: &Network, workers: Option<usize>) -> ParallelConfig {
    ParallelConfig {
        workers: workers.or(network.parallel.workers),
    }
}

fn run_scenarios(network: &Network, parallel: bool, workers: Option<usize>) -> Result<Report> {
    let mut flow = engine(network)?;
    let baseline = flow.baseline()?;

    let values = if parallel {
        let config = parallel_config(network, workers);
        let sets: Vec<&[arcflow::ArcId]> = network.scenarios.iter().map(|s| s.disabled.as_slice()).collect();
        arcflow::evaluate_scenarios_parallel(&flow, &sets, &config)?
    } else {
        network
            .scenarios
            .iter()
            .map(|s| flow.run_scenario(&s.disabled))
            .collect::<Result<Vec<i64>, _>>()?
    };

    let mut rows = vec![vec![json!("baseline"), json!(""), json!(baseline), json!(0)]];
    for (scenario, value) in network.scenarios.iter().zip(values) {
        let disabled: Vec<&str> = scenario.disabled.iter().map(|&arc| network.arc_label(arc)).collect();
        rows.push(vec![
            json!(scenario.name),
            json!(disabled.join(" ")),
            json!(value),
            json!(baseline - value),
        ]);
    }

    Ok(Report {
        columns: vec!["scenario", "disabled", "value", "loss"],
        rows,
    })
}

fn run_baseline(network: &Network) -> Result<Report> {
    let mut flow = engine(network)?;
    let value = flow.baseline()?;
    let stats = flow.stats();
    Ok(Report {
        columns: vec!["source", "sink", "value", "pushes", "relabels", "global_relabels"],
        rows: vec![vec![
            json!(network.node_names[network.source.index()]),
            json!(network.node_names[network.sink.index()]),
            json!(value),
            json!(stats.pushes),
            json!(stats.relabels),
            json!(stats.global_relabels),
        ]],
    })
}

fn run_critical(network: &Network, top: Option<usize>, parallel: bool, workers: Option<usize>) -> Result<Report> {
    let mut flow = engine(network)?;
    let impacts = if parallel {
        arcflow::single_arc_sweep_parallel(&flow, &parallel_config(network, workers))?
    } else {
        flow.single_arc_sweep()?
    };

    let rows = impacts
        .iter()
        .take(top.unwrap_or(usize::MAX))
        .map(|impact| -> Result<Vec<Value>> {
            let (from, to) = network.graph.endpoints(impact.arc)?;
            Ok(vec![
                json!(network.arc_label(impact.arc)),
                json!(network.node_names[from.index()]),
                json!(network.node_names[to.index()]),
                json!(impact.value),
                json!(impact.loss),
            ])
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Report {
        columns: vec!["arc", "from", "to", "value", "loss"],
        rows,
    })
}

fn print_report(report: &Report, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let records: Vec<Value> = report
                .rows
                .iter()
                .map(|row| {
                    let record: serde_json::Map<String, Value> = report
                        .columns
                        .iter()
                        .map(|c| c.to_string())
                        .zip(row.iter().cloned())
                        .collect();
                    Value::Object(record)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Csv => {
            println!("{}", report.columns.join(","));
            for row in &report.rows {
                let cells: Vec<String> = row.iter().map(format_csv_value).collect();
                println!("{}", cells.join(","));
            }
        }
        OutputFormat::Table => {
            if report.rows.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(&report.columns);

            for row in &report.rows {
                let cells: Vec<String> = row.iter().map(format_table_value).collect();
                table.add_row(cells);
            }

            println!("{}", table);
            println!("{} row(s)", report.rows.len());
        }
    }

    Ok(())
}

fn format_table_value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_csv_value(v: &Value) -> String {
    match v {
        Value::Null => "".to_string(),
        Value::String(s) => {
            if s.contains(',') || s.contains('"') || s.contains('\n') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}
