//! Hierank CLI: rank a JSON corpus from the command line

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table as OutputTable};
use hierank::{
    csv_field, rank, FeedbackTable, PositionIndex, RankConfig, RankRequest, SelectedCorpus, Table,
    TransitionModelBuilder,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "hierank", version, about = "Hierarchical decision-graph ranking")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Ranking configuration file (YAML or JSON)
    #[arg(long, global = true, env = "HIERANK_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

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
    /// Rank the rows of a corpus
    Rank {
        /// Corpus as a JSON array of objects
        #[arg(long)]
        corpus: PathBuf,

        /// Ranking request (hierarchy and constraints), YAML or JSON
        #[arg(long)]
        request: PathBuf,

        /// Previously selected items as a JSON array of objects
        #[arg(long)]
        selected: Option<PathBuf>,

        /// Column of the selected corpus holding repeat counts
        #[arg(long, default_value = "experiment_count")]
        selected_count_column: String,

        /// Feedback rows as a JSON array of {value, feedback, count}
        #[arg(long)]
        feedback: Option<PathBuf>,

        /// Show only the first N results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the transition matrix as labeled CSV
    Matrix {
        #[arg(long)]
        corpus: PathBuf,

        /// Comma-separated hierarchy columns, outermost first
        #[arg(long, value_delimiter = ',')]
        hierarchy: Vec<String>,
    },
    /// Print the state ordering
    Index {
        #[arg(long)]
        corpus: PathBuf,

        /// Comma-separated hierarchy columns, outermost first
        #[arg(long, value_delimiter = ',')]
        hierarchy: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Rank {
            corpus,
            request,
            selected,
            selected_count_column,
            feedback,
            limit,
        } => run_rank(
            &corpus,
            &request,
            selected.as_deref(),
            &selected_count_column,
            feedback.as_deref(),
            limit,
            &config,
            &cli.format,
        ),
        Commands::Matrix { corpus, hierarchy } => run_matrix(&corpus, &hierarchy, &config),
        Commands::Index { corpus, hierarchy } => run_index(&corpus, &hierarchy, &cli.format),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> CliResult<RankConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(RankConfig::from_path(path)?)
        }
        None => Ok(RankConfig::default()),
    }
}

fn load_table(path: &Path) -> CliResult<Table> {
    let table = Table::from_reader(BufReader::new(File::open(path)?))?;
    info!("Loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

#[allow(clippy::too_many_arguments)]
fn run_rank(
    corpus: &Path,
    request: &Path,
    selected: Option<&Path>,
    selected_count_column: &str,
    feedback: Option<&Path>,
    limit: Option<usize>,
    config: &RankConfig,
    format: &OutputFormat,
) -> CliResult<()> {
    let corpus = load_table(corpus)?;
    let request = RankRequest::from_path(request)?;

    let selected = match selected {
        Some(path) => Some(SelectedCorpus::new(load_table(path)?, selected_count_column)?),
        None => None,
    };
    let feedback = match feedback {
        Some(path) => Some(FeedbackTable::from_json_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    let ranking = rank(&corpus, selected.as_ref(), feedback.as_ref(), &request, config)?;
    info!(
        "Solved {} states in {} iterations (delta {})",
        ranking.state_count, ranking.report.iterations, ranking.report.delta
    );

    let shown = limit.unwrap_or(ranking.items.len()).min(ranking.items.len());
    let records: Vec<serde_json::Value> = ranking.items[..shown]
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Csv => {
            let columns = record_columns(&records);
            println!("{}", columns.join(","));
            for record in &records {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| format_csv_value(&record[c.as_str()]))
                    .collect();
                println!("{}", cells.join(","));
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let columns = record_columns(&records);
            let mut table = OutputTable::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            let mut header = vec!["rank".to_string()];
            header.extend(columns.iter().cloned());
            table.set_header(header);

            for (place, record) in records.iter().enumerate() {
                let mut cells = vec![(place + 1).to_string()];
                cells.extend(columns.iter().map(|c| format_table_value(&record[c.as_str()])));
                table.add_row(cells);
            }

            println!("{}", table);
            println!("{} of {} row(s)", shown, ranking.items.len());
        }
    }

    Ok(())
}

fn run_matrix(corpus: &Path, hierarchy: &[String], config: &RankConfig) -> CliResult<()> {
    let corpus = load_table(corpus)?;
    let model = TransitionModelBuilder::new(&corpus, hierarchy)
        .config(config.transition)
        .build()?;
    model.write_csv(std::io::stdout().lock())?;
    Ok(())
}

fn run_index(corpus: &Path, hierarchy: &[String], format: &OutputFormat) -> CliResult<()> {
    let corpus = load_table(corpus)?;
    let index = PositionIndex::build(&corpus, hierarchy)?;

    let states: Vec<(usize, String)> = (0..index.len())
        .map(|pos| (pos, index.label(pos).unwrap_or_default()))
        .collect();

    match format {
        OutputFormat::Json => {
            let labels: Vec<serde_json::Value> = states
                .iter()
                .map(|(pos, label)| serde_json::json!({"position": pos, "state": label}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&labels)?);
        }
        OutputFormat::Csv => {
            println!("position,state");
            for (pos, label) in &states {
                println!("{},{}", pos, csv_field(label));
            }
        }
        OutputFormat::Table => {
            let mut table = OutputTable::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["position", "state"]);
            for (pos, label) in &states {
                table.add_row(vec![pos.to_string(), label.clone()]);
            }
            println!("{}", table);
            println!("{} state(s), records start at {}", index.len(), index.record_base());
        }
    }

    Ok(())
}

/// Union of object keys in first-seen order
fn record_columns(records: &[serde_json::Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        if let Some(map) = record.as_object() {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

fn format_table_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.4}", f),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        _ => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn format_csv_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "".to_string(),
        serde_json::Value::String(s) => csv_field(s),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => csv_field(&serde_json::to_string(v).unwrap_or_default()),
    }
}
