use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use twintree_common::{logger, parse_vector, StoreConfig};
use twintree_store::{ByteEmbedder, VectorRecord, VectorStore};

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "twintree")]
#[command(about = "TwinTree - text records indexed by distance and norm", long_about = None)]
struct Cli {
    /// Corpus file, one record per line
    corpus: PathBuf,

    /// Vector dimension
    #[arg(long)]
    dimension: Option<usize>,

    /// Reference vector, comma-separated (defaults to the origin)
    #[arg(long)]
    reference: Option<String>,

    /// Metric: euclidean, manhattan or cosine
    #[arg(long)]
    metric: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List record ids in ascending distance order
    Sorted,

    /// Store statistics and root vector
    Stats,

    /// Best match for a text
    Nearest { text: String },

    /// The k best matches for a text
    TopK {
        text: String,

        #[arg(short, long, default_value_t = 5)]
        k: usize,
    },

    /// Records within a radius of a text
    Range {
        text: String,

        #[arg(long)]
        radius: f64,
    },

    /// Records whose distance to the root vector lies in [min, max]
    FromRoot {
        #[arg(long)]
        min: f64,

        #[arg(long)]
        max: f64,
    },

    /// Records inside a per-dimension box (comma-separated bounds)
    Bbox {
        #[arg(long)]
        min: String,

        #[arg(long)]
        max: String,
    },
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env()?;
    if let Some(dimension) = cli.dimension {
        config.dimension = dimension;
    }
    if let Some(reference) = &cli.reference {
        config.reference = parse_vector(reference)?;
    }
    if let Some(metric) = &cli.metric {
        config.default_metric = metric.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_corpus(store: &mut VectorStore, path: &PathBuf) -> Result<usize> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;

    let mut added = 0;
    for line in data.lines().map(str::trim).filter(|l| !l.is_empty()) {
        store.add_text(line);
        added += 1;
    }
    Ok(added)
}

fn records_for<'a>(store: &'a VectorStore, ids: &[i64]) -> Vec<&'a VectorRecord> {
    let by_id: HashMap<i64, &VectorRecord> = store
        .all_vectors_sorted_by_distance()
        .into_iter()
        .map(|r| (r.id, r))
        .collect();
    ids.iter().filter_map(|id| by_id.get(id).copied()).collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let config = load_config(&cli)?;
    match &config.log_dir {
        Some(dir) => logger::setup_logging(dir, &config.log_level)?,
        None => logger::setup_console_logging(&config.log_level)?,
    }

    let mut store = VectorStore::from_config(&config, ByteEmbedder)?;
    let added = load_corpus(&mut store, &cli.corpus)?;
    tracing::info!("Loaded {} records from {}", added, cli.corpus.display());

    let metric = store.default_metric().as_str();
    let output = match &cli.command {
        Commands::Sorted => json!({
            "ids": store.all_ids_sorted_by_distance(),
        }),
        Commands::Stats => {
            let records = store.all_vectors_sorted_by_distance();
            json!({
                "size": store.size(),
                "dimension": store.dimension(),
                "average_distance": store.average_distance(),
                "root": store.root_vector(),
                "max_distance": store.max_distance(),
                "min_distance": store.min_distance(),
                "centroid": store.compute_centroid(&records).vector,
            })
        }
        Commands::Nearest { text } => {
            let query = store.preprocess(text);
            let id = store.find_nearest(&query, metric)?;
            json!({
                "metric": metric,
                "id": id,
                "record": id.and_then(|id| records_for(&store, &[id]).pop()),
            })
        }
        Commands::TopK { text, k } => {
            let query = store.preprocess(text);
            let ids = store.top_k_nearest(&query, *k, metric)?;
            json!({
                "metric": metric,
                "ids": ids,
                "records": records_for(&store, &ids),
            })
        }
        Commands::Range { text, radius } => {
            let query = store.preprocess(text);
            let ids = store.range_query(&query, *radius, metric)?;
            json!({
                "metric": metric,
                "ids": ids,
                "records": records_for(&store, &ids),
            })
        }
        Commands::FromRoot { min, max } => {
            let ids = store.range_query_from_root(*min, *max);
            json!({
                "root": store.root_vector().map(|r| r.id),
                "ids": ids,
            })
        }
        Commands::Bbox { min, max } => {
            let ids = store.bounding_box_query(&parse_vector(min)?, &parse_vector(max)?)?;
            json!({
                "ids": ids,
                "records": records_for(&store, &ids),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
