//! stockforest CLI Module
//!
//! Command-line interface for scanning stock movement logs.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::DetectionConfig;
use crate::pipeline::{DetectionReport, StockForestPipeline};
use crate::report::{self, DatasetSummary, ScoreSummary};
use crate::utils::{AnomalyExporter, ExportOutcome, MovementLoader, MovementTable};
use crate::visualization::ScoreHistogram;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "stockforest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flag abnormal stock movements with an isolation forest")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score every movement and export the anomalies
    Detect {
        /// Semicolon-delimited movement log
        #[arg(short, long)]
        data: PathBuf,

        /// Output file for the anomaly set
        #[arg(short, long, default_value = "anomalies_detectees.csv")]
        output: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed for tree construction
        #[arg(long)]
        seed: Option<u64>,

        /// Expected share of anomalies
        #[arg(long)]
        contamination: Option<f64>,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Number of ranked anomalies to show
        #[arg(long)]
        top: Option<usize>,
    },

    /// Show movement log information
    Info {
        /// Semicolon-delimited movement log
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Arguments of the `detect` command
#[derive(Debug, Clone)]
pub struct DetectArgs {
    pub data: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub contamination: Option<f64>,
    pub trees: Option<usize>,
    pub top: Option<usize>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<DetectionConfig> {
    Ok(match path {
        Some(p) => DetectionConfig::from_json_file(p)?,
        None => DetectionConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_detect(args: &DetectArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(c) = args.contamination {
        config = config.with_contamination(c);
    }
    if let Some(n) = args.trees {
        config = config.with_n_estimators(n);
    }
    if let Some(n) = args.top {
        config = config.with_top_n(n);
    }
    config.validate()?;

    section("Detect");

    step_run("Loading movements");
    let start = Instant::now();
    let table = MovementLoader::from_config(&config).load(&args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", table.len(), table.frame.width(), start.elapsed()));

    step_run(&format!("Fitting {} trees", config.n_estimators.to_string().cyan()));
    let start = Instant::now();
    let mut pipeline = StockForestPipeline::new(config.clone())?;
    let report = pipeline.run(&table.records)?;
    step_done(&format!("{} model features in {:?}", report.n_model_features, start.elapsed()));

    print_selection(&table, &report, &config);
    print_distribution(&report, &config);
    print_rankings(&table, &report, &config);

    section("Export");
    match AnomalyExporter::from_config(&config).write(&table, &report, &args.output)? {
        ExportOutcome::Written { path, rows } => {
            println!("  {} {} rows → {}", ok("✓"), rows, path.display());
        }
        ExportOutcome::NothingToExport => {
            println!("  {}", "No anomalies to export".yellow());
        }
    }
    println!();

    Ok(())
}

fn print_selection(table: &MovementTable, report: &DetectionReport, config: &DetectionConfig) {
    section("Anomalies");
    kv("Labelled by model", &report.detection.n_anomalies().to_string());

    if report.selection.used_fallback() {
        println!(
            "  {}",
            format!(
                "No anomaly labelled by the model, using the {}th score percentile",
                config.fallback_percentile
            )
            .yellow()
        );
        kv("After adjustment", &report.selection.len().to_string());
    }

    let preview = report::selected_rows(report, &table.records);
    print_rows(&preview[..preview.len().min(5)]);
}

fn print_distribution(report: &DetectionReport, config: &DetectionConfig) {
    let scores = report.scores();

    section("Score statistics");
    if let Some(summary) = ScoreSummary::from_scores(&scores) {
        kv("count", &summary.count.to_string());
        kv("mean", &format!("{:.6}", summary.mean));
        kv("std", &format!("{:.6}", summary.std));
        kv("min", &format!("{:.6}", summary.min));
        kv("25%", &format!("{:.6}", summary.q25));
        kv("50%", &format!("{:.6}", summary.median));
        kv("75%", &format!("{:.6}", summary.q75));
        kv("max", &format!("{:.6}", summary.max));
    }
    if let Some(threshold) = report.selection.threshold {
        kv("threshold", &format!("{:.6}", threshold));
    }

    section("Score distribution");
    if let Some(histogram) = ScoreHistogram::new(&scores, config.histogram_bins) {
        for line in histogram.render(40, report.selection.threshold).lines() {
            println!("  {}", line);
        }
    }
}

fn print_rankings(table: &MovementTable, report: &DetectionReport, config: &DetectionConfig) {
    if report.selection.is_empty() {
        return;
    }

    section(&format!("Top {} anomalies", config.top_n));
    print_rows(&report::top_anomalies(report, &table.records, config.top_n));

    section("By movement type");
    for (movement_type, share) in report::movement_type_breakdown(report) {
        println!("  {:<22} {:>6.1}%", movement_type, share * 100.0);
    }

    section("By month");
    for (month, count) in report::monthly_counts(report, &table.records) {
        println!("  {:<10} {:>6} {}", month, count, dim(&"▪".repeat(count.min(40))));
    }
}

fn print_rows(rows: &[report::AnomalyRow]) {
    if rows.is_empty() {
        return;
    }
    println!(
        "  {:>7} {:<14} {:<20} {:>12} {:<8} {:>10}",
        muted("row"), muted("article"), muted("date"), muted("qty"), muted("type"), muted("score")
    );
    for r in rows {
        let date = r
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>7} {:<14} {:<20} {:>12.2} {:<8} {:>10}",
            r.row,
            r.article,
            date,
            r.quantity_pcu,
            r.movement_type,
            format!("{:.4}", r.score).red()
        );
    }
}

pub fn cmd_info(data: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    section("Info");

    step_run("Loading movements");
    let table = MovementLoader::from_config(&config).load(data)?;
    step_done(&format!("{} rows × {} cols", table.len(), table.frame.width()));

    let summary = DatasetSummary::from_records(&table.records);
    println!();
    kv("Records", &summary.n_records.to_string());
    kv("Articles", &summary.n_entities.to_string());
    kv("Missing article", &summary.n_missing_entities.to_string());
    kv("Missing timestamp", &summary.n_missing_timestamps.to_string());
    kv("Missing quantity", &summary.n_missing_quantities.to_string());
    let fmt = |t: Option<chrono::NaiveDateTime>| {
        t.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
    };
    kv("First movement", &fmt(summary.first_movement));
    kv("Last movement", &fmt(summary.last_movement));

    println!();
    println!("  {}", muted("Columns"));
    for name in table.frame.get_column_names() {
        println!("    {}", name);
    }
    println!();

    Ok(())
}
