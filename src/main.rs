use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use wiki_characters::cache::FetchCache;
use wiki_characters::config::{read_seeds, Settings};
use wiki_characters::fetch::HttpFetcher;
use wiki_characters::pipeline::{Pipeline, StageReport};
use wiki_characters::record::RecordSet;
use wiki_characters::sink::{checkpoint, csv, db};

#[derive(Parser)]
#[command(name = "wiki_characters", about = "Collect character info-boxes from a fandom wiki")]
struct Cli {
    /// Settings file (toml/yaml/json, extension optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, verify and extract in one pipeline, then write the outputs
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Discover and verify character links, writing them to the checkpoint file
    Links {
        #[command(flatten)]
        crawl: CrawlArgs,
    },
    /// Extract records from a checkpoint file of verified links
    Extract {
        /// Link file (default: configured checkpoint path)
        #[arg(short, long)]
        links: Option<PathBuf>,
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show what the last load put in the database
    Stats,
}

#[derive(Args)]
struct CrawlArgs {
    /// File with one seed URL per line (default: configured seeds)
    #[arg(short, long)]
    seeds: Option<PathBuf>,
    /// Max requests in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,
    /// Where to write verified links
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    /// Hide progress bars
    #[arg(long)]
    quiet: bool,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    delimiter: Option<char>,
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long)]
    table: Option<String>,
    #[arg(long)]
    no_csv: bool,
    #[arg(long)]
    no_db: bool,
}

impl CrawlArgs {
    fn apply(&self, settings: &mut Settings) -> anyhow::Result<()> {
        if let Some(path) = &self.seeds {
            settings.seeds = read_seeds(path)?;
        }
        if let Some(n) = self.concurrency {
            settings.concurrency = n;
        }
        if let Some(path) = &self.checkpoint {
            settings.checkpoint_path = Some(path.clone());
        }
        if self.quiet {
            settings.progress = false;
        }
        Ok(())
    }
}

impl OutputArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.csv {
            settings.csv_path = Some(path.clone());
        }
        if let Some(sep) = self.delimiter {
            settings.csv_delimiter = sep;
        }
        if let Some(path) = &self.db {
            settings.db_path = Some(path.clone());
        }
        if let Some(table) = &self.table {
            settings.db_table = table.clone();
        }
        if self.no_csv {
            settings.csv_path = None;
        }
        if self.no_db {
            settings.db_path = None;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Run { crawl, output } => {
            crawl.apply(&mut settings)?;
            output.apply(&mut settings);
            settings.validate()?;
            if settings.seeds.is_empty() {
                anyhow::bail!("No seed URLs configured");
            }

            let pipeline = build_pipeline(&settings)?;
            let outcome = pipeline.run(&settings.seeds).await;
            if let Some(path) = &settings.checkpoint_path {
                checkpoint::save_links(path, &outcome.links.verified)?;
                info!(path = %path.display(), links = outcome.links.verified.len(), "saved verified links");
            }
            for report in outcome.reports() {
                print_report(report);
            }
            println!(
                "Cache: {} pages, {} fetches, {} hits",
                outcome.cache.entries, outcome.cache.fetches, outcome.cache.hits
            );
            write_outputs(&settings, &outcome.records)?;
        }
        Commands::Links { crawl } => {
            crawl.apply(&mut settings)?;
            settings.validate()?;
            if settings.seeds.is_empty() {
                anyhow::bail!("No seed URLs configured");
            }
            let path = settings
                .checkpoint_path
                .clone()
                .context("No checkpoint path configured")?;

            let pipeline = build_pipeline(&settings)?;
            let outcome = pipeline.collect_links(&settings.seeds).await;
            print_report(&outcome.discover);
            print_report(&outcome.verify);

            checkpoint::save_links(&path, &outcome.verified)?;
            println!("Saved {} verified links to {}", outcome.verified.len(), path.display());
        }
        Commands::Extract {
            links,
            concurrency,
            output,
        } => {
            output.apply(&mut settings);
            if let Some(n) = concurrency {
                settings.concurrency = n;
            }
            settings.validate()?;
            let path = links
                .or_else(|| settings.checkpoint_path.clone())
                .context("No link file given and no checkpoint path configured")?;
            let links = checkpoint::load_links(&path)?;
            if links.is_empty() {
                println!("No links in {}. Run 'links' first.", path.display());
                return Ok(());
            }

            let pipeline = build_pipeline(&settings)?;
            let outcome = pipeline.extract_from(&links).await;
            print_report(&outcome.extract);
            write_outputs(&settings, &outcome.records)?;
        }
        Commands::Stats => {
            let path = settings
                .db_path
                .clone()
                .context("No database path configured")?;
            let conn = db::connect(&path)?;
            let s = db::table_stats(&conn, &settings.db_table)?;
            println!("Table:     {}", settings.db_table);
            println!("Rows:      {}", s.rows);
            println!("Columns:   {}", s.columns.len());
            println!("Loaded at: {}", s.loaded_at.as_deref().unwrap_or("-"));
            for column in &s.columns {
                println!("  {}", column);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline<HttpFetcher>> {
    let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
    let cache = Arc::new(FetchCache::new(fetcher));
    Ok(Pipeline::new(cache, settings))
}

fn write_outputs(settings: &Settings, records: &RecordSet) -> anyhow::Result<()> {
    if let Some(path) = &settings.csv_path {
        csv::save(path, records, settings.csv_delimiter)?;
        println!("Wrote {} records to {}", records.len(), path.display());
    }
    if let Some(path) = &settings.db_path {
        let conn = db::connect(path)?;
        let n = db::replace_table(&conn, &settings.db_table, records)?;
        println!(
            "Loaded {} records into {} ({})",
            n,
            settings.db_table,
            path.display()
        );
    }
    Ok(())
}

fn print_report(report: &StageReport) {
    println!(
        "{:<8} {:>5} in | {:>5} out | {:>4} skipped",
        report.stage.to_string(),
        report.inputs,
        report.outputs,
        report.failures.len()
    );
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
