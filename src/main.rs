mod course;
mod db;
mod enumerate;
mod extract;
mod fetch;
mod loader;
mod normalize;
mod settings;
mod snapshot;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::ensure;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use settings::Settings;

#[derive(Parser)]
#[command(name = "shnaton_scraper", about = "Hebrew University course catalog scraper")]
struct Cli {
    /// Snapshot JSON path (overrides settings)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    /// SQLite database path (overrides settings)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct IdRange {
    /// First course number to probe
    #[arg(long, default_value_t = 0)]
    start: u32,
    /// Course number to stop before (exclusive)
    #[arg(long, default_value_t = 100_000)]
    end: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe course numbers and save the raw snapshot
    Scrape {
        #[command(flatten)]
        range: IdRange,
    },
    /// Load the snapshot into raw_courses and cleaned_courses
    Clean,
    /// Scrape, then clean and load
    All {
        #[command(flatten)]
        range: IdRange,
    },
    /// Show database statistics
    Stats,
    /// List cleaned courses
    Courses {
        /// Filter by faculty name
        #[arg(short, long)]
        faculty: Option<String>,
        /// Filter by semester code (A, B, Y, C)
        #[arg(short, long)]
        semester: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
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

    let mut settings = Settings::load()?;
    if let Some(p) = cli.snapshot {
        settings.snapshot_path = p;
    }
    if let Some(p) = cli.db {
        settings.db_path = p;
    }

    let result = match cli.command {
        Commands::Scrape { range } => scrape(&settings, range).await,
        Commands::Clean => clean(&settings),
        Commands::All { range } => {
            scrape(&settings, range).await?;
            clean(&settings)
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            let s = db::get_stats(&conn)?;
            println!("Raw:       {}", s.raw);
            println!("Cleaned:   {}", s.cleaned);
            println!("No semester: {}", s.unknown_semester);
            println!("No language: {}", s.unknown_language);
            println!("No points:   {}", s.unknown_points);
            if !s.faculties.is_empty() {
                println!("\n--- Faculties ---");
                for (faculty, n) in &s.faculties {
                    println!("  {:>5}  {}", n, faculty);
                }
            }
            Ok(())
        }
        Commands::Courses {
            faculty,
            semester,
            limit,
        } => {
            let conn = db::connect(&settings.db_path)?;
            let filter = db::CourseFilter {
                faculty: faculty.as_deref(),
                semester: semester.as_deref(),
                limit: Some(limit),
            };
            let rows = db::fetch_cleaned(&conn, &filter)?;
            if rows.is_empty() {
                println!("No courses found.");
                return Ok(());
            }

            println!(
                "{:>6} | {:<28} | {:<28} | {:<20} | {:<4} | {:<8} | {:>5} | {:<12}",
                "ID", "Course", "English", "Faculty", "Sem", "Lang", "Pts", "Exam"
            );
            println!("{}", "-".repeat(140));
            for r in &rows {
                let points = r.points.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>6} | {:<28} | {:<28} | {:<20} | {:<4} | {:<8} | {:>5} | {:<12}",
                    r.id,
                    truncate(&r.name_he, 28),
                    truncate(r.name_en.as_deref().unwrap_or(""), 28),
                    truncate(r.faculty.as_deref().unwrap_or(""), 20),
                    r.semester.as_deref().unwrap_or("-"),
                    truncate(r.language.as_deref().unwrap_or("-"), 8),
                    points,
                    truncate(r.exam_type.as_deref().unwrap_or(""), 12),
                );
            }
            println!("\n{} courses", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(settings: &Settings, range: IdRange) -> anyhow::Result<()> {
    ensure!(
        range.start <= range.end,
        "--start ({}) must not be greater than --end ({})",
        range.start,
        range.end
    );
    info!("Starting scrape of [{}, {})", range.start, range.end);

    let fetcher = Arc::new(fetch::Fetcher::new(settings.fetch_config())?);
    let (courses, stats) = enumerate::enumerate(
        fetcher,
        range.start..range.end,
        &settings.enumerate_options(),
    )
    .await?;
    snapshot::write_snapshot(&settings.snapshot_path, &courses)?;

    println!(
        "Scraped {} numbers: {} courses, {} empty, {} failed.",
        stats.probed, stats.accepted, stats.empty, stats.failed
    );
    Ok(())
}

fn clean(settings: &Settings) -> anyhow::Result<()> {
    info!("Loading {:?} into {:?}", settings.snapshot_path, settings.db_path);
    let courses = snapshot::read_snapshot(&settings.snapshot_path)?;
    let conn = db::connect(&settings.db_path)?;
    let stats = loader::clean_and_load(&conn, &courses)?;
    stats.print();
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
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
