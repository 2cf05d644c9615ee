//! bookrec - cluster-based book recommendations.
//!
//! Usage:
//!   bookrec survey    --books b.csv --users u.csv --ratings r.csv
//!   bookrec recommend --books b.csv --users u.csv --ratings r.csv --user 276729
//!   bookrec compare   --books b.csv --users u.csv --ratings r.csv -k 5
//!   bookrec fit       --books b.csv --users u.csv --ratings r.csv -o model.json

mod cli;
mod output;

use bookrec::data::{BookCatalog, CsvSource, ReaderCatalog};
use bookrec::pipeline::{FittedPipeline, Pipeline};
use clap::Parser;
use cli::{Cli, Commands, DataArgs};
use colored::Colorize;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Recommend { data, user, top_n } => cmd_recommend(&data, user, top_n),
        Commands::Survey { data } => cmd_survey(&data),
        Commands::Compare { data } => cmd_compare(&data),
        Commands::Fit { data, output } => cmd_fit(&data, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "bookrec=info",
        1 => "bookrec=debug",
        _ => "bookrec=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct Loaded {
    books: BookCatalog,
    fitted: FittedPipeline,
}

fn load_and_fit(data: &DataArgs, top_n: Option<usize>) -> Result<Loaded, Box<dyn Error>> {
    let mut config = data.pipeline_config()?;
    if let Some(n) = top_n {
        config.top_n = n;
        config.validate()?;
    }

    let books = BookCatalog::from_path(&data.books)?;
    let readers = ReaderCatalog::from_path(&data.users)?;
    let ratings = bookrec::data::load_ratings(&data.ratings)?;
    info!(
        books = books.len(),
        readers = readers.len(),
        ratings = ratings.len(),
        "loaded catalogs"
    );

    let fitted = Pipeline::new(config).run_from_catalogs(&books, &readers, &ratings)?;
    Ok(Loaded { books, fitted })
}

fn print_summary(fitted: &FittedPipeline) {
    output::section("Model");
    output::kv("Users", fitted.matrix().n_users());
    output::kv("Items", fitted.matrix().n_items());
    output::kv("Embedding dim", fitted.embedding().dim());
    if let Some(ratio) = fitted.pca().explained_variance_ratio() {
        let total: f64 = ratio.iter().sum();
        output::kv("Explained variance", format!("{:.1}%", total * 100.0));
    }
    output::kv("Strategy", fitted.assignment().strategy());
    output::kv("k", fitted.k());
    output::kv("Cluster sizes", format!("{:?}", fitted.assignment().cluster_sizes()));
}

fn cmd_recommend(data: &DataArgs, user: u64, top_n: Option<usize>) -> Result<(), Box<dyn Error>> {
    let Loaded { books, fitted } = load_and_fit(data, top_n)?;
    print_summary(&fitted);

    output::section(&format!("Recommendations for user {user}"));
    let recs = fitted.recommend_with_details(user, &books)?;
    if recs.is_empty() {
        output::warning("nothing new is liked in this user's cluster");
        return Ok(());
    }
    for (rank, rec) in recs.iter().enumerate() {
        let title = rec.title.as_deref().unwrap_or("<unknown title>");
        let author = rec.author.as_deref().unwrap_or("<unknown author>");
        println!(
            "  {:>2}. {} by {} [{}] ({} likes)",
            rank + 1,
            title.bold(),
            author,
            rec.item_id.dimmed(),
            rec.popularity
        );
    }
    Ok(())
}

fn cmd_survey(data: &DataArgs) -> Result<(), Box<dyn Error>> {
    let mut config = data.pipeline_config()?;
    config.fixed_k = None;
    let pipeline = Pipeline::new(config);

    let books = BookCatalog::from_path(&data.books)?;
    let readers = ReaderCatalog::from_path(&data.users)?;
    let ratings = bookrec::data::load_ratings(&data.ratings)?;
    let cleaned = pipeline.clean(&books, &readers, &ratings)?;
    let matrix = pipeline.build_preferences(&cleaned)?;
    let (_, embedding) = pipeline.reduce(&matrix)?;
    let report = pipeline.select_k(&embedding)?;

    output::section("Elbow (k-means inertia)");
    let max_inertia = report
        .elbow
        .iter()
        .map(|p| p.inertia)
        .fold(0.0f32, f32::max);
    for point in &report.elbow {
        println!(
            "  k={:>3} {:>14.4} {}",
            point.k,
            point.inertia,
            output::bar(point.inertia, max_inertia, 40).blue()
        );
    }

    output::section("Silhouette");
    for point in &report.silhouettes {
        let line = format!("  k={:>3} {:>8.4}", point.k, point.score);
        if point.k == report.best_k {
            println!("{}  <- best", line.green().bold());
        } else {
            println!("{line}");
        }
    }
    output::success(&format!("best k = {}", report.best_k));
    Ok(())
}

fn cmd_compare(data: &DataArgs) -> Result<(), Box<dyn Error>> {
    let Loaded { fitted, .. } = load_and_fit(data, None)?;
    print_summary(&fitted);

    output::section(&format!("Strategies at k = {}", fitted.k()));
    for score in fitted.compare_strategies()? {
        println!(
            "  {:<13} silhouette {:>8.4}  inertia {:>12.4}  sizes {:?}",
            score.strategy.bold(),
            score.silhouette,
            score.inertia,
            score.cluster_sizes
        );
    }
    Ok(())
}

fn cmd_fit(data: &DataArgs, out: &Path) -> Result<(), Box<dyn Error>> {
    let Loaded { fitted, .. } = load_and_fit(data, None)?;
    print_summary(&fitted);

    fitted.to_artifact()?.save(out)?;
    output::success(&format!("saved model to {}", out.display()));
    Ok(())
}
