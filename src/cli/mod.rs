// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates everything else to Layer 2.
//
// Two commands are supported:
//   1. `run`       — raw MovieLens files → processed artifacts
//   2. `recommend` — history + CF and ranker suggestions for
//                    one user from a processed directory

pub mod commands;

use anyhow::{bail, Context, Result};
use clap::Parser;
use commands::{Commands, RecommendArgs, RunArgs};
use std::path::Path;

use crate::application::pipeline_use_case::PipelineUseCase;
use crate::application::recommend_use_case::RecommendUseCase;
use crate::domain::traits::Persistable;
use crate::ml::{linear_ranker::LinearRanker, popularity::PopularityRecommender};

#[derive(Parser, Debug)]
#[command(
    name = "movielens-recommender",
    version,
    about = "Preprocess MovieLens ratings into train/test splits and a sparse interaction matrix, then inspect recommendations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. Nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args)       => run_pipeline(args),
            Commands::Recommend(args) => run_recommend(args),
        }
    }
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    tracing::info!("Starting pipeline on raw data in: {}", args.raw_dir);

    let use_case = PipelineUseCase::new(args.into());
    let stats = use_case.execute()?;

    println!(
        "Pipeline complete: {} merged rows, {} train / {} test, {} x {} matrix ({} entries).",
        stats.merged_rows,
        stats.train_rows,
        stats.test_rows,
        stats.matrix_rows,
        stats.matrix_cols,
        stats.matrix_nnz,
    );
    Ok(())
}

fn run_recommend(args: RecommendArgs) -> Result<()> {
    let reader   = RecommendUseCase::open(&args.processed_dir)?;
    let cf_model = PopularityRecommender::fit(reader.matrix());

    let n_features = reader.feature_names().len();
    let ranker = match &args.ranker_weights {
        Some(path) => LinearRanker::load(Path::new(path))?,
        None => {
            tracing::info!("No ranker weights given; using uniform weights");
            LinearRanker::uniform(n_features)
        }
    };
    if ranker.n_features() != n_features {
        bail!(
            "Ranker weights have {} features but the processed data has {} ({})",
            ranker.n_features(),
            n_features,
            reader.feature_names().join(", ")
        );
    }

    let u_index = if args.raw_id {
        reader
            .u_index(args.user)
            .with_context(|| format!("User id {} is not in the processed data", args.user))?
    } else {
        usize::try_from(args.user)
            .with_context(|| format!("User index must be non-negative, got {}", args.user))?
    };

    match reader.user_id(u_index) {
        Some(raw) => println!("\nUser index {} (user id {})", u_index, raw),
        None => println!(
            "\nUser index {} is not among the {} processed users",
            u_index,
            reader.num_users()
        ),
    }

    println!("\nRecent ratings:");
    for rec in reader.user_history(u_index, args.history) {
        println!(
            "  {}  {:>3.1}  {}  [{}]",
            rec.timestamp.format("%Y-%m-%d"),
            rec.rating,
            rec.title,
            rec.genres
        );
    }

    println!("\nPopular with other users:");
    for rec in reader.recommend_cf(u_index, &cf_model, args.top_n)? {
        println!(
            "  {:>2}. {} (movie {})  [{}]  ({:.0} ratings)",
            rec.rank, rec.title, rec.movie_id, rec.genres, rec.score
        );
    }

    println!("\nRanked candidates:");
    for rec in reader.recommend_hybrid(u_index, &ranker, args.top_n)? {
        let marker = if rec.label == 1 { "*" } else { " " };
        println!(
            "  {:>2}. {}{} (movie {})  [{}]  score {:.3}",
            rec.rank, marker, rec.title, rec.movie_id, rec.genres, rec.score
        );
    }
    Ok(())
}
