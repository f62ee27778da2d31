// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `run` and `recommend`, and all
// their configurable flags.
//
// The application layer never sees clap types: `RunArgs` is
// converted into a `PipelineConfig` at the boundary.

use clap::{Args, Subcommand};

use crate::application::pipeline_use_case::PipelineConfig;
use crate::data::{
    cleaner::{CleanConfig, GenrePolicy},
    features::FeatureConfig,
    splitter::SplitConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn raw MovieLens files into processed artifacts
    Run(RunArgs),

    /// Show a user's history and recommendations from processed artifacts
    Recommend(RecommendArgs),
}

/// All arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory containing ratings.dat and movies.dat
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: String,

    /// Directory the artifacts are written to (overwritten)
    #[arg(long, default_value = "data/processed")]
    pub out_dir: String,

    /// Fraction of each user's ratings held out for test, in (0, 1)
    #[arg(long, default_value_t = 0.2)]
    pub test_ratio: f64,

    /// Users with fewer ratings than this are left out of the split
    #[arg(long, default_value_t = 5)]
    pub min_events: usize,

    /// Lowest rating kept (inclusive)
    #[arg(long, default_value_t = 0.5)]
    pub rating_min: f64,

    /// Highest rating kept (inclusive)
    #[arg(long, default_value_t = 5.0)]
    pub rating_max: f64,

    /// Keep movies without genres, tagged "(no genres listed)"
    #[arg(long)]
    pub fill_missing_genres: bool,

    /// Sampled negatives per positive in the ranker pairs table
    #[arg(long, default_value_t = 4)]
    pub negatives: usize,

    /// Seed for negative sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<RunArgs> for PipelineConfig {
    fn from(a: RunArgs) -> Self {
        let genre_policy = if a.fill_missing_genres {
            GenrePolicy::FillSentinel
        } else {
            GenrePolicy::DropMissing
        };

        PipelineConfig {
            raw_dir: a.raw_dir,
            out_dir: a.out_dir,
            clean: CleanConfig {
                rating_min: a.rating_min,
                rating_max: a.rating_max,
                genre_policy,
            },
            split: SplitConfig {
                test_ratio:          a.test_ratio,
                min_events_per_user: a.min_events,
            },
            features: FeatureConfig {
                negatives_per_positive: a.negatives,
                seed:                   a.seed,
            },
        }
    }
}

/// All arguments for the `recommend` command
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// User to recommend for: a dense u_index, or a raw MovieLens
    /// user id with --raw-id
    #[arg(long)]
    pub user: i64,

    /// Treat --user as the raw MovieLens user id
    #[arg(long)]
    pub raw_id: bool,

    /// Directory written by `run`
    #[arg(long, default_value = "data/processed")]
    pub processed_dir: String,

    /// Number of recommendations per list
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Number of recent ratings to show
    #[arg(long, default_value_t = 15)]
    pub history: usize,

    /// JSON file with linear ranker weights; uniform weights if omitted
    #[arg(long)]
    pub ranker_weights: Option<String>,
}
