use clap::{Parser, Subcommand};
use cli::{load_config, PrepareReport};
use color_eyre::eyre::Result;
use digit_prep::{Pipeline, RecognizerConfig, SegmenterVariant, StageOutcome};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a digit image into the 28x28 classifier canvas
    Prepare {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Recognizer configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where to write the 28x28 canvas
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory for the intermediate step images
        #[arg(long)]
        steps_dir: Option<PathBuf>,
        /// Compute the preprocessing quality score
        #[arg(long)]
        quality: bool,
    },
    /// Print the JSON schema of the recognizer configuration
    Schema,
    /// List segmenter variants and their models
    Variants,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Prepare {
            input,
            config,
            output,
            steps_dir,
            quality,
        } => {
            prepare(input, config.as_deref(), output.as_deref(), steps_dir.as_deref(), *quality)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&RecognizerConfig::schema())?);
        }
        Commands::Variants => {
            for variant in SegmenterVariant::iter() {
                println!("{:<14} {}", variant.to_string(), variant.model_name());
            }
        }
    }

    Ok(())
}

fn prepare(
    input: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    steps_dir: Option<&Path>,
    quality: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.return_intermediate_steps |= steps_dir.is_some();
    config.return_quality_score |= quality;

    let pipeline = Pipeline::builder().config(config).build();
    info!("{}", pipeline.info());

    let image = image::open(input)?;
    let normalization = pipeline.normalize(&image)?;
    let mut report = PrepareReport::from_normalization(input, &normalization);

    match (&normalization.outcome, output) {
        (StageOutcome::Continue(canvas), Some(path)) => {
            canvas.save(path)?;
            info!("Canvas written to {:?}", path);
            report = report.with_canvas(path);
        }
        (StageOutcome::Reject(reason), _) => warn!("No canvas for {:?}: {}", input, reason),
        _ => {}
    }

    if let (Some(steps), Some(dir)) = (&normalization.steps, steps_dir) {
        steps.save_to_dir(dir)?;
        info!("Intermediate steps written to {:?}", dir);
        report = report.with_steps_dir(dir);
    }

    if let Some(q) = &normalization.quality {
        info!("Quality: {}", q);
    }

    println!("{}", report.to_json()?);
    Ok(())
}
