//! Classify command - identify the monument in a single image.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use super::{is_supported_image, load_config, start_service, ClassificationReport};

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Input image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Use this model file instead of the configured source
    #[arg(short, long)]
    model: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ClassifyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported_image(&args.input) {
        anyhow::bail!("Unsupported image format: {}", args.input.display());
    }

    info!("Classifying {}", args.input.display());
    let image = image::open(&args.input)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading model...");
    let handle = match start_service(&config, args.model.as_deref()).await {
        Ok(service) => service,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Classifying...");
    let predict_start = Instant::now();
    let prediction = handle.predict(image).await;
    pb.finish_and_clear();

    let prediction = prediction.map_err(|e| anyhow::anyhow!("{}", e))?;
    let report = ClassificationReport::new(
        &args.input,
        prediction,
        predict_start.elapsed().as_millis() as u64,
    );

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => format!("Prediction: {}", report.summary_line()),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
