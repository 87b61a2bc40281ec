//! Batch command - classify many images with a single loaded model.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use super::{is_supported_image, load_config, start_service, ClassificationReport};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting input images
    #[arg(required = true)]
    input: String,

    /// Directory for per-image JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Use this model file instead of the configured source
    #[arg(short, long)]
    model: Option<PathBuf>,
}

/// Outcome for a single file.
struct BatchEntry {
    path: PathBuf,
    report: Option<ClassificationReport>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported_image(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching images found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} images to classify",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let handle = start_service(&config, args.model.as_deref()).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images")?
            .progress_chars("=>-"),
    );

    let mut entries = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = match image::open(&path) {
            Ok(image) => handle.predict(image).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(prediction) => {
                let elapsed = file_start.elapsed().as_millis() as u64;
                entries.push(BatchEntry {
                    report: Some(ClassificationReport::new(&path, prediction, elapsed)),
                    path,
                    error: None,
                });
            }
            Err(error_msg) => {
                if args.continue_on_error {
                    warn!("Failed to classify {}: {}", path.display(), error_msg);
                    entries.push(BatchEntry {
                        path,
                        report: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("Failed to classify {}: {}", path.display(), error_msg);
                    pb.abandon();
                    anyhow::bail!("Classification failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    if let Some(ref output_dir) = args.output_dir {
        let mut used = HashSet::new();
        for entry in &entries {
            if let Some(report) = &entry.report {
                let name = output_name(&entry.path, &mut used);
                let output_path = output_dir.join(format!("{}.json", name));
                fs::write(&output_path, serde_json::to_string_pretty(report)?)?;
                debug!("Wrote {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &entries)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    for entry in &entries {
        match (&entry.report, &entry.error) {
            (Some(report), _) => println!("  {} {}", entry.path.display(), report.summary_line()),
            (None, Some(error)) => println!("  {} {}", entry.path.display(), style(error).red()),
            (None, None) => {}
        }
    }

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    println!();
    println!(
        "{} Classified {} images in {:?} ({} failed)",
        style("✓").green(),
        entries.len() - failed,
        start.elapsed(),
        failed
    );

    Ok(())
}

/// Result file stem for `path`, suffixed when another input already took it.
fn output_name(path: &Path, used: &mut HashSet<String>) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let mut name = stem.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{}-{}", stem, n);
        n += 1;
    }
    if name != stem {
        warn!("{} shares its name with another input, writing {}.json", path.display(), name);
    }
    name
}

fn write_summary(path: &Path, entries: &[BatchEntry]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["file", "label", "index", "confidence", "processing_time_ms", "error"])?;

    for entry in entries {
        let file = entry.path.display().to_string();
        match &entry.report {
            Some(report) => wtr.write_record([
                file,
                report.label.clone(),
                report.index.to_string(),
                format!("{:.2}", report.confidence),
                report.processing_time_ms.to_string(),
                String::new(),
            ])?,
            None => wtr.write_record([
                file,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                entry.error.clone().unwrap_or_default(),
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_do_not_collide() {
        let mut used = HashSet::new();
        assert_eq!(output_name(Path::new("a/monas.jpg"), &mut used), "monas");
        assert_eq!(output_name(Path::new("b/monas.png"), &mut used), "monas-2");
        assert_eq!(output_name(Path::new("c/monas.webp"), &mut used), "monas-3");
        assert_eq!(output_name(Path::new("c/ikada.webp"), &mut used), "ikada");
    }
}
