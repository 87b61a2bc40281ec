//! Models command - inspect and manage the model cache.

use std::fs;

use clap::{Args, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use tugu_core::models::{DownloadProgress, ModelLoader, ModelOrigin};
use tugu_core::preprocessing::INPUT_SIZE;
use tugu_core::{ModelSource, TuguConfig};

use super::{default_cache_dir, load_config};

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    command: ModelsCommand,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// Show the configured model source
    List,

    /// Download the configured remote model
    Download(DownloadArgs),

    /// Check model availability and cache contents
    Status,

    /// Remove cached models
    Clean,
}

#[derive(Args)]
struct DownloadArgs {
    /// Re-download even if the model is cached
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let loader = config.loader(default_cache_dir());

    match args.command {
        ModelsCommand::List => list_models(&config, &loader),
        ModelsCommand::Download(download_args) => {
            download_model(&config, &loader, download_args).await
        }
        ModelsCommand::Status => check_status(&config, &loader),
        ModelsCommand::Clean => clean_models(&loader),
    }
}

fn list_models(config: &TuguConfig, loader: &ModelLoader) -> anyhow::Result<()> {
    println!("{}", style("Configured Model").bold());
    println!();

    match &config.model.source {
        ModelSource::Bundled { path } => {
            println!("  {} bundled", style("▸").cyan());
            println!("    {:<12} {}", "path", path.display());
        }
        ModelSource::Remote {
            name,
            version,
            url,
            conditions,
        } => {
            println!("  {} remote", style("▸").cyan());
            println!("    {:<12} {}", "name", name);
            println!("    {:<12} {}", "version", version);
            println!("    {:<12} {}", "url", url);
            println!("    {:<12} {}", "cache file", loader.cached_path(name, version).display());
            println!(
                "    {:<12} {}",
                "conditions",
                if conditions.require_unmetered {
                    "unmetered network only"
                } else {
                    "any network"
                }
            );
        }
    }

    println!("    {:<12} {}x{}", "input", INPUT_SIZE, INPUT_SIZE);
    println!();
    println!("Commands:");
    println!("  tugu models download        Download the remote model");
    println!("  tugu models status          Check the model and cache");
    Ok(())
}

fn check_status(config: &TuguConfig, loader: &ModelLoader) -> anyhow::Result<()> {
    println!("{}", style("Model Status").bold());
    println!();

    let (available, location) = match &config.model.source {
        ModelSource::Bundled { path } => (path.exists(), path.clone()),
        ModelSource::Remote { name, version, .. } => {
            let path = loader.cached_path(name, version);
            (path.exists(), path)
        }
    };

    let marker = if available {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("  {} {} ({})", marker, config.model.source, location.display());
    println!("  Network: {}", loader.network());
    println!();

    println!("Cache: {}", loader.cache_dir().display());
    let cached = loader.cached_models()?;
    if cached.is_empty() {
        println!("  {}", style("empty").dim());
    }
    for model in &cached {
        let name = model
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let note = if model.partial { " (partial)" } else { "" };
        println!(
            "  {:<32} {:>10}{}",
            name,
            format_size(model.size_bytes),
            style(note).yellow()
        );
    }

    if !available {
        println!();
        match config.model.source {
            ModelSource::Bundled { .. } => {
                println!("Set model.source.path with 'tugu config set' to point at a model file.")
            }
            ModelSource::Remote { .. } => println!("Run: tugu models download"),
        }
    }

    Ok(())
}

async fn download_model(
    config: &TuguConfig,
    loader: &ModelLoader,
    args: DownloadArgs,
) -> anyhow::Result<()> {
    let source = &config.model.source;
    let ModelSource::Remote { name, version, .. } = source else {
        anyhow::bail!("No remote model configured; the active source is a {}", source);
    };

    let path = loader.cached_path(name, version);
    if args.force && path.exists() {
        fs::remove_file(&path)?;
    }

    println!(
        "{} Downloading {} to {}",
        style("ℹ").blue(),
        style(format!("{}@{}", name, version)).cyan().bold(),
        loader.cache_dir().display()
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("=>-"),
    );

    let progress = pb.clone();
    let result = loader
        .resolve_with_progress(source, move |p: DownloadProgress| {
            if let Some(total) = p.total {
                progress.set_length(total);
            }
            progress.set_position(p.downloaded);
        })
        .await;

    match result {
        Ok(file) => {
            pb.finish_and_clear();
            let size = fs::metadata(file.path()).map(|m| m.len()).unwrap_or(0);
            match file.origin() {
                ModelOrigin::Cached => println!(
                    "  {} {} (already cached, {})",
                    style("✓").green(),
                    file.path().display(),
                    format_size(size)
                ),
                _ => println!(
                    "  {} {} ({})",
                    style("✓").green(),
                    file.path().display(),
                    format_size(size)
                ),
            }
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            anyhow::bail!("{}", e)
        }
    }
}

fn clean_models(loader: &ModelLoader) -> anyhow::Result<()> {
    let cached = loader.cached_models()?;

    let mut removed = 0;
    let mut freed: u64 = 0;
    for model in cached {
        fs::remove_file(&model.path)?;
        removed += 1;
        freed += model.size_bytes;
        println!("  {} Removed {}", style("✓").green(), model.path.display());
    }

    if removed > 0 {
        println!();
        println!(
            "{} Removed {} files, freed {}",
            style("✓").green(),
            removed,
            format_size(freed)
        );
    } else {
        println!("{} No model files to remove.", style("ℹ").blue());
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1}MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1}KB", bytes as f64 / 1_000.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1_500), "1.5KB");
        assert_eq!(format_size(88_000_000), "88.0MB");
    }
}
