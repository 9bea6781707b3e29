//! Ingest command handler.
//!
//! Loads pre-parsed course batches (JSON `IngestBatch` files) into the
//! catalog and content indexes.

use clap::Args;
use std::path::{Path, PathBuf};
use syllabus_core::{config::AppConfig, AppError, AppResult};
use syllabus_knowledge::{IngestBatch, IngestStats, Retriever};
use walkdir::WalkDir;

/// Load catalog entries and content chunks from JSON files
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Batch files, or directories searched recursively for `*.json`
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear both indexes before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let files = collect_batch_files(&self.paths)?;
        if files.is_empty() {
            return Err(AppError::Knowledge(
                "No .json batch files found in the given paths".to_string(),
            ));
        }

        let retriever = Retriever::from_config(config)?;
        if self.reset {
            tracing::info!("Resetting course indexes");
            retriever.clear()?;
        }

        let mut total = IngestStats::default();
        for file in &files {
            let batch = read_batch(file)?;
            let stats = retriever.ingest(&batch).await?;
            tracing::debug!(
                "Ingested {:?}: {} courses, {} chunks",
                file,
                stats.courses,
                stats.chunks
            );
            total.courses += stats.courses;
            total.chunks += stats.chunks;
        }

        if self.json {
            let output = serde_json::json!({
                "files": files.len(),
                "courses": total.courses,
                "chunks": total.chunks,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} courses and {} chunks from {} files",
                total.courses,
                total.chunks,
                files.len()
            );
        }

        Ok(())
    }
}

/// Expand paths into batch files: files are taken as given, directories are
/// walked for `.json` files in sorted order.
fn collect_batch_files(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            return Err(AppError::Knowledge(format!("Path not found: {:?}", path)));
        }
    }

    Ok(files)
}

fn read_batch(path: &Path) -> AppResult<IngestBatch> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| AppError::Serialization(format!("Invalid batch file {:?}: {}", path, e)))
}
