//! Catalog inspection and maintenance commands.

use clap::Args;
use syllabus_core::{config::AppConfig, AppResult};
use syllabus_knowledge::Retriever;

/// List indexed courses
#[derive(Args, Debug)]
pub struct CoursesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CoursesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing courses command");

        let summary = Retriever::from_config(config)?.catalog_summary()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else if summary.total_courses == 0 {
            println!("No courses indexed. Run 'syllabus ingest <paths>' first.");
        } else {
            println!("Courses: {}", summary.total_courses);
            for title in &summary.titles {
                println!("  {}", title);
            }
        }

        Ok(())
    }
}

/// Remove every indexed course and chunk
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        Retriever::from_config(config)?.clear()?;
        println!("Cleared course indexes at {:?}", config.resolved_index_path());

        Ok(())
    }
}
