//! Ask command handler.
//!
//! Answers a single question against the indexed course materials.

use clap::Args;
use syllabus_core::{config::AppConfig, AppError, AppResult};
use syllabus_knowledge::{QueryOrchestrator, QueryResponse};

/// Ask one question about the course materials
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Continue an existing session
    #[arg(long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        config.validate()?;
        let orchestrator = QueryOrchestrator::from_config(config)?;

        let response = orchestrator
            .query(&self.question, self.session.as_deref())
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_response(&response);
        }

        Ok(())
    }
}

/// Print an answer followed by its sources.
pub fn print_response(response: &QueryResponse) {
    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            match &source.link {
                Some(link) => println!("- {} ({})", source.text, link),
                None => println!("- {}", source.text),
            }
        }
    }
}
