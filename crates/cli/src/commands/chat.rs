//! Chat command handler.
//!
//! Reads questions from stdin, one per line, within a single session.

use crate::commands::ask::print_response;
use clap::Args;
use syllabus_core::{config::AppConfig, AppResult};
use syllabus_knowledge::QueryOrchestrator;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["exit", "quit", ":q"];

/// Interactive conversation sharing one session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Resume an existing session id
    #[arg(long)]
    pub session: Option<String>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        config.validate()?;
        let orchestrator = QueryOrchestrator::from_config(config)?;
        let mut session = self.session.clone();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if EXIT_COMMANDS.contains(&question) {
                break;
            }

            match orchestrator.query(question, session.as_deref()).await {
                Ok(response) => {
                    session = Some(response.session_id.clone());
                    print_response(&response);
                    println!();
                }
                // The session survives a failed turn
                Err(e) => eprintln!("Error: {}", e),
            }
        }

        if let Some(id) = session {
            tracing::debug!("Chat session {} ended", id);
        }

        Ok(())
    }
}
