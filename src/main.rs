use std::fs;
use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use scriptgen_backend::config::Config;
use scriptgen_backend::error::HandlerError;
use scriptgen_backend::event::{ApiEvent, ApiResponse};
use scriptgen_backend::handlers;
use scriptgen_backend::llm::{create_generator, MockGenerator, ScriptGenerator};
use scriptgen_backend::store::{MemoryStore, PgStore, ScriptStore};

#[derive(Parser)]
#[command(name = "scriptgen", version)]
#[command(about = "Run Apps Script generator handlers against a gateway event", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a script from the prompt in the event body
    Generate {
        /// Path to the gateway event JSON (stdin if omitted)
        #[arg(long)]
        event: Option<String>,

        /// Force mock mode: placeholder generator and in-memory store
        #[arg(long)]
        mock: bool,
    },
    /// List recently generated scripts
    History {
        /// Path to the gateway event JSON (stdin if omitted)
        #[arg(long)]
        event: Option<String>,

        /// Use an in-memory store instead of Postgres
        #[arg(long)]
        mock: bool,
    },
    /// List script templates
    Templates {
        /// Path to the gateway event JSON (stdin if omitted)
        #[arg(long)]
        event: Option<String>,

        /// Use an in-memory store instead of Postgres
        #[arg(long)]
        mock: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the response envelope.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let response = match cli.command {
        Commands::Generate { event, mock } => {
            let event = read_event(event.as_deref())?;
            generate_response(&event, mock).await
        }
        Commands::History { event, mock } => {
            let event = read_event(event.as_deref())?;
            match store_for(mock).await {
                Ok(store) => handlers::history::handle(&event, store.as_ref()).await,
                Err(error) => error.into_response(),
            }
        }
        Commands::Templates { event, mock } => {
            let event = read_event(event.as_deref())?;
            match store_for(mock).await {
                Ok(store) => handlers::templates::handle(&event, store.as_ref()).await,
                Err(error) => error.into_response(),
            }
        }
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

async fn generate_response(event: &ApiEvent, mock: bool) -> ApiResponse {
    if mock {
        return handlers::generate::handle(event, &MockGenerator::new(), &MemoryStore::new())
            .await;
    }

    let setup: Result<(Box<dyn ScriptGenerator>, PgStore), HandlerError> = async {
        let config = Config::from_env()?;
        let generator = create_generator(&config.llm)?;
        let db = config
            .db
            .ok_or_else(|| HandlerError::Config("DATABASE_URL is not set".to_string()))?;
        let store = PgStore::connect(&db).await?;
        Ok((generator, store))
    }
    .await;

    match setup {
        Ok((generator, store)) => {
            handlers::generate::handle(event, generator.as_ref(), &store).await
        }
        Err(error) => error.into_response(),
    }
}

async fn store_for(mock: bool) -> Result<Box<dyn ScriptStore>, HandlerError> {
    if mock {
        return Ok(Box::new(MemoryStore::new()));
    }
    let db = scriptgen_backend::config::DbConfig::from_env()
        .ok_or_else(|| HandlerError::Config("DATABASE_URL is not set".to_string()))?;
    Ok(Box::new(PgStore::connect(&db).await?))
}

/// Read the gateway event from a file or stdin. Empty input is treated as an
/// empty event, which the handlers answer with their method gate.
fn read_event(path: Option<&str>) -> Result<ApiEvent> {
    let raw = match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read event file {}", path))?
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read event from stdin")?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        return Ok(ApiEvent::default());
    }
    serde_json::from_str(&raw).context("event is not valid gateway JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["scriptgen", "generate"]).unwrap();
        match cli.command {
            Commands::Generate { event, mock } => {
                assert!(event.is_none());
                assert!(!mock);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_generate_with_event_and_mock() {
        let cli = Cli::try_parse_from([
            "scriptgen",
            "generate",
            "--event",
            "/tmp/event.json",
            "--mock",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { event, mock } => {
                assert_eq!(event.unwrap(), "/tmp/event.json");
                assert!(mock);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_history_and_templates() {
        assert!(matches!(
            Cli::try_parse_from(["scriptgen", "history"]).unwrap().command,
            Commands::History { .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["scriptgen", "templates", "--mock"])
                .unwrap()
                .command,
            Commands::Templates { mock: true, .. }
        ));
    }

    #[test]
    fn test_parse_missing_subcommand() {
        assert!(Cli::try_parse_from(["scriptgen"]).is_err());
    }

    #[test]
    fn test_parse_unknown_subcommand() {
        assert!(Cli::try_parse_from(["scriptgen", "deploy"]).is_err());
    }
}
