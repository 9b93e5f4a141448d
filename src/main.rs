use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use songplan::config::Config;
use songplan::lesson::Level;
use songplan::llm::OpenAiClient;
use songplan::logging::init_tracing;
use songplan::request::{LessonRequest, DEFAULT_LOCALE};
use songplan::LessonPipeline;

#[derive(Parser, Debug)]
#[command(
    name = "songplan",
    about = "Compose SONG lesson plans with a language model",
    version
)]
struct Args {
    /// Config file (defaults to ~/.config/songplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8787
        #[arg(long)]
        bind: Option<String>,
    },
    /// Compose one lesson and print it as JSON
    Compose {
        #[arg(long)]
        topic: String,
        /// beginner, intermediate or advanced
        #[arg(long, default_value = "beginner")]
        level: String,
        #[arg(long, default_value = DEFAULT_LOCALE)]
        locale: String,
        #[arg(long)]
        goal: Option<String>,
    },
    /// Print the effective configuration (API key redacted)
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    init_tracing(config.log_format);

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            songplan::server::serve(config).await
        }
        Command::Compose {
            topic,
            level,
            locale,
            goal,
        } => compose_once(&config, &topic, &level, &locale, goal).await,
        Command::Check => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
            Ok(())
        }
    }
}

async fn compose_once(
    config: &Config,
    topic: &str,
    level: &str,
    locale: &str,
    goal: Option<String>,
) -> Result<()> {
    let level = Level::from_str_case(level)
        .ok_or_else(|| anyhow!("unknown level '{}' (expected beginner, intermediate or advanced)", level))?;
    let request = LessonRequest::new(topic, level, locale, goal)?;

    let client = OpenAiClient::new(config)?;
    let pipeline = LessonPipeline::new(config, Arc::new(client));

    match pipeline.compose(&request).await {
        Ok(lesson) => {
            println!("{}", serde_json::to_string_pretty(&lesson)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&err.to_body())?);
            Err(err.into())
        }
    }
}
