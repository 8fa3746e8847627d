use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use assistant_gm::assistant::Journal;
use assistant_gm::inference::config::{load_config, load_config_or_default};
use assistant_gm::{Assistant, ClientConfig, Dialect, InferenceClient, InferenceError};

#[derive(Parser, Debug)]
#[command(name = "assistant-gm", version, about = "Talk to a local LLM server on behalf of a game master")]
struct Cli {
    /// Config file (default: $ASSISTANT_GM_CONFIG or assistant-gm.yaml found upward from the cwd)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the bearer token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Override the wire dialect (text_generation_webui, openai_completions, ollama)
    #[arg(long, global = true)]
    dialect: Option<Dialect>,

    /// Debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Write logs to a rotated assistant-gm.log in DIR instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the models the backend offers
    Models,
    /// Generate text for a prompt and print it
    Generate {
        prompt: String,
        /// Model id (default: the configured model)
        #[arg(short = 'm', long)]
        model: Option<String>,
    },
    /// Stream generated text to stdout as it arrives
    Stream {
        prompt: String,
        #[arg(short = 'm', long)]
        model: Option<String>,
    },
    /// Replace @assistant[...] markup in a document and print the result
    Enrich {
        file: PathBuf,
        /// Directory of journal entries referenced as #Name#
        #[arg(short = 'j', long)]
        journal_dir: Option<PathBuf>,
    },
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => load_config_or_default(&std::env::current_dir()?),
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.auth_token = token.clone();
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        Ok(config)
    }
}

fn pick_model(config: &ClientConfig, model: Option<String>) -> anyhow::Result<String> {
    match model.or_else(|| Some(config.model.clone()).filter(|m| !m.is_empty())) {
        Some(model) => Ok(model),
        None => anyhow::bail!("no model configured; pass --model or run `assistant-gm models`"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.log_dir {
        Some(dir) => {
            assistant_gm::init_tracing(Some(dir.as_path()))
                .with_context(|| format!("initializing logs in {}", dir.display()))?;
        }
        None => assistant_gm::init_stderr_tracing(cli.verbose),
    }

    let config = cli.client_config()?;

    match cli.command {
        Command::Models => {
            let client = InferenceClient::from_config(&config)?;
            for model in client.list_models().await? {
                println!("{}", model.id);
            }
        }
        Command::Generate { prompt, model } => {
            let model = pick_model(&config, model)?;
            let client = InferenceClient::from_config(&config)?;
            println!("{}", client.generate_text(&model, &prompt).await?);
        }
        Command::Stream { prompt, model } => {
            let model = pick_model(&config, model)?;
            let client = InferenceClient::from_config(&config)?;
            let streamed = client
                .generate_text_stream_with(&model, &prompt, |chunk| {
                    let mut stdout = std::io::stdout().lock();
                    let _ = stdout.write_all(chunk.as_bytes());
                    let _ = stdout.flush();
                })
                .await;
            match streamed {
                Ok(_) => println!(),
                Err(InferenceError::StreamingUnsupported { dialect }) => {
                    tracing::warn!(dialect = %dialect, "streaming unsupported, generating in one piece");
                    println!("{}", client.generate_text(&model, &prompt).await?);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Enrich { file, journal_dir } => {
            let document = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let journals = match &journal_dir {
                Some(dir) => Journal::load_dir(dir)
                    .with_context(|| format!("loading journals from {}", dir.display()))?,
                None => Journal::new(),
            };

            let mut assistant = Assistant::new(config);
            let update = assistant.ready().await?;
            tracing::info!(model = %update.selected, "enriching {}", file.display());
            print!("{}", assistant.enrich(&document, &journals).await);
        }
    }

    Ok(())
}
