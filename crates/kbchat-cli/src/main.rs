use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use kbchat_core::config::KbchatConfig;
use kbchat_stream::{ChatClient, Transcript};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod chat;
mod stop;

#[derive(Parser)]
#[command(name = "kbchat", about = "Chat with a knowledge-base backend from the terminal.")]
struct Cli {
    /// Config file (default: $KBCHAT_CONFIG > ~/.kbchat/kbchat.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and stream the reply.
    Chat {
        /// Model to use (default: chat.model from config).
        #[arg(long)]
        model: Option<String>,

        /// Ground the reply in this knowledge base (default: chat.rag_tag).
        #[arg(long, conflicts_with = "plain")]
        rag_tag: Option<String>,

        /// Ignore any configured knowledge base.
        #[arg(long)]
        plain: bool,

        /// Print the model's reasoning to stderr.
        #[arg(long)]
        show_reasoning: bool,

        /// Stop the stream after this many seconds.
        #[arg(long, value_name = "SECS")]
        deadline_secs: Option<u64>,

        message: String,
    },
    /// List models the backend can serve.
    Models,
    /// List knowledge-base tags.
    Tags,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logs go to stderr so stdout carries only the answer
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kbchat=warn,kbchat_stream=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > KBCHAT_CONFIG env > ~/.kbchat/kbchat.toml
    let config_path = cli.config.or_else(|| std::env::var("KBCHAT_CONFIG").ok());
    let config = KbchatConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        KbchatConfig::default()
    });

    let client = ChatClient::new(config.api.clone());

    match cli.command {
        Command::Chat {
            model,
            rag_tag,
            plain,
            show_reasoning,
            deadline_secs,
            message,
        } => {
            let req = chat::build_request(
                chat::ChatArgs {
                    model,
                    rag_tag,
                    plain,
                    message,
                },
                &config.chat,
            );
            info!(model = %req.model, grounded = req.is_grounded(), "starting chat");

            let cancel = CancellationToken::new();
            let _stop = stop::watch(cancel.clone(), deadline_secs.map(Duration::from_secs));

            let mut stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr();
            let thoughts = show_reasoning.then_some(&mut stderr);
            let mut transcript = Transcript::new();

            let outcome = chat::render(
                client.stream_chat(req, cancel),
                &mut stdout,
                thoughts,
                &mut transcript,
            )
            .await;
            chat::end_line(&mut stdout);

            if let Some(d) = transcript.reasoning_duration() {
                info!(ms = d.num_milliseconds(), "reasoning time");
            }
            match outcome {
                Ok(chat::Outcome::Completed(termination)) => {
                    info!(?termination, "chat finished");
                }
                Ok(chat::Outcome::Stopped) => eprintln!("stopped by user"),
                Err(e) => bail!("{} ({})", e, e.code()),
            }
        }
        Command::Models => {
            let models = client
                .list_models()
                .await
                .map_err(|e| anyhow::anyhow!("{} ({})", e, e.code()))?;
            for model in models {
                println!("{model}");
            }
        }
        Command::Tags => {
            for tag in client.list_rag_tags().await {
                println!("{tag}");
            }
        }
    }

    Ok(())
}
