mod cli;
mod repl;

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colloquy_ai::mirror::JsonlMirror;
use colloquy_core::config::AppConfig;
use colloquy_core::{lifecycle, TranscriptStore};

use crate::cli::{Cli, Commands};
use crate::repl::{format_exchange, ChatSession};

#[tokio::main]
async fn main() -> Result<()> {
    lifecycle::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            lifecycle::log_startup();
            let pipeline = colloquy_ai::build_pipeline(&config)?;
            let mut session = ChatSession::new(&pipeline);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            writeln!(stdout, "Colloquy: type /help for commands")?;
            let outcome = session.run(stdin, &mut stdout).await;
            pipeline.flush_mirror().await;
            lifecycle::log_shutdown();
            outcome?;
        }
        Commands::Ask { message, json } => {
            let pipeline = colloquy_ai::build_pipeline(&config)?;
            let mut store = TranscriptStore::new();
            let exchange = pipeline.submit(&mut store, &message).await?;
            let rendered = if json {
                serde_json::to_string_pretty(exchange).map(|body| format!("{body}\n"))
            } else {
                Ok(format_exchange(exchange))
            };
            pipeline.flush_mirror().await;
            print!("{}", rendered?);
        }
        Commands::Log { limit } => {
            let records = JsonlMirror::load_recent(Path::new(&config.mirror.dir), limit);
            if records.is_empty() {
                println!("No mirrored exchanges in {}", config.mirror.dir);
            }
            for record in records {
                println!(
                    "[{}] {}\nYou: {}\nBot: {}\n",
                    record.ts.format("%Y-%m-%d %H:%M:%S"),
                    record.status,
                    record.user_message,
                    record.bot_response
                );
            }
        }
        Commands::CheckConfig => {
            colloquy_ai::build_pipeline(&config)?;
            println!("generator:  {:?} ({})", config.generator.backend, config.generator.model);
            println!("moderation: {:?}", config.moderation.backend);
            println!("  input:  {:?}", config.moderation.input_policies);
            println!("  output: {:?}", config.moderation.output_policies);
            println!("mirror:     {:?}", config.mirror.backend);
            println!("Configuration OK");
        }
    }

    Ok(())
}
