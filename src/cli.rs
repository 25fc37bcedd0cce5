use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::generator::{EmailGenerator, GenerationContext};
use crate::providers::{create_completion_backend, create_embedding_backend};
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "draftpilot", version, about = "AI-assisted email drafting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a full draft, or answer a question about the draft
    Draft {
        /// What to write (or ask)
        prompt: String,
        /// Recipient address; repeatable
        #[arg(long = "to")]
        recipients: Vec<String>,
        /// File holding the current draft text
        #[arg(long)]
        draft_file: Option<PathBuf>,
        /// Conversation identifier to continue
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Generate up to three tone-varied quick replies
    QuickReply {
        prompt: String,
        #[arg(long = "to")]
        recipients: Vec<String>,
        #[arg(long)]
        draft_file: Option<PathBuf>,
    },
}

fn read_draft(draft_file: Option<&PathBuf>) -> Result<Option<String>> {
    draft_file
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("reading draft file {}", path.display()))
        })
        .transpose()
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let backend = create_completion_backend(&config)?;
    let embeddings = create_embedding_backend(&config);
    let store = Arc::new(ConversationStore::new(config.conversation));
    let generator = EmailGenerator::new(backend, embeddings, store, config.generator_options())
        .with_default_providers();

    match cli.command {
        Command::Draft {
            prompt,
            recipients,
            draft_file,
            conversation,
        } => {
            let context = GenerationContext {
                current_content: read_draft(draft_file.as_ref())?,
                recipients,
                conversation_id: conversation,
                identity: config.identity(),
                cancel: None,
            };
            let responses = generator.generate(&prompt, &context).await?;
            for response in responses {
                println!("{}", response.content);
            }
        }
        Command::QuickReply {
            prompt,
            recipients,
            draft_file,
        } => {
            let context = GenerationContext {
                current_content: read_draft(draft_file.as_ref())?,
                recipients,
                conversation_id: None,
                identity: config.identity(),
                cancel: None,
            };
            let replies = generator.quick_replies(&prompt, &context).await?;
            let rendered: Vec<String> = replies.into_iter().map(|reply| reply.content).collect();
            println!("{}", rendered.join("\n\n---\n\n"));
        }
    }

    Ok(())
}
