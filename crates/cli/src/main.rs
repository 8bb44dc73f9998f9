use anyhow::Context;
use clap::{Parser, Subcommand};
use companion_core::{collaborators_from_config, ConsentsService, CoreConfig, LinkId};
use companion_types::{CareRequestId, SignerId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "companion")]
#[command(about = "Companion consent workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a companion link for a care request
    InitLink {
        /// Dashboard care request id
        care_request_id: u64,
    },
    /// List the consent definitions a signer may sign
    Definitions {
        /// Companion link id
        link_id: String,
        /// Signer id
        signer_id: u64,
        /// Only definitions without a capture for the episode
        #[arg(long)]
        incomplete: bool,
    },
    /// List the definition ids required before consents can be propagated
    Required {
        /// Companion link id
        link_id: String,
    },
    /// Show consent categories
    Options {
        /// Companion link id
        link_id: String,
    },
    /// Mark the consents task complete and propagate signed consents
    Complete {
        /// Companion link id
        link_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("companion=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'companion --help' for commands");
        return Ok(());
    };

    let config = CoreConfig::from_env().context("loading configuration")?;
    let language_id = config.language_id();
    let consents = ConsentsService::new(collaborators_from_config(&config)?, language_id);

    match command {
        Commands::InitLink { care_request_id } => {
            let link = consents
                .initialise_link(CareRequestId(care_request_id))
                .await?;
            println!(
                "Initialised link {} for care request {}",
                link.id, link.care_request_id
            );
        }
        Commands::Definitions {
            link_id,
            signer_id,
            incomplete,
        } => {
            let link_id = LinkId::parse(&link_id)?;
            let definitions = consents
                .definitions_for_link(&link_id, SignerId(signer_id), incomplete)
                .await?;
            if definitions.is_empty() {
                println!("No consent definitions found.");
            }
            for definition in definitions {
                println!(
                    "ID: {}, Category: {}, Name: {}, Version: {}",
                    definition.id, definition.category_id, definition.name, definition.version
                );
            }
        }
        Commands::Required { link_id } => {
            let link_id = LinkId::parse(&link_id)?;
            let required = consents.required_definition_ids_for_link(&link_id).await?;
            if required.is_empty() {
                println!("No consent definitions are required.");
            }
            for id in required {
                println!("{id}");
            }
        }
        Commands::Options { link_id } => {
            let link_id = LinkId::parse(&link_id)?;
            let options = consents.options_for_link(&link_id).await?;
            for category in options.ordered_categories() {
                println!(
                    "Category {}: {}{}",
                    category.id,
                    category.name,
                    if category.required { " (required)" } else { "" }
                );
            }
        }
        Commands::Complete { link_id } => {
            let link_id = LinkId::parse(&link_id)?;
            let task = consents.complete_consents_task(&link_id).await?;
            println!("Task {} is now {}", task.id, task.status);
        }
    }

    Ok(())
}
