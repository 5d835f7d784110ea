use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

#[derive(Parser)]
#[command(name = "modelplace")]
#[command(author, version, about = "Command-line client for the Modelplace image-processing API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize against the API and store the credential
    Login {
        /// Account email (uses the password flow instead of client credentials)
        #[arg(long, requires = "password")]
        email: Option<String>,

        /// Account password
        #[arg(long, requires = "email")]
        password: Option<String>,
    },

    /// List the models available for remote computation
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit an image, poll the task and print the result
    Process {
        /// Path to the image file
        image: PathBuf,

        /// Model id to run
        #[arg(long)]
        model: i64,

        /// Skip the visualization artifact
        #[arg(long)]
        no_visualize: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { email, password } => {
            init_logging();
            cli::login::run(email, password).await
        }
        Commands::Models { json } => {
            init_logging();
            cli::models::run(json).await
        }
        Commands::Process {
            image,
            model,
            no_visualize,
            json,
        } => {
            init_logging();
            cli::process::run(&image, model, !no_visualize, json).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
