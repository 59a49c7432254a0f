use clap::{Parser, Subcommand};
use session_gate::settings::Settings;
use session_gate::{create_user, delete_user, init_tracing, run_server};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web server (default).
    Serve,
    /// Add a user, prompting for the password.
    CreateUser {
        #[clap(long)]
        email: String,
    },
    /// Remove a user and everything they own.
    DeleteUser {
        #[clap(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new()?;
    init_tracing(&settings);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(settings).await,
        Command::CreateUser { email } => create_user(&settings, &email).await,
        Command::DeleteUser { email } => delete_user(&settings, &email).await,
    }
}
