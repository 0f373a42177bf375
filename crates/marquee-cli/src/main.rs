use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee CLI - movie catalog account tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the resolved profile
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Request account creation (confirmation arrives by email)
    Signup {
        email: String,
        #[arg(long)]
        password: String,
        /// Display name recorded on the account
        #[arg(long)]
        name: String,
        /// Requested role: "user" or "admin"
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Sign out and clear the persisted session
    Logout,
    /// Print the current session and profile
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { email, password } => commands::account::login(&email, &password).await,
        Commands::Signup {
            email,
            password,
            name,
            role,
        } => commands::account::signup(&email, &password, &name, &role).await,
        Commands::Logout => commands::account::logout().await,
        Commands::Whoami => commands::account::whoami().await,
    }
}
