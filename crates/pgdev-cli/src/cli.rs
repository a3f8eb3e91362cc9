//! `pgdev` - manage PostgreSQL connection profiles, refresh catalog caches and
//! search catalog objects from the terminal

mod commands;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use pgdev_core::ConnectionProfile;
use pgdev_settings::{AppSettings, Layout};

use crate::commands::App;
use crate::logging::LoggingConfig;

#[derive(Debug, Parser)]
#[command(name = "pgdev", version, about = "PostgreSQL developer backend")]
struct Cli {
    /// Keep config and data under this directory instead of the platform defaults
    #[arg(long, env = "PGDEV_HOME", global = true)]
    home: Option<PathBuf>,

    /// More detailed logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Check that a profile can connect
    Test {
        /// Profile name; the active profile when omitted
        name: Option<String>,
    },
    /// Introspect the catalog, update the cache and rebuild the search index
    Refresh { name: Option<String> },
    /// Search indexed catalog objects by name
    Search { query: String },
    /// Run one SQL statement
    Query {
        sql: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// List schemas and their object counts
    Schemas { name: Option<String> },
    /// Show the columns and indexes of a table
    Describe {
        schema: String,
        table: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Print the definition of a function or procedure
    Source {
        schema: String,
        routine: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Add a profile, replacing one with the same name
    Add(AddProfile),
    /// List profiles
    List,
    /// Remove a profile and its cached metadata
    Remove { name: String },
    /// Make a profile the active one
    Use { name: String },
}

#[derive(Debug, Args)]
struct AddProfile {
    name: String,
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 5432)]
    port: u16,
    #[arg(long)]
    database: String,
    #[arg(long)]
    user: String,
    #[arg(long, env = "PGDEV_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Connect over TLS
    #[arg(long)]
    ssl: bool,
}

impl AddProfile {
    fn into_profile(self) -> ConnectionProfile {
        let profile = ConnectionProfile::new(self.name, self.host, self.port, self.database, self.user)
            .with_ssl(self.ssl);
        match self.password {
            Some(password) => profile.with_password(password),
            None => profile,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = ?e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let layout = match &cli.home {
        Some(home) => Layout::rooted(home),
        None => Layout::system()?,
    };
    layout.ensure_directories()?;
    let settings = AppSettings::load(&layout.settings_file())?;

    let _log_guard = logging::init(&LoggingConfig {
        log_dir: layout.log_dir(),
        enable_json_logs: settings.log_json,
        verbose: cli.verbose,
    })?;

    let app = App::open(layout, settings).await?;
    let code = match cli.command {
        Command::Profile(ProfileCommand::Add(args)) => app.add_profile(args.into_profile()).await?,
        Command::Profile(ProfileCommand::List) => app.list_profiles(),
        Command::Profile(ProfileCommand::Remove { name }) => app.remove_profile(&name).await?,
        Command::Profile(ProfileCommand::Use { name }) => app.use_profile(&name)?,
        Command::Test { name } => app.test(name.as_deref()).await?,
        Command::Refresh { name } => app.refresh(name.as_deref()).await?,
        Command::Search { query } => app.search(&query).await?,
        Command::Query { sql, profile } => app.query(&sql, profile.as_deref()).await?,
        Command::Schemas { name } => app.schemas(name.as_deref()).await?,
        Command::Describe {
            schema,
            table,
            profile,
        } => app.describe(&schema, &table, profile.as_deref()).await?,
        Command::Source {
            schema,
            routine,
            profile,
        } => app.source(&schema, &routine, profile.as_deref()).await?,
    };

    app.shutdown().await;
    Ok(code)
}
