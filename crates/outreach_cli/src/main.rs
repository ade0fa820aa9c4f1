//! `outreach`: command-line front end for the outreach admin backend.
mod commands;
mod output;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use outreach_client::{FileStorage, LocalConfigCache, ServiceContext};
use outreach_core::{JobId, Platform};
use outreach_logging::{initialize, outreach_debug, LogDestination};

use crate::output::ConsoleNoticeSink;
use crate::settings::{load_settings, SETTINGS_FILENAME};

#[derive(Parser)]
#[command(name = "outreach", author, version, about, long_about = None)]
struct Cli {
    /// Settings file (RON)
    #[arg(long, global = true, default_value = SETTINGS_FILENAME)]
    settings: PathBuf,

    /// Also log to the terminal at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Server-side configs, mirrored into the local cache
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Credentials kept in the local cache only
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Profile search tasks
    SearchTasks {
        #[command(subcommand)]
        action: SearchTaskAction,
    },
    /// Message campaigns
    MessageTasks {
        #[command(subcommand)]
        action: MessageTaskAction,
    },
    /// Message templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Print the effective settings, optionally writing them to the settings file
    Settings {
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        key: String,
    },
    /// Read the cached value without contacting the server
    Cached {
        key: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Scraping provider token, sent as X-Apify-Token
    SetApi { value: String },
    /// Session token, sent as a bearer token
    SetSession { value: String },
    Show,
}

#[derive(Subcommand)]
enum SearchTaskAction {
    List {
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    Show {
        id: JobId,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_platform, default_value = "instagram")]
        platform: Platform,
        /// Search keyword; repeat for several
        #[arg(long = "keyword", required = true)]
        keywords: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Start {
        id: JobId,
    },
    Stop {
        id: JobId,
    },
    Delete {
        id: JobId,
    },
    Status {
        #[arg(required = true)]
        ids: Vec<JobId>,
    },
    Results {
        id: JobId,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Poll until Ctrl-C; all tasks when no ids are given
    Watch {
        ids: Vec<JobId>,
    },
}

#[derive(Subcommand)]
enum MessageTaskAction {
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    Show {
        id: JobId,
    },
    Start {
        id: JobId,
    },
    Stop {
        id: JobId,
    },
    Delete {
        id: JobId,
    },
    Status {
        #[arg(required = true)]
        ids: Vec<JobId>,
    },
    /// Poll until Ctrl-C; all tasks when no ids are given
    Watch {
        ids: Vec<JobId>,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },
    Show {
        id: i64,
    },
    /// Render a template with `--var name=value` pairs
    Preview {
        id: i64,
        #[arg(long = "var", value_parser = parse_variable)]
        vars: Vec<(String, String)>,
    },
    SetDefault {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

fn parse_platform(raw: &str) -> Result<Platform, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown platform '{raw}'"))
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.settings);

    let destination = if cli.verbose {
        LogDestination::Both(settings.log_file.clone())
    } else {
        LogDestination::File(settings.log_file.clone())
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    initialize(destination, level);
    outreach_debug!("Effective settings: {:?}", settings);

    let cache = LocalConfigCache::new(Arc::new(FileStorage::new(&settings.cache_dir)));
    let ctx = ServiceContext::connect(&settings.client(), cache)?
        .with_notices(Arc::new(ConsoleNoticeSink));

    match cli.command {
        Command::Config { action } => commands::config(&ctx, action).await,
        Command::Token { action } => commands::token(&ctx, action),
        Command::SearchTasks { action } => commands::search_tasks(&ctx, &settings, action).await,
        Command::MessageTasks { action } => {
            commands::message_tasks(&ctx, &settings, action).await
        }
        Command::Templates { action } => commands::templates(&ctx, action).await,
        Command::Settings { write } => commands::show_settings(&cli.settings, &settings, write),
    }
}
