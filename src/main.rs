// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Result, Context};
use log::{warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::app_config::Config;
use app_controller::Controller;

mod app_config;
mod app_controller;
mod attachments;
mod backends;
mod database;
mod errors;
mod extraction;
mod file_utils;
mod ingest;
mod language_utils;
mod narration;
mod text_segmenter;
mod voice;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn to_level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add documents to the library
    #[command(alias = "ingest")]
    Add {
        /// Document files or directories to ingest
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,

        /// Language code to tag the documents with, skipping detection
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List the documents in the library
    #[command(alias = "ls")]
    List,

    /// Show one document in detail
    Show {
        /// Document id, or a unique id prefix
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove a document together with its reading position and attachments
    #[command(alias = "rm")]
    Remove {
        /// Document id, or a unique id prefix
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Read a document aloud in an interactive session
    Read {
        /// Document id, or a unique id prefix
        #[arg(value_name = "ID")]
        id: String,

        /// Voice id to use, saved as the preference for the document language
        #[arg(short, long)]
        voice: Option<String>,

        /// Ignore the saved position and start from the first paragraph
        #[arg(long)]
        from_start: bool,
    },

    /// List the voices the speech backend advertises
    Voices {
        /// Only show voices covering this language
        #[arg(value_name = "LANGUAGE")]
        language: Option<String>,
    },

    /// Attach a document to an AI chat context with token and cost estimates
    Attach {
        /// Document id, or a unique id prefix
        #[arg(value_name = "ID")]
        id: String,

        /// Model the estimates are computed for
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Detach a document from an AI chat context
    Detach {
        /// Document id, or a unique id prefix
        #[arg(value_name = "ID")]
        id: String,

        /// Only detach from this model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Generate shell completions for lectern
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// lectern - a local document library that reads to you
///
/// Keeps documents (PDF, DOCX, plain text) in a local library and narrates
/// them through a speech backend, remembering where you stopped.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(author = "lectern contributors")]
#[command(version = "1.0.0")]
#[command(about = "Document narration from the command line")]
#[command(long_about = "lectern keeps a local library of documents and reads them aloud through a
configurable speech backend, remembering where you stopped per document.

EXAMPLES:
    lectern add book.pdf notes.txt               # Ingest documents into the library
    lectern add --language fr articles/          # Ingest a directory, forcing the language
    lectern list                                 # Show the library
    lectern read 4f1c                            # Read a document (id prefixes work)
    lectern read --voice amy --from-start 4f1c   # Pick a voice and restart from the top
    lectern voices en                            # List voices covering English
    lectern attach 4f1c --model claude-sonnet    # Estimate tokens/cost for a chat context
    lectern completions bash > lectern.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in lectern.json by default. You can specify a
    different config file with --config. If the config file doesn't exist, a
    default one will be created automatically.

SUPPORTED BACKENDS:
    process - local synthesizer and player subprocesses (default: piper + aplay)
    bridge  - HTTP bridge to a host application's speech engine")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "lectern.json", global = true)]
    config_path: String,

    /// Database file path, overriding the configured one
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color prefix for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());
            let color = Self::get_color_for_level(record.level());

            // Records go to stderr so narration output and generated
            // completion scripts on stdout stay clean
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Shell completions need no configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "lectern", &mut std::io::stdout());
        return Ok(());
    }

    run_command(cli).await
}

async fn run_command(cli: CommandLineOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &cli.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(to_level_filter(&config_log_level));
    }

    // Load or create configuration
    let config_path = &cli.config_path;
    let mut config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;

        config
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();

        // Save default config
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Override config with CLI options if provided
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    if let Some(db) = &cli.db {
        config.database_path = Some(db.clone());
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        // Just update the max level without reinitializing the logger
        log::set_max_level(to_level_filter(&config.log_level));
    }

    // Create controller
    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Add { paths, language } => controller.add_documents(paths, language).await,
        Commands::List => controller.list_documents().await,
        Commands::Show { id } => controller.show_document(&id).await,
        Commands::Remove { id, yes } => controller.remove_document(&id, yes).await,
        Commands::Read { id, voice, from_start } => {
            controller.read_document(&id, voice, from_start).await
        },
        Commands::Voices { language } => controller.list_voices(language).await,
        Commands::Attach { id, model } => controller.attach_document(&id, model).await,
        Commands::Detach { id, model } => controller.detach_document(&id, model).await,
        // Handled before configuration is loaded
        Commands::Completions { .. } => Ok(()),
    }
}
