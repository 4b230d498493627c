use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use studytrack_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "studytrack-cli", version, about = "StudyTrack CLI")]
struct Cli {
    /// Treat this date (YYYY-MM-DD) as today for the whole invocation
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Child profiles
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Subjects of the active profile
    Subject {
        #[command(subcommand)]
        action: commands::subject::SubjectAction,
    },
    /// Chapters inside a subject
    Chapter {
        #[command(subcommand)]
        action: commands::chapter::ChapterAction,
    },
    /// Exams and their chapters
    Exam {
        #[command(subcommand)]
        action: commands::exam::ExamAction,
    },
    /// Daily study tasks
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// One-time and weekly reminders
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Points, streak and badges
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Check subject and exam chapters agree
    Doctor {
        /// Repair what is found
        #[arg(long)]
        fix: bool,
    },
}

fn init_tracing() {
    let fallback = Config::load_or_default().logging.level;
    let filter = EnvFilter::try_from_env("STUDYTRACK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let ctx = Context {
        today: cli
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    };
    let result = match cli.command {
        Commands::Profile { action } => commands::profile::run(action, &ctx),
        Commands::Subject { action } => commands::subject::run(action, &ctx),
        Commands::Chapter { action } => commands::chapter::run(action, &ctx),
        Commands::Exam { action } => commands::exam::run(action, &ctx),
        Commands::Task { action } => commands::task::run(action, &ctx),
        Commands::Reminder { action } => commands::reminder::run(action, &ctx),
        Commands::Stats { action } => commands::stats::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action),
        Commands::Doctor { fix } => commands::doctor::run(fix, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
