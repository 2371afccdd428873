//! # LearnQuest
//!
//! A terminal tracker for recurring learning tasks. Complete tasks to earn points,
//! spend points on rewards, and see what is due on any day or across a month.
//!
//! ## Repeat policies
//!
//! | Tag              | Due on                                                    |
//! |------------------|-----------------------------------------------------------|
//! | `once`           | the start date only                                       |
//! | `daily`          | every day from the start date                             |
//! | `weekly`         | every 7 days                                              |
//! | `biweekly`       | every 14 days                                             |
//! | `ebbinghaus`     | start + 0, 1, 2, 4, 7, 15 and 30 days                     |
//! | `week_cross`     | any day of the start date's week (Monday to Sunday)       |
//! | `biweek_cross`   | any day of the start week and the week after              |
//! | `month_cross`    | any day of the start date's month                         |
//! | `weekly_cross`   | any day, every week                                       |
//! | `biweekly_cross` | any day of every other week                               |
//! | `monthly_cross`  | the start date's day of month (last day in short months)  |
//!
//! Nothing is ever due before its start date. Unknown tags found in the data file are
//! treated as `daily`.
//!
//! ## Usage
//!
//! ```bash
//! # A daily task worth 20 points, 30 minutes
//! learnquest add "Read a chapter" --minutes 30
//!
//! # Vocabulary review on the Ebbinghaus schedule, in a fixed slot
//! learnquest add "Vocabulary" --repeat ebbinghaus --slot 19:00-19:30 --points 10
//!
//! # What is due today, then complete task 2 with a note
//! learnquest today
//! learnquest complete 2 --proof "50 words"
//!
//! # Month grid and statistics
//! learnquest planner --month 2024-01
//! learnquest stats --from 2024-01-01 --to 2024-01-31
//!
//! # Rewards
//! learnquest reward add "Game time" --points 50 --icon 🎮
//! learnquest reward redeem 1
//! ```
//!
//! ## Data Storage
//!
//! Data is saved in your local data directory:
//! *   Linux: `~/.local/share/learnquest/`
//! *   macOS: `~/Library/Application Support/learnquest/`
//! *   Windows: `%APPDATA%\learnquest\`
//!
//! Set `LEARNQUEST_DB` to the path of a `tasks.json` to use another directory.
//! Set `RUST_LOG` (e.g. `RUST_LOG=debug`) for diagnostics on stderr.

use std::io;
use std::process;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use log::{debug, error};

use learnquest::commands::*;
use learnquest::models::{Proof, ProofKind, RewardKind};
use learnquest::QuestError;

#[derive(Parser)]
#[command(name = "learnquest")]
#[command(about = "Recurring learning tasks, points and rewards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TaskArgs {
    /// Longer description
    #[arg(long)]
    description: Option<String>,
    /// Points earned per completion
    #[arg(short, long)]
    points: Option<u32>,
    /// Repeat policy (once, daily, weekly, biweekly, ebbinghaus, week_cross,
    /// biweek_cross, month_cross, weekly_cross, biweekly_cross, monthly_cross)
    #[arg(short, long)]
    repeat: Option<String>,
    /// Start date in YYYY-MM-DD
    #[arg(short, long)]
    start: Option<String>,
    /// Expected minutes
    #[arg(short, long, conflicts_with = "slot")]
    minutes: Option<u32>,
    /// Time slot, e.g. 19:00-19:30
    #[arg(long)]
    slot: Option<String>,
}

impl From<TaskArgs> for TaskFields {
    fn from(a: TaskArgs) -> Self {
        TaskFields {
            description: a.description,
            points: a.points,
            repeat: a.repeat,
            start: a.start,
            minutes: a.minutes,
            slot: a.slot,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[command(flatten)]
        fields: TaskArgs,
    },
    /// Edit a task
    Edit {
        id: u64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskArgs,
    },
    /// Remove a task
    Remove {
        id: u64,
    },
    /// List all tasks
    List,
    /// Show the tasks due on a date
    Today {
        /// Date in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Mark a task as completed for a date
    Complete {
        id: u64,
        /// Date in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Minutes actually spent (default: the task's estimate)
        #[arg(short, long)]
        minutes: Option<u32>,
        /// Proof note or reference
        #[arg(long)]
        proof: Option<String>,
        /// Kind of proof
        #[arg(long, value_enum, default_value_t = ProofKind::Note)]
        proof_kind: ProofKind,
    },
    /// Show a month calendar of due tasks
    Planner {
        /// Month in YYYY-MM (default: this month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Show completion statistics for a date range
    Stats {
        /// First date in YYYY-MM-DD (default: start of this month)
        #[arg(long)]
        from: Option<String>,
        /// Last date in YYYY-MM-DD (default: end of this month)
        #[arg(long)]
        to: Option<String>,
    },
    /// Show the points balance
    Points,
    /// Manage rewards
    Reward {
        #[command(subcommand)]
        command: RewardCommands,
    },
    /// Reset the database (delete all tasks, records and rewards)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RewardCommands {
    /// Add a new reward
    Add {
        name: String,
        /// Price in points
        #[arg(short, long)]
        points: u32,
        /// Emoji or short icon
        #[arg(short, long)]
        icon: Option<String>,
        #[arg(short, long, value_enum, default_value_t = RewardKind::Virtual)]
        kind: RewardKind,
    },
    /// List rewards
    List,
    /// Remove a reward
    Remove {
        id: u64,
    },
    /// Spend points on a reward
    Redeem {
        id: u64,
        /// Date in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show past redemptions
    History,
}

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn run(command: Commands) -> Result<(), QuestError> {
    match command {
        Commands::Add { title, fields } => cmd_add(title, fields.into(), false).map(|_| ()),
        Commands::Edit { id, title, fields } => cmd_edit(id, title, fields.into(), false),
        Commands::Remove { id } => cmd_remove(id, false),
        Commands::List => {
            cmd_list();
            Ok(())
        }
        Commands::Today { date } => cmd_today(date),
        Commands::Complete { id, date, minutes, proof, proof_kind } => {
            let proof = proof.map(|content| Proof { kind: proof_kind, content });
            cmd_complete(id, date, minutes, proof, false).map(|_| ())
        }
        Commands::Planner { month } => cmd_planner(month),
        Commands::Stats { from, to } => cmd_stats(from, to),
        Commands::Points => {
            cmd_points(false);
            Ok(())
        }
        Commands::Reward { command } => match command {
            RewardCommands::Add { name, points, icon, kind } => {
                cmd_reward_add(name, points, icon, kind, false).map(|_| ())
            }
            RewardCommands::List => {
                cmd_reward_list();
                Ok(())
            }
            RewardCommands::Remove { id } => cmd_reward_remove(id, false),
            RewardCommands::Redeem { id, date } => cmd_reward_redeem(id, date, false).map(|_| ()),
            RewardCommands::History => {
                cmd_reward_history();
                Ok(())
            }
        },
        Commands::Reset { force } => cmd_reset(force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "learnquest", &mut io::stdout());
            Ok(())
        }
    }
}

fn main() {
    setup_logging();
    let cli = Cli::parse();
    debug!("learnquest {} starting", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run(cli.command) {
        if !e.is_user_error() {
            error!("{:?}", e);
        }
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
