//! gradeforge-cli: Command-line front end shared by grading programs.
//!
//! A grading program builds its [`Tester`] and loader, then hands both to
//! [`run`], which parses the command line and dispatches to a subcommand.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gradeforge_core::reconcile::LogCorrect;
use gradeforge_core::tester::Tester;
use gradeforge_core::traits::ImplementationLoader;

pub mod commands;

#[derive(Parser)]
#[command(version, about = "Automated grading against a master implementation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more submissions
    Grade {
        /// Submission files, e.g. submissions/flc37/foo.rs
        #[arg(required = true)]
        submissions: Vec<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for feedback files (overrides config)
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Print feedback to stdout instead of writing files
        #[arg(long)]
        stdout: bool,

        /// Per-submission time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Submissions graded at once
        #[arg(long)]
        parallelism: Option<usize>,

        /// Only run these test functions (repeatable)
        #[arg(long = "test")]
        tests: Vec<String>,

        /// Which correct results to mention in feedback
        #[arg(long, value_enum)]
        log_correct: Option<LogCorrectArg>,

        /// Where to save the batch report JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Summarize a saved batch report
    Summary {
        /// Batch report JSON
        report: PathBuf,
    },

    /// List registered test functions
    List,

    /// Create a starter gradeforge.toml
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogCorrectArg {
    Nothing,
    Values,
    Output,
    Both,
}

impl From<LogCorrectArg> for LogCorrect {
    fn from(arg: LogCorrectArg) -> Self {
        match arg {
            LogCorrectArg::Nothing => LogCorrect::Nothing,
            LogCorrectArg::Values => LogCorrect::Values,
            LogCorrectArg::Output => LogCorrect::Output,
            LogCorrectArg::Both => LogCorrect::Both,
        }
    }
}

/// Parse the command line and run it against `tester`. Exits the process
/// with status 1 on error.
pub fn run(tester: Tester, loader: Arc<dyn ImplementationLoader>) {
    // Diagnostics go to stderr; stdout carries feedback and tables.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradeforge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            submissions,
            config,
            report_dir,
            stdout,
            timeout,
            parallelism,
            tests,
            log_correct,
            json,
        } => commands::grade::execute(
            tester,
            loader,
            commands::grade::GradeArgs {
                submissions,
                config,
                report_dir,
                stdout,
                timeout,
                parallelism,
                tests,
                log_correct: log_correct.map(Into::into),
                json,
            },
        ),
        Commands::Summary { report } => commands::summary::execute(&report),
        Commands::List => commands::list::execute(&tester),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
