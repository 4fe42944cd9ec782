//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// FeedUp - course feedback analytics client
///
/// Summarize course ratings and sentiment, run topic analysis over
/// student feedback, and submit new feedback to a FeedUp server.
///
/// Examples:
///   feedup dashboard -u admin --course CS101
///   feedup courses -u admin --format json
///   feedup topics -u admin --course all --min-count 10
///   feedup submit --course web-development --rating 5 --text "Great labs"
///   feedup --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// What to do
    #[arg(value_enum, required_unless_present = "init_config")]
    pub action: Option<Action>,

    /// Base URL of the FeedUp server
    #[arg(long, value_name = "URL", env = "FEEDUP_URL")]
    pub url: Option<String>,

    /// Admin username for dashboard and topic analysis
    #[arg(short, long, env = "FEEDUP_USERNAME")]
    pub username: Option<String>,

    /// Admin password
    #[arg(short, long, env = "FEEDUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Course key to show or analyze ("all" for every course in topics)
    #[arg(long, value_name = "COURSE")]
    pub course: Option<String>,

    /// Minimum number of feedback items required for topic analysis
    #[arg(long, value_name = "COUNT")]
    pub min_count: Option<usize>,

    /// Star rating for submit (1-5)
    #[arg(long, value_name = "STARS")]
    pub rating: Option<i64>,

    /// Feedback text for submit
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .feedup.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write rendered output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .feedup.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    /// Analytics for one course
    Dashboard,
    /// Rating and review totals for every course
    Courses,
    /// Run topic analysis over a course's feedback
    Topics,
    /// Submit one piece of feedback
    Submit,
}

impl Action {
    /// Whether the action needs an authenticated admin session.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Action::Submit)
    }
}

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Server URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(min_count) = self.min_count {
            if min_count == 0 {
                return Err("Minimum feedback count must be at least 1".to_string());
            }
        }

        if self.action == Some(Action::Submit) {
            if self.course.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err("submit requires --course".to_string());
            }
            match self.rating {
                None => return Err("submit requires --rating".to_string()),
                Some(rating) if !(1..=5).contains(&rating) => {
                    return Err("Rating must be between 1 and 5".to_string());
                }
                Some(_) => {}
            }
            if self.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
                return Err("submit requires --text".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
