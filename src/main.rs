//! FeedUp - course feedback analytics client
//!
//! A CLI tool that talks to a FeedUp server to summarize course ratings
//! and sentiment, run topic analysis over student feedback, and submit
//! new feedback.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, failed analysis run, etc.)
//!   2 - Admin session required (missing or rejected credentials)

mod analysis;
mod cli;
mod client;
mod config;
mod models;
mod orchestrator;
mod report;

use analysis::{course_counts, course_overview, feedback_stats, CourseFilter};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Action, Args, OutputFormat};
use client::FeedupClient;
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::FeedbackSubmission;
use orchestrator::dashboard;
use orchestrator::state::DEFAULT_MINIMUM_SAMPLE_COUNT;
use orchestrator::{
    shape_results, DashboardEvent, DashboardState, LoadStatus, Orchestrator, RunState,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_AUTH_REQUIRED: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("FeedUp v{}", env!("CARGO_PKG_VERSION"));
    debug!("Action: {:?}", args.action);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Handle --init-config: generate a default .feedup.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(EXIT_FAILURE);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the server URL, admin username, and analysis defaults.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the requested action. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(action) = args.action else {
        return Ok(EXIT_OK);
    };

    let client = FeedupClient::new(&config.server.url, config.server.timeout_seconds)
        .context("Failed to create HTTP client")?;
    info!("Server: {}", client.base_url());

    if action.requires_session() && !open_session(&client, &config, &args).await? {
        return Ok(EXIT_AUTH_REQUIRED);
    }

    match action {
        Action::Dashboard => within_session(&client, run_dashboard(&client, &config, &args)).await,
        Action::Courses => within_session(&client, run_courses(&client, &config, &args)).await,
        Action::Topics => within_session(&client, run_topics(&client, &config, &args)).await,
        Action::Submit => run_submit(&client, &args).await,
    }
}

/// Run an action inside the open admin session, logging out afterwards
/// whether or not the action succeeded.
async fn within_session<F>(client: &FeedupClient, action: F) -> Result<i32>
where
    F: Future<Output = Result<i32>>,
{
    let outcome = action.await;
    close_session(client).await;
    outcome
}

/// Log in with the configured admin credentials.
///
/// Returns `Ok(false)` when credentials are missing or rejected.
async fn open_session(client: &FeedupClient, config: &Config, args: &Args) -> Result<bool> {
    let (Some(username), Some(password)) =
        (config.server.username.as_deref(), args.password.as_deref())
    else {
        eprintln!(
            "🔒 Admin login required: pass --username and --password \
             (or set FEEDUP_USERNAME and FEEDUP_PASSWORD)."
        );
        return Ok(false);
    };

    if !client.login(username, password).await? {
        eprintln!("🔒 Invalid username or password.");
        return Ok(false);
    }

    match client.check_auth().await? {
        Some(name) => debug!("Authenticated as {}", name),
        None => warn!("Login succeeded but the session is not authenticated"),
    }
    Ok(true)
}

async fn close_session(client: &FeedupClient) {
    match client.logout().await {
        Ok(true) => debug!("Logged out"),
        Ok(false) => debug!("Logout was not acknowledged"),
        Err(e) => debug!("Logout failed: {}", e),
    }
}

/// Fetch the analytics payload through the dashboard reducer.
///
/// On failure, prints the reason and returns the exit code to use.
async fn load_dashboard(client: &FeedupClient) -> std::result::Result<DashboardState, i32> {
    let state = dashboard::reduce(DashboardState::default(), DashboardEvent::FetchStarted);
    let state = dashboard::reduce(state, DashboardEvent::from(client.fetch_analytics().await));

    match &state.status {
        LoadStatus::RedirectToLogin => {
            eprintln!("🔒 Session is not authenticated. Log in again.");
            Err(EXIT_AUTH_REQUIRED)
        }
        LoadStatus::Failed(message) => {
            eprintln!("❌ Data loading failed: {}", message);
            Err(EXIT_FAILURE)
        }
        _ => Ok(state),
    }
}

/// Show analytics for one course.
async fn run_dashboard(client: &FeedupClient, config: &Config, args: &Args) -> Result<i32> {
    let mut state = match load_dashboard(client).await {
        Ok(state) => state,
        Err(code) => return Ok(code),
    };

    if let CourseFilter::Course(course) = CourseFilter::from(config.analysis.course.as_str()) {
        let known = state
            .data
            .as_ref()
            .is_some_and(|data| data.summary.contains_key(&course));
        if !known {
            warn!("No analytics recorded for course {}", course);
        }
        state = dashboard::reduce(state, DashboardEvent::CourseSelected(course));
    }

    let (Some(course), Some(view)) = (state.selected_course.clone(), state.current_view()) else {
        println!("No course analytics available yet.");
        return Ok(EXIT_OK);
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&view)?,
        OutputFormat::Markdown => report::generate_course_markdown(&course, &view, Utc::now()),
    };
    emit(config, &output)?;
    Ok(EXIT_OK)
}

/// Show the rating and review totals of every course.
async fn run_courses(client: &FeedupClient, config: &Config, args: &Args) -> Result<i32> {
    let state = match load_dashboard(client).await {
        Ok(state) => state,
        Err(code) => return Ok(code),
    };

    let rows = state.data.as_ref().map(course_overview).unwrap_or_default();
    info!("{} courses with analytics", rows.len());

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&rows)?,
        OutputFormat::Markdown => report::generate_overview_markdown(&rows, Utc::now()),
    };
    emit(config, &output)?;
    Ok(EXIT_OK)
}

/// Run one topic analysis over the loaded feedback.
async fn run_topics(client: &FeedupClient, config: &Config, args: &Args) -> Result<i32> {
    let state = match load_dashboard(client).await {
        Ok(state) => state,
        Err(code) => return Ok(code),
    };
    let payload = state.data.unwrap_or_default();
    let stats = feedback_stats(&payload);

    for (course, count) in course_counts(&payload.feedback_data) {
        debug!("Course option: {} ({} feedback items)", course, count);
    }

    let mut orchestrator = Orchestrator::new(client.clone(), DEFAULT_MINIMUM_SAMPLE_COUNT);
    orchestrator.set_minimum_sample_count(config.analysis.min_feedback_count);
    orchestrator.set_course_filter(CourseFilter::from(config.analysis.course.as_str()));

    let spinner = analysis_spinner(args.quiet);
    orchestrator.start_run(&payload.feedback_data).await;
    spinner.finish_and_clear();

    let run = orchestrator.run();
    let sections = run.result.as_ref().map(shape_results).unwrap_or_default();
    if let Some(result) = &run.result {
        let succeeded = result.values().filter(|outcome| outcome.is_success()).count();
        info!("{} of {} courses produced topics", succeeded, result.len());
    }

    let output = match args.format {
        OutputFormat::Json => report::generate_topics_json(run, &stats, &sections)?,
        OutputFormat::Markdown => {
            report::generate_topics_markdown(run, &stats, &sections, Utc::now())
        }
    };
    emit(config, &output)?;

    if run.state == RunState::Failed {
        if let Some(message) = run.error_message() {
            eprintln!("❌ {}", message);
        }
        return Ok(EXIT_FAILURE);
    }
    Ok(EXIT_OK)
}

/// Submit one piece of feedback. No session is needed.
async fn run_submit(client: &FeedupClient, args: &Args) -> Result<i32> {
    let submission = FeedbackSubmission::new(
        args.course.as_deref().unwrap_or_default(),
        args.rating.unwrap_or_default(),
        args.text.as_deref().unwrap_or_default(),
    )?;

    if client.submit_feedback(&submission).await? {
        println!(
            "✅ Thank you! Your {}-star feedback for {} was submitted.",
            submission.rating, submission.course
        );
        Ok(EXIT_OK)
    } else {
        eprintln!("❌ Failed to submit feedback. Please try again.");
        Ok(EXIT_FAILURE)
    }
}

fn analysis_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Analyzing topics...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Write rendered output to the configured file, or stdout.
fn emit(config: &Config, output: &str) -> Result<()> {
    match config.general.output.as_deref() {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write output to {}", path))?;
            println!("📝 Output saved to: {}", path);
        }
        None => println!("{}", output),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, answer 200, and return the request line.
    async fn answer_once(listener: TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&received)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_failed_action_still_logs_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(answer_once(listener));
        let client = FeedupClient::new(&url, 5).unwrap();

        let outcome = within_session(&client, async {
            Err(anyhow::anyhow!("Failed to write output to /nonexistent/out.md"))
        })
        .await;

        assert!(outcome.unwrap_err().to_string().contains("Failed to write output"));
        assert_eq!(server.await.unwrap(), "POST /api/logout HTTP/1.1");
    }

    #[tokio::test]
    async fn test_successful_action_keeps_exit_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(answer_once(listener));
        let client = FeedupClient::new(&url, 5).unwrap();

        let outcome = within_session(&client, async { Ok(EXIT_FAILURE) }).await;

        assert_eq!(outcome.unwrap(), EXIT_FAILURE);
        assert_eq!(server.await.unwrap(), "POST /api/logout HTTP/1.1");
    }
}
