//! # Email Hunter CLI
//!
//! Command-line interface for the Email Hunter library (`email_hunter_core`).
//! This binary parses arguments, builds the configuration, initializes the
//! finder, processes profiles (either a single one from flags or a JSON file)
//! and writes the results as JSON.

use email_hunter_core::{
    check_smtp_connectivity, find_single_email, initialize_finder, process_profiles, Config,
    ConfigBuilder, EmailFinder, FindResult, PersonProfile, ProbeMode, ProfileRequest,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// How far verification goes for each candidate.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum VerificationMode {
    /// Resolving the domain is enough
    Fast,
    /// Known providers, SMTP handshake, then port reachability
    Thorough,
}

impl From<VerificationMode> for ProbeMode {
    fn from(mode: VerificationMode) -> Self {
        match mode {
            VerificationMode::Fast => ProbeMode::Fast,
            VerificationMode::Thorough => ProbeMode::Thorough,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Finds and ranks likely email addresses for a person.",
    long_about = "Email Hunter generates candidate addresses from a person's name and organisation domain, verifies them with DNS, SMTP and port checks, and ranks them by confidence."
)]
struct AppArgs {
    /// Path to the input JSON file containing an array of profiles (file mode).
    #[arg(short, long, default_value = "input.json", env = "EMAIL_HUNTER_INPUT")]
    input: String,

    /// Path to the output JSON file where results will be saved.
    #[arg(
        short,
        long,
        default_value = "results.json",
        env = "EMAIL_HUNTER_OUTPUT"
    )]
    output: String,

    /// Full name of the person (enables single profile mode).
    #[arg(long, env = "EMAIL_HUNTER_NAME")]
    name: Option<String>,

    /// Company name of the person (single profile mode).
    #[arg(long, env = "EMAIL_HUNTER_COMPANY", requires = "name")]
    company: Option<String>,

    /// Organisation domain or website URL (single profile mode).
    #[arg(long, env = "EMAIL_HUNTER_DOMAIN", requires = "name")]
    domain: Option<String>,

    /// Known or guessed address to verify first; may be repeated.
    #[arg(long = "seed", requires = "name")]
    seeds: Vec<String>,

    /// Write results to standard output instead of a file.
    #[arg(long, default_value = "false", env = "EMAIL_HUNTER_STDOUT")]
    stdout: bool,

    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "EMAIL_HUNTER_CONFIG")]
    config_file: Option<String>,

    /// Maximum number of candidates verified concurrently per profile.
    #[arg(short, long, env = "EMAIL_HUNTER_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Maximum number of profiles processed concurrently in file mode.
    #[arg(long, env = "EMAIL_HUNTER_PROFILE_CONCURRENCY")]
    profile_concurrency: Option<usize>,

    /// Overall verification deadline per profile, in seconds.
    #[arg(long, env = "EMAIL_HUNTER_DEADLINE")]
    deadline: Option<u64>,

    /// Sender email address used in SMTP `MAIL FROM`.
    #[arg(long, env = "EMAIL_HUNTER_SMTP_SENDER")]
    smtp_sender: Option<String>,

    /// SMTP handshake timeout in seconds.
    #[arg(long, env = "EMAIL_HUNTER_SMTP_TIMEOUT")]
    smtp_timeout: Option<u64>,

    /// DNS lookup timeout in seconds.
    #[arg(long, env = "EMAIL_HUNTER_DNS_TIMEOUT")]
    dns_timeout: Option<u64>,

    /// Comma-separated list of DNS servers to use for lookups.
    #[arg(long, value_delimiter = ',', env = "EMAIL_HUNTER_DNS_SERVERS")]
    dns_servers: Option<Vec<String>>,

    /// Guess the organisation domain from the company name when none is given.
    #[arg(long, action = clap::ArgAction::SetTrue, env = "EMAIL_HUNTER_INFER_DOMAIN")]
    infer_domain: Option<bool>,

    /// Verification mode.
    #[arg(short, long, value_enum, env = "EMAIL_HUNTER_MODE")]
    mode: Option<VerificationMode>,

    /// Skip the outbound port 25 pre-flight check.
    #[arg(long, default_value = "false")]
    skip_connectivity_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Email Hunter CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let config = Arc::new(build_config(&args).context("Failed to build configuration")?);
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    let finder = Arc::new(
        initialize_finder(&config)
            .await
            .context("Failed to initialize EmailFinder core")?,
    );

    if !args.skip_connectivity_check && config.probe_mode == ProbeMode::Thorough {
        match check_smtp_connectivity().await {
            Ok(_) => tracing::info!("SMTP connectivity test passed (outbound port 25 likely open)."),
            Err(e) => {
                tracing::warn!("SMTP connectivity test failed: {}", e);
                tracing::warn!("Handshake checks will likely fall back to port reachability.");
            }
        }
    }

    let start_time = Instant::now();
    let results = if args.name.is_some() {
        process_cli_mode(&finder, &args).await?
    } else {
        process_file_mode(Arc::clone(&config), finder, &args).await?
    };

    if args.stdout {
        print_results(&results)?;
    } else {
        tracing::info!("Saving {} results to '{}'...", results.len(), args.output);
        save_results(&results, &args.output)?;
        tracing::info!("Results saved successfully.");
    }

    log_summary(&results, start_time.elapsed());
    Ok(())
}

fn build_config(args: &AppArgs) -> Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(mode) = args.mode {
        config_builder = config_builder.probe_mode(mode.into());
    }
    if let Some(c) = args.concurrency {
        config_builder = config_builder.max_concurrency(c);
    }
    if let Some(c) = args.profile_concurrency {
        config_builder = config_builder.max_profile_concurrency(c);
    }
    if let Some(d) = args.deadline {
        config_builder = config_builder.overall_deadline(Duration::from_secs(d));
    }
    if let Some(ref s) = args.smtp_sender {
        config_builder = config_builder.smtp_sender_email(s);
    }
    if let Some(t) = args.smtp_timeout {
        config_builder = config_builder.smtp_timeout(Duration::from_secs(t));
    }
    if let Some(t) = args.dns_timeout {
        config_builder = config_builder.dns_timeout(Duration::from_secs(t));
    }
    if let Some(ref servers) = args.dns_servers {
        if !servers.is_empty() {
            config_builder = config_builder.dns_servers(servers.clone());
        }
    }
    if args.infer_domain == Some(true) {
        config_builder = config_builder.infer_company_domain(true);
    }

    Ok(config_builder.build()?)
}

async fn process_cli_mode(finder: &EmailFinder, args: &AppArgs) -> Result<Vec<FindResult>> {
    let name = args
        .name
        .clone()
        .context("--name is required in single profile mode")?;
    tracing::info!(
        "Running in single profile mode: Name='{}', Company='{}', Domain='{}'",
        name,
        args.company.as_deref().unwrap_or("N/A"),
        args.domain.as_deref().unwrap_or("N/A")
    );

    let mut profile = PersonProfile::new(name);
    if let Some(ref company) = args.company {
        profile = profile.with_company_name(company);
    }
    if let Some(ref domain) = args.domain {
        profile = profile.with_company_domain(domain);
    }
    let request = ProfileRequest {
        profile,
        seed_emails: args.seeds.clone(),
    };

    Ok(vec![find_single_email(finder, request).await])
}

async fn process_file_mode(
    config: Arc<Config>,
    finder: Arc<EmailFinder>,
    args: &AppArgs,
) -> Result<Vec<FindResult>> {
    tracing::info!(
        "Running in file mode. Input: '{}', Output: '{}'",
        args.input,
        if args.stdout { "<stdout>" } else { args.output.as_str() }
    );
    let input_path = Path::new(&args.input);
    if !input_path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            args.input
        ));
    }

    let requests = load_profiles(&args.input)?;
    if requests.is_empty() {
        tracing::warn!("Input file '{}' contains no profiles.", args.input);
        return Ok(Vec::new());
    }
    tracing::info!(
        "Starting email discovery for {} profiles (profile concurrency: {})...",
        requests.len(),
        config.max_profile_concurrency
    );

    Ok(process_profiles(config, finder, requests).await)
}

fn load_profiles(file_path: &str) -> Result<Vec<ProfileRequest>> {
    tracing::debug!("Opening input file: {}", file_path);
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open input file '{}'", file_path))?;
    let reader = BufReader::new(file);

    let records: Vec<ProfileRequest> = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse JSON from '{}'. Ensure it's an array of profile objects.",
            file_path
        )
    })?;
    Ok(records)
}

/// Saves the results to `file_path` as pretty-printed JSON.
fn save_results(results: &[FindResult], file_path: &str) -> Result<()> {
    let output_path = Path::new(file_path);
    if let Some(parent_dir) = output_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }

    let file = File::create(file_path)
        .with_context(|| format!("Failed to create/truncate output file '{}'", file_path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, results)
        .with_context(|| format!("Failed to serialize results to JSON for '{}'", file_path))?;
    Ok(())
}

fn print_results(results: &[FindResult]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, results)
        .context("Failed to serialize results to JSON")?;
    writeln!(handle).context("Failed to write to stdout")?;
    Ok(())
}

fn log_summary(results: &[FindResult], duration: Duration) {
    let found = results.iter().filter(|r| r.selection.is_found()).count();
    let timed_out = results.iter().filter(|r| r.timed_out).count();

    tracing::info!("-------------------- Processing Summary --------------------");
    tracing::info!("Profiles Processed          : {}", results.len());
    tracing::info!("  - Likely Emails Found     : {}", found);
    tracing::info!("  - No Email Found          : {}", results.len() - found);
    tracing::info!("  - Hit Verification Deadline: {}", timed_out);
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    tracing::info!("------------------------------------------------------------");
}
