use anyhow::Result;
use argh::FromArgs;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod gitlab;
mod model;
mod reminders;
mod sync;
mod template;

use config::Config;
use gitlab::GitLab;
use reminders::AppleScript;

/// Mirror GitLab issues assigned to you into Apple Reminders.
///
/// The token may be left out of the config file and given as GITLAB_TOKEN
/// (also read from a .env file).
#[derive(FromArgs)]
struct Args {
    /// path to the JSON configuration file
    #[argh(option, short = 'c', default = "String::from(\"config.json\")")]
    config: String,
}

/// Go-style `-config` is accepted as an alias of `--config`.
fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut normalized = Vec::new();
    for arg in args {
        match arg.strip_prefix("-config") {
            Some("") => normalized.push(String::from("--config")),
            Some(rest) if rest.starts_with('=') => {
                normalized.push(String::from("--config"));
                normalized.push(rest[1..].to_string());
            }
            _ => normalized.push(arg),
        }
    }
    normalized
}

fn parse_from<I>(args: I) -> Result<Args, argh::EarlyExit>
where
    I: IntoIterator<Item = String>,
{
    let args = normalize_args(args);
    let cmd = args
        .first()
        .and_then(|arg| std::path::Path::new(arg).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or(env!("CARGO_PKG_NAME"));
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    Args::from_args(&[cmd], &rest)
}

fn parse_args() -> Args {
    parse_from(std::env::args()).unwrap_or_else(|early_exit| {
        match early_exit.status {
            Ok(()) => {
                println!("{}", early_exit.output);
                std::process::exit(0);
            }
            Err(()) => {
                eprintln!("{}", early_exit.output);
                std::process::exit(1);
            }
        }
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> Result<()> {
    let args = parse_args();
    dotenv::dotenv().ok();
    init_logging();

    let config = Config::load(&args.config)?;

    info!("Starting GitLab to Apple Reminders integration");
    info!("Monitoring issues assigned to: {}", config.gitlab_username);
    info!("Creating reminders in list: {}", config.reminder_list);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let gitlab = GitLab::new();
    let reminders = AppleScript::new()?;
    runtime.block_on(sync::run_forever(&config, &gitlab, &reminders));

    Ok(())
}

fn main() {
    if let Err(ref e) = run() {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
