use std::fmt;
use std::sync::Arc;

use lesson_core::model::{LessonId, UserId};
use services::{AppServices, Clock, RemoteConfig, SessionConfig};
use storage::repository::ProfileRepository;
use tracing_subscriber::EnvFilter;

mod play;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    RemoteNotConfigured,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::RemoteNotConfigured => {
                write!(f, "--remote needs QUIZ_API_URL to be set")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(flag: &'static str, raw: String) -> Result<u64, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play   [--db <sqlite_url>] [--user-id <id>] [--lesson-id <id>] [--remote]");
    eprintln!("  cargo run -p app -- refill [--db <sqlite_url>] [--user-id <id>] [--remote]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://dev.sqlite3");
    eprintln!("  --user-id 1");
    eprintln!("  --lesson-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_LESSON_ID");
    eprintln!("  QUIZ_API_URL, QUIZ_API_TOKEN");
    eprintln!("  QUIZ_POINTS_PER_LESSON, QUIZ_HEARTS_AT_ZERO, QUIZ_MISMATCH_WINDOW_MS");
    eprintln!("  RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Refill,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "refill" => Some(Self::Refill),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    user_id: UserId,
    lesson_id: LessonId,
    remote: bool,
}

fn env_id(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = UserId::new(env_id("QUIZ_USER_ID").unwrap_or(1));
        let mut lesson_id = LessonId::new(env_id("QUIZ_LESSON_ID").unwrap_or(1));
        let mut remote = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    user_id = UserId::new(parse_id("--user-id", value)?);
                }
                "--lesson-id" => {
                    let value = require_value(args, "--lesson-id")?;
                    lesson_id = LessonId::new(parse_id("--lesson-id", value)?);
                }
                "--remote" => remote = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            lesson_id,
            remote,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw.starts_with("sqlite://") || raw.starts_with("sqlite::memory:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_services(parsed: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::default();
    let config = SessionConfig::from_env();

    let services = if parsed.remote {
        let remote = RemoteConfig::from_env().ok_or(ArgsError::RemoteNotConfigured)?;
        AppServices::new_remote(remote, clock, config)?
    } else {
        prepare_sqlite_file(&parsed.db_url)?;
        AppServices::new_sqlite(&parsed.db_url, clock, config).await?
    };
    tracing::debug!(remote = parsed.remote, db = %parsed.db_url, "services ready");
    Ok(services.with_audio(Arc::new(play::TerminalPlayer)))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = build_services(&parsed).await?;

    match cmd {
        Command::Play => play::run_lesson(&services, parsed.user_id, parsed.lesson_id).await,
        Command::Refill => {
            let profile = services.profiles().refill_hearts(parsed.user_id).await?;
            println!("hearts: {}", profile.hearts);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&["--db", "sqlite::memory:", "--user-id", "7", "--lesson-id", "3", "--remote"])
            .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.user_id, UserId::new(7));
        assert_eq!(args.lesson_id, LessonId::new(3));
        assert!(args.remote);
    }

    #[test]
    fn bad_ids_and_missing_values_are_rejected() {
        assert!(matches!(
            parse(&["--lesson-id", "abc"]),
            Err(ArgsError::InvalidId { flag: "--lesson-id", .. })
        ));
        assert!(matches!(
            parse(&["--user-id"]),
            Err(ArgsError::MissingValue { flag: "--user-id" })
        ));
        assert!(matches!(parse(&["--course"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/quiz.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.sqlite3"));
    }
}
