use std::fmt;

use lesson_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, LearnerProfile, Lesson, LessonId,
    OptionId, UserId,
};
use storage::repository::{LessonRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    lesson_id: LessonId,
    user_id: UserId,
    subscribed: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLessonId { raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson-id value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://dev.sqlite3?mode=rwc".into());
        let mut lesson_id = std::env::var("QUIZ_LESSON_ID")
            .ok()
            .and_then(|value| value.parse::<LessonId>().ok())
            .unwrap_or(LessonId::new(1));
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or(UserId::new(1));
        let mut subscribed = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--lesson-id" => {
                    let value = require_value(&mut args, "--lesson-id")?;
                    lesson_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--subscribed" => subscribed = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            lesson_id,
            user_id,
            subscribed,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://dev.sqlite3?mode=rwc)");
    eprintln!("  --lesson-id <id>          Lesson id to upsert (default: 1)");
    eprintln!("  --user-id <id>            Learner to create or reset (default: 1)");
    eprintln!("  --subscribed              Give the learner unlimited hearts");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_LESSON_ID, QUIZ_USER_ID");
}

/// Greetings lesson covering each input mode once.
fn demo_lesson(lesson_id: LessonId) -> Lesson {
    // Ids are namespaced by lesson so several seeded lessons can coexist.
    let base = lesson_id.value() * 100;
    let challenge = |n: u64| ChallengeId::new(base + n);
    let option = |n: u64| OptionId::new(base * 10 + n);

    let challenges = vec![
        Challenge::new(challenge(1), ChallengeKind::Select, "Which one means \"Hello\"?")
            .with_options(vec![
                ChallengeOption::new(option(1), "Dumêla", true),
                ChallengeOption::new(option(2), "Tsamaya sentle", false),
                ChallengeOption::new(option(3), "Ke a leboga", false),
            ]),
        Challenge::new(challenge(2), ChallengeKind::Match, "Match the formal greetings")
            .with_options(vec![
                ChallengeOption::new(option(4), "Man", true).with_image("rra"),
                ChallengeOption::new(option(5), "Woman", true).with_image("mma"),
                ChallengeOption::new(option(6), "Hello (Formal)", true).with_image("Dumêla"),
                ChallengeOption::new(option(7), "How are you?", true)
                    .with_image("o tsogile jang?"),
            ]),
        Challenge::new(challenge(3), ChallengeKind::Translate, "Translate: 'Hello sir'")
            .with_correct_text("Dumêla rra")
            .with_options(vec![
                ChallengeOption::new(option(8), "Dumêla", true),
                ChallengeOption::new(option(9), "rra", true),
                ChallengeOption::new(option(10), "mma", false),
            ]),
        Challenge::new(challenge(4), ChallengeKind::Assist, "How do you say 'I am happy'?")
            .with_options(vec![
                ChallengeOption::new(option(11), "Ke itumetse", true),
                ChallengeOption::new(option(12), "Ke hutsafetse", false),
            ]),
        Challenge::new(challenge(5), ChallengeKind::ListenType, "Listen and type: 'I am tired'")
            .with_audio("/audio/ke_lapile.mp3")
            .with_correct_text("Ke lapile"),
    ];

    Lesson::new(lesson_id, "Greetings", challenges)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let lesson = demo_lesson(args.lesson_id);
    lesson.validate()?;
    storage
        .lessons
        .upsert_lesson(&LessonRecord::from_lesson(&lesson))
        .await?;

    let mut profile = LearnerProfile::new(args.user_id);
    profile.subscription_active = args.subscribed;
    storage.profiles.upsert_profile(&profile).await?;

    println!(
        "Seeded lesson {} ({} challenges) and learner {} into {}",
        args.lesson_id,
        lesson.challenges.len(),
        args.user_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
