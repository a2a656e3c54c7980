//! Line-based terminal front end for one lesson.

use std::io::{self, BufRead, Write};

use lesson_core::model::{LessonId, UserId};
use lesson_core::{MatchEvent, MatchingPairs};
use services::audio::AudioError;
use services::{
    AppServices, AudioPlayer, Interaction, LessonLoopService, LessonRun, SessionError, Sound, Step,
};

/// Prints sounds instead of playing them.
pub struct TerminalPlayer;

impl AudioPlayer for TerminalPlayer {
    fn play(&self, sound: &Sound) -> Result<(), AudioError> {
        let asset = match sound {
            Sound::Cue(cue) => cue.asset().to_owned(),
            Sound::Media(media) => media.as_str().to_owned(),
        };
        eprintln!("  [sound] {asset}");
        Ok(())
    }
}

enum Input {
    Quit,
    Check,
    Refill,
    Listen,
    Number(usize),
    Add(usize),
    Remove(usize),
    Text(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" | "check" => return Input::Check,
        "q" | "quit" => return Input::Quit,
        "refill" => return Input::Refill,
        "listen" => return Input::Listen,
        _ => {}
    }
    let index = |raw: &str| raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
    if let Some(n) = line.strip_prefix('+').and_then(index) {
        Input::Add(n)
    } else if let Some(n) = line.strip_prefix('-').and_then(index) {
        Input::Remove(n)
    } else if let Some(n) = index(line) {
        Input::Number(n)
    } else {
        Input::Text(line.to_owned())
    }
}

fn read_line(lines: &mut impl Iterator<Item = io::Result<String>>) -> io::Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    lines.next().transpose()
}

fn render(run: &LessonRun) {
    let session = run.session();
    let progress = session.progress();
    let Some(challenge) = session.current_challenge() else {
        return;
    };
    println!();
    println!(
        "[{}/{}] {:.0}%  hearts: {}",
        progress.index + 1,
        progress.total,
        progress.percentage,
        progress.hearts
    );
    println!("{}", challenge.kind.title());
    println!("  {}", challenge.question);
    if challenge.audio_ref.is_some() {
        println!("  (type `listen` to hear the prompt)");
    }

    match session.interaction() {
        Interaction::Choice => {
            for (n, option) in challenge.options.iter().enumerate() {
                println!("  {}. {}", n + 1, option.text);
            }
        }
        Interaction::WordBank(builder) => {
            println!("  sentence: {}", builder.candidate());
            let words: Vec<String> = builder
                .available()
                .iter()
                .enumerate()
                .map(|(n, word)| format!("+{} {word}", n + 1))
                .collect();
            println!("  words: {}", words.join("  "));
            println!("  (+N adds a word, -N removes the Nth word of the sentence)");
        }
        Interaction::FreeText => println!("  (type your answer)"),
        Interaction::Pairs(board) => render_board(board),
    }
    if let Some(answer) = session.selected() {
        println!("  answer: {answer:?}");
    }
}

fn render_board(board: &MatchingPairs) {
    for (n, item) in board.items().iter().enumerate() {
        let mark = if board.is_matched(item.id) {
            " ✓"
        } else if board.pending() == Some(item.id) {
            " *"
        } else {
            ""
        };
        println!("  {}. {}{mark}", n + 1, item.text);
    }
}

fn handle_input(
    svc: &LessonLoopService,
    run: &mut LessonRun,
    input: Input,
) -> Result<bool, SessionError> {
    let checked = match input {
        Input::Check => {
            let feedback = svc.check(run)?;
            if feedback.correct {
                println!("Correct!");
            } else {
                println!("Wrong. Hearts left: {}", feedback.hearts);
            }
            true
        }
        Input::Number(n) => {
            match run.session().interaction() {
                Interaction::Choice => {
                    let option = run
                        .session()
                        .current_challenge()
                        .and_then(|c| c.options.get(n))
                        .map(|o| o.id);
                    match option {
                        Some(id) => {
                            svc.pick_option(run, id)?;
                        }
                        None => println!("no option {}", n + 1),
                    }
                }
                Interaction::Pairs(board) => match board.items().get(n).map(|item| item.id) {
                    Some(id) => {
                        let selection = svc.tap_pair(run, id)?;
                        if let MatchEvent::Mismatch { .. } = selection.event {
                            println!("Not a pair.");
                        }
                    }
                    None => println!("no tile {}", n + 1),
                },
                _ => {
                    run.session_mut().type_text(&(n + 1).to_string())?;
                }
            }
            false
        }
        Input::Add(n) => {
            run.session_mut().add_word(n)?;
            false
        }
        Input::Remove(n) => {
            run.session_mut().remove_word(n)?;
            false
        }
        Input::Text(text) => {
            run.session_mut().type_text(&text)?;
            false
        }
        Input::Quit | Input::Refill | Input::Listen => false,
    };
    Ok(checked)
}

/// Play `lesson_id` for `user_id` on stdin/stdout.
///
/// # Errors
///
/// Returns load, storage and terminal I/O failures.
pub async fn run_lesson(
    services: &AppServices,
    user_id: UserId,
    lesson_id: LessonId,
) -> Result<(), Box<dyn std::error::Error>> {
    let svc = services.lesson_loop();
    let mut run = svc.start(user_id, lesson_id).await?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        svc.tick(&mut run);
        render(&run);
        let Some(line) = read_line(&mut lines)? else {
            return Ok(());
        };

        let input = parse_input(&line);
        match input {
            Input::Quit => return Ok(()),
            Input::Refill => {
                let hearts = svc.refill_hearts(&mut run).await?;
                println!("Hearts refilled: {hearts}");
                continue;
            }
            Input::Listen => {
                if !svc.play_prompt(&run) {
                    println!("This challenge has no audio.");
                }
                continue;
            }
            _ => {}
        }

        match handle_input(&svc, &mut run, input) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(SessionError::OutOfHearts) => {
                println!("You ran out of hearts. Type `refill` to continue.");
                continue;
            }
            Err(err) => {
                println!("{err}");
                continue;
            }
        }

        println!("(press Enter to continue)");
        if read_line(&mut lines)?.is_none() {
            return Ok(());
        }
        match svc.advance(&mut run).await? {
            Step::Next(_) | Step::Retry => {}
            Step::Completed { completion, report } => {
                println!();
                println!(
                    "Lesson complete! +{} points, {} hearts used.",
                    completion.points_earned, completion.hearts_used
                );
                match report {
                    Ok(receipt) => {
                        if let Some(profile) = receipt.profile {
                            println!(
                                "Total points: {}  streak: {} day(s)",
                                profile.points, profile.streak.count
                            );
                        }
                    }
                    Err(err) => {
                        println!("Could not save progress: {err}");
                        let receipt = svc.retry_report(&mut run).await;
                        if let Err(err) = receipt {
                            println!("Retry failed: {err}");
                        }
                    }
                }
                return Ok(());
            }
        }
    }
}
