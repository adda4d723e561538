//! The `quizrun take` command: an interactive timed run on stdin/stdout.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quizrun_core::aggregate::AttemptSummary;
use quizrun_core::clock::IntervalClock;
use quizrun_core::engine::{QuizEngine, QuizRun};
use quizrun_core::sequencer::{Phase, SelectOutcome, TickOutcome};
use quizrun_core::session::{QuestionView, Reveal, SessionView};

type Input = Lines<BufReader<Stdin>>;

enum Event {
    Clock(Option<TickOutcome>),
    Line(Option<String>),
}

enum Command {
    Choose(usize),
    Next,
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        "" | "n" | "next" => Command::Next,
        "q" | "quit" => Command::Quit,
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| Command::Choose(n - 1))
            .unwrap_or(Command::Unknown),
    }
}

pub async fn execute(
    quiz_id: String,
    subject: Option<String>,
    quiz_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    tick_ms: u64,
) -> Result<()> {
    let settings = super::load_settings(config.as_deref(), quiz_dir)?;
    let subject = subject.unwrap_or_else(|| settings.default_subject.clone());
    let catalog = super::load_catalog(&settings)?;
    let engine = super::build_engine(&settings, catalog);

    let previous = engine.history(&quiz_id, &subject).await?;

    let clock = IntervalClock::with_period(Duration::from_millis(tick_ms.max(1)));
    let mut run = engine.open_quiz(&quiz_id, &subject, clock).await?;

    println!("{}", run.quiz().title);
    if !run.quiz().description.is_empty() {
        println!("{}", run.quiz().description);
    }
    println!(
        "{} questions, {}s each, {}% to pass.",
        run.quiz().question_count(),
        run.quiz().question_duration_secs,
        run.quiz().passing_score
    );
    if let Some(best) = previous.best_score() {
        let status = if previous.has_passed { "passed" } else { "not passed yet" };
        println!(
            "Previous attempts: {} (best {best}%, {status})",
            previous.attempt_count()
        );
    }
    println!("Type an option number to answer, Enter for the next question, q to quit.\n");

    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();

    if let SessionView::Presenting(view) = run.view() {
        print_question(&view);
    }

    loop {
        match run.phase() {
            Phase::Complete => break,
            Phase::Presenting => {
                let event = tokio::select! {
                    outcome = run.tick() => Event::Clock(outcome),
                    line = input.next_line() => Event::Line(line.context("failed to read input")?),
                };
                match event {
                    Event::Clock(Some(TickOutcome::Tick {
                        remaining,
                        low_time: true,
                    })) => {
                        println!("  {remaining}s left");
                    }
                    Event::Clock(Some(TickOutcome::Expired(reveal))) => {
                        println!("  Time's up!");
                        print_reveal(&run, &reveal);
                    }
                    Event::Clock(_) => {}
                    Event::Line(None) => return abandon(run),
                    Event::Line(Some(line)) => match parse_command(&line) {
                        Command::Quit => return abandon(run),
                        Command::Choose(index) => choose(&mut run, index)?,
                        Command::Next | Command::Unknown => {
                            let count = current_option_count(&run);
                            println!("  Enter an option number (1-{count}) or q to quit.");
                        }
                    },
                }
            }
            Phase::Revealed => {
                prompt("Enter for next, q to quit: ")?;
                let Some(line) = input.next_line().await.context("failed to read input")? else {
                    return abandon(run);
                };
                match parse_command(&line) {
                    Command::Quit => return abandon(run),
                    Command::Next => {
                        if run.advance()? == Phase::Presenting {
                            if let SessionView::Presenting(view) = run.view() {
                                print_question(&view);
                            }
                        }
                    }
                    Command::Choose(_) | Command::Unknown => {
                        println!("  This question is already answered.");
                    }
                }
            }
        }
    }

    if let Some(summary) = run.summary() {
        print_summary(&summary);
    }
    submit(&engine, &mut run, &mut input).await
}

fn choose(run: &mut QuizRun<IntervalClock>, index: usize) -> Result<()> {
    let Some(question) = run.sequencer().current_question() else {
        return Ok(());
    };
    let Some(option) = question.options.get(index) else {
        println!(
            "  There is no option {}; choose 1-{}.",
            index + 1,
            question.options.len()
        );
        return Ok(());
    };
    let (question_id, option_id) = (question.id.clone(), option.id.clone());

    if let SelectOutcome::Revealed(reveal) = run.select_option(&question_id, &option_id)? {
        print_reveal(run, &reveal);
    }
    Ok(())
}

fn current_option_count(run: &QuizRun<IntervalClock>) -> usize {
    run.sequencer()
        .current_question()
        .map_or(0, |q| q.options.len())
}

fn abandon(run: QuizRun<IntervalClock>) -> Result<()> {
    run.abandon();
    println!("\nRun abandoned; nothing was recorded.");
    Ok(())
}

/// Submit, offering a retry while the store is unavailable.
async fn submit(
    engine: &QuizEngine,
    run: &mut QuizRun<IntervalClock>,
    input: &mut Input,
) -> Result<()> {
    loop {
        match engine.submit(run).await {
            Ok(outcome) => {
                println!("\nAttempt recorded ({}).", outcome.attempt.id);
                if outcome.celebrate {
                    println!("*** Congratulations! ***");
                }
                return Ok(());
            }
            Err(e) if e.is_retryable() => {
                eprintln!("Could not record the attempt: {e}");
                prompt("Retry? [Y/n]: ")?;
                let answer = input.next_line().await.context("failed to read input")?;
                let retry = answer.is_some_and(|a| !a.trim().eq_ignore_ascii_case("n"));
                if !retry {
                    return Err(e).context("attempt was not recorded");
                }
            }
            Err(e) => return Err(e).context("attempt was not recorded"),
        }
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

fn print_question(view: &QuestionView) {
    println!(
        "Question {}/{} ({}s)",
        view.position, view.question_count, view.remaining_secs
    );
    println!("{}", view.prompt);
    for (i, option) in view.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option.text);
    }
}

fn print_reveal(run: &QuizRun<IntervalClock>, reveal: &Reveal) {
    let correct_text = run
        .quiz()
        .question(&reveal.question_id)
        .and_then(|q| q.option(&reveal.correct_option_id))
        .map_or(reveal.correct_option_id.as_str(), |o| o.text.as_str());

    if reveal.score.correct {
        println!(
            "  Correct! +{} points (streak {})",
            reveal.score.reward, reveal.score.streak
        );
    } else if reveal.expired {
        println!("  No answer. The correct answer was: {correct_text}");
    } else {
        println!("  Wrong. The correct answer was: {correct_text}");
    }
    if let Some(explanation) = &reveal.explanation {
        println!("  {explanation}");
    }
}

fn print_summary(summary: &AttemptSummary) {
    println!("\nFinished!");
    println!(
        "Score: {}% ({}/{} correct)",
        summary.score_percent, summary.correct_count, summary.question_count
    );
    println!(
        "Points: {} (best streak {})",
        summary.reward_total, summary.best_streak
    );
    println!(
        "Result: {}",
        if summary.passed { "passed" } else { "not passed" }
    );
}
