//! The `quizrun history` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

pub async fn execute(
    quiz_id: String,
    subject: Option<String>,
    json: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let settings = super::load_settings(config.as_deref(), None)?;
    let subject = subject.unwrap_or_else(|| settings.default_subject.clone());
    let catalog = super::load_catalog(&settings)?;
    let title = catalog.get(&quiz_id).map(|q| q.title.clone());
    let engine = super::build_engine(&settings, catalog);

    let history = engine.history(&quiz_id, &subject).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    let name = title.unwrap_or_else(|| quiz_id.clone());
    if history.attempts.is_empty() {
        println!("No attempts recorded for {name} by {subject}.");
        return Ok(());
    }

    println!("{name} ({subject})\n");

    let mut table = Table::new();
    table.set_header(vec!["#", "Submitted", "Score", "Correct", "Result"]);
    let count = history.attempt_count();
    for (i, attempt) in history.attempts.iter().enumerate() {
        table.add_row(vec![
            Cell::new(count - i),
            Cell::new(attempt.submitted_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{}%", attempt.score_percent)),
            Cell::new(format!(
                "{}/{}",
                attempt.correct_count, attempt.question_count
            )),
            Cell::new(if attempt.passed { "passed" } else { "failed" }),
        ]);
    }
    println!("{table}");

    if let Some(best) = &history.best {
        println!(
            "\nBest score: {}% ({})",
            best.score_percent,
            best.submitted_at.format("%Y-%m-%d")
        );
    }
    if let Some(avg) = history.average_score {
        println!("Average score: {avg:.1}%");
    }
    match history.first_pass_attempt {
        Some(n) => println!("Passed: yes (first on attempt {n})"),
        None => println!("Passed: not yet"),
    }

    Ok(())
}
