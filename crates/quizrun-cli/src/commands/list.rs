//! The `quizrun list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use quizrun_core::traits::QuizSource;

pub async fn execute(quiz_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let settings = super::load_settings(config.as_deref(), quiz_dir)?;
    let catalog = super::load_catalog(&settings)?;
    let listing = catalog.list_quizzes().await?;

    if listing.is_empty() {
        println!("No quizzes found in {}", settings.quiz_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Title", "Questions"]);
    for entry in &listing {
        table.add_row(vec![
            entry.id.clone(),
            entry.title.clone(),
            entry.question_count.to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}
