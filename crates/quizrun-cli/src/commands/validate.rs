//! The `quizrun validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizrun_core::parser;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let quizzes = if quiz_path.is_dir() {
        parser::load_quiz_directory(&quiz_path)?
    } else {
        vec![parser::parse_quiz(&quiz_path)?]
    };

    let mut total_warnings = 0;
    let mut invalid = 0;

    for quiz in &quizzes {
        println!(
            "Quiz: {} [{}] ({} questions, pass at {}%, {}s per question, {})",
            quiz.title,
            quiz.id,
            quiz.question_count(),
            quiz.passing_score,
            quiz.question_duration_secs,
            quiz.variant,
        );

        if let Err(e) = quiz.validate() {
            println!("  ERROR: {e}");
            invalid += 1;
        }

        let warnings = parser::validate_quiz(quiz);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} quiz(zes) cannot be run");
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
