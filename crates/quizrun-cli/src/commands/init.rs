//! The `quizrun init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizrun.toml
    if std::path::Path::new("quizrun.toml").exists() {
        println!("quizrun.toml already exists, skipping.");
    } else {
        std::fs::write("quizrun.toml", SAMPLE_CONFIG)?;
        println!("Created quizrun.toml");
    }

    // Create example quiz
    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizrun validate --quiz-dir quizzes");
    println!("  2. Run: quizrun take --quiz example");
    println!("  3. Run: quizrun history --quiz example");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizrun configuration

quiz_dir = "quizzes"
default_subject = "${USER}"

[store]
type = "json"
path = "quizrun-attempts.json"

[recorder]
max_retries = 2
retry_delay_ms = 200
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = "example"
title = "Example Quiz"
description = "A short quiz to get started"
passing_score = 70
question_duration_secs = 30
variant = "graded"

[[questions]]
id = "q1"
prompt = "Which keyword moves ownership into a closure?"
explanation = "`move` forces captured variables to be taken by value."

[[questions.options]]
id = "a"
text = "move"
correct = true

[[questions.options]]
id = "b"
text = "ref"

[[questions.options]]
id = "c"
text = "static"

[[questions]]
id = "q2"
prompt = "What does the `?` operator do with an `Err` value?"
explanation = "It returns early, converting the error with `From`."

[[questions.options]]
id = "a"
text = "Panics"

[[questions.options]]
id = "b"
text = "Returns it from the enclosing function"
correct = true

[[questions.options]]
id = "c"
text = "Ignores it"

[[questions]]
id = "q3"
prompt = "Which trait lets a type be duplicated with a plain bitwise copy?"
explanation = "`Copy` types are duplicated implicitly on assignment."

[[questions.options]]
id = "a"
text = "Clone"

[[questions.options]]
id = "b"
text = "Copy"
correct = true

[[questions.options]]
id = "c"
text = "Default"

[[questions.options]]
id = "d"
text = "Sized"
"#;
