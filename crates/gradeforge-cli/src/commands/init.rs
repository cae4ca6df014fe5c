//! The `init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradeforge.toml").exists() {
        println!("gradeforge.toml already exists, skipping.");
    } else {
        std::fs::write("gradeforge.toml", SAMPLE_CONFIG)?;
        println!("Created gradeforge.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit gradeforge.toml to taste");
    println!("  2. Run: <grader> list");
    println!("  3. Run: <grader> grade submissions/*/foo.rs");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradeforge configuration

# One feedback file per submission lands here.
report_dir = "./feedback"

# Wall-clock limit for grading one submission.
timeout_secs = 30

# Submissions graded at once.
parallelism = 1

# Mention correct results too: "nothing", "values", "output" or "both".
# Leave unset to keep the grading program's own choice.
# log_correct = "nothing"

# Print feedback instead of writing report files.
stdout_reports = false
"#;
