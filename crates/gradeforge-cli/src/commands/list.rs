//! The `list` command.

use anyhow::Result;

use gradeforge_core::tester::Tester;

pub fn execute(tester: &Tester) -> Result<()> {
    let tests = tester.test_functions();
    if tests.is_empty() {
        println!("No test functions registered.");
        return Ok(());
    }

    println!("{} test function(s):", tests.len());
    for test in tests {
        let mut line = format!("  {}", test.name());
        if test.is_manual() {
            line.push_str(" (manual)");
        }
        if !test.fixed_names().is_empty() {
            let names: Vec<&str> = test.fixed_names().iter().map(String::as_str).collect();
            line.push_str(&format!(" tests: {}", names.join(", ")));
        }
        if !test.dependencies().is_empty() {
            let names: Vec<&str> = test.dependencies().iter().map(String::as_str).collect();
            line.push_str(&format!(" depends: {}", names.join(", ")));
        }
        println!("{line}");
    }
    Ok(())
}
