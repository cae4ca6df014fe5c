//! Grader for the `foo` assignment.
//!
//! Usage: `grade-foo grade submissions/flc37/foo.rs --stdout`

use std::sync::Arc;

use gradeforge_core::{args, Check, TestFunction, Tester, Value};
use gradeforge_runner::setup::normalize_source;

mod foo;
mod submissions;

fn tester() -> Tester {
    let mut tester = Tester::new(foo::master())
        .points(1865)
        .note("An example grading program.");

    tester.setup(false, normalize_source);

    tester
        .register(
            TestFunction::new("test_add_one", |t| {
                t.check(Check::expr("add_one(1)"), |cx| cx.call("add_one", args![1]));

                let big = 100;
                t.check(Check::expr("add_one(big)"), |cx| cx.call("add_one", args![big]));

                let quip = "takes one to know";
                t.check(Check::expr("add_one({quip})").bind("quip", quip), |cx| {
                    cx.call("add_one", args![quip])
                });

                t.check(Check::expr("add_one(101)").note("This is not an edge case."), |cx| {
                    cx.call("add_one", args![101])
                });
                Ok(())
            })
            .doc("Checks add_one on small, large and string arguments.")
            .tests(["add_one"]),
        )
        .register(
            TestFunction::new("test_divide", |t| {
                t.check(Check::expr("divide(1, divide(1, 2))"), |cx| {
                    let half = cx.call("divide", args![1, 2])?;
                    cx.call("divide", vec![Value::from(1), half])
                });

                // Outside a check: a fault here ends the test function.
                let zero = t.call("divide", args![1, 0])?;
                t.check(
                    Check::expr("divide(1, 0)").note("Dividing by zero hands back the numerator."),
                    |_| Ok(zero),
                );
                Ok(())
            })
            .tests(["divide"]),
        )
        .register(
            TestFunction::new("test_foo", |t| {
                let mut foo = t.call("Foo", args!["2"])?;
                t.check(Check::expr("foo.arg"), |_| Ok(arg_of(&foo)));

                t.call_method(&mut foo, "bar", vec![])?;
                t.check(Check::expr("foo.arg").note("after calling foo.bar()"), |_| Ok(arg_of(&foo)));

                t.check(Check::expr("foo.bar()"), |cx| cx.call_method(&mut foo, "bar", vec![]));
                t.check(Check::expr("foo.arg").note("after calling foo.bar() twice"), |_| {
                    Ok(arg_of(&foo))
                });
                Ok(())
            })
            .tests(["Foo.bar"]),
        )
        .register(
            TestFunction::new("test_add_two", |t| {
                t.check(Check::expr("add_two(1)"), |cx| cx.call("add_two", args![1]));
                t.check(Check::expr("add_two(99)"), |cx| cx.call("add_two", args![99]));
                Ok(())
            })
            .doc("Relies on add_one; mistakes there are carried forward.")
            .tests(["add_two"])
            .depends(["add_one"]),
        )
        .register(
            TestFunction::new("test_cook_stdin", |t| {
                t.check(Check::expr("cook_stdin()").stdin("pig"), |cx| cx.call("cook_stdin", vec![]));
                Ok(())
            })
            .tests(["cook_stdin"]),
        )
        .register(TestFunction::manual("test_coverage", |m| {
            let missing: Vec<String> = m
                .master
                .implementation()
                .symbol_names()
                .filter(|name| !m.student.implementation().contains(name))
                .map(str::to_string)
                .collect();
            if missing.is_empty() {
                m.log("Every symbol in the assignment is defined.");
            } else {
                m.log(format!("Not defined: {}", missing.join(", ")));
            }
            Ok(())
        }));

    tester
}

fn arg_of(foo: &Value) -> Value {
    foo.field("arg").cloned().unwrap_or(Value::None)
}

fn main() {
    gradeforge_cli::run(tester(), Arc::new(submissions::loader()));
}
