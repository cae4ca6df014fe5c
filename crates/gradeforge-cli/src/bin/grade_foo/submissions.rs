//! Student submissions known to this grader, keyed by submission directory.

use gradeforge_core::{CallContext, Fault, Implementation, Value};
use gradeforge_runner::loader::RegistryLoader;

use crate::foo;

pub fn loader() -> RegistryLoader {
    RegistryLoader::new()
        .register("ab12", foo::master)
        .register("flc37", flc37)
        .register("zz99", zz99)
}

/// Mostly right, with a few classic slips: `add_one` misbehaves from 100 up,
/// `divide` floors integers, `Foo.bar` doubles and `cook_stdin` forgets to
/// return its dish.
fn flc37() -> Implementation {
    foo::master()
        .with_origin("flc37/foo.rs")
        .function("add_one", |_, args| match foo::one_arg("add_one", args)? {
            Value::Int(x) if x >= 100 => Ok(Value::from("!?!?!")),
            Value::Int(x) => Ok(Value::Int(x + 1)),
            Value::Str(s) => Ok(Value::Str(format!("{s} two"))),
            other => Err(Fault::type_error(format!(
                "add_one() does not accept a {}",
                other.type_name()
            ))),
        })
        .function("divide", floor_divide)
        .method("Foo", "bar", |_, receiver, _| {
            let doubled = foo::repeat(receiver.field("arg"), 2)?;
            receiver.set_field("arg", doubled);
            Ok(Value::None)
        })
        .function("cook_stdin", |cx, _| {
            let meat = cx.input("What should I cook? ")?;
            cx.print(format!("Cooking {meat}..."));
            Ok(Value::None)
        })
}

fn floor_divide(_: &CallContext<'_>, args: Vec<Value>) -> Result<Value, Fault> {
    let (x, y) = foo::two_args("divide", args)?;
    match (&x, &y) {
        (Value::Int(_), Value::Int(0)) => Err(Fault::new(
            "ZeroDivisionError",
            "integer division or modulo by zero",
        )),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.div_euclid(*b))),
        _ => Ok(Value::Float(foo::number(&x)? / foo::number(&y)?)),
    }
}

/// Only got as far as `add_one`.
fn zz99() -> Implementation {
    Implementation::new("zz99/foo.rs").function("add_one", foo::add_one)
}
