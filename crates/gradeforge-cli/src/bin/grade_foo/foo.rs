//! The master solution for the `foo` assignment.

use gradeforge_core::{CallContext, Fault, Implementation, Value};

pub fn master() -> Implementation {
    Implementation::new("master/foo.rs")
        .function("add_one", add_one)
        .function("add_two", add_two)
        .function("divide", divide)
        .function("cook_stdin", cook_stdin)
        .function("Foo", new_foo)
        .method("Foo", "bar", bar)
}

/// `x + 1` for numbers; strings get `" one"` appended.
pub fn add_one(_: &CallContext<'_>, args: Vec<Value>) -> Result<Value, Fault> {
    match one_arg("add_one", args)? {
        Value::Int(x) => Ok(Value::Int(x + 1)),
        Value::Float(x) => Ok(Value::Float(x + 1.0)),
        Value::Str(s) => Ok(Value::Str(format!("{s} one"))),
        other => Err(Fault::type_error(format!(
            "add_one() does not accept a {}",
            other.type_name()
        ))),
    }
}

/// Built on `add_one`, so a broken helper breaks this too.
pub fn add_two(cx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, Fault> {
    let x = one_arg("add_two", args)?;
    let once = cx.call("add_one", vec![x])?;
    cx.call("add_one", vec![once])
}

/// True division; dividing by zero hands back the numerator.
pub fn divide(_: &CallContext<'_>, args: Vec<Value>) -> Result<Value, Fault> {
    let (x, y) = two_args("divide", args)?;
    let divisor = number(&y)?;
    if divisor == 0.0 {
        return Ok(x);
    }
    Ok(Value::Float(number(&x)? / divisor))
}

pub fn cook_stdin(cx: &CallContext<'_>, _: Vec<Value>) -> Result<Value, Fault> {
    let meat = cx.input("What should I cook? ")?;
    let dish = if meat == "pig" { "bacon" } else { "mystery stew" };
    cx.print(format!("Cooking {dish}..."));
    Ok(Value::from(dish))
}

pub fn new_foo(_: &CallContext<'_>, args: Vec<Value>) -> Result<Value, Fault> {
    let arg = one_arg("Foo", args)?;
    Ok(Value::object("Foo", vec![("arg".to_string(), arg)]))
}

/// Triples `arg` in place.
pub fn bar(_: &CallContext<'_>, foo: &mut Value, _: Vec<Value>) -> Result<Value, Fault> {
    let tripled = repeat(foo.field("arg"), 3)?;
    foo.set_field("arg", tripled);
    Ok(Value::None)
}

pub fn one_arg(name: &str, args: Vec<Value>) -> Result<Value, Fault> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(x), None) => Ok(x),
        _ => Err(Fault::type_error(format!("{name}() takes exactly 1 argument"))),
    }
}

pub fn two_args(name: &str, args: Vec<Value>) -> Result<(Value, Value), Fault> {
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(x), Some(y), None) => Ok((x, y)),
        _ => Err(Fault::type_error(format!("{name}() takes exactly 2 arguments"))),
    }
}

pub fn number(value: &Value) -> Result<f64, Fault> {
    value.as_float().ok_or_else(|| {
        Fault::type_error(format!(
            "unsupported operand type: '{}'",
            value.type_name()
        ))
    })
}

/// `value * times`, for numbers and strings.
pub fn repeat(value: Option<&Value>, times: i64) -> Result<Value, Fault> {
    match value {
        Some(Value::Int(x)) => Ok(Value::Int(x * times)),
        Some(Value::Float(x)) => Ok(Value::Float(x * times as f64)),
        Some(Value::Str(s)) => Ok(Value::Str(s.repeat(times.max(0) as usize))),
        Some(other) => Err(Fault::type_error(format!(
            "can't multiply a {} by an int",
            other.type_name()
        ))),
        None => Err(Fault::new("AttributeError", "'Foo' object has no attribute 'arg'")),
    }
}
