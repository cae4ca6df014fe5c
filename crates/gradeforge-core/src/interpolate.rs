//! Expression templates for feedback.
//!
//! `{name}` inserts the `repr()` of a bound value, so strings keep their
//! quotes. `{name:q}` inserts strings bare. `{{` and `}}` are literal braces.

use crate::value::Value;

/// Render `template` with the given bindings.
///
/// Unbound placeholders are left untouched.
pub fn render(template: &str, bindings: &[(String, Value)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            rest = "";
            break;
        };
        let field = &tail[1..end];
        let (name, spec) = match field.split_once(':') {
            Some((name, spec)) => (name.trim(), spec.trim()),
            None => (field.trim(), ""),
        };

        match bindings.iter().find(|(bound, _)| bound == name) {
            Some((_, value)) => out.push_str(&format_field(value, spec)),
            None => {
                tracing::warn!(placeholder = name, template, "unbound placeholder in check expression");
                out.push_str(&tail[..=end]);
            }
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}

fn format_field(value: &Value, spec: &str) -> String {
    match (spec, value) {
        ("q", Value::Str(s)) => s.clone(),
        _ => value.repr(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(name: &str, value: impl Into<Value>) -> (String, Value) {
        (name.to_string(), value.into())
    }

    #[test]
    fn strings_keep_quotes() {
        let out = render("add_one({quip})", &[bind("quip", "takes one to know")]);
        assert_eq!(out, "add_one('takes one to know')");
    }

    #[test]
    fn q_spec_drops_quotes() {
        let out = render("string: {foo:q}", &[bind("foo", "bar")]);
        assert_eq!(out, "string: bar");
    }

    #[test]
    fn non_strings_render_naturally() {
        let out = render("divide({x}, {y})", &[bind("x", 1), bind("y", 0.5)]);
        assert_eq!(out, "divide(1, 0.5)");
    }

    #[test]
    fn braces_escape_and_unbound_stay() {
        let out = render("{{literal}} {missing} {n}", &[bind("n", 3)]);
        assert_eq!(out, "{literal} {missing} 3");
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        assert_eq!(render("f({x", &[bind("x", 1)]), "f({x");
    }
}
