//! Prompt templates as plain parameterized strings.
//!
//! A template is a fixed string with `{name}` placeholders. Filling is pure
//! substitution over a name-to-value mapping; there are no conditionals or
//! loops, so no templating engine is involved.

/// Fill `{name}` placeholders in `template` with the given values.
///
/// Placeholders with no matching value are left untouched, and values are
/// inserted literally (a value containing `{other}` is not re-expanded).
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        match after.find('}') {
            Some(close) => {
                let name = &after[1..close];
                match values.iter().find(|(k, _)| *k == name) {
                    Some((_, v)) => out.push_str(v),
                    None => out.push_str(&after[..=close]),
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(after);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_named_placeholders() {
        let filled = fill(
            "history:\n{chat_history}\n\nuser: {input}",
            &[("chat_history", "user: hi"), ("input", "bye")],
        );
        assert_eq!(filled, "history:\nuser: hi\n\nuser: bye");
    }

    #[test]
    fn unknown_placeholder_is_preserved() {
        assert_eq!(fill("a {missing} b", &[("x", "y")]), "a {missing} b");
    }

    #[test]
    fn value_is_not_re_expanded() {
        let filled = fill("{a}", &[("a", "{b}"), ("b", "nope")]);
        assert_eq!(filled, "{b}");
    }

    #[test]
    fn repeated_placeholder_fills_every_occurrence() {
        assert_eq!(fill("{m} and {m}", &[("m", "x")]), "x and x");
    }

    #[test]
    fn unterminated_brace_passes_through() {
        assert_eq!(fill("left {open", &[("open", "x")]), "left {open");
    }
}
