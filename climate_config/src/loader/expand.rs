//! Shell-style expansion of `$VAR`, `${VAR}` and a leading `~`.

use std::iter::Peekable;
use std::str::Chars;

/// Replace `$NAME` and `${NAME}` with the value of the environment variable.
///
/// References to unset variables are left untouched.
pub(crate) fn expand_vars(input: &str) -> String {
    expand_vars_with(input, |name| std::env::var(name).ok())
}

/// [`expand_vars`] with an explicit variable lookup.
pub(crate) fn expand_vars_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            expand_braced(&mut chars, &mut out, &lookup);
        } else {
            expand_bare(&mut chars, &mut out, &lookup);
        }
    }
    out
}

fn expand_braced<F>(chars: &mut Peekable<Chars<'_>>, out: &mut String, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut name = String::new();
    let mut closed = false;
    for ch in chars.by_ref() {
        if ch == '}' {
            closed = true;
            break;
        }
        name.push(ch);
    }
    match lookup(&name).filter(|_| closed) {
        Some(value) => out.push_str(&value),
        None => {
            out.push_str("${");
            out.push_str(&name);
            if closed {
                out.push('}');
            }
        }
    }
}

fn expand_bare<F>(chars: &mut Peekable<Chars<'_>>, out: &mut String, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut name = String::new();
    while let Some(&ch) = chars.peek() {
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            break;
        }
        name.push(ch);
        chars.next();
    }
    out.push_str(&lookup_or_literal(&name, lookup));
}

fn lookup_or_literal<F>(name: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if name.is_empty() {
        return "$".to_owned();
    }
    lookup(name).unwrap_or_else(|| format!("${name}"))
}

/// Replace a leading `~` (alone or followed by `/`) with the home directory.
pub(crate) fn expand_user(input: &str) -> String {
    let Some(rest) = input.strip_prefix('~') else {
        return input.to_owned();
    };
    if !(rest.is_empty() || rest.starts_with('/')) {
        return input.to_owned();
    }
    dirs::home_dir()
        .and_then(|home| home.to_str().map(|prefix| format!("{prefix}{rest}")))
        .unwrap_or_else(|| input.to_owned())
}
