//! Query parsing.
//!
//! Turns the user's arguments into an ordered list of [`SearchTerm`]s.
//! Parsing never fails: anything malformed collapses to a single empty
//! term, which matches nothing and therefore yields no results.
//!
//! | Token        | Kind     |
//! |--------------|----------|
//! | `"a b"`      | Quoted   |
//! | `/fn\s+\w+/` | Regex    |
//! | `foo~1`      | Fuzzy1   |
//! | `foo~2`      | Fuzzy2   |
//! | `foo`        | Default  |
//!
//! `AND` and `OR` are accepted and ignored. `NOT` negates the next term.

use crate::types::{SearchTerm, TermKind};

const NOT: &str = "NOT";

/// Parses an argument list into search terms.
///
/// With `fuzzy_default`, plain terms become [`TermKind::Fuzzy1`].
#[must_use]
pub fn parse_arguments<S: AsRef<str>>(args: &[S], fuzzy_default: bool) -> Vec<SearchTerm> {
    let mut terms = Vec::with_capacity(args.len());
    let mut negate_next = false;

    for arg in args {
        let token = arg.as_ref();

        match token {
            "AND" | "OR" => continue,
            NOT => {
                negate_next = true;
                continue;
            }
            _ => {}
        }

        let Some(mut term) = parse_token(token, fuzzy_default) else {
            tracing::debug!("malformed query token {token:?}, query matches nothing");
            return vec![SearchTerm::empty()];
        };

        if std::mem::take(&mut negate_next) {
            term = term.negated();
        }
        terms.push(term);
    }

    if terms.is_empty() {
        return vec![SearchTerm::empty()];
    }
    terms
}

/// Tokenizes a raw query string and parses it.
///
/// Whitespace separates tokens except inside quotes, so
/// `error "not found"` yields two terms. An unterminated quote makes the
/// whole query malformed.
#[must_use]
pub fn parse_query(query: &str, fuzzy_default: bool) -> Vec<SearchTerm> {
    match tokenize(query) {
        Some(tokens) => parse_arguments(&tokens, fuzzy_default),
        None => vec![SearchTerm::empty()],
    }
}

/// Splits on whitespace, keeping quoted phrases (quotes included) intact.
fn tokenize(query: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in query.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if (c == '"' || c == '\'') && current.is_empty() {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}

/// Classifies a single token. `None` means malformed.
fn parse_token(token: &str, fuzzy_default: bool) -> Option<SearchTerm> {
    if let Some(first) = token.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let inner = token[first.len_utf8()..].strip_suffix(first)?;
        return Some(SearchTerm::new(inner, TermKind::Quoted));
    }

    if token.len() >= 3 && token.starts_with('/') && token.ends_with('/') {
        return Some(SearchTerm::new(&token[1..token.len() - 1], TermKind::Regex));
    }

    if let Some(text) = token.strip_suffix("~1") {
        return Some(SearchTerm::new(text, TermKind::Fuzzy1));
    }
    if let Some(text) = token.strip_suffix("~2") {
        return Some(SearchTerm::new(text, TermKind::Fuzzy2));
    }

    let kind = if fuzzy_default {
        TermKind::Fuzzy1
    } else {
        TermKind::Default
    };
    Some(SearchTerm::new(token, kind))
}
