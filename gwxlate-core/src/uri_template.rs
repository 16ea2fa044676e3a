//! A small, dedicated recursive-descent parser for gateway URI path
//! templates. This deliberately does not reuse a general regex/parser-
//! combinator library for the parsing step itself — the `regex` crate is
//! only used afterwards, to validate that the *derived* regex compiles and
//! stays under the data plane's program-size bound.
//!
//! Grammar:
//! ```text
//! template   := '/' segment ('/' segment)*
//! segment    := literal | '*' | '**' | '{' NAME ('=' subpattern)? '}'
//! subpattern := subsegment ('/' subsegment)*      // no nested captures
//! subsegment := literal | '*' | '**'
//! literal    := one or more chars excluding '/' '{' '}' '*'
//! NAME       := [A-Za-z_][A-Za-z0-9_]*
//! ```

use gwxlate_kernel::error::{BuildError, BuildResult};
use gwxlate_kernel::model::{Segment, UriTemplate};

/// The data plane's regex program-size bound is approximated here by a cap
/// on the derived regex string's length. RE2 (the data plane's regex
/// engine) doesn't expose a portable "compiled program size" through the
/// `regex` crate used to validate compilability, so a character-count proxy
/// is the closest faithful approximation available without linking RE2
/// itself.
const MAX_REGEX_LEN: usize = 2048;

/// Validate a standalone regex pattern (one not derived from a path
/// template, e.g. a configured CORS allow-origin regex) against the same
/// program-size bound and compilability check the path-template parser
/// applies to its derived regexes.
pub fn check_regex_bound(pattern: &str) -> Result<(), String> {
    if pattern.len() > MAX_REGEX_LEN {
        return Err(format!(
            "regex exceeds the data-plane size bound ({MAX_REGEX_LEN} chars)"
        ));
    }
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| format!("does not compile: {e}"))
}

/// Parse `template_str` (the `Origin`) into a [`UriTemplate`], attaching
/// `selector` to any error for diagnostics.
pub fn parse(selector: &str, template_str: &str) -> BuildResult<UriTemplate> {
    let malformed = |reason: &str| BuildError::MalformedTemplate {
        selector: selector.to_string(),
        template: template_str.to_string(),
        reason: reason.to_string(),
    };

    if !template_str.starts_with('/') {
        return Err(malformed("template must start with '/'"));
    }
    let body = &template_str[1..];
    let top_level = split_top_level(body).map_err(|e| malformed(&e))?;

    let mut segments = Vec::with_capacity(top_level.len());
    for raw in &top_level {
        segments.push(parse_segment(raw, true).map_err(|e| malformed(&e))?);
    }

    let mut names = std::collections::HashSet::new();
    check_names_and_wildcards(&segments, &mut names).map_err(|e| malformed(&e))?;

    let mut variables = Vec::new();
    let mut regex_body = String::from("^/");
    render(&segments, &mut regex_body, &mut variables);
    regex_body.push('$');

    if regex_body.len() > MAX_REGEX_LEN {
        return Err(BuildError::RegexTooLarge {
            selector: selector.to_string(),
            template: template_str.to_string(),
        });
    }
    regex::Regex::new(&regex_body).map_err(|e| malformed(&format!("derived regex does not compile: {e}")))?;

    Ok(UriTemplate::from_parts(
        template_str.to_string(),
        segments,
        regex_body,
        variables,
    ))
}

/// Split `path` on `/` while respecting `{...}` nesting depth, so a capture
/// spanning multiple slash-separated pieces (e.g. `{name=shelves/*}`) stays
/// intact as one top-level segment.
fn split_top_level(path: &str) -> Result<Vec<String>, String> {
    if path.is_empty() {
        return Ok(vec![String::new()]);
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in path.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced '}'".to_string());
                }
                current.push(c);
            }
            '/' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err("unbalanced '{'".to_string());
    }
    parts.push(current);
    Ok(parts)
}

fn parse_segment(raw: &str, allow_capture: bool) -> Result<Segment, String> {
    if raw == "*" {
        return Ok(Segment::SingleWildcard);
    }
    if raw == "**" {
        return Ok(Segment::DoubleWildcard);
    }
    if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        if !allow_capture {
            return Err("capture variables cannot be nested inside a subpattern".to_string());
        }
        let (name, sub_str) = match inner.split_once('=') {
            Some((n, s)) => (n, Some(s)),
            None => (inner, None),
        };
        if !is_valid_identifier(name) {
            return Err(format!("'{name}' is not a valid variable name"));
        }
        let sub = match sub_str {
            Some(s) => {
                let pieces = split_top_level(s)?;
                let mut segs = Vec::with_capacity(pieces.len());
                for p in &pieces {
                    segs.push(parse_segment(p, false)?);
                }
                segs
            }
            None => vec![Segment::SingleWildcard],
        };
        return Ok(Segment::Capture {
            name: name.to_string(),
            sub,
        });
    }
    if raw.is_empty() || raw.contains(['{', '}', '*']) {
        return Err(format!("'{raw}' is not a valid literal path segment"));
    }
    Ok(Segment::Literal(raw.to_string()))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Enforce "duplicate variable names" and "nested `**`" rules across the
/// whole template. A double wildcard, if present, must be the final segment
/// since it consumes the remainder of the path.
fn check_names_and_wildcards(
    segments: &[Segment],
    seen_names: &mut std::collections::HashSet<String>,
) -> Result<(), String> {
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            Segment::DoubleWildcard if i + 1 != segments.len() => {
                return Err("'**' must be the final path segment".to_string());
            }
            Segment::Capture { name, sub } => {
                if !seen_names.insert(name.clone()) {
                    return Err(format!("duplicate variable name '{name}'"));
                }
                check_names_and_wildcards(sub, seen_names)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Render `segments` into `out` (a `^`-anchored regex body under
/// construction) and append positional variable names to `variables`.
fn render(segments: &[Segment], out: &mut String, variables: &mut Vec<String>) {
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        render_one(seg, out, variables);
    }
}

fn render_one(seg: &Segment, out: &mut String, variables: &mut Vec<String>) {
    match seg {
        Segment::Literal(l) => out.push_str(&regex::escape(l)),
        Segment::SingleWildcard => out.push_str("[^/]+"),
        Segment::DoubleWildcard => out.push_str(".*"),
        Segment::Capture { name, sub } => {
            variables.push(name.clone());
            out.push('(');
            render(sub, out, &mut Vec::new());
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_path_is_exact_and_has_no_variables() {
        let t = parse("svc.Get", "/shelves").unwrap();
        assert!(t.is_exact_match());
        assert_eq!(t.exact_match_string(false).unwrap(), "/shelves");
        assert_eq!(t.exact_match_string(true).unwrap(), "/shelves/");
        assert!(t.variables().is_empty());
    }

    #[test]
    fn single_wildcard_compiles_and_is_not_exact() {
        let t = parse("svc.Get", "/shelves/*").unwrap();
        assert!(!t.is_exact_match());
        assert_eq!(t.regex(), "^/shelves/[^/]+$");
    }

    #[test]
    fn double_wildcard_matches_rest_of_path() {
        let t = parse("svc.Get", "/media/**").unwrap();
        assert_eq!(t.regex(), "^/media/.*$");
    }

    #[test]
    fn capture_with_default_subpattern_is_single_wildcard() {
        let t = parse("svc.Get", "/shelves/{shelf_id}").unwrap();
        assert!(!t.is_exact_match());
        assert_eq!(t.variables(), &["shelf_id".to_string()]);
        assert_eq!(t.regex(), "^/shelves/([^/]+)$");
    }

    #[test]
    fn capture_with_literal_subpattern_is_exact() {
        let t = parse("svc.Get", "/items/{kind=books}").unwrap();
        assert!(t.is_exact_match());
        assert_eq!(t.exact_match_string(false).unwrap(), "/items/books");
    }

    #[test]
    fn capture_with_multi_segment_subpattern() {
        let t = parse("svc.Get", "/{name=shelves/*}").unwrap();
        assert_eq!(t.variables(), &["name".to_string()]);
        assert_eq!(t.regex(), "^/(shelves/[^/]+)$");
    }

    #[test]
    fn duplicate_variable_names_are_rejected() {
        let err = parse("svc.Get", "/{a}/{a}").unwrap_err();
        assert!(matches!(err, BuildError::MalformedTemplate { .. }));
    }

    #[test]
    fn double_wildcard_not_last_is_rejected() {
        let err = parse("svc.Get", "/**/tail").unwrap_err();
        assert!(matches!(err, BuildError::MalformedTemplate { .. }));
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        let err = parse("svc.Get", "/{shelf_id").unwrap_err();
        assert!(matches!(err, BuildError::MalformedTemplate { .. }));
    }

    #[test]
    fn nested_capture_is_rejected() {
        let err = parse("svc.Get", "/{a={b}}").unwrap_err();
        assert!(matches!(err, BuildError::MalformedTemplate { .. }));
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let err = parse("svc.Get", "/{1bad}").unwrap_err();
        assert!(matches!(err, BuildError::MalformedTemplate { .. }));
    }

    #[test]
    fn replace_variable_field_renames_without_touching_regex() {
        let mut t = parse("svc.Get", "/items/{foo_bar}").unwrap();
        let mut renames = std::collections::HashMap::new();
        renames.insert("foo_bar".to_string(), "fooBar".to_string());
        t.replace_variable_field(&renames);
        assert_eq!(t.variables(), &["fooBar".to_string()]);
        assert_eq!(t.regex(), "^/items/([^/]+)$");
        assert_eq!(t.origin(), "/items/{foo_bar}");
    }

    #[test]
    fn oversize_regex_is_rejected() {
        let huge = format!("/{}", "a".repeat(MAX_REGEX_LEN));
        let err = parse("svc.Get", &huge).unwrap_err();
        assert!(matches!(err, BuildError::RegexTooLarge { .. }));
    }
}
