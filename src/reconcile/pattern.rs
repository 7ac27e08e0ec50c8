//! Glob and regex evaluation for dynamic template predicates.

use regex::Regex;

/// Translate a glob into an anchored regex.
///
/// Supported: `*` (any run, `**` collapses to it), `?` (one char),
/// `[abc]` / `[!abc]` classes, `{a,b}` alternation and `\` escapes.
/// Unbalanced brackets or braces are taken literally.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let braces_balanced = braces_balanced(&chars);
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push('[');
                    let mut j = i + 1;
                    if chars[j] == '!' || chars[j] == '^' {
                        out.push('^');
                        j += 1;
                    }
                    for &cc in &chars[j..end] {
                        if cc == '\\' || cc == '[' || cc == ']' {
                            out.push('\\');
                        }
                        out.push(cc);
                    }
                    out.push(']');
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            '{' if braces_balanced => {
                depth += 1;
                out.push_str("(?:");
            }
            ',' if depth > 0 => out.push('|'),
            '}' if depth > 0 => {
                depth -= 1;
                out.push(')');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if j < chars.len() && (chars[j] == '!' || chars[j] == '^') {
        j += 1;
    }
    // a leading `]` is part of the class
    if j < chars.len() && chars[j] == ']' {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn braces_balanced(chars: &[char]) -> bool {
    let mut depth: i32 = 0;
    for &c in chars {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

pub fn glob_matches(glob: &str, text: &str) -> bool {
    match Regex::new(&glob_to_regex(glob)) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!("unusable glob {:?}: {}", glob, e);
            false
        }
    }
}

/// Unanchored regex test, as the cluster applies `match_pattern: regex`.
pub fn regex_matches(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!("unusable regex {:?}: {}", pattern, e);
            false
        }
    }
}
