//! XML Schema regular expressions
//!
//! Schema patterns are implicitly anchored and use a smaller escape vocabulary than the
//! `regex` crate. Patterns are rewritten into the `regex` dialect and compiled anchored;
//! anything XML Schema does not define is rejected with a reason.

use regex::Regex;
use std::iter::Peekable;
use std::str::Chars;

/// Compile a schema pattern into an anchored regex
pub(crate) fn compile(pattern: &str) -> Result<Regex, String> {
    let translated = translate(pattern)?;
    Regex::new(&format!("^(?:{translated})$")).map_err(|e| e.to_string())
}

fn translate(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| "pattern ends with a lone backslash".to_string())?;
                translate_escape(escaped, &mut chars, &mut out)?;
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            '[' => return Err("character class subtraction is not supported".to_string()),
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '-' if in_class && chars.peek() == Some(&'[') => {
                return Err("character class subtraction is not supported".to_string());
            }
            // Literal outside classes in schema patterns, but set operators in the regex crate
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            '&' | '~' | '-' if in_class && chars.peek() == Some(&c) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_class {
        return Err("character class is not closed".to_string());
    }
    Ok(out)
}

fn translate_escape(escaped: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<(), String> {
    match escaped {
        'n' => out.push_str("\\n"),
        'r' => out.push_str("\\r"),
        't' => out.push_str("\\t"),
        '\\' | '|' | '.' | '-' | '^' | '?' | '*' | '+' | '{' | '}' | '(' | ')' | '[' | ']' => {
            out.push('\\');
            out.push(escaped);
        }
        's' => out.push_str(r"[\x20\t\n\r]"),
        'S' => out.push_str(r"[^\x20\t\n\r]"),
        'i' => out.push_str(r"[_:\p{L}]"),
        'I' => out.push_str(r"[^_:\p{L}]"),
        'c' => out.push_str(r"[\-._:\p{L}\p{Nd}]"),
        'C' => out.push_str(r"[^\-._:\p{L}\p{Nd}]"),
        'd' => out.push_str(r"\p{Nd}"),
        'D' => out.push_str(r"\P{Nd}"),
        'w' => out.push_str(r"[^\p{P}\p{Z}\p{C}]"),
        'W' => out.push_str(r"[\p{P}\p{Z}\p{C}]"),
        'p' | 'P' => {
            if chars.next() != Some('{') {
                return Err(format!("\\{escaped} must be followed by a property in braces"));
            }
            let mut property = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => property.push(c),
                    None => return Err(format!("\\{escaped}{{{property} is not closed")),
                }
            }
            if property.starts_with("Is") {
                return Err(format!("block escape \\{escaped}{{{property}}} is not supported"));
            }
            out.push('\\');
            out.push(escaped);
            out.push('{');
            out.push_str(&property);
            out.push('}');
        }
        other => return Err(format!("\\{other} is not a valid escape")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_anchored() {
        let regex = compile("[A-Z0-9]+").unwrap();
        assert!(regex.is_match("ALPHA1"));
        assert!(!regex.is_match("ALPHA 1"));
        assert!(!regex.is_match("alpha"));
    }

    #[test]
    fn test_alternation_is_grouped() {
        let regex = compile("AB|CD").unwrap();
        assert!(regex.is_match("AB"));
        assert!(regex.is_match("CD"));
        assert!(!regex.is_match("ABCD"));
    }

    #[test]
    fn test_schema_escapes() {
        assert!(compile(r"\d{4}").unwrap().is_match("2024"));
        assert!(compile(r"[\p{L}_-]+").unwrap().is_match("user_name-x"));
        assert!(compile(r"a\.b").unwrap().is_match("a.b"));
        assert!(!compile(r"a\.b").unwrap().is_match("axb"));
        assert!(compile(r"\i\c*").unwrap().is_match("gpx:wpt"));
        assert!(compile(r"\s").unwrap().is_match(" "));
    }

    #[test]
    fn test_caret_and_dollar_are_literal() {
        let regex = compile("a^b$").unwrap();
        assert!(regex.is_match("a^b$"));
    }

    #[test]
    fn test_undefined_escapes_are_rejected() {
        let err = compile(r"[\p{L}_]+\@[\p{L}_]+").unwrap_err();
        assert!(err.contains("\\@"));
        assert!(compile(r"\b").is_err());
        assert!(compile(r"[a-z-[aeiou]]").is_err());
        assert!(compile(r"[abc").is_err());
        assert!(compile(r"\p{IsBasicLatin}").is_err());
    }
}
