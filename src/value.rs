// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Value codec helpers (component G): parsing and writing the four
//! composite value shapes — list, semi-structured, structured, and
//! multimap — that share one `\`-escape convention. These operate purely
//! on `&str` and know nothing about line framing, folding, or parameter
//! syntax; the tokenizer hands them an already-unfolded value string.

/// Unescapes `\\` → `\`, `\;` → `;`, `\,` → `,`, and `\n`/`\N` → `newline`.
/// Any other backslash escape (an unrecognized character following `\`)
/// passes both characters through verbatim.
#[must_use]
pub fn unescape(s: &str, newline: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            Some(';') => {
                out.push(';');
                chars.next();
            }
            Some(',') => {
                out.push(',');
                chars.next();
            }
            Some('n' | 'N') => {
                out.push_str(newline);
                chars.next();
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
                chars.next();
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Escapes `\` and `;` unconditionally; escapes `,` only if
/// `escape_commas` is set (semi-structured writes may turn this off, as
/// the OLD dialect historically did not escape commas there); any
/// embedded CR, LF, or CRLF becomes the two-character sequence `\n`.
#[must_use]
pub fn escape(s: &str, escape_commas: bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' if escape_commas => out.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Splits `s` on unescaped occurrences of `delim` (a backslash-escaped
/// delimiter is not a split point). `limit`, if non-zero, caps the
/// number of resulting pieces: at most `limit - 1` splits are performed,
/// so the final piece retains any remaining unescaped delimiters.
/// Pieces are returned in their original (still-escaped) form.
fn split_unescaped(s: &str, delim: char, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    let mut splits = 0usize;
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        let can_split = limit == 0 || splits < limit - 1;
        if c == delim && can_split {
            parts.push(std::mem::take(&mut current));
            splits += 1;
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Finds the byte index of the first unescaped occurrence of `target`.
fn find_unescaped(s: &str, target: char) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if c == target {
            return Some(i);
        }
    }
    None
}

/// Parses a comma-separated list value. Empty input yields an empty
/// sequence (not a sequence containing one empty string).
#[must_use]
pub fn parse_list(s: &str, newline: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    split_unescaped(s, ',', 0)
        .into_iter()
        .map(|p| unescape(&p, newline))
        .collect()
}

/// Writes a comma-separated list value; list items always have their
/// commas escaped (otherwise they would be indistinguishable from list
/// separators).
#[must_use]
pub fn write_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| escape(v, true))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a semicolon-separated value into up to `limit` pieces
/// (`limit == 0` for unlimited).
#[must_use]
pub fn parse_semi_structured(s: &str, limit: usize, newline: &str) -> Vec<String> {
    split_unescaped(s, ';', limit)
        .into_iter()
        .map(|p| unescape(&p, newline))
        .collect()
}

/// Options controlling how [`write_semi_structured`] serializes a
/// sequence of pieces.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiStructuredOptions {
    /// Keep trailing empty pieces (and their separating `;`) rather than
    /// trimming them.
    pub include_trailing_semicolons: bool,
    /// Escape commas within each piece. OLD-dialect writers historically
    /// leave commas unescaped in semi-structured values.
    pub escape_commas: bool,
}

/// Writes a semicolon-separated value from `values` per `options`.
#[must_use]
pub fn write_semi_structured(values: &[String], options: SemiStructuredOptions) -> String {
    let mut pieces: Vec<String> = values
        .iter()
        .map(|v| escape(v, options.escape_commas))
        .collect();
    if !options.include_trailing_semicolons {
        while pieces.last().is_some_and(String::is_empty) {
            pieces.pop();
        }
    }
    pieces.join(";")
}

/// Parses a structured value: semicolon-separated components, each a
/// comma-separated sequence of sub-values. A component that parses to a
/// single empty sub-value is represented as an empty component (never as
/// a component containing one empty string).
#[must_use]
pub fn parse_structured(s: &str, newline: &str) -> Vec<Vec<String>> {
    split_unescaped(s, ';', 0)
        .into_iter()
        .map(|component| {
            let subs: Vec<String> = split_unescaped(&component, ',', 0)
                .into_iter()
                .map(|p| unescape(&p, newline))
                .collect();
            if subs.len() == 1 && subs[0].is_empty() {
                Vec::new()
            } else {
                subs
            }
        })
        .collect()
}

/// Writes a structured value. `None` sub-values are written as the
/// literal text `null`. If `trim_trailing_empty` is set, trailing empty
/// components are dropped.
#[must_use]
pub fn write_structured(components: &[Vec<Option<String>>], trim_trailing_empty: bool) -> String {
    let mut pieces: Vec<String> = components
        .iter()
        .map(|component| {
            if component.is_empty() {
                return String::new();
            }
            component
                .iter()
                .map(|sub| match sub {
                    Some(v) => escape(v, true),
                    None => "null".to_string(),
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    if trim_trailing_empty {
        while pieces.last().is_some_and(String::is_empty) {
            pieces.pop();
        }
    }
    pieces.join(";")
}

/// Parses a multimap value: semicolon-separated `KEY=val1,val2` pairs.
/// Keys are canonicalized to upper-case ASCII; a pair with no `=` is
/// stored with a single empty value; empty keys are skipped; repeated
/// keys accumulate their values in order.
#[must_use]
pub fn parse_multimap(s: &str, newline: &str) -> Vec<(String, Vec<String>)> {
    let mut result: Vec<(String, Vec<String>)> = Vec::new();
    for pair in split_unescaped(s, ';', 0) {
        if pair.is_empty() {
            continue;
        }
        let (key_raw, values) = match find_unescaped(&pair, '=') {
            Some(idx) => {
                let key = pair[..idx].to_string();
                let rest = &pair[idx + '='.len_utf8()..];
                let values = split_unescaped(rest, ',', 0)
                    .into_iter()
                    .map(|p| unescape(&p, newline))
                    .collect();
                (key, values)
            }
            None => (pair, vec![String::new()]),
        };
        let key = unescape(&key_raw, newline).to_ascii_uppercase();
        if key.is_empty() {
            continue;
        }
        if let Some((_, existing)) = result.iter_mut().find(|(k, _)| *k == key) {
            existing.extend(values);
        } else {
            result.push((key, values));
        }
    }
    result
}

/// Writes a multimap value from `entries`, in order.
#[must_use]
pub fn write_multimap(entries: &[(String, Vec<String>)]) -> String {
    entries
        .iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(key, values)| {
            let key = escape(key, true);
            if values.is_empty() {
                key
            } else {
                let joined = values
                    .iter()
                    .map(|v| escape(v, true))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{key}={joined}")
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_unescape_round_trip_for_all_special_chars() {
        let original = "a\\b;c,d\r\ne";
        let escaped = escape(original, true);
        assert_eq!(unescape(&escaped, "\n"), original.replace("\r\n", "\n"));
    }

    #[test]
    fn list_parses_empty_input_to_empty_sequence() {
        assert_eq!(parse_list("", "\n"), Vec::<String>::new());
        assert_eq!(parse_list("a,b\\,c", "\n"), vec!["a", "b,c"]);
    }

    #[test]
    fn semi_structured_respects_limit() {
        let parts = parse_semi_structured("a;b;c;d", 2, "\n");
        assert_eq!(parts, vec!["a", "b;c;d"]);
    }

    #[test]
    fn semi_structured_write_trims_trailing_empties_by_default() {
        let values = vec!["a".to_string(), String::new(), String::new()];
        let options = SemiStructuredOptions::default();
        assert_eq!(write_semi_structured(&values, options), "a");
    }

    #[test]
    fn structured_empty_component_has_no_inner_empty_string() {
        let parsed = parse_structured(";a,b;", "\n");
        assert_eq!(parsed, vec![Vec::<String>::new(), vec!["a".to_string(), "b".to_string()], Vec::new()]);
    }

    #[test]
    fn structured_write_emits_null_for_none() {
        let components = vec![vec![Some("a".to_string()), None]];
        assert_eq!(write_structured(&components, false), "a,null");
    }

    #[test]
    fn multimap_handles_keyless_pairs_and_repeats() {
        let parsed = parse_multimap("TYPE=work,voice;PREF;type=home", "\n");
        assert_eq!(
            parsed,
            vec![
                ("TYPE".to_string(), vec!["work".to_string(), "voice".to_string(), "home".to_string()]),
                ("PREF".to_string(), vec![String::new()]),
            ]
        );
    }

    #[test]
    fn multimap_skips_empty_keys() {
        assert_eq!(parse_multimap(";=value;", "\n"), Vec::new());
    }
}
