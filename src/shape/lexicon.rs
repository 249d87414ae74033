//! Small string helpers shared by the reshaper: key casing, counts, and list splitting.

use std::num::ParseIntError;

/// Convert a camelCase (or PascalCase) fragment to snake_case.
///
/// An uppercase letter starts a new segment unless the characters on both sides of it
/// are themselves uppercase (or absent at the end), so acronym runs stay fused:
/// `"LocalId"` becomes `"local_id"` and `"URLId"` becomes `"url_id"`.
pub fn camel_to_snake(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }
        let fused = i > 0 && {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            !prev.is_lowercase() && !next.is_some_and(char::is_lowercase)
        };
        if !fused {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out.trim_start_matches('_').to_string()
}

/// Parse a count such as `"12,345"`. An absent value parses `default` instead.
pub fn parse_thousands(s: Option<&str>, default: &str) -> Result<u64, ParseIntError> {
    s.unwrap_or(default).replace(',', "").trim().parse()
}

/// Split an FFN character list such as `"[Harry, Hermione] Ron, Luna"` into names.
///
/// Brackets count as separators; blank tokens are dropped.
pub fn split_bracket_list(s: &str) -> Vec<String> {
    s.replace('[', ", ")
        .replace(']', ", ")
        .split(", ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
