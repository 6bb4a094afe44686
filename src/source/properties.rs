use super::{read_location, SourceError};
use indexmap::IndexMap;

const MAX_EXPANSION_DEPTH: usize = 16;

/// A loaded key/value file in the `.properties` format, with `${name}`
/// references between entries expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: IndexMap<String, String>,
}

impl Properties {
    pub fn parse(raw: &str) -> Self {
        let mut entries = IndexMap::new();
        for line in logical_lines(raw) {
            let (key, value) = split_entry(&line);
            entries.insert(key, value);
        }
        let mut properties = Self { entries };
        properties.expand_references();
        properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn expand_references(&mut self) {
        let snapshot = self.entries.clone();
        for value in self.entries.values_mut() {
            *value = expand(value, &snapshot, 0);
        }
    }
}

/// Loads a property file from a path-or-url.
pub fn load_properties(location: &str) -> Result<Properties, SourceError> {
    let raw = read_location(location)?;
    Ok(Properties::parse(&raw))
}

/// Loads `location` and returns the value stored under `key`.
pub fn lookup_property(location: &str, key: &str) -> Result<String, SourceError> {
    let properties = load_properties(location)?;
    properties
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| SourceError::MissingKey {
            location: location.to_string(),
            key: key.to_string(),
        })
}

fn expand(value: &str, entries: &IndexMap<String, String>, depth: usize) -> String {
    if depth >= MAX_EXPANSION_DEPTH || !value.contains("${") {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match entries.get(name) {
            Some(replacement) => out.push_str(&expand(replacement, entries, depth + 1)),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Joins continuation lines (odd count of trailing backslashes) and drops
/// blank and comment lines.
fn logical_lines(raw: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for physical in raw.lines() {
        let trimmed = physical.trim_start_matches([' ', '\t', '\u{c}']);
        let line = match pending.take() {
            Some(mut acc) => {
                acc.push_str(trimmed);
                acc
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed.to_string()
            }
        };

        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            let mut line = line;
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }

    if let Some(line) = pending {
        lines.push(line);
    }
    lines
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut index = 0;
    let mut escaped = false;

    while index < chars.len() {
        let c = chars[index];
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if matches!(c, '=' | ':' | ' ' | '\t' | '\u{c}') {
            break;
        }
        index += 1;
    }

    let key: String = chars[..index].iter().collect();
    let mut value_start = index;
    while value_start < chars.len() && matches!(chars[value_start], ' ' | '\t' | '\u{c}') {
        value_start += 1;
    }
    if value_start < chars.len() && matches!(chars[value_start], '=' | ':') {
        value_start += 1;
        while value_start < chars.len() && matches!(chars[value_start], ' ' | '\t' | '\u{c}') {
            value_start += 1;
        }
    }
    let value: String = chars[value_start..].iter().collect();

    (unescape(&key), unescape(&value))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
