//! Ordered `key=value` property files.
//!
//! Loading accepts `=`, `:` or whitespace as the key/value separator, `#` and
//! `!` comment lines, backslash line continuations and the escapes `\n`,
//! `\t`, `\r`, `\f`, `\uXXXX`. Storing writes one `key=value` line per entry
//! in insertion order, escaping whatever loading would otherwise misread.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ResourcesError, Result};

/// An insertion-ordered string to string mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ResourcesError::io(path, e))?;
        let properties = Self::parse(&text, path)?;
        debug!(
            "Loaded {} properties from {}",
            properties.len(),
            path.display()
        );
        Ok(properties)
    }

    /// Parse property text. `origin` only labels errors.
    pub fn parse(text: &str, origin: impl Into<PathBuf>) -> Result<Self> {
        let origin = origin.into();
        let mut properties = Self::new();
        let mut lines = text.lines().enumerate();

        while let Some((idx, raw)) = lines.next() {
            let line_no = idx + 1;
            let trimmed = raw.trim_start_matches(is_blank);
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let mut logical = trimmed.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                    None => break,
                }
            }

            let (raw_key, raw_value) = split_entry(&logical);
            let key = unescape(raw_key).map_err(|message| ResourcesError::Properties {
                path: origin.clone(),
                line: line_no,
                message,
            })?;
            let value = unescape(raw_value).map_err(|message| ResourcesError::Properties {
                path: origin.clone(),
                line: line_no,
                message,
            })?;
            properties.insert(key, value);
        }

        Ok(properties)
    }

    /// Write the mapping to `path`, replacing the file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.serialize()).map_err(|e| ResourcesError::io(path, e))?;
        debug!("Stored {} properties to {}", self.len(), path.display());
        Ok(())
    }

    /// Render as property text, one `key=value` line per entry.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{}={}", escape_key(key), escape_value(value));
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite `key`, returning the previous value.
    ///
    /// An overwritten key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// First key, in insertion order, whose value equals `value`.
    pub fn find_key_by_value(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| v == value)
            .map(|(k, _)| k.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut chars = line.char_indices();
    let mut key_end = line.len();
    let mut hard_separator = false;

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '=' | ':' => {
                key_end = i;
                hard_separator = true;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    if key_end == line.len() {
        return (line, "");
    }

    let key = &line[..key_end];
    // Skip the separator character itself (all separators are one byte).
    let mut rest = line[key_end + 1..].trim_start_matches(is_blank);
    if !hard_separator {
        if let Some(stripped) = rest.strip_prefix(['=', ':']) {
            rest = stripped.trim_start_matches(is_blank);
        }
    }
    (key, rest)
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let (hex, code) = read_code_unit(&mut chars)?;
                let code = match code {
                    0xD800..=0xDBFF => {
                        // High surrogate: only valid followed by `\uDC00`-`\uDFFF`.
                        let low = match (chars.next(), chars.next()) {
                            (Some('\\'), Some('u')) => read_code_unit(&mut chars)?.1,
                            _ => return Err(format!("\\u{} is an unpaired surrogate", hex)),
                        };
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(format!("\\u{} is an unpaired surrogate", hex));
                        }
                        0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
                    }
                    code => code,
                };
                let decoded = char::from_u32(code)
                    .ok_or_else(|| format!("\\u{} is not a valid character", hex))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Read the four hex digits of a `\u` escape.
fn read_code_unit(chars: &mut std::str::Chars<'_>) -> std::result::Result<(String, u32), String> {
    let hex: String = chars.by_ref().take(4).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .filter(|_| hex.len() == 4)
        .map(|code| (hex.clone(), code))
        .ok_or_else(|| format!("malformed \\u escape '\\u{}'", hex))
}

fn escape_common(c: char, out: &mut String) -> bool {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\x0c' => out.push_str("\\f"),
        _ => return false,
    }
    true
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if escape_common(c, &mut out) {
            continue;
        }
        if matches!(c, ' ' | '=' | ':' | '#' | '!') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        if escape_common(c, &mut out) {
            continue;
        }
        // Leading blanks would be swallowed as separator padding.
        if i == 0 && c == ' ' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
