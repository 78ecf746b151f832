// Frontmatter
//
// The `---`-delimited header of a note. Rendering is canonical: every scalar
// is double-quoted and every list is written inline, so a block this module
// produced parses back to the same fields and re-renders to the same bytes.
// Only the subset of YAML that we emit is accepted.

use std::path::{Path, PathBuf};

use crate::errors::VaultError;

const DELIMITER: &str = "---";

/// A frontmatter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Ordered key/value frontmatter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    fields: Vec<(String, FieldValue)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping its original position if it already exists
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, FieldValue::Text(value.into()));
        self
    }

    pub fn with_list(mut self, key: &str, values: Vec<String>) -> Self {
        self.insert(key, FieldValue::List(values));
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Render as a complete block, delimiters included, ending in a newline
    pub fn render(&self) -> String {
        let mut out = String::from(DELIMITER);
        out.push('\n');
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            match value {
                FieldValue::Text(s) => out.push_str(&quote(s)),
                FieldValue::List(items) => {
                    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
                    out.push('[');
                    out.push_str(&quoted.join(", "));
                    out.push(']');
                }
            }
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out
    }

    /// Parse the lines between the delimiters
    pub fn parse(block: &str) -> Result<Self, String> {
        let mut fm = Self::new();
        for (n, line) in block.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, raw) = line
                .split_once(':')
                .ok_or_else(|| format!("line {}: expected `key: value`", n + 1))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("line {}: empty key", n + 1));
            }
            let value = parse_value(raw.trim()).map_err(|e| format!("line {}: {}", n + 1, e))?;
            fm.insert(key, value);
        }
        Ok(fm)
    }
}

fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

fn parse_value(raw: &str) -> Result<FieldValue, String> {
    if raw.starts_with('[') {
        parse_list(raw).map(FieldValue::List)
    } else if raw.starts_with('"') {
        let (value, rest) = parse_quoted(raw)?;
        if !rest.trim().is_empty() {
            return Err(format!("unexpected text after string: {:?}", rest));
        }
        Ok(FieldValue::Text(value))
    } else {
        Ok(FieldValue::Text(raw.to_string()))
    }
}

/// Parse a leading double-quoted string, returning it and the remainder
fn parse_quoted(s: &str) -> Result<(String, &str), String> {
    let mut chars = s.char_indices();
    if !matches!(chars.next(), Some((_, '"'))) {
        return Err("expected '\"'".into());
    }
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &s[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, other)) => return Err(format!("unknown escape '\\{}'", other)),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err("unterminated string".into())
}

fn parse_list(raw: &str) -> Result<Vec<String>, String> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or("unterminated list")?;

    let mut items = Vec::new();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        let item;
        if rest.starts_with('"') {
            let (value, after) = parse_quoted(rest)?;
            item = value;
            rest = after.trim_start();
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            item = rest[..end].trim().to_string();
            rest = &rest[end..];
        }
        items.push(item);
        match rest.strip_prefix(',') {
            Some(after) => rest = after.trim_start(),
            None if rest.is_empty() => break,
            None => return Err(format!("expected ',' in list, found {:?}", rest)),
        }
    }
    Ok(items)
}

/// Split `---` frontmatter from the body. `None` when the text has no block.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let after_open = content.strip_prefix("---\n")?;
    let (block, rest) = if let Some(rest) = after_open.strip_prefix("---\n") {
        ("", rest)
    } else {
        let close = after_open.find("\n---\n")?;
        (&after_open[..close], &after_open[close + 5..])
    };
    // The blank separator line belongs to the layout, not the body
    Some((block, rest.strip_prefix('\n').unwrap_or(rest)))
}

/// One markdown note: a path relative to the vault store, its frontmatter and
/// its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub path: PathBuf,
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl VaultFile {
    pub fn new(path: impl Into<PathBuf>, frontmatter: Frontmatter, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            frontmatter,
            body: body.into(),
        }
    }

    /// Full file text: frontmatter block, a blank line, then the body
    pub fn to_markdown(&self) -> String {
        format!("{}\n{}", self.frontmatter.render(), self.body)
    }

    /// Parse file text. A note without a frontmatter block gets empty
    /// frontmatter and the whole text as body.
    pub fn parse(path: &Path, content: &str) -> Result<Self, VaultError> {
        let (frontmatter, body) = match split_frontmatter(content) {
            Some((block, body)) => {
                let fm = Frontmatter::parse(block).map_err(|reason| VaultError::Frontmatter {
                    path: path.to_path_buf(),
                    reason,
                })?;
                (fm, body)
            }
            None => (Frontmatter::new(), content),
        };
        Ok(Self::new(path, frontmatter, body))
    }
}
