//! Relative path sanitation for archive entries and URL-supplied names

use std::fmt;

use serde::Deserialize;

/// Why a path was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path escapes its namespace")]
    Traversal,
    #[error("path is absolute")]
    Absolute,
    #[error("path contains control characters")]
    ControlCharacter,
}

/// A normalized relative path that cannot escape the namespace it is joined to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct SafePath(String);

impl SafePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        sanitize_path(raw).map(SafePath)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for SafePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize `raw` into a forward-slash relative path.
///
/// Backslashes become slashes, `./` prefixes, empty and `.` segments are
/// dropped. Any `..` segment, a leading slash or a drive prefix rejects the
/// whole path rather than being resolved.
pub fn sanitize_path(raw: &str) -> Result<String, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let normalized = trimmed.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return Err(PathError::Absolute);
    }

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::Traversal),
            s if s.chars().any(char::is_control) => return Err(PathError::ControlCharacter),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
