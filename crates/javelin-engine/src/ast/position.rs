//! Source positions attached to syntax nodes and generated steps

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the source text (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextPosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Length of the covered text in characters
    #[serde(default)]
    pub length: u32,
}

impl TextPosition {
    /// Create a new position
    pub fn new(line: u32, column: u32, length: u32) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// Position used for synthesized nodes with no source text
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// Whether this position points into real source text
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(TextPosition::new(3, 7, 2).to_string(), "line 3, column 7");
    }

    #[test]
    fn test_synthetic() {
        assert!(TextPosition::synthetic().is_synthetic());
        assert!(!TextPosition::new(1, 1, 0).is_synthetic());
    }

    #[test]
    fn test_length_defaults_when_missing() {
        let pos: TextPosition = serde_json::from_str(r#"{"line": 2, "column": 4}"#).unwrap();
        assert_eq!(pos, TextPosition::new(2, 4, 0));
    }
}
