//! Compile diagnostics
//!
//! Diagnostics are collected per module and phase instead of being raised, so
//! one bad method does not stop generation of the others. They render through
//! `codespan-reporting` when the source text is at hand.

use crate::ast::TextPosition;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use serde::Serialize;
use std::fmt;
use termcolor::WriteColor;

/// Lexer phase index in an [`ErrorCollection`]
pub const LEXER_PHASE: usize = 0;
/// Parser phase index
pub const PARSER_PHASE: usize = 1;
/// Declaration and type resolution phase index
pub const TYPE_RESOLUTION_PHASE: usize = 2;
/// Code generation phase index
pub const CODE_GENERATION_PHASE: usize = 3;

const PHASE_COUNT: usize = 4;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Prevents execution
    Error,
    /// Suspicious but executable
    Warning,
    /// Informational
    Info,
}

/// Suggested source edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickFix {
    /// What the fix does
    pub title: String,
    /// Where to insert
    pub position: TextPosition,
    /// Text to insert
    pub insert: String,
}

/// A compile diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Message
    pub message: String,
    /// Source position
    pub position: TextPosition,
    /// Severity
    pub severity: Severity,
    /// Suggested fix
    pub quick_fix: Option<QuickFix>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(message: impl Into<String>, position: TextPosition) -> Self {
        Self {
            message: message.into(),
            position,
            severity: Severity::Error,
            quick_fix: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>, position: TextPosition) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message, position)
        }
    }

    /// Attach a quick fix
    pub fn with_quick_fix(mut self, title: impl Into<String>, position: TextPosition, insert: impl Into<String>) -> Self {
        self.quick_fix = Some(QuickFix {
            title: title.into(),
            position,
            insert: insert.into(),
        });
        self
    }

    /// Convert to a codespan diagnostic labelled against `source`
    pub fn to_codespan(&self, source: Option<&str>) -> CsDiagnostic<()> {
        let severity = match self.severity {
            Severity::Error => CsSeverity::Error,
            Severity::Warning => CsSeverity::Warning,
            Severity::Info => CsSeverity::Note,
        };
        let mut diagnostic = CsDiagnostic::new(severity).with_message(&self.message);
        match source.and_then(|text| byte_range(text, self.position)) {
            Some(range) => diagnostic = diagnostic.with_labels(vec![Label::primary((), range)]),
            None if !self.position.is_synthetic() => {
                diagnostic = diagnostic.with_notes(vec![format!("at {}", self.position)]);
            }
            None => {}
        }
        if let Some(fix) = &self.quick_fix {
            diagnostic.notes.push(format!("help: {}", fix.title));
        }
        diagnostic
    }

    /// Render to a terminal writer
    pub fn emit(
        &self,
        writer: &mut dyn WriteColor,
        file_name: &str,
        source: Option<&str>,
    ) -> Result<(), codespan_reporting::files::Error> {
        let file = SimpleFile::new(file_name, source.unwrap_or_default());
        let config = term::Config::default();
        term::emit(writer, &config, &file, &self.to_codespan(source))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{}: {} ({})", label, self.message, self.position)
    }
}

fn byte_range(source: &str, position: TextPosition) -> Option<std::ops::Range<usize>> {
    if position.is_synthetic() {
        return None;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(position.line as usize - 1)
        .map(str::len)
        .sum();
    let line = source.get(line_start..)?.lines().next()?;
    let start = line
        .char_indices()
        .nth(position.column.saturating_sub(1) as usize)
        .map(|(i, _)| line_start + i)?;
    let end = line[start - line_start..]
        .char_indices()
        .nth(position.length.max(1) as usize)
        .map(|(i, _)| start + i)
        .unwrap_or(line_start + line.len());
    Some(start..end)
}

/// Diagnostics of one module, grouped by compile phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorCollection {
    phases: [Vec<Diagnostic>; PHASE_COUNT],
}

impl ErrorCollection {
    /// Record a diagnostic for a phase
    pub fn push(&mut self, phase: usize, diagnostic: Diagnostic) {
        tracing::debug!(phase, %diagnostic, "diagnostic recorded");
        if let Some(list) = self.phases.get_mut(phase) {
            list.push(diagnostic);
        }
    }

    /// Diagnostics of one phase
    pub fn phase(&self, phase: usize) -> &[Diagnostic] {
        self.phases.get(phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All diagnostics in phase order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.phases.iter().flatten()
    }

    /// Any diagnostic with error severity
    pub fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of diagnostics
    pub fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    /// No diagnostics
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
