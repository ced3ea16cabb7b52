//! Terminal output shared by the commands

use crate::ColorMode;
use javelin_engine::ErrorCollection;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the `--color` flag and environment
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: ColorMode) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto => ColorChoice::Auto,
    }
}

/// Render every diagnostic to stderr, labelled against `source` when given
pub fn emit_diagnostics(
    errors: &ErrorCollection,
    file_name: &str,
    source: Option<&str>,
    color: ColorChoice,
) -> anyhow::Result<()> {
    let mut stderr = StandardStream::stderr(color);
    for diagnostic in errors.iter() {
        diagnostic.emit(&mut stderr, file_name, source)?;
    }
    Ok(())
}

/// One-line summary in bold red (failures) or green
pub fn summary(text: &str, failed: bool, color: ColorChoice) -> std::io::Result<()> {
    let mut stderr = StandardStream::stderr(color);
    let fg = if failed { Color::Red } else { Color::Green };
    stderr.set_color(ColorSpec::new().set_fg(Some(fg)).set_bold(true))?;
    write!(stderr, "{}", text)?;
    stderr.reset()?;
    writeln!(stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_flag() {
        if std::env::var_os("NO_COLOR").is_some() {
            return;
        }
        assert!(matches!(resolve_color_choice(ColorMode::Never), ColorChoice::Never));
        assert!(matches!(resolve_color_choice(ColorMode::Always), ColorChoice::Always));
        assert!(matches!(resolve_color_choice(ColorMode::Auto), ColorChoice::Auto));
    }
}
