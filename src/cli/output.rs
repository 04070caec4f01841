//! Colored terminal output for packaging runs
//!
//! Progress goes to stdout and is silenced under `--json` so the JSON
//! document is the only thing written there. Errors always go to stderr.

use std::io::{self, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager; `quiet` silences everything but errors
    pub fn new(quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    /// Print a success line with a green check mark
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.progress(|buffer| {
            marker(buffer, "✓", Color::Green)?;
            writeln!(buffer, " {message}")
        })
    }

    /// Print an error line to stderr (always shown)
    pub fn error(&self, message: &str) {
        let stderr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = stderr.buffer();
        let written = render_error(&mut buffer, message).and_then(|()| stderr.print(&buffer));
        if written.is_err() {
            println!("✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> io::Result<()> {
        self.progress(|buffer| {
            writeln!(buffer)?;
            buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            writeln!(buffer, "═══ {title} ═══")?;
            buffer.reset()
        })
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.progress(|buffer| writeln!(buffer, "    {message}"))
    }

    /// Print a plain line
    pub fn println(&self, message: &str) -> io::Result<()> {
        self.progress(|buffer| writeln!(buffer, "{message}"))
    }

    fn progress(&self, render: impl FnOnce(&mut Buffer) -> io::Result<()>) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.stdout.buffer();
        render(&mut buffer)?;
        self.stdout.print(&buffer)
    }
}

fn marker(buffer: &mut Buffer, symbol: &str, color: Color) -> io::Result<()> {
    buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(buffer, "{symbol}")?;
    buffer.reset()
}

fn render_error(buffer: &mut Buffer, message: &str) -> io::Result<()> {
    marker(buffer, "✗", Color::Red)?;
    buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
    writeln!(buffer, " {message}")?;
    buffer.reset()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_skips_rendering() {
        let output = OutputManager::new(true);
        let rendered = output.progress(|_| Err(io::Error::other("rendered while quiet")));
        assert!(rendered.is_ok());
    }

    #[test]
    fn test_error_line_has_marker() {
        let mut buffer = Buffer::no_color();
        render_error(&mut buffer, "hdiutil exited with status 1").unwrap();
        assert_eq!(
            String::from_utf8(buffer.into_inner()).unwrap(),
            "✗ hdiutil exited with status 1\n"
        );
    }
}
