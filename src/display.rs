//! Console output for the demos: status lines, section rules and previews.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Ok,
    Warn,
    Fail,
    Info,
    Dim,
}

/// Decide whether stdout should be colored (`NO_COLOR` disables it)
pub fn should_color(no_color_flag: bool) -> bool {
    if no_color_flag || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}

/// Truncate to `max_chars` characters, appending `...` when anything was cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(feature = "colors")]
fn paint_tone(s: &str, tone: Tone) -> String {
    match tone {
        Tone::Ok => s.green().to_string(),
        Tone::Warn => s.yellow().to_string(),
        Tone::Fail => s.red().bold().to_string(),
        Tone::Info => s.cyan().to_string(),
        Tone::Dim => s.bright_black().to_string(),
    }
}

#[cfg(not(feature = "colors"))]
fn paint_tone(s: &str, _tone: Tone) -> String {
    s.to_string()
}

pub struct Printer<W: Write> {
    out: W,
    color: bool,
}

impl Printer<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, s: &str, tone: Tone) -> String {
        if self.color {
            paint_tone(s, tone)
        } else {
            s.to_string()
        }
    }

    pub fn line(&mut self, s: impl Display) -> io::Result<()> {
        writeln!(self.out, "{s}")
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn ok(&mut self, msg: impl Display) -> io::Result<()> {
        let s = self.paint(&format!("✅ {msg}"), Tone::Ok);
        self.line(s)
    }

    pub fn warn(&mut self, msg: impl Display) -> io::Result<()> {
        let s = self.paint(&format!("⚠️  {msg}"), Tone::Warn);
        self.line(s)
    }

    pub fn fail(&mut self, msg: impl Display) -> io::Result<()> {
        let s = self.paint(&format!("❌ {msg}"), Tone::Fail);
        self.line(s)
    }

    pub fn info(&mut self, icon: &str, msg: impl Display) -> io::Result<()> {
        let s = self.paint(&format!("{icon} {msg}"), Tone::Info);
        self.line(s)
    }

    /// Thin separator between items
    pub fn divider(&mut self) -> io::Result<()> {
        let s = self.paint(&"-".repeat(50), Tone::Dim);
        self.line(s)
    }

    /// Heavy separator between demos
    pub fn rule(&mut self) -> io::Result<()> {
        let s = self.paint(&"=".repeat(60), Tone::Dim);
        writeln!(self.out, "\n{s}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("héllo wörld", 4), "héll...");
        assert_eq!(preview("  padded  ", 10), "padded");
    }

    #[test]
    fn test_plain_printer_has_no_escape_codes() {
        let mut p = Printer::new(Vec::new(), false);
        p.ok("done").unwrap();
        p.fail("broken").unwrap();
        p.divider().unwrap();
        let out = String::from_utf8(p.into_inner()).unwrap();
        assert_eq!(out, format!("✅ done\n❌ broken\n{}\n", "-".repeat(50)));
    }
}
