// Terminal renderer

use crate::filter::Filter;
use crate::view::{Frame, MenuState, Renderer};
use colored::Colorize;
use std::io::Write;
use tracing::warn;

/// Draws frames as numbered lines on a writer
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame) -> std::io::Result<()> {
        let marker = match frame.menu {
            MenuState::Open => "▴",
            MenuState::Closed => "▾",
        };
        writeln!(self.out, "{} {}", "Filter:".bold(), format!("{} {}", frame.filter.label(), marker).cyan())?;

        if frame.menu == MenuState::Open {
            for filter in Filter::ALL {
                let bullet = if filter == frame.filter { "•" } else { " " };
                writeln!(self.out, "  {} {}", bullet, filter)?;
            }
        }

        if frame.records.is_empty() {
            writeln!(self.out, "  {}", "(nothing to show)".dimmed())?;
        }

        for (n, record) in frame.records.iter().enumerate() {
            if record.completed {
                writeln!(self.out, "{:>3}. [x] {}", n + 1, record.text.strikethrough().dimmed())?;
            } else {
                writeln!(self.out, "{:>3}. [ ] {}", n + 1, record.text)?;
            }
        }

        self.out.flush()
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, frame: &Frame) {
        if let Err(e) = self.draw(frame) {
            warn!(error = %e, "render: failed to write frame");
        }
    }
}
