//! Frame sinks: plain text and JSON.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::core::frame::Frame;

/// Output format for a frame written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per grid row.
    #[default]
    Text,
    /// The whole frame as pretty JSON.
    Json,
}

/// Render a frame as text.
///
/// A header line `tick=<n> pointer=<x>,<y>` is followed by one line per row.
/// A fully transparent cell is `.`. Other cells are `#`, or their color digit
/// when `showVal()` is on. The pointer cell is bracketed when `showCell()` is on.
pub fn render_text(frame: &Frame<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "tick={} pointer={},{}",
        frame.tick, frame.pointer.x, frame.pointer.y
    );
    for (y, row) in frame.grid.rows().enumerate() {
        let line: String = row
            .iter()
            .enumerate()
            .map(|(x, cell)| {
                let glyph = if cell.opacity == 0 {
                    '.'
                } else if frame.flags.show_values {
                    char::from(b'0' + cell.color)
                } else {
                    '#'
                };
                if frame.is_highlighted(x, y) {
                    format!("[{glyph}]")
                } else {
                    format!(" {glyph} ")
                }
            })
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Write `frame` to `out` in `format`.
pub fn write_frame<W: Write>(out: &mut W, frame: &Frame<'_>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => out
            .write_all(render_text(frame).as_bytes())
            .context("write text frame")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, frame).context("serialize frame json")?;
            out.write_all(b"\n").context("write json frame")?;
        }
    }
    out.flush().context("flush frame")?;
    Ok(())
}
