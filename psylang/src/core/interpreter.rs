//! Command interpreter.
//!
//! Code is interpreted left to right over a [`CodeBuffer`]. Every call runs to
//! completion: loop bodies are executed recursively, one full pass per
//! iteration, before the outer cursor moves on. Malformed constructs never
//! fail; they degrade to no-ops or to a zero value.
//!
//! | Token | Effect |
//! |---|---|
//! | `>` `<` `.` `,` | move the pointer right, left, down, up (wrapping) |
//! | `+` `-` | raise / lower the current cell's color (saturating) |
//! | `Op[n]` | set the current cell's opacity to `n`, clamped |
//! | `%[lo/hi]` | splice a random integer in place of the token and re-read it |
//! | `n{...}` | run the block `n` times |

use std::num::IntErrorKind;
use std::ops::Range;
use std::str::FromStr;

use crate::core::grid::Direction;
use crate::core::state::InterpreterState;

/// Program text plus the read position of an in-flight interpretation.
///
/// `%[lo/hi]` rewrites the text in place, so the buffer is owned rather than
/// borrowed. The cursor is a byte offset; every operator is ASCII, so any
/// offset the interpreter stops at is a character boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    text: String,
    cursor: usize,
}

impl CodeBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self::starting_at(text, 0)
    }

    pub fn starting_at(text: impl Into<String>, cursor: usize) -> Self {
        Self {
            text: text.into(),
            cursor,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True once everything up to the end of the text has been interpreted.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.text.len()
    }

    /// Replace `range` with `replacement` without moving the cursor.
    fn splice(&mut self, range: Range<usize>, replacement: &str) {
        self.text.replace_range(range, replacement);
    }
}

/// Interpret `code` from byte offset `start` to the end.
///
/// Returns the offset after the last byte consumed, measured in the text as
/// rewritten by any `%[lo/hi]` splices. For `start <= code.len()` without
/// splices this is `code.len()`.
pub fn execute(state: &mut InterpreterState, code: &str, start: usize) -> usize {
    let mut buffer = CodeBuffer::starting_at(code, start);
    run(state, &mut buffer);
    buffer.cursor()
}

/// Interpret `buffer` from its cursor until the end of its (possibly
/// rewritten) text.
pub fn run(state: &mut InterpreterState, buffer: &mut CodeBuffer) {
    while let Some(&byte) = buffer.text.as_bytes().get(buffer.cursor) {
        let at = buffer.cursor;
        match byte {
            b'>' => state.move_pointer(Direction::Right),
            b'<' => state.move_pointer(Direction::Left),
            b'.' => state.move_pointer(Direction::Down),
            b',' => state.move_pointer(Direction::Up),
            b'+' => state.current_cell().increment(),
            b'-' => state.current_cell().decrement(),
            b'O' => {
                if let Some((value, close)) = opacity_at(&buffer.text, at) {
                    state.current_cell().set_opacity(value);
                    buffer.cursor = close;
                }
            }
            b'%' => {
                if let Some(token) = random_at(&buffer.text, at) {
                    let drawn = state.draw(token.lo, token.hi);
                    buffer.splice(token.span, &drawn.to_string());
                    // Re-read from the same offset so the digits are interpreted.
                    continue;
                }
            }
            b'0'..=b'9' => {
                if let Some(header) = loop_at(&buffer.text, at) {
                    let body = &buffer.text[header.body.clone()];
                    for _ in 0..header.count {
                        execute(state, body, 0);
                    }
                    buffer.cursor = header.body.end;
                }
            }
            _ => {}
        }
        buffer.cursor += 1;
    }
}

/// Index of the `}` closing a block whose body starts at `body_start`
/// (just past the opening `{`), counting nested braces.
pub fn matching_brace(text: &str, body_start: usize) -> Option<usize> {
    matching_close(text, body_start, b'{', b'}')
}

/// Index of the `close` byte that balances an already-consumed `open`,
/// scanning from `body_start`.
pub(crate) fn matching_close(text: &str, body_start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, &byte) in text.as_bytes().get(body_start..)?.iter().enumerate() {
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
            if depth == 0 {
                return Some(body_start + offset);
            }
        }
    }
    None
}

/// Parse an integer literal the lenient way: surrounding whitespace is
/// ignored, out-of-range values saturate, anything else is `None`.
pub fn parse_int<T>(text: &str, min: T, max: T) -> Option<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    match text.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Some(max),
            IntErrorKind::NegOverflow => Some(min),
            _ => None,
        },
    }
}

/// `Op[<int>]` at `at`: the parsed value (zero when malformed) and the index
/// of the closing `]`.
fn opacity_at(text: &str, at: usize) -> Option<(i64, usize)> {
    let rest = text.get(at..)?;
    if !rest.starts_with("Op[") {
        return None;
    }
    let literal_start = at + 3;
    let close = literal_start + text[literal_start..].find(']')?;
    let value = parse_int(&text[literal_start..close], i64::MIN, i64::MAX).unwrap_or(0);
    Some((value, close))
}

#[derive(Debug, PartialEq, Eq)]
struct RandomToken {
    span: Range<usize>,
    lo: i64,
    hi: i64,
}

/// `%[<lo>/<hi>]` at `at`. Requires a closing `]` with a `/` before it;
/// malformed bounds draw from `[0, 0]`.
fn random_at(text: &str, at: usize) -> Option<RandomToken> {
    let rest = text.get(at..)?;
    if !rest.starts_with("%[") {
        return None;
    }
    let inner_start = at + 2;
    let close = inner_start + text[inner_start..].find(']')?;
    let (lo, hi) = text[inner_start..close].split_once('/')?;
    let bounds = parse_int(lo, i64::MIN, i64::MAX).zip(parse_int(hi, i64::MIN, i64::MAX));
    let (lo, hi) = bounds.unwrap_or((0, 0));
    Some(RandomToken {
        span: at..close + 1,
        lo,
        hi,
    })
}

#[derive(Debug, PartialEq, Eq)]
struct LoopHeader {
    count: u64,
    /// Body text, excluding both braces. `body.end` is the closing `}`.
    body: Range<usize>,
}

/// `<digits>{<block>}` at `at`. `None` when the digits are not followed by
/// `{` or the block is never closed.
fn loop_at(text: &str, at: usize) -> Option<LoopHeader> {
    let digits = text.get(at..)?.bytes().take_while(u8::is_ascii_digit).count();
    let open = at + digits;
    if text.as_bytes().get(open) != Some(&b'{') {
        return None;
    }
    let count = parse_int(&text[at..open], 0, u64::MAX)?;
    let close = matching_brace(text, open + 1)?;
    Some(LoopHeader {
        count,
        body: open + 1..close,
    })
}
