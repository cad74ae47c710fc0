// src/streader.rs
//
// Hand-rolled reader for the model's on-disk data format: a JSON-like
// grammar extended with two domain literals that plain JSON has no room
// for -- Tstamp fractions (`"3/8"`) and pattern-instance references
// (`[14, 2]` tagged by context, not syntax). All model-load parsing goes
// through a Streader; nothing upstream touches raw bytes directly.
//
// The reader is a cursor over a borrowed byte slice, not an allocating
// tokenizer -- it walks forward through whitespace, matches literals by
// byte comparison, and only allocates for the strings and lists it
// actually returns.

use thiserror::Error;

use crate::tstamp::Tstamp;
use crate::value::{PatInstRef, Value};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StreaderError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unexpected byte {found:?} at offset {pos}, expected {expected}")]
    UnexpectedByte {
        pos: usize,
        found: char,
        expected: &'static str,
    },

    #[error("malformed number at offset {0}")]
    MalformedNumber(usize),

    #[error("malformed tstamp literal {0:?} at offset {1}")]
    MalformedTstamp(String, usize),

    #[error("malformed string escape at offset {0}")]
    MalformedEscape(usize),

    #[error("trailing data at offset {0}")]
    TrailingData(usize),
}

pub type StreaderResult<T> = Result<T, StreaderError>;

/// A cursor over a borrowed byte slice of model data.
pub struct Streader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Streader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.skip_ws_peek() >= self.data.len()
    }

    /// Parse a single value and confirm nothing but whitespace follows.
    pub fn read_all(&mut self) -> StreaderResult<Value> {
        let v = self.read_value()?;
        self.skip_ws();
        if self.pos != self.data.len() {
            return Err(StreaderError::TrailingData(self.pos));
        }
        Ok(v)
    }

    pub fn read_value(&mut self) -> StreaderResult<Value> {
        self.skip_ws();
        match self.peek_byte()? {
            b'n' => self.read_literal("null", Value::None),
            b't' => self.read_literal("true", Value::Bool(true)),
            b'f' => self.read_literal("false", Value::Bool(false)),
            b'"' => self.read_string_or_tstamp(),
            b'[' => self.read_list(),
            b'-' | b'0'..=b'9' => self.read_number(),
            other => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: other as char,
                expected: "value",
            }),
        }
    }

    pub fn read_bool(&mut self) -> StreaderResult<bool> {
        match self.read_value()? {
            Value::Bool(b) => Ok(b),
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "bool",
            }),
        }
    }

    pub fn read_int(&mut self) -> StreaderResult<i64> {
        match self.read_value()? {
            Value::Int(i) => Ok(i),
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "int",
            }),
        }
    }

    pub fn read_float(&mut self) -> StreaderResult<f64> {
        match self.read_value()? {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "float",
            }),
        }
    }

    pub fn read_string(&mut self) -> StreaderResult<String> {
        match self.read_value()? {
            Value::String(s) => Ok(s),
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "string",
            }),
        }
    }

    pub fn read_tstamp(&mut self) -> StreaderResult<Tstamp> {
        match self.read_value()? {
            Value::Tstamp(t) => Ok(t),
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "tstamp",
            }),
        }
    }

    /// Read `[a, b]` as a pattern-instance reference. Used by track/order
    /// list data, which embeds these inside otherwise-plain lists.
    pub fn read_pat_inst_ref(&mut self) -> StreaderResult<PatInstRef> {
        match self.read_value()? {
            Value::List(items) if items.len() == 2 => {
                let pattern = items[0]
                    .as_int()
                    .ok_or(StreaderError::MalformedNumber(self.pos))?;
                let instance = items[1]
                    .as_int()
                    .ok_or(StreaderError::MalformedNumber(self.pos))?;
                Ok(PatInstRef { pattern, instance })
            }
            _ => Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: '?',
                expected: "[pattern, instance]",
            }),
        }
    }

    fn read_literal(&mut self, word: &'static str, value: Value) -> StreaderResult<Value> {
        let bytes = word.as_bytes();
        if self.data[self.pos..].starts_with(bytes) {
            self.pos += bytes.len();
            Ok(value)
        } else {
            Err(StreaderError::UnexpectedByte {
                pos: self.pos,
                found: self.data[self.pos] as char,
                expected: word,
            })
        }
    }

    fn read_number(&mut self) -> StreaderResult<Value> {
        let start = self.pos;
        if self.peek_byte()? == b'-' {
            self.pos += 1;
        }
        while matches!(self.peek_byte_opt(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek_byte_opt() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek_byte_opt(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte_opt(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek_byte_opt(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek_byte_opt(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| StreaderError::MalformedNumber(start))?;
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| StreaderError::MalformedNumber(start))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| StreaderError::MalformedNumber(start))
        }
    }

    /// Strings double as Tstamp literals: a quoted body matching
    /// `-?\d+/\d+` is read as a fractional-beat Tstamp instead of a plain
    /// string, mirroring how trigger argument lists embed timestamps.
    fn read_string_or_tstamp(&mut self) -> StreaderResult<Value> {
        let raw = self.read_quoted()?;
        if let Some(t) = parse_tstamp_literal(&raw) {
            Ok(Value::Tstamp(t))
        } else {
            Ok(Value::String(raw))
        }
    }

    fn read_quoted(&mut self) -> StreaderResult<String> {
        debug_assert_eq!(self.peek_byte()?, b'"');
        self.pos += 1;
        let mut out = String::new();
        loop {
            let b = self.peek_byte()?;
            self.pos += 1;
            match b {
                b'"' => return Ok(out),
                b'\\' => {
                    let esc = self.peek_byte()?;
                    self.pos += 1;
                    let ch = match esc {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'/' => '/',
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        _ => return Err(StreaderError::MalformedEscape(self.pos - 1)),
                    };
                    out.push(ch);
                }
                other => out.push(other as char),
            }
        }
    }

    fn read_list(&mut self) -> StreaderResult<Value> {
        debug_assert_eq!(self.peek_byte()?, b'[');
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek_byte()? == b']' {
            self.pos += 1;
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.read_value()?);
            self.skip_ws();
            match self.peek_byte()? {
                b',' => {
                    self.pos += 1;
                    self.skip_ws();
                }
                b']' => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                other => {
                    return Err(StreaderError::UnexpectedByte {
                        pos: self.pos,
                        found: other as char,
                        expected: "',' or ']'",
                    })
                }
            }
        }
    }

    fn peek_byte(&self) -> StreaderResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(StreaderError::UnexpectedEof(self.pos))
    }

    fn peek_byte_opt(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_byte_opt(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn skip_ws_peek(&self) -> usize {
        let mut p = self.pos;
        while matches!(self.data.get(p), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            p += 1;
        }
        p
    }
}

/// Parse a `"beats/denominator"` or plain-integer-beats string as a Tstamp.
/// Returns `None` (falling back to a plain string) if it does not match.
fn parse_tstamp_literal(raw: &str) -> Option<Tstamp> {
    let (num, den) = raw.split_once('/')?;
    let num: i64 = num.parse().ok()?;
    let den: i64 = den.parse().ok()?;
    if den <= 0 {
        return None;
    }
    let beats = num.div_euclid(den);
    let frac_num = num.rem_euclid(den);
    let rem = (frac_num as i128 * crate::tstamp::BEAT_UNITS as i128 / den as i128) as i64;
    Some(Tstamp::new(beats, rem))
}
