//! File handles and the fixed-layout binary record codec.
//!
//! Text files buffer whole line vectors: `READ` loads the file split on
//! `\r?\n` (dropping the final empty segment a trailing newline
//! produces); `WRITE`/`APPEND` collect lines and flush on close, each
//! line followed by `\n`. Random files hold the entire byte buffer in
//! memory between open and close.
//!
//! Codec layout (little-endian, sizes exact): Integer 4 bytes signed,
//! Real 8 bytes IEEE-754, Boolean 1 byte, Char 4 bytes Unicode scalar,
//! Date 4 bytes signed day-number, Enum 4 bytes signed ordinal; arrays
//! concatenate row-major, records concatenate fields in declared order.

use std::fs;

use crate::date::Date;
use crate::error::{Diagnostic, Fallible};

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

#[derive(Debug)]
pub enum TextState {
    Closed,
    Read { lines: Vec<String>, cursor: usize },
    Write { mode: WriteMode, lines: Vec<String> },
}

#[derive(Debug)]
pub struct TextFile {
    pub path: String,
    pub state: TextState,
}

impl TextFile {
    pub fn closed() -> Self {
        TextFile {
            path: String::new(),
            state: TextState::Closed,
        }
    }

    pub fn open(&mut self, path: &str, mode: &str, line: usize) -> Fallible<()> {
        if !matches!(self.state, TextState::Closed) {
            return Err(Diagnostic::file(line, "File is already open."));
        }
        let state = match mode.to_ascii_uppercase().as_str() {
            "READ" => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Diagnostic::file(line, format!("Cannot open '{path}' for reading: {e}."))
                })?;
                TextState::Read {
                    lines: split_lines(&content),
                    cursor: 0,
                }
            }
            "WRITE" => TextState::Write {
                mode: WriteMode::Truncate,
                lines: Vec::new(),
            },
            "APPEND" => TextState::Write {
                mode: WriteMode::Append,
                lines: Vec::new(),
            },
            other => {
                return Err(Diagnostic::file(line, format!("Invalid file mode '{other}'.")));
            }
        };
        self.path = path.to_string();
        self.state = state;
        Ok(())
    }

    pub fn read_line(&mut self, line: usize) -> Fallible<String> {
        match &mut self.state {
            TextState::Read { lines, cursor } => {
                if *cursor >= lines.len() {
                    return Err(Diagnostic::file(line, "Read past end of file."));
                }
                let text = lines[*cursor].clone();
                *cursor += 1;
                Ok(text)
            }
            _ => Err(Diagnostic::file(line, "File is not open for reading.")),
        }
    }

    pub fn write_line(&mut self, text: String, line: usize) -> Fallible<()> {
        match &mut self.state {
            TextState::Write { lines, .. } => {
                lines.push(text);
                Ok(())
            }
            _ => Err(Diagnostic::file(line, "File is not open for writing.")),
        }
    }

    /// Closed handles and write sessions report end-of-file.
    pub fn eof(&self) -> bool {
        match &self.state {
            TextState::Closed => true,
            TextState::Read { lines, cursor } => *cursor >= lines.len(),
            TextState::Write { .. } => true,
        }
    }

    pub fn close(&mut self, line: usize) -> Fallible<()> {
        match std::mem::replace(&mut self.state, TextState::Closed) {
            TextState::Closed => Err(Diagnostic::file(line, "File is not open.")),
            TextState::Read { .. } => Ok(()),
            TextState::Write { mode, lines } => {
                let mut content: String = lines.iter().map(|l| format!("{l}\n")).collect();
                if mode == WriteMode::Append {
                    let existing = fs::read_to_string(&self.path).unwrap_or_default();
                    content = existing + &content;
                }
                fs::write(&self.path, content).map_err(|e| {
                    Diagnostic::file(line, format!("Cannot write '{}': {e}.", self.path))
                })
            }
        }
    }
}

fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[derive(Debug)]
pub struct RandomFile {
    pub path: String,
    pub record_size: usize,
    pub buffer: Vec<u8>,
    /// 1-based record position.
    pub position: usize,
    pub open: bool,
}

impl RandomFile {
    pub fn closed(record_size: usize) -> Self {
        RandomFile {
            path: String::new(),
            record_size,
            buffer: Vec::new(),
            position: 1,
            open: false,
        }
    }

    pub fn open(&mut self, path: &str, mode: &str, line: usize) -> Fallible<()> {
        if self.open {
            return Err(Diagnostic::file(line, "File is already open."));
        }
        if !mode.eq_ignore_ascii_case("RANDOM") {
            return Err(Diagnostic::file(
                line,
                format!("Invalid file mode '{mode}' for a random file."),
            ));
        }
        self.buffer = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(Diagnostic::file(
                    line,
                    format!("Cannot open '{path}': {e}."),
                ));
            }
        };
        self.path = path.to_string();
        self.position = 1;
        self.open = true;
        Ok(())
    }

    pub fn seek(&mut self, position: i32, line: usize) -> Fallible<()> {
        self.require_open(line)?;
        if position < 1 {
            return Err(Diagnostic::file(
                line,
                format!("Record position {position} is invalid."),
            ));
        }
        self.position = position as usize;
        Ok(())
    }

    pub fn read_record(&self, line: usize) -> Fallible<&[u8]> {
        self.require_open(line)?;
        let start = (self.position - 1) * self.record_size;
        let end = start + self.record_size;
        if end > self.buffer.len() {
            return Err(Diagnostic::file(line, "Read past end of file."));
        }
        Ok(&self.buffer[start..end])
    }

    pub fn write_record(&mut self, bytes: &[u8], line: usize) -> Fallible<()> {
        self.require_open(line)?;
        debug_assert_eq!(bytes.len(), self.record_size);
        let start = (self.position - 1) * self.record_size;
        let end = start + self.record_size;
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn eof(&self) -> bool {
        if !self.open {
            return true;
        }
        self.position > self.buffer.len() / self.record_size.max(1)
    }

    pub fn close(&mut self, line: usize) -> Fallible<()> {
        self.require_open(line)?;
        fs::write(&self.path, &self.buffer)
            .map_err(|e| Diagnostic::file(line, format!("Cannot write '{}': {e}.", self.path)))?;
        self.open = false;
        Ok(())
    }

    fn require_open(&self, line: usize) -> Fallible<()> {
        if self.open {
            Ok(())
        } else {
            Err(Diagnostic::file(line, "File is not open."))
        }
    }
}

// === binary record codec ===

/// Byte size of a value under the fixed codec. The caller guarantees
/// the value's type was statically admitted for random files.
pub fn size_of_value(value: &Value) -> usize {
    match value {
        Value::Integer(_) => 4,
        Value::Real(_) => 8,
        Value::Boolean(_) => 1,
        Value::Char(_) => 4,
        Value::Date(_) => 4,
        Value::Enum(_) => 4,
        Value::Array(array) => array.elems.iter().map(size_of_value).sum(),
        Value::Record(record) => record.fields.iter().map(|(_, v)| size_of_value(v)).sum(),
        _ => unreachable!("checked program: value has fixed size"),
    }
}

pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Real(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Boolean(v) => out.push(u8::from(*v)),
        Value::Char(v) => out.extend_from_slice(&(*v as u32).to_le_bytes()),
        Value::Date(v) => out.extend_from_slice(&v.day_number().to_le_bytes()),
        Value::Enum(v) => out.extend_from_slice(&v.ordinal.to_le_bytes()),
        Value::Array(array) => {
            for elem in &array.elems {
                encode_value(elem, out);
            }
        }
        Value::Record(record) => {
            for (_, field) in &record.fields {
                encode_value(field, out);
            }
        }
        _ => unreachable!("checked program: value has fixed size"),
    }
}

/// Decode bytes into the shape of `template`, validating every scalar.
/// `enum_size` yields the member count of a named enumeration.
pub fn decode_value(
    template: &Value,
    bytes: &[u8],
    offset: &mut usize,
    enum_size: &dyn Fn(&str) -> Option<usize>,
    line: usize,
) -> Fallible<Value> {
    fn take<'b>(bytes: &'b [u8], offset: &mut usize, n: usize) -> &'b [u8] {
        let slice = &bytes[*offset..*offset + n];
        *offset += n;
        slice
    }
    match template {
        Value::Integer(_) => Ok(Value::Integer(i32::from_le_bytes(
            take(bytes, offset, 4).try_into().unwrap(),
        ))),
        Value::Real(_) => {
            let raw = f64::from_le_bytes(take(bytes, offset, 8).try_into().unwrap());
            if raw.is_nan() || raw.is_infinite() {
                return Err(Diagnostic::file(line, "Invalid REAL in record."));
            }
            Ok(Value::Real(raw))
        }
        Value::Boolean(_) => match take(bytes, offset, 1)[0] {
            0 => Ok(Value::Boolean(false)),
            1 => Ok(Value::Boolean(true)),
            _ => Err(Diagnostic::file(line, "Invalid BOOLEAN in record.")),
        },
        Value::Char(_) => {
            let raw = u32::from_le_bytes(take(bytes, offset, 4).try_into().unwrap());
            char::from_u32(raw)
                .map(Value::Char)
                .ok_or_else(|| Diagnostic::file(line, "Invalid CHAR in record."))
        }
        Value::Date(_) => {
            let days = i32::from_le_bytes(take(bytes, offset, 4).try_into().unwrap());
            Date::from_day_number(days, line)
                .map(Value::Date)
                .map_err(|_| Diagnostic::file(line, "Invalid DATE in record."))
        }
        Value::Enum(e) => {
            let ordinal = i32::from_le_bytes(take(bytes, offset, 4).try_into().unwrap());
            let count = enum_size(&e.enum_name).unwrap_or(0);
            if ordinal < 0 || ordinal as usize >= count {
                return Err(Diagnostic::file(line, "Invalid enum ordinal in record."));
            }
            Ok(Value::Enum(super::value::EnumValue {
                enum_name: e.enum_name.clone(),
                ordinal,
            }))
        }
        Value::Array(array) => {
            let mut elems = Vec::with_capacity(array.elems.len());
            for elem in &array.elems {
                elems.push(decode_value(elem, bytes, offset, enum_size, line)?);
            }
            Ok(Value::Array(super::value::ArrayValue {
                bounds: array.bounds.clone(),
                elems,
            }))
        }
        Value::Record(record) => {
            let mut fields = Vec::with_capacity(record.fields.len());
            for (name, field) in &record.fields {
                fields.push((
                    name.clone(),
                    decode_value(field, bytes, offset, enum_size, line)?,
                ));
            }
            Ok(Value::Record(super::value::RecordValue {
                name: record.name.clone(),
                fields,
            }))
        }
        _ => unreachable!("checked program: value has fixed size"),
    }
}
