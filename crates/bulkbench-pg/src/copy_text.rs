//! PostgreSQL text-format COPY encoding.
//!
//! Fields are separated by a tab and records terminated by a newline. A
//! backslash, tab, newline or carriage return inside a field is written as a
//! backslash escape (`\\`, `\t`, `\n`, `\r`) so the server reconstructs the
//! exact original value.

use bulkbench_core::{BenchError, BenchResult, SyntheticRow};

pub const FIELD_DELIMITER: u8 = b'\t';
pub const RECORD_TERMINATOR: u8 = b'\n';

/// Appends one field to `out`, escaping as COPY text format requires.
fn push_escaped(out: &mut Vec<u8>, field: &str) {
    for &byte in field.as_bytes() {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            other => out.push(other),
        }
    }
}

/// Encodes rows as `key<TAB>payload<LF>` records.
pub fn encode_rows(rows: &[SyntheticRow]) -> Vec<u8> {
    let estimated = rows
        .iter()
        .map(|row| row.key.len() + row.payload.len() + 2)
        .sum();
    let mut out = Vec::with_capacity(estimated);
    for row in rows {
        push_escaped(&mut out, &row.key);
        out.push(FIELD_DELIMITER);
        push_escaped(&mut out, &row.payload);
        out.push(RECORD_TERMINATOR);
    }
    out
}

/// Decodes a buffer produced by [`encode_rows`] back into `(key, payload)` pairs.
pub fn decode_rows(buffer: &[u8]) -> BenchResult<Vec<(String, String)>> {
    let text = std::str::from_utf8(buffer)
        .map_err(|err| BenchError::write(format!("COPY buffer is not UTF-8: {err}")))?;

    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::with_capacity(2);
    let mut current = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let unescaped = match chars.next() {
                    Some('\\') => '\\',
                    Some('t') => '\t',
                    Some('n') => '\n',
                    Some('r') => '\r',
                    Some(other) => {
                        return Err(BenchError::write(format!(
                            "unsupported escape sequence `\\{other}` in COPY buffer"
                        )))
                    }
                    None => {
                        return Err(BenchError::write("dangling escape at end of COPY buffer"))
                    }
                };
                current.push(unescaped);
            }
            '\t' => fields.push(std::mem::take(&mut current)),
            '\n' => {
                fields.push(std::mem::take(&mut current));
                let record = std::mem::take(&mut fields);
                let [key, payload]: [String; 2] = record.try_into().map_err(|r: Vec<String>| {
                    BenchError::write(format!("COPY record has {} fields, expected 2", r.len()))
                })?;
                rows.push((key, payload));
            }
            other => current.push(other),
        }
    }

    if !current.is_empty() || !fields.is_empty() {
        return Err(BenchError::write("COPY buffer ends without a record terminator"));
    }

    Ok(rows)
}
