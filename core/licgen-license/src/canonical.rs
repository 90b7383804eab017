//! Canonical byte encoding of a license record (the signature input).
//!
//! The canonical form is compact JSON of the `licenca` object with the field
//! order fixed to `cliente`, `validade` and the date written as `YYYY-MM-DD`:
//!
//! ```text
//! {"cliente":"Acme Corp","validade":"2024-01-31"}
//! ```
//!
//! Licenses produced by the earlier desktop tool were signed over its JSON
//! encoder's default output instead (`", "`/`": "` separators, non-ASCII
//! escaped as `\uXXXX`). [`Encoding::Legacy`] reproduces that text so those
//! licenses can still be checked.

use std::io;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter};

use crate::packet::LicenseRecord;

/// Text encoding of the signed record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Compact JSON, UTF-8, no inserted whitespace. Used for all new signatures.
    #[default]
    Compact,
    /// The earlier tool's encoder output. Verification only.
    Legacy,
}

/// Returns the bytes that are signed and verified for `record`.
#[must_use]
pub fn canonicalize(record: &LicenseRecord) -> Vec<u8> {
    canonicalize_with(record, Encoding::Compact)
}

/// Returns the signed bytes for `record` in the given encoding.
#[must_use]
pub fn canonicalize_with(record: &LicenseRecord, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Compact => encode(record, CompactFormatter),
        Encoding::Legacy => encode(record, LegacyFormatter),
    }
}

fn encode<F: Formatter>(record: &LicenseRecord, formatter: F) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    record
        .serialize(&mut serializer)
        .expect("two-string record always encodes into a Vec");
    out
}

/// Separators `", "` and `": "`; everything outside `' '..='~'` escaped as
/// lowercase `\uXXXX` UTF-16 units.
struct LegacyFormatter;

impl Formatter for LegacyFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
