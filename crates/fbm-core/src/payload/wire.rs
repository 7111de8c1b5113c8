//! Byte-stable JSON encoding for Send API bodies.
//!
//! Bodies are rendered with object keys sorted at every level, `", "` / `": "`
//! separators and non-ASCII characters escaped as `\uXXXX`. Consumers diff the
//! rendered strings, so this layout is part of the wire contract.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::Result;

/// Render any serializable value in the wire layout.
///
/// The value is first lowered to a `serde_json::Value`, whose object map is
/// ordered by key, so field declaration order never leaks into the output.
pub fn to_wire_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value)?;
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, WireFormatter);
    tree.serialize(&mut ser)?;
    // The formatter only ever emits ASCII.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WireFormatter;

impl Formatter for WireFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
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
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
                continue;
            }
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_and_spaces_separators() {
        let v = json!({"b": [1, 2], "a": {"z": null, "y": true}});
        assert_eq!(
            to_wire_string(&v).unwrap(),
            r#"{"a": {"y": true, "z": null}, "b": [1, 2]}"#
        );
    }

    #[test]
    fn escapes_non_ascii_text() {
        let v = json!({"text": "caf\u{e9} \u{1f600}"});
        assert_eq!(
            to_wire_string(&v).unwrap(),
            r#"{"text": "caf\u00e9 \ud83d\ude00"}"#
        );
    }

    #[test]
    fn keeps_standard_escapes() {
        let v = json!("line\n\"quoted\"");
        assert_eq!(to_wire_string(&v).unwrap(), r#""line\n\"quoted\"""#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(to_wire_string(&json!({})).unwrap(), "{}");
        assert_eq!(to_wire_string(&json!([])).unwrap(), "[]");
    }
}
