/// Field and record codec for the flat tables.
///
/// Two layers:
/// - Opaque text fields (names, titles, notes) are base64-encoded so they can
///   carry commas, quotes, newlines and any Unicode.
/// - Records are comma-delimited. Plain fields that contain a delimiter,
///   quote or line break are double-quoted with `""` escaping, so a hand-edited
///   file written by any CSV tool still reads back.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode a text field for storage.
pub fn encode_field(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decode a stored text field.
///
/// Lenient: input that is not valid base64, or that decodes to invalid UTF-8,
/// is returned unchanged. Plain text typed into the file by hand survives.
pub fn decode_field(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    match STANDARD.decode(value.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

/// Append one record (terminated by `\n`) to `out`.
pub fn write_record<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let field = field.as_ref();
        if needs_quoting(field) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Split file content into records.
///
/// Accepts `\n` and `\r\n` line endings. Quoted fields may span lines.
/// Blank lines produce no record.
pub fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // True once the current line has produced any field content or delimiter.
    let mut line_started = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                line_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                line_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if line_started {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                line_started = false;
            }
            _ => {
                field.push(c);
                line_started = true;
            }
        }
    }

    if line_started {
        record.push(field);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_roundtrip_with_hostile_content() {
        let samples = [
            "",
            "plain",
            "comma, inside",
            "quote \" inside",
            "multi\nline\r\nnotes",
            "Ünïcödé – 日本語 🚀",
            ",,,\n\n\"",
        ];
        for s in samples {
            let encoded = encode_field(s);
            assert!(!encoded.contains([',', '\n', '"']), "encoded {:?}", encoded);
            assert_eq!(decode_field(&encoded), s);
        }
    }

    #[test]
    fn test_decode_falls_back_to_raw_text() {
        assert_eq!(decode_field("not base64!"), "not base64!");
        assert_eq!(decode_field(""), "");
    }

    #[test]
    fn test_record_writer_quotes_only_when_needed() {
        let mut out = String::new();
        write_record(&mut out, &["a", "b,c", "say \"hi\"", ""]);
        assert_eq!(out, "a,\"b,c\",\"say \"\"hi\"\"\",\n");
    }

    #[test]
    fn test_parse_records_handles_quotes_and_crlf() {
        let content = "id,title\r\n1,\"x,y\"\r\n\r\n2,\"line1\nline2\"\n3,\n";
        let records = parse_records(content);
        assert_eq!(
            records,
            vec![
                vec!["id".to_string(), "title".to_string()],
                vec!["1".to_string(), "x,y".to_string()],
                vec!["2".to_string(), "line1\nline2".to_string()],
                vec!["3".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_parse_reads_back_what_writer_produced() {
        let mut out = String::new();
        write_record(&mut out, &["#ff0000", "with \"quotes\", commas", "0"]);
        write_record(&mut out, &["", "", ""]);
        let records = parse_records(&out);
        assert_eq!(records[0][1], "with \"quotes\", commas");
        assert_eq!(records[1], vec![String::new(), String::new(), String::new()]);
    }

    #[test]
    fn test_parse_last_line_without_newline() {
        let records = parse_records("a,b\nc,d");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], vec!["c".to_string(), "d".to_string()]);
    }
}
