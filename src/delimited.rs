//! Delimited text reader for participant files
//!
//! Reads comma/tab/semicolon separated text with a header row. Quoting
//! follows the usual spreadsheet convention: a field wrapped in double quotes
//! may contain the delimiter, and `""` inside it is a literal quote.

use thiserror::Error;

/// Errors produced while splitting delimited text into records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelimitedError {
    #[error("Input is empty: no header row")]
    Empty,

    #[error("Line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("Line {line}: unexpected character after closing quote")]
    TrailingAfterQuote { line: usize },

    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// One data row with its 1-based line number in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Parsed table: header names plus data records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Position of a header, compared case-insensitively after trimming
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }
}

/// Split a full document into a [`Table`]
///
/// Blank lines are skipped. Every record must have as many fields as the
/// header row.
pub fn parse(text: &str, delimiter: char) -> Result<Table, DelimitedError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.trim().is_empty() {
            continue;
        }
        rows.push(Record {
            line,
            fields: split_line(raw, delimiter, line)?,
        });
    }

    let mut rows = rows.into_iter();
    let header = rows.next().ok_or(DelimitedError::Empty)?;
    let headers: Vec<String> = header
        .fields
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for record in rows {
        if record.fields.len() != headers.len() {
            return Err(DelimitedError::FieldCount {
                line: record.line,
                expected: headers.len(),
                found: record.fields.len(),
            });
        }
        records.push(record);
    }

    Ok(Table { headers, records })
}

/// Split one line into fields, honoring double-quoted fields
fn split_line(raw: &str, delimiter: char, line: usize) -> Result<Vec<String>, DelimitedError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = raw.chars().peekable();
    let mut in_quotes = false;
    let mut after_quote = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                    after_quote = true;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        if c == delimiter {
            fields.push(std::mem::take(&mut field));
            after_quote = false;
        } else if after_quote {
            // Allow padding such as `"a" ,b`
            if !c.is_whitespace() {
                return Err(DelimitedError::TrailingAfterQuote { line });
            }
        } else if c == '"' && field.trim().is_empty() {
            field.clear();
            in_quotes = true;
        } else {
            field.push(c);
        }
    }

    if in_quotes {
        return Err(DelimitedError::UnterminatedQuote { line });
    }
    fields.push(field);

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let table = parse("a,b,c\n1,2,3\n4,5,6\n", ',').unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].fields, vec!["4", "5", "6"]);
        assert_eq!(table.records[1].line, 3);
    }

    #[test]
    fn test_parse_quoted_delimiter_and_escaped_quote() {
        let table = parse("id,note\n1,\"hello, \"\"world\"\"\"\n", ',').unwrap();
        assert_eq!(table.records[0].fields[1], "hello, \"world\"");
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let table = parse("a;b\r\n\r\n1;2\r\n", ';').unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].fields, vec!["1", "2"]);
        assert_eq!(table.records[0].line, 3);
    }

    #[test]
    fn test_parse_strips_bom() {
        let table = parse("\u{feff}id,x\n1,2\n", ',').unwrap();
        assert_eq!(table.column_index("id"), Some(0));
    }

    #[test]
    fn test_parse_tab_delimited() {
        let table = parse("a\tb\n1\t2\n", '\t').unwrap();
        assert_eq!(table.records[0].fields, vec!["1", "2"]);
    }

    #[test]
    fn test_column_index_case_insensitive() {
        let table = parse(" Participant_ID ,AGE\n1,20\n", ',').unwrap();
        assert_eq!(table.column_index("participant_id"), Some(0));
        assert_eq!(table.column_index("age"), Some(1));
        assert_eq!(table.column_index("gender"), None);
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse("", ','), Err(DelimitedError::Empty));
        assert_eq!(parse("\n\n", ','), Err(DelimitedError::Empty));
    }

    #[test]
    fn test_parse_field_count_mismatch() {
        let err = parse("a,b\n1,2\n3\n", ',').unwrap_err();
        assert_eq!(
            err,
            DelimitedError::FieldCount {
                line: 3,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let err = parse("a,b\n1,\"oops\n", ',').unwrap_err();
        assert_eq!(err, DelimitedError::UnterminatedQuote { line: 2 });
    }

    #[test]
    fn test_parse_garbage_after_quote() {
        let err = parse("a,b\n\"x\"y,2\n", ',').unwrap_err();
        assert_eq!(err, DelimitedError::TrailingAfterQuote { line: 2 });
    }
}
