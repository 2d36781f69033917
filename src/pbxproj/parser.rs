//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Reader for the old-style ASCII property lists Xcode uses for `project.pbxproj` files.
//!
//! The reader keeps the byte span of every string it finds, so values can later be rewritten
//! in place without touching anything else in the file.

use thiserror::Error;

use super::{Dictionary, PlistString, Value};

//---------------------------------------------------------------------------//
//                          Struct/Enum Definitions
//---------------------------------------------------------------------------//

/// Error produced when a project file cannot be parsed. Lines and columns are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("unexpected character '{found}', expected {expected}")]
    UnexpectedChar { found: char, expected: &'static str },

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("invalid data literal")]
    InvalidData,

    #[error("trailing content after the root object")]
    TrailingContent,
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

//---------------------------------------------------------------------------//
//                             Implementations
//---------------------------------------------------------------------------//

/// This function parses an entire property list: a single root value, optionally surrounded by comments.
pub fn parse(source: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(source);

    // Spans stay relative to the full text, BOM included, so edits keep it in place.
    if source.starts_with('\u{feff}') {
        parser.pos = '\u{feff}'.len_utf8();
    }

    parser.skip_trivia()?;
    let value = parser.parse_value()?;
    parser.skip_trivia()?;

    if parser.pos < parser.bytes.len() {
        return Err(parser.error_at(parser.pos, ParseErrorKind::TrailingContent));
    }

    Ok(value)
}

impl<'a> Parser<'a> {

    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        let offset = offset.min(self.bytes.len());
        let line_start = self.bytes[..offset].iter().rposition(|byte| *byte == b'\n').map_or(0, |pos| pos + 1);
        let line = self.bytes[..line_start].iter().filter(|byte| **byte == b'\n').count() + 1;
        let column = self.source.get(line_start..offset).map_or(offset - line_start, |text| text.chars().count()) + 1;

        ParseError { kind, line, column }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.source.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(found) => self.error_at(self.pos, ParseErrorKind::UnexpectedChar { found, expected }),
            None => self.error_at(self.pos, ParseErrorKind::UnexpectedEof),
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Skips whitespace, `// line` comments and `/* block */` comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(byte) = self.peek() {
            match (byte, self.peek_at(1)) {
                (b'/', Some(b'/')) => {
                    self.pos = self.bytes[self.pos..].iter()
                        .position(|byte| *byte == b'\n')
                        .map_or(self.bytes.len(), |end| self.pos + end + 1);
                }
                (b'/', Some(b'*')) => {
                    let start = self.pos;
                    match self.source[start + 2..].find("*/") {
                        Some(end) => self.pos = start + 2 + end + 2,
                        None => return Err(self.error_at(start, ParseErrorKind::UnterminatedComment)),
                    }
                }
                (byte, _) if byte.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }

        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(b'{') => self.parse_dictionary().map(Value::Dictionary),
            Some(b'(') => self.parse_array().map(Value::Array),
            Some(b'<') => self.parse_data().map(Value::Data),
            Some(byte) if byte == b'"' || byte == b'\'' || is_unquoted_char(byte) => self.parse_string().map(Value::String),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_dictionary(&mut self) -> Result<Dictionary, ParseError> {
        self.expect(b'{', "'{'")?;

        let mut dictionary = Dictionary::default();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(dictionary);
            }

            let key = self.parse_string()?;
            self.skip_trivia()?;
            self.expect(b'=', "'='")?;
            self.skip_trivia()?;

            let value = self.parse_value()?;
            self.skip_trivia()?;
            self.expect(b';', "';'")?;

            dictionary.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect(b'(', "'('")?;

        let mut values = vec![];
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(values);
            }

            values.push(self.parse_value()?);
            self.skip_trivia()?;

            // Trailing commas are the norm in Xcode's output.
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {},
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }

    fn parse_data(&mut self) -> Result<Vec<u8>, ParseError> {
        let start = self.pos;
        self.expect(b'<', "'<'")?;

        let mut digits = vec![];
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(byte) if byte.is_ascii_hexdigit() => {
                    digits.push(byte);
                    self.pos += 1;
                }
                Some(byte) if byte.is_ascii_whitespace() => self.pos += 1,
                Some(_) => return Err(self.error_at(self.pos, ParseErrorKind::InvalidData)),
                None => return Err(self.error_at(self.pos, ParseErrorKind::UnexpectedEof)),
            }
        }

        if digits.len() % 2 != 0 {
            return Err(self.error_at(start, ParseErrorKind::InvalidData));
        }

        Ok(digits.chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect())
    }

    fn parse_string(&mut self) -> Result<PlistString, ParseError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.parse_quoted_string(quote),
            Some(byte) if is_unquoted_char(byte) => {
                let start = self.pos;
                while self.peek().is_some_and(is_unquoted_char) {
                    self.pos += 1;
                }

                Ok(PlistString::new(self.source[start..self.pos].to_owned(), start..self.pos, false))
            }
            _ => Err(self.unexpected("a string")),
        }
    }

    fn parse_quoted_string(&mut self, quote: u8) -> Result<PlistString, ParseError> {
        let start = self.pos;
        self.pos += 1;

        let mut value = String::new();
        loop {
            let character = match self.source[self.pos..].chars().next() {
                Some(character) => character,
                None => return Err(self.error_at(start, ParseErrorKind::UnterminatedString)),
            };

            if character == char::from(quote) {
                self.pos += 1;
                break;
            }

            if character == '\\' {
                let escape_start = self.pos;
                self.pos += 1;
                if self.peek().is_none() {
                    return Err(self.error_at(start, ParseErrorKind::UnterminatedString));
                }

                match self.parse_escape() {
                    Some(decoded) => value.push(decoded),
                    None => return Err(self.error_at(escape_start, ParseErrorKind::InvalidEscape)),
                }
            } else {
                value.push(character);
                self.pos += character.len_utf8();
            }
        }

        Ok(PlistString::new(value, start..self.pos, true))
    }

    /// Decodes the escape sequence right after a backslash.
    fn parse_escape(&mut self) -> Option<char> {
        let byte = self.peek()?;
        self.pos += 1;

        let decoded = match byte {
            b'\\' => '\\',
            b'"' => '"',
            b'\'' => '\'',
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'a' => '\u{7}',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'v' => '\u{b}',
            b'U' | b'u' => {
                let code = self.parse_utf16_unit()?;

                // Characters outside the BMP come as a high surrogate followed by an escaped low one.
                if (0xD800..=0xDBFF).contains(&code) {
                    if self.peek() != Some(b'\\') || !matches!(self.peek_at(1), Some(b'U' | b'u')) {
                        return None;
                    }

                    self.pos += 2;
                    let low = self.parse_utf16_unit()?;
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return None;
                    }

                    char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))?
                } else {
                    char::from_u32(code)?
                }
            }
            b'0'..=b'7' => {
                let mut code = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }

                char::from_u32(code)?
            }
            _ => return None,
        };

        Some(decoded)
    }

    /// Reads the four hex digits of a `\U` escape.
    fn parse_utf16_unit(&mut self) -> Option<u32> {
        let digits = self.source.get(self.pos..self.pos + 4)?;
        if !digits.bytes().all(|digit| digit.is_ascii_hexdigit()) {
            return None;
        }

        let code = u32::from_str_radix(digits, 16).ok()?;
        self.pos += 4;
        Some(code)
    }
}

/// Characters NeXTSTEP plists accept in strings without quotes.
fn is_unquoted_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'+' | b'/' | b':' | b'.' | b'-')
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_dictionary(source: &str) -> Dictionary {
        match parse(source) {
            Ok(Value::Dictionary(dictionary)) => dictionary,
            other => panic!("expected a dictionary, got {:?}", other),
        }
    }

    #[test]
    fn parses_nested_structures_and_comments() {
        let source = "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n\tclasses = {\n\t};\n\t/* Begin section */\n\tlist = (\n\t\tBase,\n\t\ten, /* English */\n\t);\n}\n";
        let root = parse_dictionary(source);

        assert_eq!(root.get_str("archiveVersion"), Some("1"));
        assert_eq!(root.get("classes"), Some(&Value::Dictionary(Dictionary::default())));

        let list = root.get("list").and_then(Value::as_array).unwrap();
        let list = list.iter().filter_map(Value::as_str).collect::<Vec<_>>();
        assert_eq!(list, vec!["Base", "en"]);
    }

    #[test]
    fn records_string_spans() {
        let source = "{a = \"b c\"; d = e-f;}";
        let root = parse_dictionary(source);

        let quoted = root.get("a").and_then(Value::as_plist_string).unwrap();
        assert_eq!(quoted.value(), "b c");
        assert_eq!(quoted.span(), &(5..10));
        assert!(quoted.quoted());
        assert_eq!(&source[quoted.span().clone()], "\"b c\"");

        let unquoted = root.get("d").and_then(Value::as_plist_string).unwrap();
        assert_eq!(unquoted.value(), "e-f");
        assert_eq!(&source[unquoted.span().clone()], "e-f");
        assert!(!unquoted.quoted());
    }

    #[test]
    fn decodes_escapes_and_unicode() {
        let root = parse_dictionary(r#"{ a = "x\"y\\z\n\U00e9\101"; b = 'its'; c = "ñandú"; }"#);

        assert_eq!(root.get_str("a"), Some("x\"y\\z\né\u{41}"));
        assert_eq!(root.get_str("b"), Some("its"));
        assert_eq!(root.get_str("c"), Some("ñandú"));

        let root = parse_dictionary(r#"{ emoji = "\UD83D\UDE00!"; }"#);
        assert_eq!(root.get_str("emoji"), Some("😀!"));
    }

    #[test]
    fn rejects_unpaired_surrogates() {
        assert_eq!(parse(r#"{ a = "\UD83D"; }"#).unwrap_err().kind, ParseErrorKind::InvalidEscape);
        assert_eq!(parse(r#"{ a = "\UD83Dx"; }"#).unwrap_err().kind, ParseErrorKind::InvalidEscape);
        assert_eq!(parse(r#"{ a = "\UDE00\UD83D"; }"#).unwrap_err().kind, ParseErrorKind::InvalidEscape);
        assert_eq!(parse(r#"{ a = "\UD83D\U0041"; }"#).unwrap_err().kind, ParseErrorKind::InvalidEscape);
    }

    #[test]
    fn skips_leading_byte_order_mark() {
        let source = "\u{feff}// !$*UTF8*$!\n{ a = \"-x\"; }";
        let root = parse_dictionary(source);

        let string = root.get("a").and_then(Value::as_plist_string).unwrap();
        assert_eq!(string.value(), "-x");
        assert_eq!(&source[string.span().clone()], "\"-x\"");
    }

    #[test]
    fn parses_data_literals() {
        let root = parse_dictionary("{ data = <0fA0 12>; }");
        assert_eq!(root.get("data"), Some(&Value::Data(vec![0x0f, 0xa0, 0x12])));

        let error = parse("{ data = <0fA>; }").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::InvalidData);
    }

    #[test]
    fn reports_missing_semicolon_position() {
        let error = parse("{ a = b }").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::UnexpectedChar { found: '}', expected: "';'" });
        assert_eq!((error.line, error.column), (1, 9));
    }

    #[test]
    fn reports_unterminated_string_position() {
        let error = parse("{\n a = \"b;\n}").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::UnterminatedString);
        assert_eq!((error.line, error.column), (2, 6));
    }

    #[test]
    fn rejects_broken_input() {
        assert_eq!(parse("{ a = b; /* never closed").unwrap_err().kind, ParseErrorKind::UnterminatedComment);
        assert_eq!(parse(r#"{ a = "\q"; }"#).unwrap_err().kind, ParseErrorKind::InvalidEscape);
        assert_eq!(parse("{ a = b;").unwrap_err().kind, ParseErrorKind::UnexpectedEof);
        assert_eq!(parse("( a b )").unwrap_err().kind, ParseErrorKind::UnexpectedChar { found: 'b', expected: "',' or ')'" });

        let error = parse("{} x").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::TrailingContent);
        assert_eq!(error.column, 4);
    }
}
