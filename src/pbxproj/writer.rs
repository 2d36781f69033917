//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

use anyhow::{anyhow, Result};
use getset::Getters;
use itertools::Itertools;

use std::ops::Range;

use super::PlistString;

//---------------------------------------------------------------------------//
//                          Struct/Enum Definitions
//---------------------------------------------------------------------------//

/// A replacement of a byte range of a project file.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Edit {
    span: Range<usize>,
    text: String,
}

//---------------------------------------------------------------------------//
//                             Implementations
//---------------------------------------------------------------------------//

impl Edit {
    pub fn new(span: Range<usize>, text: String) -> Self {
        Self { span, text }
    }

    /// Edit that swaps the literal of an already parsed string for a new value, keeping its quoting style when possible.
    pub fn replace_string(string: &PlistString, value: &str) -> Self {
        Self::new(string.span().clone(), encode_string(value, string.quoted()))
    }
}

/// This function encodes a string as a plist literal.
///
/// Bare output is only used if the literal we're replacing was bare too, and Xcode would leave the new value unquoted.
pub fn encode_string(value: &str, quoted: bool) -> String {
    if !quoted && !value.is_empty() && value.bytes().all(is_bare_char) {
        return value.to_owned();
    }

    let mut encoded = String::with_capacity(value.len() + 2);
    encoded.push('"');
    for character in value.chars() {
        match character {
            '\\' => encoded.push_str("\\\\"),
            '"' => encoded.push_str("\\\""),
            '\n' => encoded.push_str("\\n"),
            '\t' => encoded.push_str("\\t"),
            '\r' => encoded.push_str("\\r"),
            _ => encoded.push(character),
        }
    }
    encoded.push('"');
    encoded
}

/// This function applies a list of edits to the provided text. Everything outside the edited ranges is kept byte by byte.
pub fn splice(source: &str, edits: &[Edit]) -> Result<String> {
    let mut output = String::with_capacity(source.len());
    let mut cursor = 0;

    for edit in edits.iter().sorted_by_key(|edit| edit.span.start) {
        if edit.span.start < cursor {
            return Err(anyhow!("Overlapping edits found at byte {}.", edit.span.start));
        }

        if edit.span.end < edit.span.start || source.get(edit.span.clone()).is_none() {
            return Err(anyhow!("Edit range {:?} is not valid for a file of {} bytes.", edit.span, source.len()));
        }

        output.push_str(&source[cursor..edit.span.start]);
        output.push_str(&edit.text);
        cursor = edit.span.end;
    }

    output.push_str(&source[cursor..]);
    Ok(output)
}

/// Characters Xcode writes without quotes.
fn is_bare_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'/' | b':' | b'.')
}

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//
