//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the in-memory representation of Xcode projects.
//!
//! Projects are never re-serialized. Changes are applied as [`Edit`]s over the original text,
//! so everything we don't explicitly touch stays byte-identical.

use anyhow::{anyhow, Context, Result};
use getset::{CopyGetters, Getters};

use std::fs::read_to_string;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::utils::{pbxproj_path, save_atomically};

use self::parser::parse;
use self::writer::splice;

pub use self::writer::Edit;

mod parser;
mod writer;

//---------------------------------------------------------------------------//
//                          Struct/Enum Definitions
//---------------------------------------------------------------------------//

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    String(PlistString),
    Array(Vec<Value>),
    Dictionary(Dictionary),
    Data(Vec<u8>),
}

/// A string value, with the byte range its literal occupies in the source file (quotes included).
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct PlistString {
    #[getset(get = "pub")]
    value: String,

    #[getset(get = "pub")]
    span: Range<usize>,

    #[getset(get_copy = "pub")]
    quoted: bool,
}

/// Dictionary keeping its entries in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<(PlistString, Value)>,
}

#[derive(Clone, Debug, Getters)]
pub struct Project {

    /// Path of the `project.pbxproj` file.
    #[getset(get = "pub")]
    path: PathBuf,

    /// Current text of the project file, with all applied edits.
    #[getset(get = "pub")]
    source: String,

    /// Root dictionary of the project file.
    root: Dictionary,
}

#[derive(Clone, Copy, Debug)]
pub struct Target<'a> {
    project: &'a Project,
    id: &'a str,
    object: &'a Dictionary,
}

#[derive(Clone, Copy, Debug)]
pub struct BuildConfiguration<'a> {
    id: &'a str,
    object: &'a Dictionary,
}

//---------------------------------------------------------------------------//
//                             Implementations
//---------------------------------------------------------------------------//

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        self.as_plist_string().map(|string| string.value().as_str())
    }

    pub fn as_plist_string(&self) -> Option<&PlistString> {
        match self {
            Self::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }
}

impl PlistString {
    pub fn new(value: String, span: Range<usize>, quoted: bool) -> Self {
        Self { value, span, quoted }
    }
}

impl Dictionary {
    pub fn insert(&mut self, key: PlistString, value: Value) {
        self.entries.push((key, value));
    }

    /// Returns the value of a key. If a key is repeated, the last one wins, like in Xcode.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter()
            .rev()
            .find(|(entry_key, _)| entry_key.value() == key)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

impl Project {

    /// This function opens a project from disk. It accepts either the `.xcodeproj` folder or the `project.pbxproj` file within.
    pub fn open(project_path: &Path) -> Result<Self> {
        let path = pbxproj_path(project_path);
        let source = read_to_string(&path).with_context(|| format!("Error reading project file {}", path.display()))?;
        Self::from_source(path, source)
    }

    pub fn from_source(path: PathBuf, source: String) -> Result<Self> {
        let root = parse_root(&source).with_context(|| format!("Error parsing project file {}", path.display()))?;
        Ok(Self { path, source, root })
    }

    fn objects(&self) -> Result<&Dictionary> {
        self.root.get("objects")
            .and_then(Value::as_dictionary)
            .ok_or_else(|| anyhow!("Project file {} has no objects dictionary.", self.path.display()))
    }

    /// Returns the object with the provided id.
    pub fn object(&self, id: &str) -> Result<&Dictionary> {
        self.objects()?
            .get(id)
            .and_then(Value::as_dictionary)
            .ok_or_else(|| anyhow!("Object {} is referenced but missing in {}.", id, self.path.display()))
    }

    /// Returns the targets of the project, in the order the root `PBXProject` object lists them.
    pub fn targets(&self) -> Result<Vec<Target<'_>>> {
        let root_id = self.root.get_str("rootObject").ok_or_else(|| anyhow!("Project file {} has no rootObject.", self.path.display()))?;
        let root_object = self.object(root_id)?;

        self.references(root_object, "targets")?
            .into_iter()
            .map(|id| self.object(id).map(|object| Target {
                project: self,
                id,
                object,
            }))
            .collect()
    }

    /// Returns the ids listed in an array field of an object. A missing field means no ids.
    fn references<'a>(&self, object: &'a Dictionary, key: &str) -> Result<Vec<&'a str>> {
        match object.get(key) {
            Some(Value::Array(values)) => values.iter()
                .map(|value| value.as_str().ok_or_else(|| anyhow!("Invalid {} reference in {}.", key, self.path.display())))
                .collect(),
            Some(_) => Err(anyhow!("Field {} is not a list in {}.", key, self.path.display())),
            None => Ok(vec![]),
        }
    }

    /// This function applies the provided edits to the project text, and reloads the project from the result.
    pub fn apply(&mut self, edits: &[Edit]) -> Result<()> {
        if edits.is_empty() {
            return Ok(());
        }

        let source = splice(&self.source, edits)?;
        self.root = parse_root(&source).with_context(|| format!("Edits left project file {} unparseable", self.path.display()))?;
        self.source = source;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        save_atomically(&self.path, self.source.as_bytes())
            .with_context(|| format!("Error saving project file {}", self.path.display()))
    }
}

impl<'a> Target<'a> {
    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.object.get_str("name").unwrap_or_default()
    }

    pub fn isa(&self) -> &'a str {
        self.object.get_str("isa").unwrap_or_default()
    }

    /// Returns the build configurations of the target. Targets without configuration list have none.
    pub fn build_configurations(&self) -> Result<Vec<BuildConfiguration<'a>>> {
        let list_id = match self.object.get_str("buildConfigurationList") {
            Some(list_id) => list_id,
            None => return Ok(vec![]),
        };

        let list = self.project.object(list_id)?;
        self.project.references(list, "buildConfigurations")?
            .into_iter()
            .map(|id| self.project.object(id).map(|object| BuildConfiguration {
                id,
                object,
            }))
            .collect()
    }
}

impl<'a> BuildConfiguration<'a> {
    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.object.get_str("name").unwrap_or_default()
    }

    pub fn build_settings(&self) -> Option<&'a Dictionary> {
        self.object.get("buildSettings").and_then(Value::as_dictionary)
    }

    pub fn build_setting(&self, key: &str) -> Option<&'a Value> {
        self.build_settings().and_then(|settings| settings.get(key))
    }
}

fn parse_root(source: &str) -> Result<Dictionary> {
    match parse(source)? {
        Value::Dictionary(root) => Ok(root),
        _ => Err(anyhow!("The root object of a project file must be a dictionary.")),
    }
}

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//
