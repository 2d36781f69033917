//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

use anyhow::Result;
use csv::WriterBuilder;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use std::fs::metadata;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::fixes::Substitution;

const PBXPROJ_FILE_NAME: &str = "project.pbxproj";
const PBXPROJ_EXTENSION: &str = "pbxproj";

const REPORT_HEADERS: [&str; 6] = ["project", "target", "configuration", "setting", "before", "after"];

//-------------------------------------------------------------------------------//
//                             Util functions.
//-------------------------------------------------------------------------------//

/// This function initializes the terminal logger. `RUST_LOG` takes priority over the verbose flag.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();

    // If this fails there may be no subscriber to report it to.
    if let Err(error) = result {
        eprintln!("Logging initialization has failed, some messages may not be shown: {}", error);
    }
}

/// This function returns the path of the file holding the project data.
///
/// Xcode projects are folders, but we also accept paths pointing directly to the file within.
pub fn pbxproj_path(project_path: &Path) -> PathBuf {
    if project_path.extension().is_some_and(|extension| extension == PBXPROJ_EXTENSION) {
        project_path.to_path_buf()
    } else {
        project_path.join(PBXPROJ_FILE_NAME)
    }
}

/// This function writes the provided data to a temporary file next to the destination, then moves it over the destination.
///
/// If the destination already exists, its permissions are kept.
pub fn save_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(folder)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;

    if let Ok(metadata) = metadata(path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }

    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// This function saves the provided substitutions as a CSV file. The header is written even if there are no substitutions.
pub fn save_report(path: &Path, substitutions: &[Substitution]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(REPORT_HEADERS)?;
    for substitution in substitutions {
        writer.serialize(substitution)?;
    }

    writer.flush().map_err(From::from)
}

//-------------------------------------------------------------------------------//
//                                  Tests
//-------------------------------------------------------------------------------//
