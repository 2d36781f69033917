//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This module contains the input and command definitions for the tool.

use anyhow::{anyhow, Result};
use clap::Parser;
use csv::ReaderBuilder;
use itertools::Itertools;

use std::path::PathBuf;

use crate::fixes::*;

//---------------------------------------------------------------------------//
//                          Struct/Enum Definitions
//---------------------------------------------------------------------------//

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {

    /// Make output more detailed.
    #[arg(short, long)]
    pub verbose: bool,

    /// Report what would be fixed, without writing anything to disk.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Only targets whose name contains this text get their build configurations fixed.
    #[arg(short, long, value_name = "MARKER", default_value = TARGET_MARKER)]
    pub target_marker: String,

    /// Build setting to fix. Can be repeated.
    ///
    /// If none is provided, OTHER_CFLAGS and COMPILER_FLAGS are fixed.
    #[arg(short, long = "setting", value_name = "SETTING")]
    pub settings: Vec<String>,

    /// Flag to replace, followed by its replacement, separated with ;. Can be repeated, and they're applied in order.
    ///
    /// If none is provided, -GCC_WARN_INHIBIT_ALL_WARNINGS is replaced with -w.
    #[arg(short, long = "flag-fix", value_parser = flag_fix_parser, value_name = "FROM;TO", allow_hyphen_values = true)]
    pub flag_fixes: Vec<FlagFix>,

    /// Path of a CSV file where to save a report with every changed setting.
    #[arg(short, long, value_name = "REPORT_PATH")]
    pub report: Option<PathBuf>,

    /// Xcode projects to fix. Paths that don't exist are skipped.
    ///
    /// If none is provided, ios/Pods/Pods.xcodeproj and macos/Pods/Pods.xcodeproj are used.
    #[arg(value_name = "PROJECT_PATH")]
    pub projects: Vec<PathBuf>,
}

//---------------------------------------------------------------------------//
//                             Implementations
//---------------------------------------------------------------------------//

impl Cli {

    pub fn project_paths(&self) -> Vec<PathBuf> {
        if self.projects.is_empty() {
            default_project_paths()
        } else {
            self.projects.clone()
        }
    }

    pub fn fix_options(&self) -> FixOptions {
        let settings = if self.settings.is_empty() {
            default_settings()
        } else {
            self.settings.iter().unique().cloned().collect()
        };

        let flag_fixes = if self.flag_fixes.is_empty() {
            default_flag_fixes()
        } else {
            self.flag_fixes.clone()
        };

        FixOptions::new(self.target_marker.clone(), settings, flag_fixes, self.dry_run)
    }
}

//---------------------------------------------------------------------------//
//                          Custom parsers
//---------------------------------------------------------------------------//

fn flag_fix_parser(src: &str) -> Result<FlagFix> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .quoting(true)
        .has_headers(false)
        .flexible(true)
        .from_reader(src.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) if record.len() == 2 => {
            if record[0].is_empty() {
                return Err(anyhow!("The flag to replace cannot be empty."));
            }

            Ok(FlagFix::new(&record[0], &record[1]))
        }
        Some(Ok(record)) => Err(anyhow!("Expected FROM;TO, but got {} fields.", record.len())),
        _ => Err(anyhow!("Incorrect FROM;TO input.")),
    }
}

//---------------------------------------------------------------------------//
//                                  Tests
//---------------------------------------------------------------------------//
