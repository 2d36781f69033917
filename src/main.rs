//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! This is a small CLI tool to fix the compiler flags CocoaPods generates for BoringSSL-GRPC.

use clap::Parser;
use itertools::Itertools;
use tracing::{debug, error, info};

use std::process::exit;

use crate::app::Cli;
use crate::fixes::*;
use crate::utils::*;

mod app;
mod fixes;
mod pbxproj;
mod utils;

/// Guess you know what this function does....
fn main() {

    // Parse the entire cli command.
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = cli.fix_options();
    let project_paths = cli.project_paths();

    info!("Fixing {} flags in: {}.", options.target_marker(), project_paths.iter().map(|path| path.display()).join(", "));
    if cli.verbose {
        info!("- Settings: {}.", options.settings().join(", "));
        info!("- Flag fixes: {}.", options.flag_fixes().iter().map(|fix| format!("{} -> {}", fix.from(), fix.to())).join(", "));
    }

    let mut substitutions = vec![];
    for project_path in &project_paths {
        match fix_project_flags(project_path, &options) {
            Ok(FixOutcome::Skipped) => info!("Skipping {} - doesn't exist", project_path.display()),
            Ok(FixOutcome::Unchanged) => info!("No {} flags to fix in {}.", options.target_marker(), project_path.display()),
            Ok(FixOutcome::Fixed(mut fixed)) => {
                for substitution in &fixed {
                    debug!("- {} / {} / {}: \"{}\" -> \"{}\"",
                        substitution.target(),
                        substitution.configuration(),
                        substitution.setting(),
                        substitution.before(),
                        substitution.after()
                    );
                }

                if options.dry_run() {
                    info!("Would fix {} flags for {} (dry run).", options.target_marker(), project_path.display());
                } else {
                    info!("Fixed {} flags for {}!", options.target_marker(), project_path.display());
                }

                substitutions.append(&mut fixed);
            }

            // A broken project stops the run. Later paths are not processed.
            Err(error) => return error_path(&format!("{:#}", error)),
        }
    }

    if let Some(report_path) = &cli.report {
        if let Err(error) = save_report(report_path, &substitutions) {
            return error_path(&format!("Error saving report to {}: {}", report_path.display(), error));
        }

        info!("Report saved to: {}.", report_path.display());
    }

    info!("All done. Closing. Bye!");

    exit(0)
}

fn error_path(error: &str) {
    error!("{}", error);
    exit(1);
}
