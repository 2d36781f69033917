//---------------------------------------------------------------------------//
// Copyright (c) 2025-2025 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Pods Patcher (PodPatcher) project,
// which can be found here: https://github.com/Frodo45127/podpatcher.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/podpatcher/blob/master/LICENSE.
//---------------------------------------------------------------------------//

use std::path::PathBuf;

use super::FlagFix;

/// The pod whose targets get the broken flag.
pub const TARGET_MARKER: &str = "BoringSSL-GRPC";

/// CocoaPods turns the `GCC_WARN_INHIBIT_ALL_WARNINGS` setting into this, which clang rejects.
pub const MALFORMED_FLAG: &str = "-GCC_WARN_INHIBIT_ALL_WARNINGS";
pub const CORRECTIVE_FLAG: &str = "-w";

const AFFECTED_SETTINGS: [&str; 2] = [
    "OTHER_CFLAGS",
    "COMPILER_FLAGS",
];

const PROJECT_PATHS: [&str; 2] = [
    "ios/Pods/Pods.xcodeproj",
    "macos/Pods/Pods.xcodeproj",
];

//-------------------------------------------------------------------------------//
//                             Implementations
//-------------------------------------------------------------------------------//

pub fn default_flag_fixes() -> Vec<FlagFix> {
    vec![FlagFix::new(MALFORMED_FLAG, CORRECTIVE_FLAG)]
}

pub fn default_settings() -> Vec<String> {
    AFFECTED_SETTINGS.iter().map(|setting| setting.to_string()).collect()
}

/// Pods projects of an app with iOS and macOS runners, relative to the app root.
pub fn default_project_paths() -> Vec<PathBuf> {
    PROJECT_PATHS.iter().map(PathBuf::from).collect()
}
