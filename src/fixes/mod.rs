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
use getset::{CopyGetters, Getters};
use serde::Serialize;
use tracing::debug;

use std::collections::HashSet;
use std::path::Path;

use crate::pbxproj::{Edit, PlistString, Project, Value};

pub use self::boring_ssl::*;

mod boring_ssl;

//-------------------------------------------------------------------------------//
//                          Struct/Enum Definitions
//-------------------------------------------------------------------------------//

/// A flag to replace, and what to replace it with.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct FlagFix {
    from: String,
    to: String,
}

#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct FixOptions {

    /// Substring a target name has to contain to get its configurations patched.
    #[getset(get = "pub")]
    target_marker: String,

    /// Build settings to patch.
    #[getset(get = "pub")]
    settings: Vec<String>,

    /// Replacements to perform, in order.
    #[getset(get = "pub")]
    flag_fixes: Vec<FlagFix>,

    /// If true, nothing is written to disk.
    #[getset(get_copy = "pub")]
    dry_run: bool,
}

/// A single changed build setting value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Getters)]
#[getset(get = "pub")]
pub struct Substitution {
    project: String,
    target: String,
    configuration: String,
    setting: String,
    before: String,
    after: String,

    #[serde(skip)]
    edit: Edit,
}

#[derive(Debug)]
pub enum FixOutcome {

    /// The project path doesn't exist.
    Skipped,

    /// The project exists, but had nothing to fix.
    Unchanged,

    /// The project had the listed settings fixed (or would have, on dry runs).
    Fixed(Vec<Substitution>),
}

//-------------------------------------------------------------------------------//
//                             Implementations
//-------------------------------------------------------------------------------//

impl FlagFix {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_owned(),
            to: to.to_owned(),
        }
    }

    /// Replaces every occurrence of the flag in the provided value.
    pub fn apply(&self, value: &str) -> String {
        if self.from.is_empty() {
            value.to_owned()
        } else {
            value.replace(&self.from, &self.to)
        }
    }
}

impl FixOptions {
    pub fn new(target_marker: String, settings: Vec<String>, flag_fixes: Vec<FlagFix>, dry_run: bool) -> Self {
        Self {
            target_marker,
            settings,
            flag_fixes,
            dry_run,
        }
    }
}

impl Default for FixOptions {
    fn default() -> Self {
        Self::new(TARGET_MARKER.to_owned(), default_settings(), default_flag_fixes(), false)
    }
}

/// This function fixes the flags of the project at the provided path, saving it back to disk if anything changed.
pub fn fix_project_flags(project_path: &Path, options: &FixOptions) -> Result<FixOutcome> {
    if !project_path.exists() {
        return Ok(FixOutcome::Skipped);
    }

    let mut project = Project::open(project_path)?;
    let substitutions = prepare_substitutions(&project, project_path, options)?;
    if substitutions.is_empty() {
        return Ok(FixOutcome::Unchanged);
    }

    if !options.dry_run {
        let edits = substitutions.iter()
            .map(|substitution| substitution.edit.clone())
            .collect::<Vec<_>>();

        project.apply(&edits)?;
        project.save()?;
    }

    Ok(FixOutcome::Fixed(substitutions))
}

/// This function finds all the setting values the provided options would change in a project, without changing them.
pub fn prepare_substitutions(project: &Project, project_path: &Path, options: &FixOptions) -> Result<Vec<Substitution>> {
    let mut substitutions = vec![];

    // Configuration lists can be shared between targets, so make sure we never edit the same value twice.
    let mut seen = HashSet::new();

    for target in project.targets()? {
        if !target.name().contains(options.target_marker.as_str()) {
            continue;
        }

        debug!("- Target {} ({}, {}) matches {}.", target.name(), target.isa(), target.id(), options.target_marker);

        for configuration in target.build_configurations()? {
            debug!("  - Checking configuration {} ({}).", configuration.name(), configuration.id());

            for setting in &options.settings {
                let value = match configuration.build_setting(setting) {
                    Some(value) => value,
                    None => continue,
                };

                let strings = match value.as_array() {
                    Some(values) => values.iter().filter_map(Value::as_plist_string).collect::<Vec<_>>(),
                    None => value.as_plist_string().into_iter().collect(),
                };

                for string in strings {
                    if !seen.insert(string.span().clone()) {
                        continue;
                    }

                    if let Some(after) = fix_flags(string, &options.flag_fixes) {
                        substitutions.push(Substitution {
                            project: project_path.display().to_string(),
                            target: target.name().to_owned(),
                            configuration: configuration.name().to_owned(),
                            setting: setting.to_owned(),
                            before: string.value().to_owned(),
                            after: after.clone(),
                            edit: Edit::replace_string(string, &after),
                        });
                    }
                }
            }
        }
    }

    Ok(substitutions)
}

/// Applies all the fixes to a string. Returns the new value only if it changed.
fn fix_flags(string: &PlistString, flag_fixes: &[FlagFix]) -> Option<String> {
    let fixed = flag_fixes.iter().fold(string.value().to_owned(), |value, fix| fix.apply(&value));
    if &fixed != string.value() {
        Some(fixed)
    } else {
        None
    }
}

//-------------------------------------------------------------------------------//
//                                  Tests
//-------------------------------------------------------------------------------//

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{create_dir_all, read_to_string, write};
    use std::path::PathBuf;

    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../tests/fixtures/Pods.xcodeproj/project.pbxproj");

    fn fixture_project(folder: &TempDir) -> PathBuf {
        let project_path = folder.path().join("ios/Pods/Pods.xcodeproj");
        create_dir_all(&project_path).unwrap();
        write(project_path.join("project.pbxproj"), FIXTURE).unwrap();
        project_path
    }

    fn saved_source(project_path: &Path) -> String {
        read_to_string(project_path.join("project.pbxproj")).unwrap()
    }

    #[test]
    fn replaces_malformed_flags_in_matching_targets() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);

        let substitutions = match fix_project_flags(&project_path, &FixOptions::default()).unwrap() {
            FixOutcome::Fixed(substitutions) => substitutions,
            outcome => panic!("expected the project to be fixed, got {:?}", outcome),
        };

        let changes = substitutions.iter()
            .map(|substitution| (substitution.configuration().as_str(), substitution.setting().as_str(), substitution.after().as_str()))
            .collect::<Vec<_>>();

        assert_eq!(changes, vec![
            ("Debug", "OTHER_CFLAGS", "-w"),
            ("Debug", "COMPILER_FLAGS", "-w -fno-objc-arc"),
            ("Release", "OTHER_CFLAGS", "-DOPENSSL_NO_ASM -w -w"),
        ]);
        assert!(substitutions.iter().all(|substitution| substitution.target() == "BoringSSL-GRPC"));

        let source = saved_source(&project_path);
        assert!(source.contains("COMPILER_FLAGS = \"-w -fno-objc-arc\";"));
        assert!(source.contains("\t\t\t\t\t\"$(inherited)\",\n\t\t\t\t\t\"-w\",\n\t\t\t\t\t\"-DOPENSSL_NO_ASM\",\n"));
        assert!(source.contains("OTHER_CFLAGS = \"-DOPENSSL_NO_ASM -w -w\";"));
        assert_eq!(source.len(), FIXTURE.len() - 4 * (MALFORMED_FLAG.len() - CORRECTIVE_FLAG.len()));
    }

    #[test]
    fn leaves_unrelated_settings_and_targets_untouched() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);

        fix_project_flags(&project_path, &FixOptions::default()).unwrap();
        let source = saved_source(&project_path);

        // Linker flags of the matching target, per-file flags, other targets and the project itself keep the flag.
        assert_eq!(source.matches(MALFORMED_FLAG).count(), 4);
        assert!(source.contains("OTHER_LDFLAGS = \"-GCC_WARN_INHIBIT_ALL_WARNINGS\";"));
        assert!(source.contains("settings = {COMPILER_FLAGS = \"-DOPENSSL_NO_ASM -GCC_WARN_INHIBIT_ALL_WARNINGS\"; };"));
        assert!(source.contains("OTHER_CFLAGS = \"-GCC_WARN_INHIBIT_ALL_WARNINGS -DGRPC_ARES=0\";"));
        assert!(source.contains("GCC_WARN_INHIBIT_ALL_WARNINGS = YES;"));

        // Nothing before the first edited value moved.
        let first_edit = FIXTURE.find("COMPILER_FLAGS = \"-GCC_WARN_INHIBIT_ALL_WARNINGS -fno-objc-arc\"").unwrap();
        assert_eq!(&source[..first_edit], &FIXTURE[..first_edit]);
    }

    #[test]
    fn skips_missing_projects_without_creating_anything() {
        let folder = TempDir::new().unwrap();
        let project_path = folder.path().join("macos/Pods/Pods.xcodeproj");

        let outcome = fix_project_flags(&project_path, &FixOptions::default()).unwrap();
        assert!(matches!(outcome, FixOutcome::Skipped));
        assert!(!folder.path().join("macos").exists());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);

        assert!(matches!(fix_project_flags(&project_path, &FixOptions::default()).unwrap(), FixOutcome::Fixed(_)));
        let first_run = saved_source(&project_path);

        assert!(matches!(fix_project_flags(&project_path, &FixOptions::default()).unwrap(), FixOutcome::Unchanged));
        assert_eq!(saved_source(&project_path), first_run);
    }

    #[test]
    fn dry_runs_do_not_write() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);
        let options = FixOptions::new(TARGET_MARKER.to_owned(), default_settings(), default_flag_fixes(), true);

        match fix_project_flags(&project_path, &options).unwrap() {
            FixOutcome::Fixed(substitutions) => assert_eq!(substitutions.len(), 3),
            outcome => panic!("expected a dry run report, got {:?}", outcome),
        }

        assert_eq!(saved_source(&project_path), FIXTURE);
    }

    #[test]
    fn honors_custom_markers_settings_and_fixes() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);
        let options = FixOptions::new(
            "gRPC-Core".to_owned(),
            vec!["OTHER_CFLAGS".to_owned(), "OTHER_CFLAGS".to_owned()],
            vec![FlagFix::new(MALFORMED_FLAG, CORRECTIVE_FLAG), FlagFix::new("-DGRPC_ARES=0", "-DGRPC_ARES=1")],
            false,
        );

        match fix_project_flags(&project_path, &options).unwrap() {
            FixOutcome::Fixed(substitutions) => {
                assert_eq!(substitutions.len(), 1);
                assert_eq!(substitutions[0].before(), "-GCC_WARN_INHIBIT_ALL_WARNINGS -DGRPC_ARES=0");
                assert_eq!(substitutions[0].after(), "-w -DGRPC_ARES=1");
            }
            outcome => panic!("expected the project to be fixed, got {:?}", outcome),
        }

        let source = saved_source(&project_path);
        assert!(source.contains("OTHER_CFLAGS = \"-w -DGRPC_ARES=1\";"));
        assert!(source.contains("COMPILER_FLAGS = \"-GCC_WARN_INHIBIT_ALL_WARNINGS -fno-objc-arc\";"));
    }

    #[test]
    fn projects_without_matching_targets_are_unchanged() {
        let folder = TempDir::new().unwrap();
        let project_path = fixture_project(&folder);
        let options = FixOptions::new("Firebase".to_owned(), default_settings(), default_flag_fixes(), false);

        assert!(matches!(fix_project_flags(&project_path, &options).unwrap(), FixOutcome::Unchanged));
        assert_eq!(saved_source(&project_path), FIXTURE);
    }

    #[test]
    fn broken_projects_are_errors() {
        let folder = TempDir::new().unwrap();
        let project_path = folder.path().join("Pods.xcodeproj");
        create_dir_all(&project_path).unwrap();

        // Folder without project file.
        assert!(fix_project_flags(&project_path, &FixOptions::default()).is_err());

        write(project_path.join("project.pbxproj"), "{ objects = { ").unwrap();
        let error = fix_project_flags(&project_path, &FixOptions::default()).unwrap_err();

        // The context and the cause get joined with ": ", so the context must not end a sentence.
        let message = format!("{:#}", error);
        assert!(message.starts_with("Error parsing project file "));
        assert!(message.ends_with("project.pbxproj: unexpected end of file at line 1, column 15"));
    }

    #[test]
    fn values_shared_between_targets_are_fixed_once() {
        let folder = TempDir::new().unwrap();
        let project_path = folder.path().join("project.pbxproj");
        let source = "// !$*UTF8*$!
{
	objects = {
		P = {isa = PBXProject; targets = (T1, T2, ); };
		T1 = {isa = PBXNativeTarget; buildConfigurationList = L; name = \"BoringSSL-GRPC\"; };
		T2 = {isa = PBXNativeTarget; buildConfigurationList = L; name = \"BoringSSL-GRPC-Privacy\"; };
		L = {isa = XCConfigurationList; buildConfigurations = (C, ); };
		C = {isa = XCBuildConfiguration; buildSettings = {OTHER_CFLAGS = \"-GCC_WARN_INHIBIT_ALL_WARNINGS\"; }; name = Release; };
	};
	rootObject = P;
}
";
        write(&project_path, source).unwrap();

        match fix_project_flags(&project_path, &FixOptions::default()).unwrap() {
            FixOutcome::Fixed(substitutions) => {
                assert_eq!(substitutions.len(), 1);
                assert_eq!(substitutions[0].target(), "BoringSSL-GRPC");
            }
            outcome => panic!("expected the project to be fixed, got {:?}", outcome),
        }

        let saved = read_to_string(&project_path).unwrap();
        assert_eq!(saved, source.replace(MALFORMED_FLAG, CORRECTIVE_FLAG));
    }

    #[test]
    fn empty_flags_are_never_replaced() {
        assert_eq!(FlagFix::new("", "-w").apply("-O2"), "-O2");
        assert_eq!(FlagFix::new("-a", "-b").apply("-a -c -a"), "-b -c -b");
    }
}
