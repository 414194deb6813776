use crate::constants::FILESYSTEM_PREFIX;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The set of directories that may contain migration scripts for one
/// invocation. Kept sorted and deduplicated so the rendered descriptors are
/// reproducible across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSet {
    directories: BTreeSet<PathBuf>,
}

impl LocationSet {
    /// Parses the comma-separated `locations` value. Relative entries are
    /// anchored at `root_dir`, the configuration file's directory.
    pub fn parse(value: &str, root_dir: &Path) -> Self {
        let directories = value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let path = Path::new(entry);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root_dir.join(path)
                }
            })
            .collect();
        Self { directories }
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    /// Renders the engine's location descriptors, comma-joined. Directories
    /// that do not exist still produce descriptors; the engine validates
    /// existence, not us.
    pub fn descriptor(&self) -> String {
        self.directories
            .iter()
            .map(|dir| format!("{}{}", FILESYSTEM_PREFIX, dir.display()))
            .join(",")
    }

    /// True when no directory contributes a single file: either the set has
    /// no directories at all, or none of the existing ones contains anything.
    /// "Scripts exist but are all applied" is the engine's call, not ours.
    pub fn has_no_scripts(&self) -> bool {
        !self.directories.iter().any(|dir| contains_any_file(dir))
    }
}

fn contains_any_file(dir: &Path) -> bool {
    let Some(pattern) = dir.join("**/*").to_str().map(str::to_owned) else {
        return false;
    };
    glob::glob(&pattern)
        .map(|paths| paths.flatten().any(|path| path.is_file()))
        .unwrap_or(false)
}
