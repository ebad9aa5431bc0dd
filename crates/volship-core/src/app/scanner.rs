//! Volume scanner: first-level directories under each root path.

use std::fs::ReadDir;
use std::path::PathBuf;

use log::{debug, warn};

use crate::domain::{ScanWarning, WorkItem};

/// Lazy, single-pass walk over the roots, yielding one `WorkItem` per
/// immediate subdirectory.
///
/// A root is listed only when the iterator reaches it. Roots that cannot be
/// listed are logged and skipped. Entry order within a root is whatever the
/// platform's directory listing yields.
pub struct VolumeScan {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, ReadDir)>,
    warnings: Vec<ScanWarning>,
}

/// Start a scan over `roots`, in order.
pub fn scan(roots: Vec<PathBuf>) -> VolumeScan {
    VolumeScan {
        roots: roots.into_iter(),
        current: None,
        warnings: Vec::new(),
    }
}

impl VolumeScan {
    /// Roots that were skipped. Complete only once the iterator is exhausted.
    pub fn into_warnings(self) -> Vec<ScanWarning> {
        self.warnings
    }

    fn open_next_root(&mut self) -> bool {
        for root in self.roots.by_ref() {
            match std::fs::read_dir(&root) {
                Ok(entries) => {
                    debug!("Scanning: [{}]", root.display());
                    self.current = Some((root, entries));
                    return true;
                }
                Err(source) => {
                    let warning = ScanWarning { root, source };
                    warn!("{warning}");
                    self.warnings.push(warning);
                }
            }
        }
        false
    }
}

impl Iterator for VolumeScan {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        loop {
            let Some((root, entries)) = self.current.as_mut() else {
                if !self.open_next_root() {
                    return None;
                }
                continue;
            };

            let Some(entry) = entries.next() else {
                self.current = None;
                continue;
            };

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry in [{}]: {}", root.display(), e);
                    continue;
                }
            };

            let joined = entry.path();
            let path = std::path::absolute(&joined).unwrap_or(joined);
            // Follows symlinks: a link to a directory is a volume too.
            if !path.is_dir() {
                continue;
            }

            match WorkItem::from_dir(path) {
                Some(item) => {
                    debug!("Found valid folder: [{}]", item.source_path.display());
                    return Some(item);
                }
                None => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn names(items: impl IntoIterator<Item = WorkItem>) -> BTreeSet<String> {
        items.into_iter().map(|i| i.display_name).collect()
    }

    #[test]
    fn yields_only_directories() {
        let data = tempfile::tempdir().unwrap();
        fs::create_dir(data.path().join("a")).unwrap();
        fs::create_dir(data.path().join("b")).unwrap();
        fs::write(data.path().join("c.txt"), b"not a volume").unwrap();

        let items: Vec<WorkItem> = scan(vec![data.path().to_path_buf()]).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(
            names(items.clone()),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        for item in &items {
            assert!(item.source_path.is_absolute());
            assert_eq!(item.source_path, data.path().join(&item.display_name));
        }
    }

    #[test]
    fn missing_root_is_skipped_and_recorded() {
        let data = tempfile::tempdir().unwrap();
        fs::create_dir(data.path().join("volume")).unwrap();
        let missing = data.path().join("does-not-exist");

        let mut walk = scan(vec![missing.clone(), data.path().to_path_buf()]);
        let items: Vec<WorkItem> = walk.by_ref().collect();

        assert_eq!(names(items), BTreeSet::from(["volume".to_string()]));
        let warnings = walk.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].root, missing);
    }

    #[test]
    fn root_that_is_a_file_is_skipped() {
        let data = tempfile::tempdir().unwrap();
        let file = data.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let mut walk = scan(vec![file]);
        assert!(walk.next().is_none());
        assert_eq!(walk.into_warnings().len(), 1);
    }

    #[test]
    fn roots_are_walked_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir(first.path().join("one")).unwrap();
        fs::create_dir(second.path().join("two")).unwrap();

        let items: Vec<String> = scan(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ])
        .map(|i| i.display_name)
        .collect();

        assert_eq!(items, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn no_roots_yields_nothing() {
        assert_eq!(scan(Vec::new()).count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_follow_their_target_kind() {
        let data = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        fs::write(data.path().join("file.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(target_dir.path(), data.path().join("dir-link")).unwrap();
        std::os::unix::fs::symlink(data.path().join("file.txt"), data.path().join("file-link"))
            .unwrap();

        let found = names(scan(vec![data.path().to_path_buf()]));
        assert_eq!(found, BTreeSet::from(["dir-link".to_string()]));
    }

    #[test]
    fn listing_is_a_snapshot_per_call() {
        let data = tempfile::tempdir().unwrap();
        fs::create_dir(data.path().join("a")).unwrap();
        assert_eq!(scan(vec![data.path().to_path_buf()]).count(), 1);

        fs::create_dir(data.path().join("b")).unwrap();
        assert_eq!(scan(vec![data.path().to_path_buf()]).count(), 2);
    }
}
