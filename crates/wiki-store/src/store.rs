//! Filesystem-backed page store (C2).
//!
//! Grounded on `crates/edge/src/fs/scan.rs` (walkdir enumeration, file
//! read/write helpers) and `crates/domain/src/doc.rs` (value-object
//! documents). Atomic commit is a temp-file-then-rename dance in the same
//! directory as the target, so a crash mid-write never leaves a torn file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use wiki_core::{Identifier, Page, Version};

use crate::error::Error;
use crate::locks::WriteLocks;

/// Injected seam so higher layers (templates, render pipeline, tests) can
/// depend on a trait rather than the concrete filesystem store.
pub trait PageStore: Send + Sync {
    fn read(&self, id: &Identifier) -> Result<Page, Error>;
    fn write(&self, id: &Identifier, text: String) -> Result<Page, Error>;
    fn delete(&self, id: &Identifier) -> Result<(), Error>;
    fn exists(&self, id: &Identifier) -> bool;
    fn history(&self, id: &Identifier) -> Result<Vec<Version>, Error>;
    fn read_version(&self, id: &Identifier, mod_time: DateTime<Utc>) -> Result<Version, Error>;
    /// All non-tombstoned identifiers currently in the store.
    fn enumerate(&self) -> Result<Vec<Identifier>, Error>;
}

pub struct FsPageStore {
    root: PathBuf,
    locks: WriteLocks,
}

impl FsPageStore {
    pub fn new(root: impl Into<PathBuf>, write_stripes: usize) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(root.join("pages"))?;
        fs::create_dir_all(root.join("history"))?;
        fs::create_dir_all(root.join("tombstones"))?;
        Ok(Self {
            root,
            locks: WriteLocks::new(write_stripes),
        })
    }

    fn page_path(&self, id: &Identifier) -> PathBuf {
        self.root.join("pages").join(format!("{}.md", id.as_str()))
    }

    fn history_dir(&self, id: &Identifier) -> PathBuf {
        self.root.join("history").join(id.as_str())
    }

    fn tombstone_path(&self, id: &Identifier) -> PathBuf {
        self.root.join("tombstones").join(id.as_str())
    }

    fn is_tombstoned(&self, id: &Identifier) -> bool {
        self.tombstone_path(id).exists()
    }

    fn mod_time_of(path: &Path) -> Result<DateTime<Utc>, Error> {
        let meta = fs::metadata(path)?;
        Ok(DateTime::from(meta.modified()?))
    }

    fn read_uncontested(&self, id: &Identifier) -> Result<Page, Error> {
        let path = self.page_path(id);
        let text = fs::read_to_string(&path)?;
        let mod_time = Self::mod_time_of(&path)?;
        Ok(Page::from_text(id.clone(), text, mod_time))
    }

    fn stamp_history(&self, id: &Identifier, version: &Version) -> Result<(), Error> {
        let dir = self.history_dir(id);
        fs::create_dir_all(&dir)?;
        let stamp = version.mod_time.to_rfc3339().replace(':', "-");
        let path = dir.join(format!("{stamp}.md"));
        atomic_write(&dir, &path, &version.text)?;
        Ok(())
    }
}

/// Write `contents` to `path` by creating a temp file in `dir` (same
/// filesystem as `path`, so the final rename is atomic) and persisting it.
fn atomic_write(dir: &Path, path: &Path, contents: &str) -> Result<(), Error> {
    use std::io::Write;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

impl PageStore for FsPageStore {
    fn read(&self, id: &Identifier) -> Result<Page, Error> {
        if self.is_tombstoned(id) {
            return Err(Error::NotFound(id.as_str().to_string()));
        }
        let path = self.page_path(id);
        if !path.exists() {
            return Err(Error::NotFound(id.as_str().to_string()));
        }
        self.read_uncontested(id)
    }

    fn write(&self, id: &Identifier, text: String) -> Result<Page, Error> {
        let _guard = self.locks.lock_for(id);

        let path = self.page_path(id);
        if path.exists() {
            let previous = self.read_uncontested(id)?;
            self.stamp_history(
                id,
                &Version { text: previous.text, mod_time: previous.mod_time },
            )?;
        }

        atomic_write(&self.root.join("pages"), &path, &text)?;

        let tombstone = self.tombstone_path(id);
        if tombstone.exists() {
            fs::remove_file(&tombstone)?;
            debug!(identifier = id.as_str(), "write resurrected tombstoned page");
        }

        self.read_uncontested(id)
    }

    fn delete(&self, id: &Identifier) -> Result<(), Error> {
        let _guard = self.locks.lock_for(id);

        let path = self.page_path(id);
        if !path.exists() || self.is_tombstoned(id) {
            return Err(Error::NotFound(id.as_str().to_string()));
        }

        let current = self.read_uncontested(id)?;
        self.stamp_history(id, &Version { text: current.text, mod_time: current.mod_time })?;

        fs::create_dir_all(self.tombstone_path(id).parent().unwrap())?;
        fs::write(self.tombstone_path(id), b"")?;
        Ok(())
    }

    fn exists(&self, id: &Identifier) -> bool {
        self.page_path(id).exists() && !self.is_tombstoned(id)
    }

    fn history(&self, id: &Identifier) -> Result<Vec<Version>, Error> {
        let dir = self.history_dir(id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let mod_time = Self::mod_time_of(&path)?;
            versions.push(Version { text, mod_time });
        }
        versions.sort_by_key(|v| v.mod_time);
        Ok(versions)
    }

    fn read_version(&self, id: &Identifier, mod_time: DateTime<Utc>) -> Result<Version, Error> {
        self.history(id)?
            .into_iter()
            .find(|v| v.mod_time == mod_time)
            .ok_or_else(|| Error::NotFound(format!("{id}@{mod_time}")))
    }

    fn enumerate(&self) -> Result<Vec<Identifier>, Error> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(self.root.join("pages"))
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Identifier::normalize(stem) {
                Ok(id) if !self.is_tombstoned(&id) => out.push(id),
                Ok(_) => {}
                Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unparsable page file"),
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsPageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPageStore::new(dir.path(), 4).unwrap();
        (dir, store)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, store) = store();
        let id = Identifier::normalize("garage").unwrap();
        store.write(&id, "+++\ntitle = \"Garage\"\n+++\nhello\n".to_string()).unwrap();
        let page = store.read(&id).unwrap();
        assert_eq!(page.body, "hello\n");
    }

    #[test]
    fn read_missing_page_is_not_found() {
        let (_dir, store) = store();
        let id = Identifier::normalize("missing").unwrap();
        assert!(matches!(store.read(&id), Err(Error::NotFound(_))));
    }

    #[test]
    fn second_write_preserves_prior_version_in_history() {
        let (_dir, store) = store();
        let id = Identifier::normalize("garage").unwrap();
        store.write(&id, "first\n".to_string()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.write(&id, "second\n".to_string()).unwrap();

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "first\n");

        let current = store.read(&id).unwrap();
        assert_eq!(current.body, "second\n");
    }

    #[test]
    fn delete_tombstones_but_keeps_history() {
        let (_dir, store) = store();
        let id = Identifier::normalize("garage").unwrap();
        store.write(&id, "first\n".to_string()).unwrap();
        store.delete(&id).unwrap();

        assert!(matches!(store.read(&id), Err(Error::NotFound(_))));
        assert!(!store.exists(&id));
        assert_eq!(store.history(&id).unwrap().len(), 1);
        assert!(!store.enumerate().unwrap().contains(&id));
    }

    #[test]
    fn write_after_delete_resurrects_the_page() {
        let (_dir, store) = store();
        let id = Identifier::normalize("garage").unwrap();
        store.write(&id, "first\n".to_string()).unwrap();
        store.delete(&id).unwrap();
        store.write(&id, "reborn\n".to_string()).unwrap();

        let page = store.read(&id).unwrap();
        assert_eq!(page.body, "reborn\n");
        assert!(store.exists(&id));
    }

    #[test]
    fn enumerate_lists_all_non_deleted_identifiers() {
        let (_dir, store) = store();
        let a = Identifier::normalize("alpha").unwrap();
        let b = Identifier::normalize("beta").unwrap();
        store.write(&a, "a\n".to_string()).unwrap();
        store.write(&b, "b\n".to_string()).unwrap();
        store.delete(&b).unwrap();

        let ids = store.enumerate().unwrap();
        assert_eq!(ids, vec![a]);
    }
}
