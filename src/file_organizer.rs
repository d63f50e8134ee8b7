/// Moving files into category directories.
///
/// This module provides the three filesystem steps of sorting a file: computing a
/// collision-free name inside the destination, creating the destination on
/// demand, and relocating the file (rename, or copy and delete across volumes).
use crate::file_category::Category;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file found by a directory scan, alive for one classify-and-move pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// The full path to the file.
    pub path: PathBuf,
    /// The file name, as found in the watched directory.
    pub name: String,
    /// Size in bytes at scan time.
    pub size: u64,
}

/// A move that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Where the file was before the move.
    pub original_path: PathBuf,
    /// Where the file is now.
    pub new_path: PathBuf,
    pub category: Category,
}

impl MoveRecord {
    /// True if the file had to be renamed to avoid a collision.
    pub fn was_renamed(&self) -> bool {
        self.original_path.file_name() != self.new_path.file_name()
    }
}

/// Errors that can occur while sorting a single file.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Failed to create directory {}: {error}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Failed to move {} to {}: {error}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Splits a filename into stem and extension, keeping the dot on the extension.
///
/// Leading dots do not start an extension, so `.bashrc` has none.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if !file_name[..index].chars().all(|c| c == '.') => {
            file_name.split_at(index)
        }
        _ => (file_name, ""),
    }
}

/// Whether anything, including a dangling symlink, occupies `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Organizes files by moving them into category directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Returns a name that does not currently exist inside `dest_dir`.
    ///
    /// `file_name` is returned unchanged when it is free. Otherwise
    /// `"{stem} ({n}){extension}"` is probed for `n = 1, 2, ...` and the first
    /// free candidate wins. Every probe hits the filesystem, so gaps left by
    /// deleted files are reused.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use autosort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// // With "photo.jpg" already in Pictures:
    /// let name = FileOrganizer::unique_name(Path::new("/data/Pictures"), "photo.jpg");
    /// assert_eq!(name, "photo (1).jpg");
    /// ```
    pub fn unique_name(dest_dir: &Path, file_name: &str) -> String {
        if !occupied(&dest_dir.join(file_name)) {
            return file_name.to_string();
        }

        let (stem, extension) = split_extension(file_name);
        let mut counter: u64 = 1;
        loop {
            let candidate = format!("{stem} ({counter}){extension}");
            if !occupied(&dest_dir.join(&candidate)) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Creates `dir`, including missing parents. Succeeds if it already exists.
    pub fn ensure_dir(dir: &Path) -> OrganizeResult<()> {
        fs::create_dir_all(dir).map_err(|error| OrganizeError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            error,
        })
    }

    /// Moves `candidate` into `dest_dir`, renaming it if the name is taken.
    ///
    /// `dest_dir` must already exist. On failure the source is left in place.
    pub fn move_into(
        candidate: &FileCandidate,
        category: Category,
        dest_dir: &Path,
    ) -> OrganizeResult<MoveRecord> {
        let mut target = dest_dir.join(&candidate.name);
        if occupied(&target) {
            target = dest_dir.join(Self::unique_name(dest_dir, &candidate.name));
        }

        relocate(&candidate.path, &target).map_err(|error| OrganizeError::FileMoveFailure {
            from: candidate.path.clone(),
            to: target.clone(),
            error,
        })?;

        let record = MoveRecord {
            original_path: candidate.path.clone(),
            new_path: target,
            category,
        };
        tracing::info!(
            file = %candidate.name,
            category = %category,
            destination = %record.new_path.display(),
            renamed = record.was_renamed(),
            "Moved {category} file: {}",
            candidate.name
        );

        Ok(record)
    }
}

/// Renames `from` to `to`, falling back to copy and delete across volumes.
fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), "rename crosses devices, copying instead");
            if let Err(copy_error) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(copy_error);
            }
            if let Err(remove_error) = fs::remove_file(from) {
                // keep exactly one copy so the next scan can retry cleanly
                let _ = fs::remove_file(to);
                return Err(remove_error);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn candidate(dir: &Path, name: &str, content: &str) -> FileCandidate {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write test file");
        FileCandidate {
            path,
            name: name.to_string(),
            size: content.len() as u64,
        }
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("..hidden"), ("..hidden", ""));
        assert_eq!(split_extension(".config.toml"), (".config", ".toml"));
    }

    #[test]
    fn test_unique_name_free() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(
            FileOrganizer::unique_name(temp_dir.path(), "photo.jpg"),
            "photo.jpg"
        );
    }

    #[test]
    fn test_unique_name_sequential() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path();

        fs::write(dir.join("photo.jpg"), "a").unwrap();
        assert_eq!(FileOrganizer::unique_name(dir, "photo.jpg"), "photo (1).jpg");

        fs::write(dir.join("photo (1).jpg"), "b").unwrap();
        assert_eq!(FileOrganizer::unique_name(dir, "photo.jpg"), "photo (2).jpg");
    }

    #[test]
    fn test_unique_name_fills_first_gap() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path();

        fs::write(dir.join("photo.jpg"), "a").unwrap();
        fs::write(dir.join("photo (2).jpg"), "c").unwrap();
        assert_eq!(FileOrganizer::unique_name(dir, "photo.jpg"), "photo (1).jpg");
    }

    #[test]
    fn test_unique_name_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path();

        fs::write(dir.join("LICENSE"), "a").unwrap();
        assert_eq!(FileOrganizer::unique_name(dir, "LICENSE"), "LICENSE (1)");
    }

    #[test]
    fn test_ensure_dir_creates_parents_and_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("Music").join("Audios");

        FileOrganizer::ensure_dir(&nested).expect("first call");
        FileOrganizer::ensure_dir(&nested).expect("second call");
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_fails_over_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("Pictures");
        fs::write(&blocker, "not a directory").unwrap();

        let result = FileOrganizer::ensure_dir(&blocker);
        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
    }

    #[test]
    fn test_move_into_plain() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Documents");
        fs::create_dir(&dest).unwrap();
        let file = candidate(temp_dir.path(), "notes.txt", "hello");

        let record = FileOrganizer::move_into(&file, Category::Documents, &dest)
            .expect("Failed to move file");

        assert!(!file.path.exists());
        assert_eq!(record.new_path, dest.join("notes.txt"));
        assert_eq!(fs::read_to_string(&record.new_path).unwrap(), "hello");
        assert!(!record.was_renamed());
    }

    #[test]
    fn test_move_into_renames_on_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Pictures");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("photo.jpg"), "old").unwrap();
        let file = candidate(temp_dir.path(), "photo.jpg", "new");

        let record =
            FileOrganizer::move_into(&file, Category::Image, &dest).expect("Failed to move file");

        assert_eq!(record.new_path, dest.join("photo (1).jpg"));
        assert!(record.was_renamed());
        assert_eq!(fs::read_to_string(dest.join("photo.jpg")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dest.join("photo (1).jpg")).unwrap(), "new");
    }

    #[test]
    fn test_move_into_vanished_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("General");
        fs::create_dir(&dest).unwrap();
        let file = FileCandidate {
            path: temp_dir.path().join("gone.bin"),
            name: "gone.bin".to_string(),
            size: 0,
        };

        let result = FileOrganizer::move_into(&file, Category::General, &dest);
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
        assert!(!dest.join("gone.bin").exists());
    }

    #[test]
    fn test_move_into_missing_destination_leaves_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = candidate(temp_dir.path(), "setup.exe", "MZ");

        let result =
            FileOrganizer::move_into(&file, Category::Programs, &temp_dir.path().join("Programs"));
        assert!(result.is_err());
        assert!(file.path.exists());
    }
}
