//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, the single sequential
//! producer of the pipeline. It lazily yields the path of every regular file
//! under a root, visiting each exactly once per walk.
//!
//! # Features
//!
//! - Lazy, name-sorted traversal via [`walkdir`]
//! - Optional symlink following with loop detection
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Hidden entry filtering and depth limiting
//! - Graceful shutdown via atomic flag
//!
//! # Error handling
//!
//! A directory that cannot be listed is reported once as
//! [`ScanError::DirectoryListing`] and its subtree is skipped. Entries that
//! disappear during the walk are dropped without an error. Files that are
//! present but unreadable are still yielded; the hasher records them as
//! unreadable.
//!
//! # Example
//!
//! ```no_run
//! use dupecheck::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! walker.validate_root().expect("root must exist");
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Sequential directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory (or single file) to scan; relative roots are
    ///   resolved against the current directory so every yielded path is
    ///   absolute
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let root = std::path::absolute(path).unwrap_or_else(|e| {
            log::debug!("Cannot resolve {} to an absolute path: {}", path.display(), e);
            path.to_path_buf()
        });
        Self {
            root,
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is `true`, the walk ends before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root this walker scans.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail fast when the root does not exist or cannot be read.
    ///
    /// A directory root must be listable and a file root must open for
    /// reading.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::PathNotFound`] if the root is missing, unreadable,
    /// or its existence cannot be determined.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        let readable = match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => fs::read_dir(&self.root).map(drop),
            Ok(_) => File::open(&self.root).map(drop),
            Err(e) => Err(e),
        };

        readable.map_err(|e| {
            log::debug!("Root {} is not usable: {}", self.root.display(), e);
            ScanError::PathNotFound(self.root.clone())
        })
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Decide whether an entry (and, for directories, its subtree) is visited.
    fn should_visit(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        if self.config.skip_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }

        if let Some(gi) = gitignore {
            let relative_path = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if gi
                .matched(relative_path, entry.file_type().is_dir())
                .is_ignore()
            {
                log::trace!("Ignoring: {}", entry.path().display());
                return false;
            }
        }

        true
    }

    /// Walk the directory tree, yielding regular file paths.
    ///
    /// Returns a lazy iterator. Errors are yielded as [`ScanError`] values
    /// rather than stopping iteration. Children are visited in file name
    /// order, so two walks of an unchanged tree yield the same sequence.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        let mut walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walk_dir = walk_dir.max_depth(depth);
        }

        walk_dir
            .into_iter()
            .filter_entry(move |entry| self.should_visit(entry, gitignore.as_ref()))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        Some(Ok(entry.into_path()))
                    } else {
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => self.handle_walk_error(e),
            })
    }

    /// Classify a walkdir error.
    fn handle_walk_error(&self, error: walkdir::Error) -> Option<Result<PathBuf, ScanError>> {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink loop at {} (points to {}), skipping",
                path.display(),
                ancestor.display()
            );
            return Some(Err(ScanError::SymlinkLoop {
                ancestor: ancestor.to_path_buf(),
                path,
            }));
        }

        if error
            .io_error()
            .is_some_and(|io| io.kind() == ErrorKind::NotFound)
        {
            log::debug!("Entry vanished during traversal: {}", path.display());
            return None;
        }

        log::warn!("Cannot list {}, skipping subtree: {}", path.display(), error);
        Some(Err(ScanError::DirectoryListing {
            path,
            source: error,
        }))
    }
}
