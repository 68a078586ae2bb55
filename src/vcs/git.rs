//
// src/vcs/git.rs
//
// Git backend built on libgit2
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use super::{Item, ItemStatus, BlameLine, CommitProgress};
use crate::error;

use anyhow::Result;
use std::path::{Path, PathBuf};


const SYMLINK_MODE : u32 = 0o120000;
const GITLINK_MODE : u32 = 0o160000;


/// A Git working copy
#[derive(Debug, Clone)]
pub struct GitBackend {
    workdir : PathBuf
}

impl GitBackend {
    /// Locate the repository enclosing `path`
    ///
    /// Bare repositories have no working copy and are not considered.
    pub fn discover<P: AsRef<Path>>(path: P) -> Option<GitBackend> {
        use path_clean::PathClean;

        let path = path.as_ref();
        let start = if path.is_dir() { path } else { path.parent()? };

        let repository = git2::Repository::discover(start).ok()?;

        repository.workdir().map(|workdir| {
            GitBackend { workdir: workdir.to_path_buf().clean() }
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn open(&self) -> Result<git2::Repository> {
        git2::Repository::open(&self.workdir).map_err(|err| {
            use git2::ErrorCode;

            match err.code() {
                ErrorCode::NotFound => error::NotAWorkingCopy { path: self.workdir.clone() }.into(),
                _                   => error::OtherGitError::from(err).into()
            }
        })
    }

    /// Translate the path to one relative to the working directory
    ///
    /// # Notes
    ///
    /// It is an error if the path is outside the working directory
    pub(super) fn relative<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        use crate::util::absolute_path;

        let absolute = absolute_path(path.as_ref());

        let relative = absolute.strip_prefix(&self.workdir).map(Path::to_path_buf).or_else(|_| {
            // the working directory is reported with symlinks resolved
            absolute.canonicalize().ok()
                .and_then(|canonical| canonical.strip_prefix(&self.workdir).ok().map(Path::to_path_buf))
                .ok_or_else(|| {
                    error::PathNotInWorkingCopy {
                        path : path.as_ref().to_owned(),
                        root : self.workdir.clone()
                    }
                })
        })?;

        Ok( relative )
    }

    /// Query the status of all changed, added and untracked files under `paths`
    pub fn status(&self, paths: &[PathBuf]) -> Result<Vec<Item>> {
        let repository = self.open()?;

        let relative_paths = paths.iter()
            .map(|path| self.relative(path))
            .collect::<Result<Vec<_>>>()?;

        let mut options = git2::StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        // the working directory itself means "everything"
        if !relative_paths.iter().any(|path| path.as_os_str().is_empty()) {
            for path in relative_paths {
                options.pathspec(path);
            }
        }

        let statuses = repository.statuses(Some(&mut options)).map_err(error::OtherGitError::from)?;

        statuses.iter().enumerate().map(|(index, entry)| {
            let path = entry.path().ok_or_else(|| {
                error::InvalidItem { index, reason: "path is not valid UTF-8".to_owned() }
            })?;

            Ok( Item::new(
                self.workdir.join(path).to_string_lossy().into_owned(),
                content_status(entry.status()),
                ItemStatus::None
            ))
        })
        .collect()
    }

    /// Name of the checked out branch
    ///
    /// A freshly initialised repository still has a (yet unborn) branch.
    /// Returns `None` for a detached HEAD.
    pub fn active_branch(&self) -> Option<String> {
        let repository = self.open().ok()?;

        let branch = match repository.head() {
            Ok( head ) if head.is_branch() => head.shorthand().map(str::to_owned),
            Ok( _ ) => None,
            Err( _ ) => {
                let head = repository.find_reference("HEAD").ok()?;
                let target = head.symbolic_target()?;

                target.strip_prefix("refs/heads/").map(str::to_owned)
            }
        };

        branch
    }

    /// Commit the working copy state of `items`, and only of those
    ///
    /// The commit tree is the tree of HEAD with the selected paths replaced by
    /// their working copy contents. Other changes in the index are left staged.
    pub fn commit<N>(&self, items: &[Item], message: &str, mut notify: N) -> Result<String>
    where
        N: FnMut(CommitProgress)
    {
        let repository = self.open()?;

        let parent = repository.head().ok().and_then(|head| head.peel_to_commit().ok());

        // the index the commit tree is written from
        let mut tree_index = git2::Index::new().map_err(error::OtherGitError::from)?;
        if let Some(parent) = &parent {
            let tree = parent.tree().map_err(error::OtherGitError::from)?;
            tree_index.read_tree(&tree).map_err(error::OtherGitError::from)?;
        }

        // the repository index is kept in sync for the committed paths
        let mut repo_index = repository.index().map_err(error::OtherGitError::from)?;

        for item in items {
            let full_path = PathBuf::from(&item.path);
            let path = self.relative(&full_path)?;

            if !item.is_versioned {
                notify(CommitProgress::Added(&item.path));
            }

            // symbolic links are committed as links, not as what they point to
            let entry = match std::fs::symlink_metadata(&full_path) {
                Ok( metadata ) if metadata.is_dir() => gitlink_entry(&full_path, &path),
                Ok( metadata ) => Some( index_entry(&repository, &full_path, &path, &metadata)? ),
                Err( _ ) => {
                    if tree_index.get_path(&path, 0).is_some() {
                        tree_index.remove_path(&path).map_err(error::OtherGitError::from)?;
                    }
                    if repo_index.get_path(&path, 0).is_some() {
                        repo_index.remove_path(&path).map_err(error::OtherGitError::from)?;
                    }
                    None
                }
            };

            if let Some(entry) = entry {
                tree_index.add(&entry).map_err(error::OtherGitError::from)?;

                if entry.mode == GITLINK_MODE {
                    repo_index.add(&entry).map_err(error::OtherGitError::from)?;
                } else {
                    repo_index.add_path(&path).map_err(error::OtherGitError::from)?;
                }
            } else if full_path.is_dir() {
                tracing::warn!(path = %item.path, "not a repository, directory left out of the commit");
            }

            notify(CommitProgress::Staged(&item.path));
        }

        repo_index.write().map_err(error::OtherGitError::from)?;

        notify(CommitProgress::Committing);

        let tree_id = tree_index.write_tree_to(&repository).map_err(error::OtherGitError::from)?;
        let tree = repository.find_tree(tree_id).map_err(error::OtherGitError::from)?;
        let signature = repository.signature().map_err(error::OtherGitError::from)?;
        let parents = parent.iter().collect::<Vec<_>>();

        let commit_id = repository.commit(
            Some("HEAD"), &signature, &signature, message, &tree, &parents
        ).map_err(error::OtherGitError::from)?;

        tracing::debug!(commit = %commit_id, paths = items.len(), "created commit");

        Ok( short_id(commit_id) )
    }

    /// Discard local changes of `items`
    ///
    /// Paths known to HEAD are restored from it, in the index and on disk.
    /// Added paths are only unstaged, their files are kept. Unversioned
    /// items are left alone.
    pub fn revert(&self, items: &[Item]) -> Result<()> {
        let repository = self.open()?;

        let head = repository.head().ok().and_then(|head| head.peel_to_commit().ok());
        let head_tree = head.as_ref().and_then(|commit| commit.tree().ok());

        let mut index = repository.index().map_err(error::OtherGitError::from)?;
        let mut restored = Vec::new();

        for item in items.iter().filter(|item| item.is_versioned) {
            let path = self.relative(&item.path)?;

            if head_tree.as_ref().map_or(false, |tree| tree.get_path(&path).is_ok()) {
                restored.push(path);
            } else if index.get_path(&path, 0).is_some() {
                index.remove_path(&path).map_err(error::OtherGitError::from)?;
            }
        }

        index.write().map_err(error::OtherGitError::from)?;

        if let Some(head) = head.as_ref().filter(|_| !restored.is_empty()) {
            repository.reset_default(Some(head.as_object()), restored.iter())
                .map_err(error::OtherGitError::from)?;

            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force();
            for path in &restored {
                checkout.path(path.as_path());
            }

            repository.checkout_head(Some(&mut checkout)).map_err(error::OtherGitError::from)?;
        }

        tracing::debug!(restored = restored.len(), "reverted items");

        Ok( () )
    }

    /// Add an ignore pattern for `item` to the `.gitignore` next to it
    ///
    /// Returns the pattern that was added.
    pub fn ignore(&self, item: &Item, by_extension: bool) -> Result<String> {
        let full_path = PathBuf::from(&item.path);
        let pattern = super::ignore_pattern(&full_path, by_extension)?;

        // anchor plain names to the directory, like svn:ignore does
        let pattern = if by_extension { pattern } else { format!("/{}", pattern) };

        let directory = full_path.parent().unwrap_or(self.workdir.as_path());
        append_line(&directory.join(".gitignore"), &pattern)?;

        Ok( pattern )
    }

    /// Delete `items` from disk and stop tracking them
    pub fn remove(&self, items: &[Item]) -> Result<()> {
        let repository = self.open()?;
        let mut index = repository.index().map_err(error::OtherGitError::from)?;

        for item in items {
            let path = self.relative(&item.path)?;

            super::remove_from_disk(Path::new(&item.path))?;

            if index.get_path(&path, 0).is_some() {
                index.remove_path(&path).map_err(error::OtherGitError::from)?;
            }
        }

        index.write().map_err(error::OtherGitError::from)?;

        Ok( () )
    }

    /// Unified diff of the working copy state of `path` against HEAD
    pub fn diff<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let repository = self.open()?;
        let path = self.relative(path)?;

        let mut options = git2::DiffOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);

        if !path.as_os_str().is_empty() {
            options.pathspec(path.as_path());
        }

        let head_tree = repository.head().ok().and_then(|head| head.peel_to_tree().ok());
        let diff = repository
            .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut options))
            .map_err(error::OtherGitError::from)?;

        let mut patch = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            if let origin @ ('+' | '-' | ' ') = line.origin() {
                patch.push(origin);
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));

            true
        }).map_err(error::OtherGitError::from)?;

        Ok( patch )
    }

    /// Line-by-line origin of the committed version of `path`
    pub fn blame<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BlameLine>> {
        let repository = self.open()?;
        let path = self.relative(path)?;

        let blame = repository.blame_file(&path, None).map_err(error::OtherGitError::from)?;

        // blame describes HEAD, so the text has to come from there as well
        let blob = repository.head()
            .and_then(|head| head.peel_to_tree())
            .and_then(|tree| tree.get_path(&path))
            .and_then(|entry| entry.to_object(&repository))
            .and_then(|object| object.peel_to_blob())
            .map_err(error::OtherGitError::from)?;

        let text = String::from_utf8_lossy(blob.content());

        let lines = text.lines().enumerate().map(|(i, line)| {
            let (revision, author) = match blame.get_line(i + 1) {
                Some( hunk ) => (
                    short_id(hunk.final_commit_id()),
                    hunk.final_signature().name().unwrap_or("unknown").to_owned()
                ),
                None => (String::from("-"), String::from("-"))
            };

            BlameLine {
                line : i + 1,
                revision,
                author,
                text : line.to_owned()
            }
        })
        .collect();

        Ok( lines )
    }
}


fn short_id(id: git2::Oid) -> String {
    let mut id = id.to_string();
    id.truncate(7);

    id
}

/// Map libgit2 status flags onto a single content status
fn content_status(status: git2::Status) -> ItemStatus {
    use git2::Status;

    if status.contains(Status::CONFLICTED) {
        ItemStatus::Conflicted
    } else if status.contains(Status::IGNORED) {
        ItemStatus::Ignored
    } else if status.contains(Status::INDEX_NEW) {
        if status.contains(Status::WT_DELETED) { ItemStatus::Missing } else { ItemStatus::Added }
    } else if status.contains(Status::WT_NEW) {
        ItemStatus::Unversioned
    } else if status.contains(Status::INDEX_DELETED) {
        ItemStatus::Deleted
    } else if status.contains(Status::WT_DELETED) {
        ItemStatus::Missing
    } else if status.intersects(
        Status::INDEX_MODIFIED | Status::WT_MODIFIED |
        Status::INDEX_TYPECHANGE | Status::WT_TYPECHANGE |
        Status::INDEX_RENAMED | Status::WT_RENAMED
    ) {
        ItemStatus::Modified
    } else {
        ItemStatus::Normal
    }
}

/// Build an index entry for a working copy file or symbolic link, writing its blob
fn index_entry(
    repository : &git2::Repository,
    full_path  : &Path,
    path       : &Path,
    metadata   : &std::fs::Metadata
) -> Result<git2::IndexEntry> {
    let read_error = |err: std::io::Error| {
        error::FileReadError {
            path : full_path.to_owned(),
            msg  : err.to_string()
        }
    };

    let (id, mode) = if metadata.file_type().is_symlink() {
        // the blob of a link is its target
        let target = std::fs::read_link(full_path).map_err(read_error)?;
        let target = target.to_string_lossy().replace('\\', "/");

        (repository.blob(target.as_bytes()).map_err(error::OtherGitError::from)?, SYMLINK_MODE)
    } else {
        (repository.blob_path(full_path).map_err(error::OtherGitError::from)?, file_mode(metadata))
    };

    Ok( entry(path, mode, id, metadata.len()) )
}

/// Entry recording the checked out commit of a nested repository
///
/// `None` if the directory is not a repository or has no commits yet.
fn gitlink_entry(full_path: &Path, path: &Path) -> Option<git2::IndexEntry> {
    let nested = git2::Repository::open(full_path).ok()?;
    let id = nested.head().ok()?.target()?;

    Some( entry(path, GITLINK_MODE, id, 0) )
}

fn entry(path: &Path, mode: u32, id: git2::Oid, size: u64) -> git2::IndexEntry {
    let path = path.to_string_lossy().replace('\\', "/").into_bytes();

    git2::IndexEntry {
        ctime : git2::IndexTime::new(0, 0),
        mtime : git2::IndexTime::new(0, 0),
        dev   : 0,
        ino   : 0,
        mode,
        uid   : 0,
        gid   : 0,
        file_size : size as u32,
        id,
        flags : std::cmp::min(path.len(), 0xfff) as u16,
        flags_extended : 0,
        path
    }
}

/// Append `line` to a text file, creating it if needed
fn append_line(file: &Path, line: &str) -> Result<()> {
    use std::io::Write;

    let write_error = |err: std::io::Error| {
        error::FileWriteError {
            path : file.to_owned(),
            msg  : err.to_string()
        }
    };

    let existing = std::fs::read_to_string(file).unwrap_or_default();
    if existing.lines().any(|existing| existing.trim() == line) {
        return Ok( () );
    }

    let mut output = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .map_err(write_error)?;

    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(output).map_err(write_error)?;
    }
    writeln!(output, "{}", line).map_err(write_error)?;

    Ok( () )
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 != 0 { 0o100755 } else { 0o100644 }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o100644
}
