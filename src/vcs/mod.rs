//
// src/vcs/mod.rs
//
// Version control backends.
//
// A working copy is either Subversion or Git. The backend is detected once
// and then offers the same capabilities regardless of the kind: status
// queries, commits, the commit target label, diffs and blame.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

// item and status model
mod item;
// libgit2 backed working copies
mod git;
// `svn` client backed working copies
mod svn;

pub use item::{Item, ItemStatus, STATUSES_FOR_COMMIT};
pub use git::GitBackend;
pub use svn::SvnBackend;

use crate::error;
use anyhow::{Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};


/// A working copy and the version control system managing it
#[derive(Debug, Clone)]
pub enum Vcs {
    Subversion(SvnBackend),
    Git(GitBackend)
}

/// Progress notifications emitted while committing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitProgress<'a> {
    /// an unversioned path was put under version control
    Added(&'a str),
    /// a path was prepared for the commit
    Staged(&'a str),
    /// the commit itself is being created
    Committing
}

/// One line of blame output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub line     : usize,
    pub revision : String,
    pub author   : String,
    pub text     : String
}


impl Vcs {
    /// Detect the working copy enclosing `path`
    ///
    /// If `path` is inside both a Git and a Subversion working copy (e.g. a
    /// Subversion checkout inside a Git repository), the nearest one wins.
    pub fn guess<P: AsRef<Path>>(path: P) -> Result<Vcs> {
        use crate::util::absolute_path;

        let path = absolute_path(path);

        let backend = match (SvnBackend::discover(&path), GitBackend::discover(&path)) {
            (Some(svn), Some(git)) => {
                // git reports its working directory with symbolic links resolved
                let canonical = |path: &Path| path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

                if canonical(svn.root()).starts_with(canonical(git.workdir())) {
                    Vcs::Subversion(svn)
                } else {
                    Vcs::Git(git)
                }
            },
            (Some(svn), None) => Vcs::Subversion(svn),
            (None, Some(git)) => Vcs::Git(git),
            (None, None) => bail!(error::NotAWorkingCopy { path })
        };

        tracing::debug!(vcs = %backend, root = %backend.root().display(), "detected working copy");

        Ok( backend )
    }

    /// Root directory of the working copy
    pub fn root(&self) -> &Path {
        match self {
            Vcs::Subversion(svn) => svn.root(),
            Vcs::Git(git)        => git.workdir()
        }
    }

    /// `path` in the form item paths of this working copy take
    ///
    /// Git reports paths below the canonical working directory, so symbolic
    /// links in `path` are resolved as needed.
    pub fn item_path<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        use crate::util::path_key;

        match self {
            Vcs::Subversion(_) => Ok( path_key(path) ),
            Vcs::Git(git)      => Ok( path_key(git.workdir().join(git.relative(path)?)) )
        }
    }

    /// Status of the items under `paths` whose content or metadata status is in `filter`
    pub fn get_items(&self, paths: &[PathBuf], filter: &[ItemStatus]) -> Result<Vec<Item>> {
        let items = match self {
            Vcs::Subversion(svn) => svn.status(paths)?,
            Vcs::Git(git)        => git.status(paths)?
        };

        Ok( items.into_iter().filter(|item| item.matches(filter)).collect() )
    }

    /// What a commit goes to: the repository URL or the active branch
    pub fn target_label(&self) -> Result<String> {
        match self {
            Vcs::Subversion(svn) => svn.repository_url(),
            Vcs::Git(git)        => Ok( git.active_branch().unwrap_or_else(|| "No active branch".to_owned()) )
        }
    }

    /// Commit `items` with `message`, returning the new revision
    pub fn commit<N>(&self, items: &[Item], message: &str, notify: N) -> Result<String>
    where
        N: FnMut(CommitProgress)
    {
        match self {
            Vcs::Subversion(svn) => svn.commit(items, message, notify),
            Vcs::Git(git)        => git.commit(items, message, notify)
        }
    }

    /// Discard the local changes of `items`
    pub fn revert(&self, items: &[Item]) -> Result<()> {
        match self {
            Vcs::Subversion(svn) => svn.revert(items),
            Vcs::Git(git)        => git.revert(items)
        }
    }

    /// Ignore `item` by name, or every file sharing its extension
    ///
    /// Returns the pattern that was added.
    pub fn ignore(&self, item: &Item, by_extension: bool) -> Result<String> {
        match self {
            Vcs::Subversion(svn) => svn.ignore(item, by_extension),
            Vcs::Git(git)        => git.ignore(item, by_extension)
        }
    }

    /// Delete `items`, scheduling the deletion of versioned ones
    pub fn remove(&self, items: &[Item]) -> Result<()> {
        match self {
            Vcs::Subversion(svn) => svn.remove(items),
            Vcs::Git(git)        => git.remove(items)
        }
    }

    pub fn diff<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        match self {
            Vcs::Subversion(svn) => svn.diff(path),
            Vcs::Git(git)        => git.diff(path)
        }
    }

    pub fn blame<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BlameLine>> {
        match self {
            Vcs::Subversion(svn) => svn.blame(path),
            Vcs::Git(git)        => git.blame(path)
        }
    }
}

/// Ignore pattern for `path`: its file name, or `*.<extension>`
fn ignore_pattern(path: &Path, by_extension: bool) -> Result<String> {
    use crate::util::file_extension;

    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

    if by_extension {
        let extension = file_extension(&name);
        if extension.is_empty() {
            bail!(error::NoExtension { path: path.to_owned() });
        }

        Ok( format!("*{}", extension) )
    } else {
        Ok( name )
    }
}

/// Delete a file, link or directory tree. Already gone is fine.
fn remove_from_disk(path: &Path) -> Result<()> {
    use std::io::ErrorKind;

    let result = match std::fs::symlink_metadata(path) {
        Ok( metadata ) if metadata.is_dir() => std::fs::remove_dir_all(path),
        Ok( _ ) => std::fs::remove_file(path),
        Err( err ) if err.kind() == ErrorKind::NotFound => Ok( () ),
        Err( err ) => Err(err)
    };

    result.map_err(|err| {
        error::FileWriteError { path: path.to_owned(), msg: err.to_string() }.into()
    })
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Vcs::Subversion(_) => f.write_str("subversion"),
            Vcs::Git(_)        => f.write_str("git")
        }
    }
}
