//
// src/vcs/svn.rs
//
// Subversion backend. Drives the `svn` command line client and parses its output.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use super::{Item, ItemStatus, BlameLine, CommitProgress};
use crate::error;

use anyhow::{Result, bail};
use itertools::Itertools;
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};


lazy_static::lazy_static! {
    // seven status columns, a space and the path
    static ref STATUS_LINE : Regex = Regex::new(
        r"^(?P<content>[ ACDIMRX?!~])(?P<props>[ CM])[ L][ +][ SX][ KOTB][ C] (?P<path>.+)$"
    ).expect("fatal: invalid regex");

    static ref COMMITTED_REVISION : Regex = Regex::new(
        r"(?m)^Committed revision (?P<rev>[0-9]+)\.$"
    ).expect("fatal: invalid regex");

    static ref BLAME_LINE : Regex = Regex::new(
        r"^\s*(?P<rev>[0-9]+|-)\s+(?P<author>\S+) (?P<text>.*)$"
    ).expect("fatal: invalid regex");
}


/// A Subversion working copy
#[derive(Debug, Clone)]
pub struct SvnBackend {
    root : PathBuf
}

impl SvnBackend {
    /// Locate the working copy enclosing `path`
    ///
    /// Since Subversion 1.7 the administrative `.svn` directory only exists
    /// at the working copy root.
    pub fn discover<P: AsRef<Path>>(path: P) -> Option<SvnBackend> {
        path.as_ref()
            .ancestors()
            .find(|dir| dir.join(".svn").is_dir())
            .map(|root| SvnBackend { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the svn client in the working copy root and capture its output
    fn svn<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>
    {
        use std::process::Command;

        let args = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect::<Vec<OsString>>();
        let command = format!("svn {}", args.iter().map(|arg| arg.to_string_lossy()).join(" "));

        tracing::debug!(%command, "running subversion client");

        let output = Command::new("svn")
            .arg("--non-interactive")
            .args(&args)
            .current_dir(&self.root)
            .output()
            .map_err(|err| {
                error::SvnCommandFailed { command: command.clone(), msg: err.to_string() }
            })?;

        if !output.status.success() {
            bail!(error::SvnCommandFailed {
                command,
                msg : String::from_utf8_lossy(&output.stderr).trim().to_owned()
            });
        }

        Ok( String::from_utf8_lossy(&output.stdout).into_owned() )
    }

    fn path_args(&self, paths: &[PathBuf]) -> Vec<OsString> {
        if paths.is_empty() {
            vec![self.root.clone().into_os_string()]
        } else {
            paths.iter().map(|path| path.clone().into_os_string()).collect()
        }
    }

    pub fn status(&self, paths: &[PathBuf]) -> Result<Vec<Item>> {
        let mut args = vec![OsString::from("status")];
        args.extend(self.path_args(paths));

        let output = self.svn(args)?;

        Ok( parse_status_output(&output, &self.root) )
    }

    /// URL of the repository the working copy is checked out from
    pub fn repository_url(&self) -> Result<String> {
        let output = self.svn(vec![
            OsString::from("info"), "--show-item".into(), "url".into(), self.root.clone().into()
        ])?;

        Ok( output.trim().to_owned() )
    }

    /// Schedule unversioned items for addition, missing ones for deletion, and commit
    pub fn commit<N>(&self, items: &[Item], message: &str, mut notify: N) -> Result<String>
    where
        N: FnMut(CommitProgress)
    {
        let (unversioned, missing) : (Vec<_>, Vec<_>) = (
            items.iter().filter(|item| !item.is_versioned).collect(),
            items.iter().filter(|item| item.content_status == ItemStatus::Missing).collect()
        );

        if !unversioned.is_empty() {
            let mut args = vec![OsString::from("add")];
            args.extend(unversioned.iter().map(|item| OsString::from(&item.path)));
            self.svn(args)?;

            unversioned.iter().for_each(|item| notify(CommitProgress::Added(&item.path)));
        }

        if !missing.is_empty() {
            let mut args = vec![OsString::from("delete"), "--force".into()];
            args.extend(missing.iter().map(|item| OsString::from(&item.path)));
            self.svn(args)?;
        }

        items.iter().for_each(|item| notify(CommitProgress::Staged(&item.path)));

        notify(CommitProgress::Committing);

        let mut args = vec![OsString::from("commit"), "--message".into(), message.into()];
        args.extend(items.iter().map(|item| OsString::from(&item.path)));

        let output = self.svn(args)?;

        committed_revision(&output)
    }

    /// Undo local modifications and scheduled additions or deletions of `items`
    pub fn revert(&self, items: &[Item]) -> Result<()> {
        let versioned = items.iter().filter(|item| item.is_versioned).collect::<Vec<_>>();

        if !versioned.is_empty() {
            let mut args = vec![OsString::from("revert"), "--depth".into(), "infinity".into()];
            args.extend(versioned.iter().map(|item| OsString::from(&item.path)));
            self.svn(args)?;
        }

        Ok( () )
    }

    /// Add an ignore pattern for `item` to the `svn:ignore` property of its directory
    ///
    /// Returns the pattern that was added.
    pub fn ignore(&self, item: &Item, by_extension: bool) -> Result<String> {
        let path = PathBuf::from(&item.path);
        let pattern = super::ignore_pattern(&path, by_extension)?;
        let directory = path.parent().unwrap_or(self.root.as_path()).as_os_str().to_owned();

        let existing = match self.svn(vec![OsString::from("propget"), "svn:ignore".into(), directory.clone()]) {
            Ok( value ) => value,
            // the property is not set yet
            Err( err ) if property_not_found(&err) => String::new(),
            Err( err ) => return Err(err)
        };

        if let Some(value) = extend_ignore_list(&existing, &pattern) {
            self.svn(vec![OsString::from("propset"), "svn:ignore".into(), value.into(), directory])?;
        }

        Ok( pattern )
    }

    /// Schedule versioned `items` for deletion and delete unversioned ones from disk
    pub fn remove(&self, items: &[Item]) -> Result<()> {
        let (versioned, unversioned) : (Vec<&Item>, Vec<&Item>) = items.iter().partition(|item| item.is_versioned);

        if !versioned.is_empty() {
            let mut args = vec![OsString::from("delete"), "--force".into()];
            args.extend(versioned.iter().map(|item| OsString::from(&item.path)));
            self.svn(args)?;
        }

        for item in unversioned {
            super::remove_from_disk(Path::new(&item.path))?;
        }

        Ok( () )
    }

    pub fn diff<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        self.svn(vec![OsStr::new("diff"), path.as_ref().as_os_str()])
    }

    pub fn blame<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BlameLine>> {
        let output = self.svn(vec![OsStr::new("blame"), path.as_ref().as_os_str()])?;

        Ok( parse_blame_output(&output) )
    }
}


fn content_status(code: char) -> ItemStatus {
    match code {
        'A' => ItemStatus::Added,
        'C' => ItemStatus::Conflicted,
        'D' => ItemStatus::Deleted,
        'I' => ItemStatus::Ignored,
        'M' => ItemStatus::Modified,
        'R' => ItemStatus::Replaced,
        'X' => ItemStatus::External,
        '?' => ItemStatus::Unversioned,
        '!' => ItemStatus::Missing,
        '~' => ItemStatus::Obstructed,
        _   => ItemStatus::Normal
    }
}

fn property_status(code: char) -> ItemStatus {
    match code {
        'C' => ItemStatus::Conflicted,
        'M' => ItemStatus::Modified,
        _   => ItemStatus::None
    }
}

/// Parse `svn status` output into items
///
/// Lines that are not status lines (external headers, changelist headers,
/// tree conflict details) are skipped. Relative paths are resolved against `root`.
fn parse_status_output(output: &str, root: &Path) -> Vec<Item> {
    use path_clean::PathClean;

    output.lines().filter_map(|line| STATUS_LINE.captures(line)).map(|captures| {
        let code = |name: &str| captures[name].chars().next().unwrap_or(' ');
        let path = root.join(&captures["path"]).clean();

        Item::new(
            path.to_string_lossy().into_owned(),
            content_status(code("content")),
            property_status(code("props"))
        )
    })
    .collect()
}

fn parse_committed_revision(output: &str) -> Option<String> {
    COMMITTED_REVISION.captures(output).map(|captures| captures["rev"].to_owned())
}

/// The revision `svn commit` reports, an error if it reports none
fn committed_revision(output: &str) -> Result<String> {
    match parse_committed_revision(output) {
        Some( revision ) => Ok( revision ),
        None => bail!(error::NoRevisionCommitted { output: output.to_owned() })
    }
}

fn property_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<error::SvnCommandFailed>()
        .map_or(false, |err| err.msg.contains("W200017") || err.msg.contains("E200017"))
}

/// The `svn:ignore` value with `pattern` appended, `None` if it is already listed
fn extend_ignore_list(existing: &str, pattern: &str) -> Option<String> {
    let mut patterns = existing.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    if patterns.contains(&pattern) {
        return None;
    }
    patterns.push(pattern);

    Some( patterns.join("\n") )
}

fn parse_blame_output(output: &str) -> Vec<BlameLine> {
    output.lines().enumerate().map(|(i, line)| {
        match BLAME_LINE.captures(line) {
            Some( captures ) => BlameLine {
                line     : i + 1,
                revision : captures["rev"].to_owned(),
                author   : captures["author"].to_owned(),
                text     : captures["text"].to_owned()
            },
            None => BlameLine {
                line     : i + 1,
                revision : "-".to_owned(),
                author   : "-".to_owned(),
                text     : line.to_owned()
            }
        }
    })
    .collect()
}
