//
// src/dialog.rs
//
// A listing opened on a set of paths: the working copy, the paths queried
// on every refresh and the session holding the user's selection.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::reconcile::ActivationPolicy;
use crate::session::{DialogSession, SessionWorker, Snapshot};
use crate::vcs::{Vcs, STATUSES_FOR_COMMIT};

use anyhow::{Result, anyhow};
use std::path::PathBuf;


pub struct Dialog {
    vcs    : Vcs,
    paths  : Vec<PathBuf>,
    worker : SessionWorker
}

impl Dialog {
    /// Open a listing on `paths` (the current directory if empty)
    ///
    /// The working copy is detected from the first path. The paths also
    /// seed the selection, so an unversioned file named on the command line
    /// starts out selected.
    pub fn open(paths: &[String], show_unversioned: bool, policy: ActivationPolicy) -> Result<Dialog> {
        use crate::util::absolute_path;

        let paths = if paths.is_empty() {
            vec![absolute_path(".")]
        } else {
            paths.iter().map(absolute_path).collect::<Vec<_>>()
        };

        let vcs = Vcs::guess(&paths[0])?;

        let seeds = paths.iter()
            .map(|path| vcs.item_path(path))
            .collect::<Result<Vec<_>>>()?;

        let worker = SessionWorker::spawn(DialogSession::new(seeds, show_unversioned, policy));

        Ok( Dialog { vcs, paths, worker } )
    }

    pub fn vcs(&self) -> &Vcs {
        &self.vcs
    }

    pub fn worker(&self) -> &SessionWorker {
        &self.worker
    }

    /// Start a status query, returning its sequence number
    pub fn refresh(&self) -> u64 {
        let vcs = self.vcs.clone();
        let paths = self.paths.clone();

        self.worker.refresh(move || vcs.get_items(&paths, STATUSES_FOR_COMMIT))
    }

    /// Refresh and wait for the result
    ///
    /// Unlike an interactive refresh, a failed query is an error here.
    pub fn load(&self) -> Result<Snapshot> {
        let snapshot = self.worker.wait_for(self.refresh())?;

        match snapshot.error {
            Some( err ) => Err(anyhow!(err)),
            None        => Ok( snapshot )
        }
    }

    /// The "Commit to" line shown above a listing
    pub fn target_line(&self) -> Result<String> {
        use crate::cli_app::style;

        let label = self.vcs.target_label()?;

        Ok( match self.vcs {
            Vcs::Subversion(_) => format!("Commit to: {}", style(label).bold()),
            Vcs::Git(_)        => format!("On branch {}", style(label).bold())
        })
    }

    /// Set the flag of `path` as given on the command line
    pub fn select(&self, path: &str, included: bool) -> Result<()> {
        use crate::util::absolute_path;

        let key = self.vcs.item_path(absolute_path(path))?;

        tracing::debug!(path = %key, included, "selection from command line");

        self.worker.toggle(key, included)
    }
}
