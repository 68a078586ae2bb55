//
// src/session.rs
//
// A selection session: the state behind one commit or diff listing.
//
// `DialogSession` owns the selection map and the last query result and is
// driven synchronously. `SessionWorker` moves a session onto its own thread
// and serialises every mutation (refresh results, toggles, visibility
// changes) through one queue. Status queries run on separate threads and
// are numbered; a result older than the newest one that came back, whether
// it succeeded or failed, is dropped.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::reconcile::{self, ActivationPolicy, Reconciliation, SelectionMap};
use crate::vcs::Item;
use crate::error;

use anyhow::Result;
use std::collections::HashSet;


/// Selection state of one listing
#[derive(Debug, Clone)]
pub struct DialogSession {
    seeds            : HashSet<String>,
    policy           : ActivationPolicy,
    show_unversioned : bool,
    selection        : SelectionMap,
    items            : Vec<Item>,
    view             : Reconciliation,
    applied_refresh  : u64,
    settled_refresh  : u64
}

impl DialogSession {
    /// A session for a listing opened on `seeds` (absolute paths)
    pub fn new<I>(seeds: I, show_unversioned: bool, policy: ActivationPolicy) -> Self
    where
        I: IntoIterator<Item = String>
    {
        DialogSession {
            seeds : seeds.into_iter().collect(),
            policy,
            show_unversioned,
            selection : SelectionMap::new(),
            items : Vec::new(),
            view  : Reconciliation::default(),
            applied_refresh : 0,
            settled_refresh : 0
        }
    }

    /// Apply the result of refresh number `seq`
    ///
    /// Returns `false` (and changes nothing) if a newer refresh has already
    /// come back, successfully or not.
    pub fn apply_refresh(&mut self, seq: u64, items: Vec<Item>) -> Result<bool> {
        if seq < self.settled_refresh {
            tracing::debug!(seq, settled = self.settled_refresh, "dropping stale refresh");
            return Ok( false );
        }

        // settled even if the items turn out to be malformed
        self.settled_refresh = seq;

        self.view = reconcile::reconcile(
            &items, &mut self.selection, &self.seeds, self.show_unversioned, self.policy
        )?;
        self.items = items;
        self.applied_refresh = seq;

        tracing::debug!(seq, rows = self.view.rows.len(), "refresh applied");

        Ok( true )
    }

    /// Record that refresh number `seq` failed
    ///
    /// The rows are kept. Returns `false` if a newer refresh has already come
    /// back, in which case the failure is of no interest.
    pub fn refresh_failed(&mut self, seq: u64) -> bool {
        if seq < self.settled_refresh {
            tracing::debug!(seq, settled = self.settled_refresh, "dropping stale refresh failure");
            return false;
        }

        self.settled_refresh = seq;
        true
    }

    /// Record a user's check or uncheck of `path`
    pub fn toggle(&mut self, path: &str, included: bool) {
        self.selection.insert(path.to_owned(), included);

        self.view.rows.iter_mut()
            .filter(|row| row.path == path)
            .for_each(|row| row.included = included);
    }

    /// Check or uncheck every visible row
    pub fn toggle_all(&mut self, included: bool) {
        for row in self.view.rows.iter_mut() {
            row.included = included;
            self.selection.insert(row.path.clone(), included);
        }
    }

    /// Show or hide unversioned items; the selection is not affected
    pub fn set_show_unversioned(&mut self, show: bool) -> Result<()> {
        self.show_unversioned = show;

        self.view = reconcile::reconcile(
            &self.items, &mut self.selection, &self.seeds, self.show_unversioned, self.policy
        )?;

        Ok( () )
    }

    pub fn show_unversioned(&self) -> bool {
        self.show_unversioned
    }

    pub fn view(&self) -> &Reconciliation {
        &self.view
    }

    pub fn applied_refresh(&self) -> u64 {
        self.applied_refresh
    }

    /// Highest refresh number that has come back
    pub fn settled_refresh(&self) -> u64 {
        self.settled_refresh
    }
}


/// A point-in-time copy of a session for rendering
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub view             : Reconciliation,
    pub show_unversioned : bool,
    /// sequence number of the refresh the rows come from
    pub refresh          : u64,
    /// the last refresh failure, cleared by a successful refresh
    pub error            : Option<String>
}

impl Snapshot {
    /// The status line: the error of the last refresh, or the item summary
    pub fn status_line(&self) -> String {
        match &self.error {
            Some( err ) => format!("Refresh failed: {}", err),
            None        => self.view.summary()
        }
    }
}


//
// ####                    ###
//  ##                      ##
//  ##                      ##
//  ##  ## ##  ##   ## ##   ##
//  ##  ### ### ##  ### ##  ##
//  ##  ##  ##  ##  ##  ##  ##
//  ##  ##  ##  ##  ##  ##  ##
// #### ##  ##  ##  #####  ####
//                  ##
//                 ####

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender, Receiver};
use std::thread::JoinHandle;

enum Request {
    Refreshed { seq: u64, result: Result<Vec<Item>> },
    Toggle { path: String, included: bool },
    ToggleAll { included: bool },
    ShowUnversioned { show: bool },
    Snapshot { reply: Sender<Snapshot> },
    WaitFor { seq: u64, reply: Sender<Snapshot> },
    Shutdown
}

/// A session running on its own thread
///
/// All methods only enqueue requests, so they never race with a refresh
/// being applied.
pub struct SessionWorker {
    sender      : Sender<Request>,
    next_seq    : AtomicU64,
    handle      : Option<JoinHandle<()>>
}

/// A numbered refresh whose result has not been delivered yet
///
/// Dropping it undelivered reports the refresh as failed, so nobody waits
/// for it forever.
pub struct PendingRefresh {
    seq    : u64,
    sender : Option<Sender<Request>>
}

impl PendingRefresh {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Hand the query result to the session
    pub fn complete(mut self, result: Result<Vec<Item>>) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: Result<Vec<Item>>) {
        if let Some(sender) = self.sender.take() {
            // the session may be gone by now, nothing to report to then
            let _ = sender.send(Request::Refreshed { seq: self.seq, result });
        }
    }
}

impl Drop for PendingRefresh {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.deliver(Err(error::RefreshAbandoned { seq: self.seq }.into()));
        }
    }
}

impl SessionWorker {
    pub fn spawn(session: DialogSession) -> Self {
        let (sender, receiver) = mpsc::channel();
        let next_seq = AtomicU64::new(session.settled_refresh());

        let handle = std::thread::spawn(move || run_session(session, receiver));

        SessionWorker { sender, next_seq, handle: Some(handle) }
    }

    fn send(&self, request: Request) -> Result<()> {
        self.sender.send(request).map_err(|_| error::SessionClosed.into())
    }

    /// Number a new refresh; its result is delivered through the returned handle
    pub fn begin_refresh(&self) -> PendingRefresh {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(seq, "refresh scheduled");

        PendingRefresh { seq, sender: Some(self.sender.clone()) }
    }

    /// Run `query` on a background thread and feed its result to the session
    ///
    /// Returns the sequence number of this refresh.
    pub fn refresh<Q>(&self, query: Q) -> u64
    where
        Q: FnOnce() -> Result<Vec<Item>> + Send + 'static
    {
        let pending = self.begin_refresh();
        let seq = pending.seq();

        std::thread::spawn(move || pending.complete(query()));

        seq
    }

    pub fn toggle<S: Into<String>>(&self, path: S, included: bool) -> Result<()> {
        self.send(Request::Toggle { path: path.into(), included })
    }

    pub fn toggle_all(&self, included: bool) -> Result<()> {
        self.send(Request::ToggleAll { included })
    }

    pub fn set_show_unversioned(&self, show: bool) -> Result<()> {
        self.send(Request::ShowUnversioned { show })
    }

    /// The current state, after every request sent so far
    pub fn snapshot(&self) -> Result<Snapshot> {
        let (reply, response) = mpsc::channel();
        self.send(Request::Snapshot { reply })?;

        response.recv().map_err(|_| error::SessionClosed.into())
    }

    /// Block until refresh `seq`, or a newer one, has come back
    pub fn wait_for(&self, seq: u64) -> Result<Snapshot> {
        let (reply, response) = mpsc::channel();
        self.send(Request::WaitFor { seq, reply })?;

        response.recv().map_err(|_| error::SessionClosed.into())
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Request::Shutdown);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}


fn run_session(mut session: DialogSession, requests: Receiver<Request>) {
    let mut error : Option<String> = None;
    let mut waiting : Vec<(u64, Sender<Snapshot>)> = Vec::new();

    let snapshot = |session: &DialogSession, error: &Option<String>| Snapshot {
        view             : session.view().clone(),
        show_unversioned : session.show_unversioned(),
        refresh          : session.applied_refresh(),
        error            : error.clone()
    };

    for request in requests.iter() {
        match request {
            Request::Refreshed { seq, result } => {
                let outcome = match result {
                    Ok( items ) => session.apply_refresh(seq, items),
                    Err( err ) => if session.refresh_failed(seq) { Err(err) } else { Ok( false ) }
                };

                match outcome {
                    Ok( true )  => error = None,
                    Ok( false ) => {},
                    Err( err )  => {
                        tracing::warn!(seq, "refresh failed: {:#}", err);
                        error = Some(console::strip_ansi_codes(&err.to_string()).into_owned());
                    }
                }
            },
            Request::Toggle { path, included } => session.toggle(&path, included),
            Request::ToggleAll { included } => session.toggle_all(included),
            Request::ShowUnversioned { show } => {
                if let Err(err) = session.set_show_unversioned(show) {
                    error = Some(console::strip_ansi_codes(&err.to_string()).into_owned());
                }
            },
            Request::Snapshot { reply } => {
                let _ = reply.send(snapshot(&session, &error));
            },
            Request::WaitFor { seq, reply } => {
                waiting.push((seq, reply));
            },
            Request::Shutdown => break
        }

        // release everyone whose refresh has settled
        let settled = session.settled_refresh();
        let (ready, pending) : (Vec<_>, Vec<_>) = waiting.drain(..).partition(|(seq, _)| *seq <= settled);
        waiting = pending;

        for (_, reply) in ready {
            let _ = reply.send(snapshot(&session, &error));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::ItemStatus;
    use anyhow::anyhow;

    fn item(path: &str, status: ItemStatus) -> Item {
        Item::new(path, status, ItemStatus::None)
    }

    fn sample() -> Vec<Item> {
        vec![
            item("/wc/a.txt", ItemStatus::Modified),
            item("/wc/b.txt", ItemStatus::Unversioned)
        ]
    }

    fn commit_session(show_unversioned: bool) -> DialogSession {
        DialogSession::new(vec!["/wc/a.txt".to_owned()], show_unversioned, ActivationPolicy::Commit)
    }

    #[test]
    fn test_toggle_then_show_unversioned() {
        let mut session = commit_session(false);

        assert!(session.apply_refresh(1, sample()).unwrap());
        assert_eq!(session.view.rows.len(), 1);
        assert_eq!(session.selection.get("/wc/b.txt"), Some(&false));

        session.toggle("/wc/b.txt", true);
        session.set_show_unversioned(true).unwrap();
        assert!(session.apply_refresh(2, sample()).unwrap());

        let rows = &session.view.rows;
        assert_eq!(rows.len(), 2);
        assert!(rows[1].included);
    }

    #[test]
    fn test_stale_refresh_is_dropped() {
        let mut session = commit_session(true);

        assert!(session.apply_refresh(2, sample()).unwrap());
        assert!(!session.apply_refresh(1, vec![item("/wc/old.txt", ItemStatus::Added)]).unwrap());

        assert_eq!(session.view.rows.len(), 2);
        assert!(!session.selection.contains_key("/wc/old.txt"));
        assert_eq!(session.applied_refresh(), 2);
    }

    #[test]
    fn test_toggle_all_touches_visible_rows_only() {
        let mut session = commit_session(false);
        session.apply_refresh(1, sample()).unwrap();

        session.toggle_all(false);
        assert_eq!(session.selection.get("/wc/a.txt"), Some(&false));
        assert_eq!(session.selection.get("/wc/b.txt"), Some(&false));

        session.toggle_all(true);
        assert_eq!(session.selection.get("/wc/a.txt"), Some(&true));
        // hidden, so left alone
        assert_eq!(session.selection.get("/wc/b.txt"), Some(&false));
    }

    #[test]
    fn test_worker_refresh_and_toggle() {
        let worker = SessionWorker::spawn(commit_session(true));

        let seq = worker.refresh(|| Ok(sample()));
        let snapshot = worker.wait_for(seq).unwrap();
        assert_eq!(snapshot.refresh, seq);
        assert_eq!(snapshot.view.rows.len(), 2);
        assert!(!snapshot.view.rows[1].included);

        worker.toggle("/wc/b.txt", true).unwrap();
        let seq = worker.refresh(|| Ok(sample()));
        let snapshot = worker.wait_for(seq).unwrap();

        assert!(snapshot.view.rows[1].included);
        assert_eq!(snapshot.status_line(), "Found 1 changed and 1 unversioned item(s)");
    }

    #[test]
    fn test_worker_failed_refresh_keeps_rows() {
        let worker = SessionWorker::spawn(commit_session(true));

        let seq = worker.refresh(|| Ok(sample()));
        worker.wait_for(seq).unwrap();

        let seq = worker.refresh(|| Err(anyhow!("repository is locked")));
        let snapshot = worker.wait_for(seq).unwrap();

        assert_eq!(snapshot.view.rows.len(), 2);
        assert_eq!(snapshot.error.as_deref(), Some("repository is locked"));
        assert!(snapshot.status_line().starts_with("Refresh failed"));

        let seq = worker.refresh(|| Ok(sample()));
        let snapshot = worker.wait_for(seq).unwrap();
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_failure_settles_older_refreshes() {
        let mut session = commit_session(true);

        assert!(session.apply_refresh(1, sample()).unwrap());
        assert!(session.refresh_failed(3));

        // issued before the failed one, so it describes an older state
        assert!(!session.apply_refresh(2, vec![item("/wc/old.txt", ItemStatus::Added)]).unwrap());
        assert!(!session.refresh_failed(2));

        assert_eq!(session.view.rows.len(), 2);
        assert_eq!(session.applied_refresh(), 1);
        assert_eq!(session.settled_refresh(), 3);
    }

    #[test]
    fn test_worker_newer_refresh_wins() {
        let worker = SessionWorker::spawn(commit_session(true));

        let older = worker.begin_refresh();
        let newer = worker.begin_refresh();
        let (older_seq, newer_seq) = (older.seq(), newer.seq());

        newer.complete(Ok(sample()));

        // the newer result settles the older request as well
        let snapshot = worker.wait_for(older_seq).unwrap();
        assert_eq!(snapshot.refresh, newer_seq);
        assert_eq!(snapshot.view.rows.len(), 2);

        older.complete(Ok(vec![item("/wc/old.txt", ItemStatus::Added)]));

        let snapshot = worker.snapshot().unwrap();
        assert_eq!(snapshot.refresh, newer_seq);
        assert!(snapshot.view.rows.iter().all(|row| row.path != "/wc/old.txt"));
    }

    #[test]
    fn test_worker_older_success_after_newer_failure() {
        let worker = SessionWorker::spawn(commit_session(true));

        let older = worker.begin_refresh();
        let newer = worker.begin_refresh();

        newer.complete(Err(anyhow!("repository is locked")));
        older.complete(Ok(vec![item("/wc/old.txt", ItemStatus::Added)]));

        let snapshot = worker.snapshot().unwrap();
        assert_eq!(snapshot.error.as_deref(), Some("repository is locked"));
        assert!(snapshot.view.rows.is_empty());
        assert_eq!(snapshot.refresh, 0);
    }

    #[test]
    fn test_worker_toggle_during_refresh() {
        let worker = SessionWorker::spawn(commit_session(true));

        let seq = worker.refresh(|| Ok(sample()));
        let snapshot = worker.wait_for(seq).unwrap();
        assert!(!snapshot.view.rows[1].included);

        let (release, gate) = mpsc::channel::<()>();
        let seq = worker.refresh(move || {
            let _ = gate.recv();
            Ok(sample())
        });

        // checked while the status query is still running
        worker.toggle("/wc/b.txt", true).unwrap();
        release.send(()).unwrap();

        let snapshot = worker.wait_for(seq).unwrap();
        assert_eq!(snapshot.refresh, seq);
        assert!(snapshot.view.rows[1].included);
    }

    #[test]
    fn test_abandoned_refresh_releases_waiters() {
        let worker = SessionWorker::spawn(commit_session(true));

        let pending = worker.begin_refresh();
        let seq = pending.seq();
        drop(pending);

        let snapshot = worker.wait_for(seq).unwrap();
        assert!(snapshot.error.is_some());
        assert_eq!(snapshot.refresh, 0);
    }

    #[test]
    fn test_worker_visibility_change() {
        let worker = SessionWorker::spawn(commit_session(true));
        let seq = worker.refresh(|| Ok(sample()));
        worker.wait_for(seq).unwrap();

        worker.set_show_unversioned(false).unwrap();
        let snapshot = worker.snapshot().unwrap();

        assert!(!snapshot.show_unversioned);
        assert_eq!(snapshot.view.rows.len(), 1);
        assert_eq!(snapshot.view.unversioned, 1);
    }
}
