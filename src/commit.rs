//
// src/commit.rs
//
// Implementation of vcs-commit commit and vcs-commit messages
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::cli_app::{style, terminal_width};
use crate::dialog::Dialog;
use crate::reconcile::{ActivationPolicy, Row};
use crate::session::Snapshot;
use crate::settings::Settings;
use crate::table_formatter::TableFormatter;
use crate::vcs::{CommitProgress, Item, Vcs};

use crate::error;
use anyhow::{Result, bail};
use console::Term;


/// Arguments of vcs-commit commit
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub paths            : Vec<String>,
    pub message          : Option<String>,
    pub include          : Vec<String>,
    pub exclude          : Vec<String>,
    pub interactive      : bool,
    pub show_unversioned : Option<bool>
}

pub fn commit(options: CommitOptions, settings: &mut Settings) -> Result<()> {
    let show_unversioned = options.show_unversioned.unwrap_or_else(|| settings.show_unversioned_files());

    let dialog = Dialog::open(&options.paths, show_unversioned, ActivationPolicy::Commit)?;
    dialog.load()?;

    // explicit choices override the defaults
    for path in options.include.iter() {
        dialog.select(path, true)?;
    }
    for path in options.exclude.iter() {
        dialog.select(path, false)?;
    }

    stdout!("{}", dialog.target_line()?);

    let snapshot = if options.interactive {
        match select_interactively(&dialog, settings)? {
            Some( snapshot ) => snapshot,
            None => {
                stdout!("Commit cancelled, nothing was changed.");
                return Ok( () );
            }
        }
    } else {
        let snapshot = dialog.worker().snapshot()?;

        stdout!("{:width$}", TableFormatter::new(&snapshot.view.rows), width = terminal_width());
        snapshot
    };

    // only what the user can see is committed
    let items = snapshot.view.rows.iter()
        .filter(|row| row.included)
        .map(Row::to_item)
        .collect::<Vec<_>>();

    if items.is_empty() {
        bail!(error::NothingToCommit);
    }

    let message = match options.message {
        Some( message ) => message,
        None if options.interactive => prompt_message(settings)?,
        None => String::new()
    };

    let message = message.trim();
    if message.is_empty() {
        bail!(error::EmptyCommitMessage);
    }

    let revision = commit_items(&dialog, &items, message)?;

    settings.push_message(message);
    if let Err(err) = settings.write() {
        stderr!("{}", err);
    }

    stdout!("{} Committed {} item(s) as {} {}",
        style("✓").green(),
        items.len(),
        match dialog.vcs() {
            crate::vcs::Vcs::Subversion(_) => "revision",
            crate::vcs::Vcs::Git(_)        => "commit"
        },
        style(&revision).bold()
    );

    Ok( () )
}

/// vcs-commit messages
pub fn messages(settings: &Settings) -> Result<()> {
    if settings.messages().is_empty() {
        stdout!("No previous commit messages");
        return Ok( () );
    }

    for (i, message) in settings.messages().iter().enumerate() {
        let mut lines = message.lines();

        stdout!("{:>3}. {}", i + 1, lines.next().unwrap_or_default());
        for line in lines {
            stdout!("     {}", line);
        }
    }

    Ok( () )
}


// helper to commit the items with a progress bar
fn commit_items(dialog: &Dialog, items: &[Item], message: &str) -> Result<String> {
    use indicatif::{ProgressBar, ProgressDrawTarget};

    let added = items.iter().filter(|item| !item.is_versioned).count();

    // adding, staging and the commit itself
    let pb = ProgressBar::new((added + items.len() + 1) as u64);

    // we want to draw to stdout with max 10 updates per second
    let term = Term::stdout();

    pb.set_draw_target(ProgressDrawTarget::to_term(term.clone(), Some(10)));

    pb.set_style(indicatif::ProgressStyle::default_spinner()
        .template("  {spinner:.cyan/blue} {pos:>4}/{len} {wide_msg}")
    );

    stdout!("Committing {} item(s) ...", items.len());

    let result = dialog.vcs().commit(items, message, |progress| {
        use crate::util::display_path;

        match progress {
            CommitProgress::Added(path)  => pb.set_message(&format!("added {}", display_path(path))),
            CommitProgress::Staged(path) => pb.set_message(&format!("prepared {}", display_path(path))),
            CommitProgress::Committing   => pb.set_message("committing")
        }

        pb.inc(1);
    });

    // clean up the interactive part
    pb.finish_and_clear();
    if term.features().is_attended() {
        let _ = term.clear_last_lines(1);
    }

    result
}


/// Interactive selection loop
///
/// Returns the snapshot to commit, or `None` if the user quit.
fn select_interactively(dialog: &Dialog, settings: &mut Settings) -> Result<Option<Snapshot>> {
    let term = Term::stdout();
    let worker = dialog.worker();

    loop {
        let snapshot = worker.snapshot()?;
        let table = TableFormatter::new(&snapshot.view.rows).numbered();

        stdout!("");
        stdout!("{:width$}", table, width = terminal_width());
        stdout!("{}", snapshot.status_line());
        stdout!("{}", style(
            "[1-9..] toggle  [a] all  [u] unversioned  [r] refresh  [c] commit  [q] quit"
        ).dim());
        stdout!("{}", style(
            "[v N..] revert  [d N..] delete  [i N..] ignore  [e N..] ignore extension"
        ).dim());

        let input = term.read_line().map_err(|err| anyhow::anyhow!("unable to read input: {}", err))?;

        match parse_choice(&input) {
            Choice::Quit => return Ok( None ),
            Choice::Commit => return Ok( Some(snapshot) ),
            Choice::ToggleAll => {
                let all_included = snapshot.view.rows.iter().all(|row| row.included);
                worker.toggle_all(!all_included)?;
            },
            Choice::ToggleUnversioned => {
                let show = !snapshot.show_unversioned;
                worker.set_show_unversioned(show)?;

                // remembered for the next session, keeping changes made meanwhile
                settings.reload();
                if settings.show_unversioned_files() != show {
                    settings.set("general", "show_unversioned_files", show)?;
                    if let Err(err) = settings.write() {
                        stderr!("{}", err);
                    }
                }
            },
            Choice::Refresh => {
                worker.wait_for(dialog.refresh())?;
            },
            Choice::Toggle(numbers) => {
                for number in numbers {
                    match table.row(number) {
                        Some( row ) => worker.toggle(row.path.as_str(), !row.included)?,
                        None        => stderr!("There is no item {}", style(number).cyan())
                    }
                }
            },
            Choice::Act(action, numbers) => {
                let items = numbers.into_iter().filter_map(|number| {
                    let row = table.row(number);
                    if row.is_none() {
                        stderr!("There is no item {}", style(number).cyan());
                    }

                    row.map(Row::to_item)
                })
                .collect::<Vec<_>>();

                if items.is_empty() {
                    continue;
                }
                if action == Action::Delete && !confirm(&term, &format!("Delete {} item(s) from disk?", items.len()))? {
                    continue;
                }

                if let Err(err) = run_action(dialog.vcs(), action, &items) {
                    stderr!("{}", err);
                }

                worker.wait_for(dialog.refresh())?;
            },
            Choice::Unknown(input) => {
                stderr!("Unknown choice {}", style(input).cyan());
            }
        }
    }
}

/// Working copy operations offered on listed items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Revert,
    Delete,
    Ignore,
    IgnoreExtension
}

fn run_action(vcs: &Vcs, action: Action, items: &[Item]) -> Result<()> {
    match action {
        Action::Revert => vcs.revert(items)?,
        Action::Delete => vcs.remove(items)?,
        Action::Ignore | Action::IgnoreExtension => {
            for item in items {
                let pattern = vcs.ignore(item, action == Action::IgnoreExtension)?;
                stdout!("Ignoring {}", style(pattern).bold());
            }
        }
    }

    tracing::debug!(?action, items = items.len(), "working copy updated");

    Ok( () )
}

fn confirm(term: &Term, question: &str) -> Result<bool> {
    stdout!("{} [y/N]", question);
    let input = term.read_line().map_err(|err| anyhow::anyhow!("unable to read input: {}", err))?;

    Ok( matches!(input.trim().to_lowercase().as_str(), "y" | "yes") )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Choice {
    Quit,
    Commit,
    ToggleAll,
    ToggleUnversioned,
    Refresh,
    Toggle(Vec<usize>),
    Act(Action, Vec<usize>),
    Unknown(String)
}

fn parse_choice(input: &str) -> Choice {
    let input = input.trim();

    match input.to_lowercase().as_str() {
        "q" => Choice::Quit,
        "c" => Choice::Commit,
        "a" => Choice::ToggleAll,
        "u" => Choice::ToggleUnversioned,
        "r" => Choice::Refresh,
        _   => {
            let action = match input.get(..1).map(str::to_lowercase).as_deref() {
                Some( "v" ) => Some( Action::Revert ),
                Some( "d" ) => Some( Action::Delete ),
                Some( "i" ) => Some( Action::Ignore ),
                Some( "e" ) => Some( Action::IgnoreExtension ),
                _           => None
            };

            let choice = match action {
                Some( action ) => parse_numbers(&input[1..]).map(|numbers| Choice::Act(action, numbers)),
                None           => parse_numbers(input).map(Choice::Toggle)
            };

            choice.unwrap_or_else(|| Choice::Unknown(input.to_owned()))
        }
    }
}

/// "1, 3 12" style lists of row numbers
fn parse_numbers(input: &str) -> Option<Vec<usize>> {
    input
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse::<usize>)
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .filter(|numbers| !numbers.is_empty())
}

/// Ask for the commit message, offering the previous ones
fn prompt_message(settings: &Settings) -> Result<String> {
    let term = Term::stdout();

    if !settings.messages().is_empty() {
        stdout!("Previous messages (enter {} to reuse one):", style("!N").bold());
        for (i, message) in settings.messages().iter().enumerate() {
            use crate::util::truncate_text;

            let first_line = message.lines().next().unwrap_or_default();
            stdout!("{:>3}. {}", i + 1, truncate_text(first_line, terminal_width().saturating_sub(6)));
        }
    }

    stdout!("Commit message:");
    let input = term.read_line().map_err(|err| anyhow::anyhow!("unable to read input: {}", err))?;

    Ok( resolve_message(&input, settings.messages()) )
}

/// `!N` picks previous message N; anything else is taken literally
fn resolve_message(input: &str, previous: &[String]) -> String {
    input.trim()
        .strip_prefix('!')
        .and_then(|number| number.parse::<usize>().ok())
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| previous.get(index))
        .cloned()
        .unwrap_or_else(|| input.trim().to_owned())
}
