//
// src/diff.rs
//
// Implementation of vcs-commit diff
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::cli_app::{style, terminal_width};
use crate::dialog::Dialog;
use crate::reconcile::ActivationPolicy;
use crate::settings::Settings;
use crate::table_formatter::TableFormatter;
use crate::vcs::Vcs;

use anyhow::Result;
use std::path::Path;


pub fn diff(paths: Vec<String>, patch: bool, show_unversioned: Option<bool>, settings: &Settings) -> Result<()> {
    // a single file is shown right away
    if let [path] = paths.as_slice() {
        if Path::new(path).is_file() {
            let vcs = Vcs::guess(path)?;

            print_diff(&vcs.diff(path)?);
            return Ok( () );
        }
    }

    let show_unversioned = show_unversioned.unwrap_or_else(|| settings.show_unversioned_files());

    let dialog = Dialog::open(&paths, show_unversioned, ActivationPolicy::Diff)?;
    let snapshot = dialog.load()?;

    stdout!("{}", dialog.target_line()?);
    stdout!("{:width$}", TableFormatter::new(&snapshot.view.rows), width = terminal_width());
    stdout!("{}", snapshot.status_line());

    if patch {
        for path in snapshot.view.included_paths() {
            stdout!("");
            print_diff(&dialog.vcs().diff(path)?);
        }
    }

    Ok( () )
}

fn print_diff(text: &str) {
    for line in text.lines() {
        stdout!("{}", colorize_line(line));
    }
}

fn colorize_line(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        style(line).bold().to_string()
    } else if line.starts_with('+') {
        style(line).green().to_string()
    } else if line.starts_with('-') {
        style(line).red().to_string()
    } else if line.starts_with("@@") {
        style(line).cyan().to_string()
    } else {
        line.to_owned()
    }
}
