//
// src/status.rs
//
// Implementation of vcs-commit status
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::dialog::Dialog;
use crate::reconcile::ActivationPolicy;
use crate::settings::Settings;
use crate::table_formatter::TableFormatter;
use crate::cli_app::terminal_width;

use anyhow::Result;


pub fn status(paths: Vec<String>, show_unversioned: Option<bool>, sort: bool, settings: &Settings) -> Result<()> {
    let show_unversioned = show_unversioned.unwrap_or_else(|| settings.show_unversioned_files());

    let dialog = Dialog::open(&paths, show_unversioned, ActivationPolicy::Commit)?;
    let snapshot = dialog.load()?;

    stdout!("{}", dialog.target_line()?);

    let table = TableFormatter::new(&snapshot.view.rows);
    let table = if sort { table.sorted() } else { table };

    stdout!("{:width$}", table, width = terminal_width());
    stdout!("{}", snapshot.status_line());

    Ok( () )
}
