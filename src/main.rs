//
// vcs-commit
//
// Commit, diff and blame for Subversion and Git working copies
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0


// Errors
#[macro_use] mod error_macros;
mod error;

// CLI interface
#[macro_use] extern crate clap;
#[macro_use] mod cli_app;

// Various internal frameworks and utilities
mod util;
mod vcs;
mod settings;
mod reconcile;
mod session;
mod dialog;
mod table_formatter;

// Implementation of CLI commands

// vcs-commit status
mod status;
// vcs-commit commit, vcs-commit messages
mod commit;
// vcs-commit diff
mod diff;
// vcs-commit blame
mod blame;


fn init_logging(verbose: bool) {
    use tracing::Level;

    let level = if verbose { Level::DEBUG } else { Level::WARN };

    // diagnostics go to stderr, command output stays on stdout
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

// Program's entry point
fn main() {
    use cli_app::Command;

    // fetch and run the command from CLI
    let result = Command::from_cli().and_then(|(command, options)| {
        init_logging(options.verbose);

        let mut settings = settings::Settings::open(options.settings);

        match command {
            Command::Status { paths, show_unversioned, sort } => {
                status::status(paths, show_unversioned, sort, &settings)
            },
            Command::Commit { paths, message, include, exclude, interactive, show_unversioned } => {
                commit::commit(
                    commit::CommitOptions { paths, message, include, exclude, interactive, show_unversioned },
                    &mut settings
                )
            },
            Command::Diff { paths, patch, show_unversioned } => {
                diff::diff(paths, patch, show_unversioned, &settings)
            },
            Command::Blame { path, line } => {
                blame::blame(path, line)
            },
            Command::Messages => {
                commit::messages(&settings)
            }
        }
    });

    // check if there was an error, display it and die
    if let Err(err) = result {
        stderr!("{}", err);
        std::process::exit(1);
    }
}
