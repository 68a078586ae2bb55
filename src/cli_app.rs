//
// src/cli_app.rs
//
// CLI interfacing, command-line argument parsing, standard output macros.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use clap::App;

/// CLI command parser using Clap
fn clap_app_spec<'a, 'b>() -> App<'a, 'b> {
    clap_app!( ("vcs-commit") =>
        (author: "Taras Zakharko <taras.zakharko@uzh.ch>")
        (about: "Commit, diff and blame for Subversion and Git working copies")
        (@arg verbose: -v --verbose +global "Verbose output")
        (@arg settings: --settings +takes_value +global
            "the settings file to use instead of the one in the user configuration directory"
        )
        (@setting SubcommandRequired)
        (@subcommand status =>
            (about: "lists the items that would be offered for a commit")
            (@arg PATHS: ... !required
                "the paths to inspect (defaults to the current directory)"
            )
            (@group visibility =>
                (@arg show_unversioned: --("show-unversioned") "list unversioned items")
                (@arg hide_unversioned: --("hide-unversioned") "do not list unversioned items")
            )
            (@arg sort: --sort "sort the listing by path")
        )
        (@subcommand commit =>
            (about: "commits the selected items")
            (@arg PATHS: ... !required
                "the paths to commit (defaults to the current directory)"
            )
            (@arg message: -m --message +takes_value "the commit message")
            (@arg include: --include +takes_value ... number_of_values(1)
                "select PATH for the commit"
            )
            (@arg exclude: --exclude +takes_value ... number_of_values(1)
                "leave PATH out of the commit"
            )
            (@arg interactive: -i --interactive "choose the items interactively")
            (@group visibility =>
                (@arg show_unversioned: --("show-unversioned") "offer unversioned items")
                (@arg hide_unversioned: --("hide-unversioned") "do not offer unversioned items")
            )
        )
        (@subcommand diff =>
            (about: "lists changed items or prints the changes of a single file")
            (@arg PATHS: ... !required
                "the paths to inspect (defaults to the current directory)"
            )
            (@arg patch: -p --patch "print the changes of every selected item")
            (@group visibility =>
                (@arg show_unversioned: --("show-unversioned") "list unversioned items")
                (@arg hide_unversioned: --("hide-unversioned") "do not list unversioned items")
            )
        )
        (@subcommand blame =>
            (about: "shows the revision and author of every line of a file")
            (@arg PATH: +required "the file to annotate")
            (@arg LINE: !required "the line to highlight")
        )
        (@subcommand messages =>
            (about: "prints the previous commit messages")
        )
    )
}


/// vcs-commit command
#[derive(Clone, Debug)]
pub enum Command {
    /// vcs-commit status
    Status {
        paths: Vec<String>,
        show_unversioned: Option<bool>,
        sort: bool
    },
    /// vcs-commit commit
    Commit {
        paths: Vec<String>,
        message: Option<String>,
        include: Vec<String>,
        exclude: Vec<String>,
        interactive: bool,
        show_unversioned: Option<bool>
    },
    /// vcs-commit diff
    Diff {
        paths: Vec<String>,
        patch: bool,
        show_unversioned: Option<bool>
    },
    /// vcs-commit blame
    Blame {
        path: String,
        line: Option<String>
    },
    /// vcs-commit messages
    Messages
}

/// Options shared by all commands
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub settings: Option<std::path::PathBuf>
}

/// ANSI-terminal styling wrapper
pub fn style<D: std::fmt::Display>(obj: D) -> console::StyledObject<D> {
    console::Style::new().force_styling(true).apply_to(obj)
}

/// Width to lay tables out for
pub fn terminal_width() -> usize {
    console::Term::stdout().size_checked().map(|(_, columns)| columns as usize).unwrap_or(80)
}


macro_rules! stdout {
    ($fmt:expr) => {
        stdout!("{}", $fmt);
    };
    ($fmt:expr, $($arg:tt)*) => {{
        if ::console::colors_enabled() {
            println!($fmt, $($arg)*);
        } else {
            println!("{}", ::console::strip_ansi_codes(&format!($fmt, $($arg)*)));
        }
    }}
}

macro_rules! stderr {
    ($fmt:expr) => {
        stderr!("{}", $fmt);
    };
    ($fmt:expr, $($arg:tt)*) => {{
        if ::console::colors_enabled() {
            eprintln!($fmt, $($arg)*);
        } else {
            eprintln!("{}", ::console::strip_ansi_codes(&format!($fmt, $($arg)*)));
        }
    }}
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

use anyhow::Result;

/// The visibility override requested on the command line, if any
fn visibility(cmd: &clap::ArgMatches) -> Option<bool> {
    if cmd.is_present("show_unversioned") {
        Some(true)
    } else if cmd.is_present("hide_unversioned") {
        Some(false)
    } else {
        None
    }
}

impl Command {
    pub fn from_cli() -> Result<(Self, GlobalOptions)> {
        Command::from_args(std::env::args_os()).map_err(|err| {
            // help, version and usage errors are reported by clap itself
            match err.downcast::<clap::Error>() {
                Ok( err )  => err.exit(),
                Err( err ) => err
            }
        })
    }

    pub fn from_args<I, T>(args: I) -> Result<(Self, GlobalOptions)>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone
    {
        let args = clap_app_spec().get_matches_from_safe(args)?;

        let (name, cmd) = args.subcommand();
        let cmd = cmd.ok_or_else(|| anyhow::anyhow!("missing command"))?;

        let options = GlobalOptions {
            verbose  : args.is_present("verbose") || cmd.is_present("verbose"),
            settings : cmd.value_of_os("settings").or_else(|| args.value_of_os("settings")).map(Into::into)
        };

        let command = match name {
            "status" => {
                Command::Status {
                    paths            : cmd.values_of_lossy("PATHS").unwrap_or_default(),
                    show_unversioned : visibility(cmd),
                    sort             : cmd.is_present("sort")
                }
            },
            "commit" => {
                Command::Commit {
                    paths            : cmd.values_of_lossy("PATHS").unwrap_or_default(),
                    message          : cmd.value_of_lossy("message").map(|msg| msg.into_owned()),
                    include          : cmd.values_of_lossy("include").unwrap_or_default(),
                    exclude          : cmd.values_of_lossy("exclude").unwrap_or_default(),
                    interactive      : cmd.is_present("interactive"),
                    show_unversioned : visibility(cmd)
                }
            },
            "diff" => {
                Command::Diff {
                    paths            : cmd.values_of_lossy("PATHS").unwrap_or_default(),
                    patch            : cmd.is_present("patch"),
                    show_unversioned : visibility(cmd)
                }
            },
            "blame" => {
                Command::Blame {
                    path : cmd.value_of_lossy("PATH").map(|path| path.into_owned()).unwrap_or_default(),
                    line : cmd.value_of_lossy("LINE").map(|line| line.into_owned())
                }
            },
            "messages" => Command::Messages,
            // otherwise
            other => {
                anyhow::bail!("unknown command line command {}", other);
            }
        };

        Ok( (command, options) )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Command, GlobalOptions) {
        Command::from_args(std::iter::once("vcs-commit").chain(args.iter().copied()))
            .expect("valid command line")
    }

    #[test]
    fn test_commit_arguments() {
        let (command, options) = parse(&[
            "commit", "-m", "Fix typo", "--include", "new.txt", "--exclude", "a.txt",
            "--exclude", "b.txt", "--hide-unversioned", "src", "docs"
        ]);

        match command {
            Command::Commit { paths, message, include, exclude, interactive, show_unversioned } => {
                assert_eq!(paths, vec!["src", "docs"]);
                assert_eq!(message.as_deref(), Some("Fix typo"));
                assert_eq!(include, vec!["new.txt"]);
                assert_eq!(exclude, vec!["a.txt", "b.txt"]);
                assert!(!interactive);
                assert_eq!(show_unversioned, Some(false));
            },
            other => panic!("unexpected command {:?}", other)
        }

        assert!(!options.verbose);
    }

    #[test]
    fn test_global_options() {
        let (command, options) = parse(&["-v", "status", "--settings", "/tmp/s.toml", "--sort"]);

        assert!(matches!(command, Command::Status { sort: true, show_unversioned: None, .. }));
        assert!(options.verbose);
        assert_eq!(options.settings, Some("/tmp/s.toml".into()));
    }

    #[test]
    fn test_blame_line() {
        let (command, _) = parse(&["blame", "src/main.rs", "12"]);

        match command {
            Command::Blame { path, line } => {
                assert_eq!(path, "src/main.rs");
                assert_eq!(line.as_deref(), Some("12"));
            },
            other => panic!("unexpected command {:?}", other)
        }
    }

    #[test]
    fn test_visibility_flags() {
        let (command, _) = parse(&["status", "--show-unversioned"]);
        assert!(matches!(command, Command::Status { show_unversioned: Some(true), .. }));

        let (command, _) = parse(&["diff", "--hide-unversioned", "--patch"]);
        assert!(matches!(command, Command::Diff { show_unversioned: Some(false), patch: true, .. }));

        let (command, _) = parse(&["commit", "--show-unversioned"]);
        assert!(matches!(command, Command::Commit { show_unversioned: Some(true), .. }));
    }

    #[test]
    fn test_conflicting_visibility_is_rejected() {
        let result = Command::from_args(vec![
            "vcs-commit", "diff", "--show-unversioned", "--hide-unversioned"
        ]);

        assert!(result.is_err());
    }
}
