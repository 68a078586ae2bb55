//
// src/error.rs
//
// The global error catalogue. All errors are defined here.
// In addition, common error styling routines are here as well.
//
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use std::path::PathBuf;
use crate::util::get_relative_path;

define_error!(
    NotAWorkingCopy {
        pub path: PathBuf
    }
    @display(self) {
        (@err "{path} is not inside a Subversion or Git working copy"
            [
                path = style::path(get_relative_path(&self.path).display())
            ]
        )
        (@hint "Are you running {cmd} from outside your project?"
            [
                cmd = style::command("vcs-commit")
            ]
        )
    }
);

define_error!(
    PathNotInWorkingCopy {
        pub path: PathBuf,
        pub root: PathBuf
    }
    @display(self) {
        (@err "{path} is not within the working copy at {root}"
            [
                path = style::path(&self.path.display()),
                root = style::path(&self.root.display())
            ]
        )
    }
);

define_error!(
    InvalidItem {
        pub index: usize,
        pub reason: String
    }
    @display(self) {
        (@err "malformed status entry #{index} {reason}"
            [
                index  = self.index + 1,
                reason = style::comment(&self.reason)
            ]
        )
    }
);

define_error!(
    StalePreference {
        pub path: PathBuf,
        pub msg : String
    }
    @display(self) {
        (@warn "preferences in {path} are unavailable {msg}"
            [
                path = style::path(get_relative_path(&self.path).display()),
                msg  = style::comment(&self.msg)
            ]
        )
        (@hint "Falling back to the last known values.")
    }
);

define_error!(
    OtherGitError {
        pub msg : String
    }
    @display(self) {
        (@err "git error {msg}" [
                msg  = style::comment(&self.msg)
            ]
        )
    }
);

impl From<git2::Error> for OtherGitError {
    fn from(error: git2::Error) -> Self {
        OtherGitError { msg : error.message().to_owned() }
    }
}

define_error!(
    SvnCommandFailed {
        pub command : String,
        pub msg     : String
    }
    @display(self) {
        (@err "{cmd} failed {msg}"
            [
                cmd = style::command(&self.command),
                msg = style::comment(&self.msg)
            ]
        )
    }
);

define_error!(
    EmptyCommitMessage
    @display(self) {
        (@err "the commit message is empty")
        (@div "Please provide one with {cmd}"
            [
                cmd = style::command("vcs-commit commit -m <MESSAGE>")
            ]
        )
    }
);

define_error!(
    NothingToCommit
    @display(self) {
        (@err "no items are selected for the commit")
        (@hint "Select items with {include} or commit interactively with {interactive}"
            [
                include     = style::command("--include <PATH>"),
                interactive = style::command("-i")
            ]
        )
    }
);

define_error!(
    InvalidLineNumber {
        pub value : String
    }
    @display(self) {
        (@err "{value} is not a valid line number"
            [
                value = style::value(&self.value)
            ]
        )
    }
);

define_error!(
    FileWriteError {
        pub path : PathBuf,
        pub msg  : String,
    }
    @display(self) {
        (@err "unable to write {path} {msg}"
            [
                path = style::path(get_relative_path(&self.path).display()),
                msg  = style::comment(&self.msg)
            ]
        )
    }
);

define_error!(
    FileReadError {
        pub path : PathBuf,
        pub msg  : String,
    }
    @display(self) {
        (@err "unable to read {path} {msg}"
            [
                path = style::path(get_relative_path(&self.path).display()),
                msg  = style::comment(&self.msg)
            ]
        )
    }
);

define_error!(
    NoRevisionCommitted {
        pub output : String
    }
    @display(self) {
        (@err "svn commit did not report a committed revision {output}"
            [
                output = style::comment(self.output.trim())
            ]
        )
        (@hint "Nothing may have been sent. Check {cmd}"
            [
                cmd = style::command("svn status")
            ]
        )
    }
);

define_error!(
    NoExtension {
        pub path : PathBuf
    }
    @display(self) {
        (@err "{path} has no extension to ignore"
            [
                path = style::path(get_relative_path(&self.path).display())
            ]
        )
    }
);

define_error!(
    SettingsNotWritten {
        pub path : PathBuf
    }
    @display(self) {
        (@warn "{path} was not updated, it could not be read when loading"
            [
                path = style::path(get_relative_path(&self.path).display())
            ]
        )
        (@hint "Fix or remove the file to save preferences again.")
    }
);

define_error!(
    RefreshAbandoned {
        pub seq : u64
    }
    @display(self) {
        (@err "status query #{seq} ended without a result"
            [
                seq = self.seq
            ]
        )
    }
);

define_error!(
    SessionClosed
    @display(self) {
        (@err "the selection session has shut down")
    }
);


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


mod style {
    use std::fmt::Display;
    use console::Style;

    fn basic_style() -> Style {
        Style::new().force_styling(true)
    }

    pub fn value<D: Display>(obj: D) -> impl Display {
        basic_style().cyan().apply_to(obj)
    }

    pub fn comment<D: Display>(obj: D) -> impl Display {
        let msg = obj.to_string();
        let msg = if msg.trim().is_empty() {
            "".to_owned()
        } else {
            format!("({})", lowercase_first(msg.trim()))
        };

        basic_style().italic().apply_to(msg)
    }

    pub fn path<D: Display>(obj: D) -> impl Display {
        use crate::util::escape_unicode_only;

        basic_style().italic().apply_to(format!("'{}'", escape_unicode_only(&obj.to_string())))
    }

    pub fn command<D: Display>(obj: D) -> impl Display {
        basic_style().bold().apply_to(format!("`{}`", obj))
    }

    fn lowercase_first(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(ch) => ch.to_lowercase().chain(chars).collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_has_marker() {
        console::set_colors_enabled(false);

        let err = InvalidItem { index: 2, reason: "Missing path".to_owned() };
        let text = console::strip_ansi_codes(&err.to_string()).into_owned();

        assert!(text.starts_with("error: malformed status entry #3"));
        assert!(text.contains("(missing path)"));
    }

    #[test]
    fn test_warning_display() {
        let err = StalePreference { path: "/tmp/settings.toml".into(), msg: "denied".to_owned() };
        let text = console::strip_ansi_codes(&err.to_string()).into_owned();

        assert!(text.starts_with("warning: preferences in"));
        assert!(text.contains("Falling back to the last known values."));
    }

    #[test]
    fn test_errors_travel_through_anyhow() {
        let err: anyhow::Error = SvnCommandFailed {
            command : "svn status".to_owned(),
            msg     : "E155007".to_owned()
        }.into();

        assert!(err.downcast_ref::<SvnCommandFailed>().is_some());
        assert!(err.downcast_ref::<InvalidItem>().is_none());
    }
}
