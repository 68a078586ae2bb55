//
// src/blame.rs
//
// Implementation of vcs-commit blame
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use crate::cli_app::style;
use crate::vcs::{BlameLine, Vcs};

use crate::error;
use anyhow::{Result, bail};
use tap::*;


pub fn blame(path: String, line: Option<String>) -> Result<()> {
    let highlight = line.as_deref().map(parse_line_number).transpose()?;

    let vcs = Vcs::guess(&path)?;
    let lines = vcs.blame(&path)?;

    if let Some(number) = highlight {
        if number > lines.len() {
            bail!(error::InvalidLineNumber { value: number.to_string() });
        }
    }

    let revision_width = lines.iter().map(|line| line.revision.len()).max().unwrap_or_default();
    let author_width = lines.iter().map(|line| line.author.chars().count()).max().unwrap_or_default();
    let number_width = lines.len().to_string().len();

    for line in lines.iter() {
        let text = format_line(line, number_width, revision_width, author_width);

        if highlight == Some(line.line) {
            stdout!("{}", style(text).reverse());
        } else {
            stdout!("{}", text);
        }
    }

    highlight.and_then(|number| lines.get(number - 1)).tap_some(|line| {
        stdout!("");
        stdout!("Line {} was last changed in {} by {}",
            line.line,
            style(&line.revision).bold(),
            style(&line.author).bold()
        );
    });

    Ok( () )
}

/// Line numbers start at 1
fn parse_line_number(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok( number ) if number > 0 => Ok( number ),
        _ => bail!(error::InvalidLineNumber { value: value.to_owned() })
    }
}

fn format_line(line: &BlameLine, number_width: usize, revision_width: usize, author_width: usize) -> String {
    format!("{:>nw$} {:>rw$} {:<aw$} {}",
        line.line,
        line.revision,
        line.author,
        line.text,
        nw = number_width,
        rw = revision_width,
        aw = author_width
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_number() {
        assert_eq!(parse_line_number("12").unwrap(), 12);
        assert_eq!(parse_line_number(" 3 ").unwrap(), 3);

        for value in &["0", "-1", "twelve", ""] {
            let err = parse_line_number(value).unwrap_err();
            assert!(err.downcast_ref::<error::InvalidLineNumber>().is_some());
        }
    }

    #[test]
    fn test_format_line() {
        let line = BlameLine {
            line     : 7,
            revision : "42".to_owned(),
            author   : "alice".to_owned(),
            text     : "let x = 1;".to_owned()
        };

        assert_eq!(format_line(&line, 2, 4, 6), " 7   42 alice  let x = 1;");
    }
}
