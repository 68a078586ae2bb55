//
// src/table_formatter.rs
//
// A bare-bones implementation for prettified display of the file table.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

use std::fmt;

use crate::reconcile::Row;
use crate::vcs::ItemStatus;


const PATH_HEADER       : &str = "Path";
const EXTENSION_HEADER  : &str = "Extension";
const TEXT_HEADER       : &str = "Text Status";
const PROPERTY_HEADER   : &str = "Property Status";
const MIN_PATH_WIDTH    : usize = 12;


/// Writes out the file table
///
/// Rows are shown in the order given, or sorted by path. The display order
/// is also the numbering used by the interactive selection.
#[derive(Debug)]
pub struct TableFormatter<'a> {
    rows     : Vec<&'a Row>,
    numbered : bool
}

impl<'a> TableFormatter<'a> {
    pub fn new(rows: &'a [Row]) -> Self {
        TableFormatter {
            rows     : rows.iter().collect(),
            numbered : false
        }
    }

    /// Sort the rows by path, treating runs of digits as numbers
    pub fn sorted(mut self) -> Self {
        self.rows.sort_by(|a, b| alphanumeric_sort::compare_str(&a.path, &b.path));
        self
    }

    /// Prefix every row with its 1-based position
    pub fn numbered(mut self) -> Self {
        self.numbered = true;
        self
    }

    /// The row shown at 1-based position `number`
    pub fn row(&self, number: usize) -> Option<&'a Row> {
        number.checked_sub(1).and_then(|index| self.rows.get(index)).copied()
    }
}

fn status_style(status: ItemStatus) -> console::Style {
    let style = console::Style::new();

    match status {
        ItemStatus::Added | ItemStatus::Replaced          => style.green(),
        ItemStatus::Modified                              => style.yellow(),
        ItemStatus::Deleted | ItemStatus::Missing         => style.red(),
        ItemStatus::Conflicted | ItemStatus::Obstructed   => style.red().bold(),
        ItemStatus::Unversioned | ItemStatus::None        => style.dim(),
        _                                                 => style
    }
}

/// Left-align `text` in a field of `width` display columns
fn pad<D: fmt::Display>(text: D, width: usize) -> String {
    use console::measure_text_width;

    let mut text = text.to_string();
    let fill = width.saturating_sub(measure_text_width(&text));

    text.push_str(&" ".repeat(fill));
    text
}


impl fmt::Display for TableFormatter<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        use crate::util::{display_path, truncate_text};
        use console::{truncate_str, Style};

        // the wrap border
        let wrap_at = formatter.width().unwrap_or(80);

        // early bail out if nothing to print
        if self.rows.is_empty() {
            writeln!(formatter)?;
            writeln!(formatter, "{}", truncate_str("  ...no items to show...  ", wrap_at, "..."))?;
            writeln!(formatter)?;
            return Ok( () );
        }

        // "12. "
        let number_width = if self.numbered { self.rows.len().to_string().len() + 2 } else { 0 };

        let extension_width = self.rows.iter()
            .map(|row| row.extension.len())
            .chain(Some(EXTENSION_HEADER.len()))
            .max()
            .unwrap_or_default();

        let text_width = self.rows.iter()
            .map(|row| row.content_status.as_str().len())
            .chain(Some(TEXT_HEADER.len()))
            .max()
            .unwrap_or_default();

        // margin, checkbox and the separators between five columns
        let fixed_width = 2 + number_width + 3 + 4 + extension_width + text_width + PROPERTY_HEADER.len();
        let path_width = std::cmp::max(wrap_at.saturating_sub(fixed_width), MIN_PATH_WIDTH);

        let header = Style::new().bold();
        writeln!(formatter, "  {}    {} {} {} {}",
            pad("", number_width),
            pad(header.apply_to(PATH_HEADER), path_width),
            pad(header.apply_to(EXTENSION_HEADER), extension_width),
            pad(header.apply_to(TEXT_HEADER), text_width),
            header.apply_to(PROPERTY_HEADER)
        )?;

        for (i, row) in self.rows.iter().enumerate() {
            let number = if self.numbered { format!("{}.", i + 1) } else { String::new() };

            let checkbox = if row.included {
                Style::new().green().apply_to("[x]")
            } else {
                Style::new().apply_to("[ ]")
            };

            writeln!(formatter, "  {}{} {} {} {} {}",
                pad(number, number_width),
                checkbox,
                pad(truncate_text(&display_path(&row.path), path_width), path_width),
                pad(&row.extension, extension_width),
                pad(status_style(row.content_status).apply_to(row.content_status), text_width),
                status_style(row.metadata_status).apply_to(row.metadata_status)
            )?;
        }

        Ok( () )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, included: bool, status: ItemStatus) -> Row {
        Row {
            included,
            path            : path.to_owned(),
            extension       : crate::util::file_extension(path),
            content_status  : status,
            metadata_status : ItemStatus::None
        }
    }

    fn render(table: &TableFormatter, width: usize) -> Vec<String> {
        let text = format!("{:width$}", table, width = width);

        console::strip_ansi_codes(&text).lines().map(|line| line.trim_end().to_owned()).collect()
    }

    #[test]
    fn test_rows_in_given_order() {
        let rows = vec![
            row("/wc/zeta.txt", true, ItemStatus::Modified),
            row("/wc/alpha.rs", false, ItemStatus::Unversioned)
        ];
        let lines = render(&TableFormatter::new(&rows), 80);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Path"));
        assert!(lines[0].contains("Property Status"));
        assert!(lines[1].starts_with("  [x] "));
        assert!(lines[1].contains("zeta.txt"));
        assert!(lines[1].contains("modified"));
        assert!(lines[2].starts_with("  [ ] "));
        assert!(lines[2].contains("unversioned"));
    }

    #[test]
    fn test_sorted_and_numbered() {
        let rows = vec![
            row("/wc/file10.txt", true, ItemStatus::Added),
            row("/wc/file2.txt", true, ItemStatus::Added),
            row("/wc/file1.txt", true, ItemStatus::Added)
        ];
        let table = TableFormatter::new(&rows).sorted().numbered();

        assert_eq!(table.row(1).unwrap().path, "/wc/file1.txt");
        assert_eq!(table.row(2).unwrap().path, "/wc/file2.txt");
        assert_eq!(table.row(3).unwrap().path, "/wc/file10.txt");
        assert!(table.row(0).is_none());
        assert!(table.row(4).is_none());

        let lines = render(&table, 80);
        assert!(lines[1].starts_with("  1. [x]"));
        assert!(lines[3].starts_with("  3. [x]"));
        assert!(lines[3].contains("file10.txt"));
    }

    #[test]
    fn test_empty_table() {
        let rows: Vec<Row> = Vec::new();
        let lines = render(&TableFormatter::new(&rows), 80);

        assert!(lines.iter().any(|line| line.contains("...no items to show...")));
    }

    #[test]
    fn test_long_paths_are_truncated() {
        let long = format!("/wc/{}.txt", "x".repeat(200));
        let rows = vec![row(&long, true, ItemStatus::Modified)];

        let lines = render(&TableFormatter::new(&rows), 70);

        assert!(lines[1].contains("..."));
        assert!(console::measure_text_width(&lines[1]) <= 70);
    }
}
