//
// src/util.rs
//
// Various utilities such as path and text manipulation.
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0


use std::path::{Path, PathBuf};


/// The extension of a file name, including the leading dot
///
/// Returns an empty string if the file has no extension. Hidden files
/// such as `.gitignore` have no extension.
pub fn file_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Truncate the text to the given display length, adding ellipsis dots if truncated
pub fn truncate_text(text: &str, length : usize) -> String {
  use unicode_segmentation::UnicodeSegmentation;

  if text.graphemes(true).count() <= length {
    return text.to_owned();
  }

  let mut result = String::with_capacity(length + 3);

  for grapheme in text.graphemes(true).take(length.saturating_sub(3)) {
    result.push_str(grapheme);
  }
  result.push_str("...");

  result
}

/// Obtain the path relative to the current directory
pub fn get_relative_path<P: AsRef<Path>>(path: P) -> PathBuf {
    use pathdiff::diff_paths;

    std::env::current_dir().map_or_else(
        // if current dir cannot be retrieved, just return the original
        |_| path.as_ref().into(),
        |current| diff_paths(path.as_ref(), current).unwrap_or_else(|| path.as_ref().into())
    )
}

/// Obtain the absolute, lexically cleaned path
pub fn absolute_path<P: AsRef<Path>>(path: P) -> PathBuf {
    use path_clean::PathClean;

    let path = path.as_ref();

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        // a missing current directory leaves the path relative
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    }.clean()
}

/// The absolute path as a string key, the form used for item paths
pub fn path_key<P: AsRef<Path>>(path: P) -> String {
    absolute_path(path).to_string_lossy().into_owned()
}

/// Human-readable path for display, relative to the current directory
pub fn display_path(path: &str) -> String {
    let relative = get_relative_path(path);

    if relative.as_os_str().is_empty() {
        ".".to_owned()
    } else {
        relative.to_string_lossy().into_owned()
    }
}


/// Escape unicode characters as \u sequences
pub fn escape_unicode_only(s: &str) -> String {
    s.chars().fold(String::new(), |mut buf, ch| {
        if ch.is_ascii() && ! ch.is_control() {
            buf.push(ch);
        } else {
            buf.extend(ch.escape_unicode());
        }

        buf
    })
}
