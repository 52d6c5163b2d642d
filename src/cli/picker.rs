//! Choosing a table file when none was given on the command line.
//!
//! `growth compare` without `--obs` lists the table files below the working
//! directory and asks for one. The TUI file overlay uses the same discovery.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::{AppError, EXIT_INPUT};

/// Extensions the loaders understand.
pub const TABLE_EXTENSIONS: [&str; 6] = ["csv", "xlsx", "xls", "xlsm", "xlsb", "ods"];

const SEARCH_DEPTH: usize = 4;
const SKIPPED_DIRS: [&str; 3] = [".git", "target", "node_modules"];

/// One answer to the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// 0-based index into the listed files.
    Listed(usize),
    /// A number outside the list.
    OutOfRange(usize),
    Typed(PathBuf),
    Quit,
    Blank,
}

/// Interpret one line typed at the prompt; numbers are 1-based.
pub fn parse_choice(input: &str, listed: usize) -> Choice {
    let input = input.trim();
    if input.is_empty() {
        return Choice::Blank;
    }
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=listed).contains(&n) => Choice::Listed(n - 1),
        Ok(n) => Choice::OutOfRange(n),
        Err(_) => Choice::Typed(PathBuf::from(input)),
    }
}

/// Ask on the terminal which `what` file to use; `flag` is named in the hints.
pub fn prompt_for_table_path(what: &str, flag: &str) -> Result<PathBuf, AppError> {
    let files = discover_table_files();
    let stdin = io::stdin();
    prompt_from(&files, what, flag, &mut stdin.lock(), &mut io::stdout())
}

/// Selection loop over arbitrary input/output streams.
pub fn prompt_from<R: BufRead, W: Write>(
    files: &[PathBuf],
    what: &str,
    flag: &str,
    input: &mut R,
    out: &mut W,
) -> Result<PathBuf, AppError> {
    let hint = format!("Provide the {what} file with `{flag} <file>`.");
    if files.is_empty() {
        return Err(AppError::new(EXIT_INPUT, format!("No table files found. {hint}")));
    }

    let io_err = |e: io::Error| AppError::new(EXIT_INPUT, format!("Prompt failed: {e}"));

    writeln!(out, "Found {} table file(s):", files.len()).map_err(io_err)?;
    for (n, path) in (1..).zip(files) {
        writeln!(out, "{n:>3}  {}", pretty_path(path)).map_err(io_err)?;
    }

    let mut line = String::new();
    loop {
        write!(out, "{what} file [1-{}, path, q]: ", files.len()).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        line.clear();
        if input.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(AppError::new(EXIT_INPUT, format!("No selection made. {hint}")));
        }

        let picked = match parse_choice(&line, files.len()) {
            Choice::Quit => return Err(AppError::new(EXIT_INPUT, "Canceled.")),
            Choice::Blank => continue,
            Choice::OutOfRange(n) => {
                writeln!(out, "{n} is not in the list.").map_err(io_err)?;
                continue;
            }
            Choice::Listed(idx) => files[idx].clone(),
            Choice::Typed(path) => path,
        };

        match validate_table_path(&picked) {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(io_err)?,
        }
    }
}

/// Check that `path` is an existing file with a table extension.
pub fn validate_table_path(path: &Path) -> Result<PathBuf, AppError> {
    let problem = if !path.exists() {
        Some("no such file")
    } else if !path.is_file() {
        Some("not a regular file")
    } else if !is_table_file(path) {
        Some("unsupported extension")
    } else {
        None
    };

    match problem {
        None => Ok(path.to_path_buf()),
        Some(problem) => Err(AppError::new(
            EXIT_INPUT,
            format!(
                "{}: {problem} (expected .{}).",
                path.display(),
                TABLE_EXTENSIONS.join(", .")
            ),
        )),
    }
}

/// Table files below the working directory, sorted by display path.
pub fn discover_table_files() -> Vec<PathBuf> {
    find_table_files(Path::new("."), SEARCH_DEPTH)
}

/// Collect table files under `root`, at most `max_depth` directories deep.
pub fn find_table_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(kind) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if kind.is_dir() {
                if depth < max_depth && !is_skipped_dir(&path) {
                    pending.push((path, depth + 1));
                }
            } else if kind.is_file() && is_table_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort_by_cached_key(|p| pretty_path(p));
    found
}

fn is_table_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TABLE_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Display form of a discovered path, without a leading `./`.
pub fn pretty_path(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn finds_csv_and_spreadsheets_but_skips_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("b.csv"), "id\n").unwrap();
        fs::write(root.join("data/a.XLSX"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("target/skip.csv"), "").unwrap();

        let found: Vec<String> = find_table_files(root, 4)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect();
        assert_eq!(found, vec!["b.csv".to_string(), "data/a.XLSX".to_string()]);
    }

    #[test]
    fn depth_limit_stops_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("one/two")).unwrap();
        fs::write(root.join("one/a.csv"), "").unwrap();
        fs::write(root.join("one/two/b.csv"), "").unwrap();

        assert_eq!(find_table_files(root, 1).len(), 1);
        assert_eq!(find_table_files(root, 2).len(), 2);
    }

    #[test]
    fn validate_rejects_missing_dirs_and_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "").unwrap();

        assert!(validate_table_path(&dir.path().join("nope.csv")).is_err());
        assert!(validate_table_path(dir.path()).is_err());
        assert!(validate_table_path(&txt).is_err());

        let ok = dir.path().join("p.ods");
        fs::write(&ok, "").unwrap();
        assert_eq!(validate_table_path(&ok).unwrap(), ok);
    }

    #[test]
    fn choices_are_parsed() {
        assert_eq!(parse_choice(" 2\n", 3), Choice::Listed(1));
        assert_eq!(parse_choice("4", 3), Choice::OutOfRange(4));
        assert_eq!(parse_choice("Q", 3), Choice::Quit);
        assert_eq!(parse_choice("  \n", 3), Choice::Blank);
        assert_eq!(parse_choice("data/obs.csv", 3), Choice::Typed(PathBuf::from("data/obs.csv")));
    }

    #[test]
    fn prompt_retries_until_a_valid_file_is_chosen() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("obs.csv");
        fs::write(&good, "id,t,observed\n").unwrap();
        let files = vec![dir.path().join("gone.csv"), good.clone()];

        let mut input = Cursor::new("9\n1\n2\n");
        let mut out = Vec::new();
        let picked = prompt_from(&files, "observation", "--obs", &mut input, &mut out).unwrap();

        assert_eq!(picked, good);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("9 is not in the list."));
        assert!(shown.contains("no such file"));
    }

    #[test]
    fn prompt_quits_and_reports_closed_input() {
        let files = vec![PathBuf::from("a.csv")];
        let err = prompt_from(&files, "observation", "--obs", &mut Cursor::new("q\n"), &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);

        let err = prompt_from(&files, "observation", "--obs", &mut Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("--obs"));

        let err = prompt_from(&[], "observation", "--obs", &mut Cursor::new("1\n"), &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("No table files"));
    }
}
