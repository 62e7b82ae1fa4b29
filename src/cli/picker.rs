//! Source discovery: bundled yearly files and an interactive file picker.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - this module resolves "which files should be loaded"
//!
//! Bundled data is a flat directory of spreadsheets whose file name embeds the
//! year, e.g. `sales_2021.xlsx` or `2022 - Αγοραπωλησίες.xlsx`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding spreadsheet files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

const SPREADSHEET_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

/// One file of the bundled data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledFile {
    pub year: i32,
    pub path: PathBuf,
}

/// Which bundled years to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearSelection {
    All,
    Years(Vec<i32>),
    Range { from: Option<i32>, to: Option<i32> },
}

impl YearSelection {
    pub fn contains(&self, year: i32) -> bool {
        match self {
            YearSelection::All => true,
            YearSelection::Years(years) => years.contains(&year),
            YearSelection::Range { from, to } => {
                from.is_none_or(|f| year >= f) && to.is_none_or(|t| year <= t)
            }
        }
    }
}

/// List bundled files in `dir`, sorted by year. Files without a year are skipped.
///
/// When two files carry the same year, the first by file name wins.
pub fn discover_bundled(dir: &Path) -> Result<Vec<BundledFile>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::input(format!("Cannot read data directory '{}': {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_spreadsheet_extension(path))
        .collect();
    files.sort();

    let mut out: Vec<BundledFile> = Vec::new();
    for path in files {
        let Some(year) = path.file_stem().and_then(|s| s.to_str()).and_then(year_from_name) else {
            tracing::debug!(path = %path.display(), "skipping bundled file without a year in its name");
            continue;
        };
        if out.iter().any(|f| f.year == year) {
            tracing::warn!(path = %path.display(), year, "duplicate bundled year, ignoring file");
            continue;
        }
        out.push(BundledFile { year, path });
    }
    out.sort_by_key(|f| f.year);
    Ok(out)
}

/// Bundled files matching a selection, in year order.
pub fn select_bundled(files: &[BundledFile], selection: &YearSelection) -> Vec<BundledFile> {
    files.iter().filter(|f| selection.contains(f.year)).cloned().collect()
}

/// First run of exactly four ASCII digits that reads as a year in 1900..=2100.
pub fn year_from_name(name: &str) -> Option<i32> {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start == 4 {
            if let Ok(year) = name[start..i].parse::<i32>() {
                if (1900..=2100).contains(&year) {
                    return Some(year);
                }
            }
        }
    }
    None
}

/// Prompt the user to select a spreadsheet from the current directory tree.
///
/// Behavior:
/// - list discovered spreadsheet files
/// - accept either a number (from the list) or an explicit path
/// - `q` cancels
pub fn prompt_for_path() -> Result<PathBuf, AppError> {
    let files = discover_spreadsheets();
    if files.is_empty() {
        return Err(AppError::input(
            "No spreadsheet files found. Provide one with `trends summary -f <file.xlsx>`.",
        ));
    }

    println!("Found {} spreadsheet file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::input(
                "No input received. Provide a file with `trends summary -f <file.xlsx>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_spreadsheet_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_spreadsheet_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the provided path points to a readable spreadsheet file.
pub fn validate_spreadsheet_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("File not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if !has_spreadsheet_extension(path) {
        return Err(AppError::input(format!(
            "Expected an .xlsx/.xls/.ods/.csv file (got: {}).",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Discover spreadsheet files under the current directory (deterministic order).
pub fn discover_spreadsheets() -> Vec<PathBuf> {
    find_spreadsheets(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_spreadsheets(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_spreadsheets_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_spreadsheets_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_spreadsheets_inner(&path, depth + 1, max_depth, out);
            }
            continue;
        }

        if file_type.is_file() && has_spreadsheet_extension(&path) && !is_lock_file(&path) {
            out.push(path);
        }
    }
}

fn has_spreadsheet_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SPREADSHEET_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

// Office leaves `~$name.xlsx` lock files next to open workbooks.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

pub fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}
