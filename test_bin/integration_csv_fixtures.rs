//! Loads every `fixtures/*.csv` and checks it against the sibling
//! `.expected` file.
//!
//! Expected files are line oriented. Input directives:
//!
//! - `hint <column> <type>`: column type hint
//! - `mode update`: load in update mode
//! - `dialect auto`: detect the delimiter instead of assuming a comma
//!
//! Assertions:
//!
//! - `rows <n>`
//! - `column <name> <arrow type>`: columns in order, all must be listed
//! - `nulls <column> <n>`
//! - `error <ErrorKind>`: load must fail with this kind
use std::fs;
use std::path::{Path, PathBuf};

use arrow::array::Array as _;
use libtest_mimic::{Arguments, Failed, Trial};
use tabload::{parse_data_type, ColumnTypes, CsvLoadOptions, CsvLoader, LoadMode};
use tabload_error::{Result, ResultExt};
use tracing::Level;

#[derive(Debug, Default)]
struct Expectation {
    hints: ColumnTypes,
    mode: LoadMode,
    detect_dialect: bool,
    rows: Option<usize>,
    columns: Vec<(String, String)>,
    nulls: Vec<(String, usize)>,
    error: Option<String>,
}

impl Expectation {
    fn parse(text: &str) -> Result<Self> {
        let mut exp = Expectation::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (directive, rest) = line.split_once(' ').unwrap_or((line, ""));
            match directive {
                "hint" => {
                    let (name, typ) = split_pair(rest)?;
                    exp.hints.insert(name, parse_data_type(typ)?);
                }
                "mode" if rest == "update" => exp.mode = LoadMode::Update,
                "dialect" if rest == "auto" => exp.detect_dialect = true,
                "rows" => exp.rows = Some(rest.parse().context("invalid row count")?),
                "column" => {
                    let (name, typ) = split_pair(rest)?;
                    exp.columns.push((name.to_string(), typ.to_string()));
                }
                "nulls" => {
                    let (name, count) = split_pair(rest)?;
                    exp.nulls
                        .push((name.to_string(), count.parse().context("invalid null count")?));
                }
                "error" => exp.error = Some(rest.to_string()),
                other => {
                    return Err(tabload_error::TabloadError::new(format!(
                        "Unknown directive: {other}"
                    )))
                }
            }
        }

        Ok(exp)
    }
}

fn split_pair(s: &str) -> Result<(&str, &str)> {
    s.split_once(' ')
        .ok_or_else(|| tabload_error::TabloadError::new(format!("Expected two values: '{s}'")))
}

fn find_fixtures(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn run_fixture(path: &Path) -> Result<(), Failed> {
    let csv = fs::read_to_string(path)?;
    let expected = fs::read_to_string(path.with_extension("expected"))?;
    let mut exp = Expectation::parse(&expected).map_err(|e| e.to_string())?;

    let mut options = CsvLoadOptions::default();
    if exp.detect_dialect {
        options = options.with_dialect(None);
    }
    let loader = CsvLoader::new(options);

    let result = loader.load(&csv, exp.mode, &mut exp.hints);

    if let Some(kind) = &exp.error {
        return match result {
            Ok(_) => Err(format!("expected error {kind}, load succeeded").into()),
            Err(e) if &format!("{:?}", e.kind()) == kind => Ok(()),
            Err(e) => Err(format!("expected error {kind}, got {e}").into()),
        };
    }

    let table = result.map_err(|e| e.to_string())?;

    if let Some(rows) = exp.rows {
        if table.num_rows() != rows {
            return Err(format!("expected {rows} rows, got {}", table.num_rows()).into());
        }
    }

    let got: Vec<(String, String)> = table
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name().clone(), f.data_type().to_string()))
        .collect();
    if got != exp.columns {
        return Err(format!("expected columns {:?}, got {:?}", exp.columns, got).into());
    }

    for (name, count) in &exp.nulls {
        let column = table
            .column_by_name(name)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("missing column {name}"))?;
        if column.null_count() != *count {
            return Err(format!(
                "expected {count} nulls in {name}, got {}",
                column.null_count()
            )
            .into());
        }
    }

    Ok(())
}

pub fn main() {
    let args = Arguments::from_args();
    logutil::configure_test_logger(Level::ERROR);

    let paths = find_fixtures(Path::new("fixtures")).unwrap();
    let tests = paths
        .into_iter()
        .map(|path| {
            let name = format!(
                "csv_fixture/{}",
                path.file_stem().unwrap_or_default().to_string_lossy()
            );
            Trial::test(name, move || run_fixture(&path))
        })
        .collect();

    libtest_mimic::run(&args, tests).exit_if_failed();
}
