use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use logutil::LogFormat;
use tabload::{ColumnTypes, CsvLoadOptions, CsvLoader, DialectOptions, LoadMode, Table};
use tabload_error::{Result, ResultExt};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// ASCII grid.
    Table,
    /// CSV using the input dialect.
    Csv,
    /// Resolved column types.
    Schema,
}

/// Load a CSV file into an Arrow table and print it.
#[derive(Debug, Parser)]
#[command(name = "tabload", version)]
struct Arguments {
    /// CSV file to load. Reads stdin when omitted or "-".
    file: Option<PathBuf>,

    /// Load as an update, leaving the provided column types untouched.
    #[arg(long)]
    update: bool,

    /// Column type hint, e.g. `-t age=integer`. May be repeated.
    #[arg(short = 't', long = "type", value_name = "NAME=TYPE")]
    types: Vec<String>,

    /// Field delimiter. "auto" detects it from the input.
    #[arg(long, default_value = "auto")]
    delimiter: String,

    /// Quote character. Defaults to '"', or is detected along with an "auto"
    /// delimiter.
    #[arg(long)]
    quote: Option<char>,

    /// Value treated as null. Replaces the default null tokens when given.
    #[arg(long = "null", value_name = "TOKEN")]
    null_tokens: Vec<String>,

    /// Max rows per record batch.
    #[arg(long, default_value_t = tabload::options::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Number of records scanned for type inference. Scans all by default.
    #[arg(long)]
    max_infer: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Log output format (text or json).
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

fn main() {
    let args = Arguments::parse();
    logutil::configure_global_logger(Level::WARN, args.log_format).unwrap();

    if let Err(e) = inner(args) {
        eprintln!("ERROR");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn inner(args: Arguments) -> Result<()> {
    let mut schema = ColumnTypes::new();
    for assignment in &args.types {
        schema.parse_assignment(assignment)?;
    }

    let input = read_input(args.file.as_ref())?;
    let dialect = resolve_dialect(&args.delimiter, args.quote, &input)?;

    let mut options = CsvLoadOptions::default()
        .with_dialect(dialect)
        .with_batch_size(args.batch_size)
        .with_max_infer_records(args.max_infer);
    if !args.null_tokens.is_empty() {
        options = options.with_null_tokens(args.null_tokens.iter().cloned());
    }

    let loader = CsvLoader::new(options);
    let table = loader.load(&input, LoadMode::from_is_update(args.update), &mut schema)?;
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded table"
    );

    let out_dialect = dialect.unwrap_or_else(|| DialectOptions::infer_from_sample(input.as_bytes()));
    print_table(&table, args.output, out_dialect)
}

/// Dialect to load with. None lets the loader detect both delimiter and
/// quote.
fn resolve_dialect(
    delimiter: &str,
    quote: Option<char>,
    input: &str,
) -> Result<Option<DialectOptions>> {
    let quote = quote.map(quote_byte).transpose()?;
    let dialect = match (delimiter, quote) {
        ("auto", None) => None,
        ("auto", Some(quote)) => Some(DialectOptions::infer_delimiter_from_sample(
            input.as_bytes(),
            quote,
        )),
        (delim, quote) => Some(DialectOptions {
            delimiter: DialectOptions::parse_delimiter(delim)?,
            quote: quote.unwrap_or(DialectOptions::default().quote),
        }),
    };
    Ok(dialect)
}

fn quote_byte(quote: char) -> Result<u8> {
    if quote.is_ascii() {
        Ok(quote as u8)
    } else {
        Err(tabload_error::TabloadError::with_kind(
            tabload_error::ErrorKind::Unsupported,
            format!("Quote must be an ASCII character, got '{quote}'"),
        ))
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .context_fn(|| format!("failed to read '{}'", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_table(table: &Table, format: OutputFormat, dialect: DialectOptions) -> Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(stdout, "{}", table.pretty_format()?)?;
        }
        OutputFormat::Csv => {
            tabload::write_csv(table, dialect, &mut stdout)?;
        }
        OutputFormat::Schema => {
            for field in table.schema().fields() {
                writeln!(stdout, "{}\t{}", field.name(), field.data_type())?;
            }
        }
    }

    Ok(())
}
