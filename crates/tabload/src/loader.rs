use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use tabload_error::{ErrorKind, OptionExt, Result, ResultExt, TabloadError};
use tracing::{debug, trace, warn};

use crate::datatype::{check_loadable, is_temporal, ColumnTypes};
use crate::dialect::DialectOptions;
use crate::infer::ColumnInference;
use crate::options::{CsvLoadOptions, LoadMode};
use crate::table::Table;
use crate::temporal;

const UTF8_BOM: char = '\u{feff}';

/// Loads CSV text into Arrow backed tables.
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    options: CsvLoadOptions,
}

/// Result of scanning the header and sampled records.
#[derive(Debug)]
struct ScanOutcome {
    header: Vec<String>,
    /// Inference state per column. None for hinted columns.
    inference: Vec<Option<ColumnInference>>,
    scanned_records: usize,
}

impl CsvLoader {
    pub fn new(options: CsvLoadOptions) -> Self {
        CsvLoader { options }
    }

    pub fn options(&self) -> &CsvLoadOptions {
        &self.options
    }

    /// Load `csv` into a new table.
    ///
    /// Columns named in `schema` are loaded as the given type, every other
    /// column has its type inferred. With [`LoadMode::Fresh`] the type of
    /// every loaded column is written back into `schema`. With
    /// [`LoadMode::Update`] `schema` is not modified.
    pub fn load(&self, csv: &str, mode: LoadMode, schema: &mut ColumnTypes) -> Result<Arc<Table>> {
        let input = csv.strip_prefix(UTF8_BOM).unwrap_or(csv);
        if input.trim().is_empty() {
            return Err(TabloadError::with_kind(
                ErrorKind::EmptyInput,
                "CSV input contains no header row",
            ));
        }

        let dialect = match self.options.dialect {
            Some(dialect) => dialect,
            None => DialectOptions::infer_from_sample(input.as_bytes()),
        };
        debug!(?dialect, ?mode, hints = %schema, "loading csv");

        let scan = self.scan(input, &dialect, schema)?;

        let mut fields = Vec::with_capacity(scan.header.len());
        for (name, inference) in scan.header.iter().zip(&scan.inference) {
            let datatype = schema
                .get(name)
                .cloned()
                .or_else(|| inference.as_ref().map(|inf| inf.datatype()))
                .required("column type")?;
            fields.push(Field::new(name, datatype, true));
        }
        let target = Arc::new(Schema::new(fields));
        debug!(
            scanned_records = scan.scanned_records,
            schema = ?target,
            "resolved column types"
        );

        let batches = self.decode(input, &dialect, &target)?;
        let table = Table::try_new(Arc::clone(&target), batches)?;

        for name in ignored_hints(schema, &target) {
            warn!(%name, "ignoring type hint for column not in CSV header");
        }

        match mode {
            LoadMode::Fresh => {
                for field in target.fields() {
                    schema.insert(field.name().clone(), field.data_type().clone());
                }
            }
            LoadMode::Update => (),
        }

        Ok(Arc::new(table))
    }

    /// Read the header, validate hints, and run type inference over the
    /// data records.
    fn scan(
        &self,
        input: &str,
        dialect: &DialectOptions,
        hints: &ColumnTypes,
    ) -> Result<ScanOutcome> {
        let mut reader = dialect
            .csv_reader_builder()
            .has_headers(true)
            .from_reader(input.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(|s| s.to_string())
            .collect();
        if header.is_empty() {
            return Err(TabloadError::with_kind(
                ErrorKind::EmptyInput,
                "CSV header contains no columns",
            ));
        }

        let mut seen = HashSet::with_capacity(header.len());
        for name in &header {
            if !seen.insert(name.as_str()) {
                return Err(TabloadError::with_kind(
                    ErrorKind::SchemaConflict,
                    format!("Duplicate column name '{name}' in CSV header"),
                ));
            }
        }

        let mut inference = Vec::with_capacity(header.len());
        for name in &header {
            match hints.get(name) {
                Some(datatype) => {
                    check_loadable(name, datatype)?;
                    inference.push(None);
                }
                None => inference.push(Some(ColumnInference::default())),
            }
        }

        let mut record = csv::StringRecord::new();
        let mut scanned_records = 0;
        loop {
            if let Some(max) = self.options.max_infer_records {
                if scanned_records >= max {
                    break;
                }
            }
            if !reader.read_record(&mut record).map_err(malformed)? {
                break;
            }
            scanned_records += 1;

            for (value, column) in record.iter().zip(inference.iter_mut()) {
                if let Some(column) = column {
                    if !self.options.is_null(value) {
                        column.update(value);
                    }
                }
            }
        }

        Ok(ScanOutcome {
            header,
            inference,
            scanned_records,
        })
    }

    /// Decode all records into batches matching `target`.
    fn decode(
        &self,
        input: &str,
        dialect: &DialectOptions,
        target: &SchemaRef,
    ) -> Result<Vec<RecordBatch>> {
        // Columns the Arrow decoder can't build are read as strings and
        // converted afterwards.
        let read_fields: Vec<Field> = target
            .fields()
            .iter()
            .map(|f| {
                if decoded_as_string(f.data_type()) {
                    Field::new(f.name(), DataType::Utf8, true)
                } else {
                    f.as_ref().clone()
                }
            })
            .collect();
        let read_schema = Arc::new(Schema::new(read_fields));
        let needs_conversion = read_schema != *target;

        let reader = ReaderBuilder::new(read_schema)
            .with_header(true)
            .with_delimiter(dialect.delimiter)
            .with_quote(dialect.quote)
            .with_batch_size(self.options.batch_size.max(1))
            .with_null_regex(self.options.null_regex()?)
            .build(input.as_bytes())
            .map_err(decode_error)?;

        let mut batches = Vec::new();
        let mut first_record = 1;
        for batch in reader {
            let batch = batch.map_err(decode_error)?;
            let num_rows = batch.num_rows();
            trace!(num_rows, first_record, "decoded batch");

            let batch = if needs_conversion {
                convert_string_columns(&batch, target, first_record)?
            } else {
                batch
            };
            batches.push(batch);
            first_record += num_rows;
        }

        Ok(batches)
    }
}

/// Load `csv` with default options.
///
/// See [`CsvLoader::load`].
pub fn csv_to_table(csv: &str, mode: LoadMode, schema: &mut ColumnTypes) -> Result<Arc<Table>> {
    CsvLoader::default().load(csv, mode, schema)
}

/// Hinted names with no matching column in `target`.
fn ignored_hints<'a>(hints: &'a ColumnTypes, target: &Schema) -> Vec<&'a str> {
    let mut names: Vec<&str> = hints
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| target.index_of(name).is_err())
        .collect();
    names.sort_unstable();
    names
}

fn decoded_as_string(datatype: &DataType) -> bool {
    is_temporal(datatype) || matches!(datatype, DataType::LargeUtf8)
}

fn convert_string_columns(
    batch: &RecordBatch,
    target: &SchemaRef,
    first_record: usize,
) -> Result<RecordBatch> {
    let columns = target
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, column)| {
            let datatype = field.data_type();
            if is_temporal(datatype) {
                let strings = column
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .required("string column for temporal conversion")?;
                temporal::convert_column(strings, datatype, field.name(), first_record)
            } else if decoded_as_string(datatype) {
                cast(column, datatype).context_fn(|| {
                    format!("failed to cast column '{}' to {datatype}", field.name())
                })
            } else {
                Ok(Arc::clone(column))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    RecordBatch::try_new(Arc::clone(target), columns).context("failed to build converted batch")
}

fn malformed(e: csv::Error) -> TabloadError {
    let kind = match e.kind() {
        csv::ErrorKind::Io(_) => ErrorKind::Io,
        _ => ErrorKind::Malformed,
    };
    TabloadError::with_source(format!("Failed to read CSV: {e}"), Box::new(e)).kind_of(kind)
}

fn decode_error(e: ArrowError) -> TabloadError {
    let kind = match &e {
        ArrowError::ParseError(_) | ArrowError::CastError(_) => ErrorKind::InvalidValue,
        ArrowError::CsvError(_) => ErrorKind::Malformed,
        ArrowError::IoError(..) => ErrorKind::Io,
        _ => ErrorKind::Internal,
    };
    TabloadError::with_source(format!("Failed to decode CSV: {e}"), Box::new(e)).kind_of(kind)
}
