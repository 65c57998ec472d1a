use std::fmt::Write as _;
use std::io::Write;

use arrow::util::display::{ArrayFormatter, FormatOptions};
use csv::ByteRecord;
use tabload_error::{Result, ResultExt};

use crate::dialect::DialectOptions;
use crate::table::Table;

/// Write a table as CSV, header first. Nulls are written as empty fields.
pub fn write_csv<W: Write>(table: &Table, dialect: DialectOptions, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .from_writer(writer);

    let names = table.column_names();
    let mut record = ByteRecord::with_capacity(1024, names.len());
    for name in names {
        record.push_field(name.as_bytes());
    }
    csv_writer
        .write_record(&record)
        .context("failed to write header")?;

    let options = FormatOptions::default();
    let mut format_buf = String::new();

    for batch in table.batches() {
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to create formatter")?;

        for row in 0..batch.num_rows() {
            record.clear();
            for formatter in &formatters {
                format_buf.clear();
                write!(&mut format_buf, "{}", formatter.value(row))?;
                record.push_field(format_buf.as_bytes());
            }
            csv_writer
                .write_record(&record)
                .context("failed to write record")?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Format a table as a CSV string.
pub fn table_to_csv_string(table: &Table, dialect: DialectOptions) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, dialect, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
