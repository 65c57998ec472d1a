//! Load CSV text into Arrow tables.
//!
//! The entry point is [`csv_to_table`] (or [`CsvLoader`] for non-default
//! options). Tokenizing and array building are done by the `arrow` CSV
//! reader; this crate resolves the dialect, infers or applies column types,
//! and converts date and timestamp columns Arrow can't parse itself.
pub mod datatype;
pub mod dialect;
pub mod infer;
pub mod loader;
pub mod options;
pub mod table;
pub mod temporal;
pub mod writer;

pub use datatype::{parse_data_type, ColumnTypes};
pub use dialect::DialectOptions;
pub use loader::{csv_to_table, CsvLoader};
pub use options::{CsvLoadOptions, LoadMode};
pub use table::Table;
pub use writer::{table_to_csv_string, write_csv};
