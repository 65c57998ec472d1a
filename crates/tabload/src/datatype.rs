use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

use arrow::datatypes::{DataType, TimeUnit};
use tabload_error::{not_implemented, ErrorKind, Result, TabloadError};

/// Mapping of column name to the Arrow type the column should be loaded as.
///
/// Used both as the type hints passed into a load and as the place the
/// resolved types are reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes {
    types: HashMap<String, DataType>,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, datatype: DataType) -> Option<DataType> {
        self.types.insert(name.into(), datatype)
    }

    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.types.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<DataType> {
        self.types.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, DataType> {
        self.types.iter()
    }

    /// Parse and insert a `name=type` assignment, e.g. `age=integer`.
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, typ) = assignment.rsplit_once('=').ok_or_else(|| {
            TabloadError::with_kind(
                ErrorKind::Unsupported,
                format!("Expected 'name=type', got '{assignment}'"),
            )
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TabloadError::with_kind(
                ErrorKind::Unsupported,
                format!("Missing column name in '{assignment}'"),
            ));
        }

        self.insert(name, parse_data_type(typ)?);
        Ok(())
    }
}

impl FromIterator<(String, DataType)> for ColumnTypes {
    fn from_iter<T: IntoIterator<Item = (String, DataType)>>(iter: T) -> Self {
        ColumnTypes {
            types: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ColumnTypes {
    type Item = (&'a String, &'a DataType);
    type IntoIter = hash_map::Iter<'a, String, DataType>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

impl From<HashMap<String, DataType>> for ColumnTypes {
    fn from(types: HashMap<String, DataType>) -> Self {
        ColumnTypes { types }
    }
}

impl fmt::Display for ColumnTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.types.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        write!(f, "{{")?;
        for (idx, (name, typ)) in entries.into_iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {typ}")?;
        }
        write!(f, "}}")
    }
}

/// Parse a type name into an Arrow data type.
///
/// Accepts the engine's logical names (integer, float, string, boolean,
/// date, datetime) as well as Arrow style names.
pub fn parse_data_type(s: &str) -> Result<DataType> {
    let typ = match s.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" | "int64" | "bigint" => DataType::Int64,
        "int8" | "tinyint" => DataType::Int8,
        "int16" | "smallint" => DataType::Int16,
        "int32" => DataType::Int32,
        "uint8" => DataType::UInt8,
        "uint16" => DataType::UInt16,
        "uint32" => DataType::UInt32,
        "uint64" => DataType::UInt64,
        "float" | "float64" | "double" => DataType::Float64,
        "float32" | "real" => DataType::Float32,
        "string" | "str" | "utf8" | "text" | "varchar" => DataType::Utf8,
        "large_utf8" | "large_string" => DataType::LargeUtf8,
        "boolean" | "bool" => DataType::Boolean,
        "date" | "date32" => DataType::Date32,
        "date64" => DataType::Date64,
        "datetime" | "timestamp" | "timestamp_ms" => {
            DataType::Timestamp(TimeUnit::Millisecond, None)
        }
        "timestamp_s" => DataType::Timestamp(TimeUnit::Second, None),
        "timestamp_us" => DataType::Timestamp(TimeUnit::Microsecond, None),
        "timestamp_ns" => DataType::Timestamp(TimeUnit::Nanosecond, None),
        other => {
            return Err(TabloadError::with_kind(
                ErrorKind::Unsupported,
                format!("Unknown data type '{other}'"),
            ))
        }
    };
    Ok(typ)
}

/// Check that a hinted type is something we can load CSV text into.
pub fn check_loadable(name: &str, datatype: &DataType) -> Result<()> {
    match datatype {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Decimal128(_, _)
        | DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _) => Ok(()),
        other => not_implemented!("loading column '{name}' as {other}"),
    }
}

/// Whether values of this type go through the temporal parsers rather than
/// the Arrow decoder.
pub fn is_temporal(datatype: &DataType) -> bool {
    matches!(
        datatype,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_type_names() {
        struct TestCase {
            name: &'static str,
            expected: DataType,
        }

        let test_cases = [
            TestCase {
                name: "integer",
                expected: DataType::Int64,
            },
            TestCase {
                name: "Float",
                expected: DataType::Float64,
            },
            TestCase {
                name: "string",
                expected: DataType::Utf8,
            },
            TestCase {
                name: "BOOLEAN",
                expected: DataType::Boolean,
            },
            TestCase {
                name: "date",
                expected: DataType::Date32,
            },
            TestCase {
                name: " datetime ",
                expected: DataType::Timestamp(TimeUnit::Millisecond, None),
            },
            TestCase {
                name: "timestamp_ns",
                expected: DataType::Timestamp(TimeUnit::Nanosecond, None),
            },
            TestCase {
                name: "uint16",
                expected: DataType::UInt16,
            },
        ];

        for tc in test_cases {
            assert_eq!(tc.expected, parse_data_type(tc.name).unwrap(), "{}", tc.name);
        }
    }

    #[test]
    fn parse_unknown_type() {
        let err = parse_data_type("list<int>").unwrap_err();
        assert_eq!(ErrorKind::Unsupported, err.kind());
    }

    #[test]
    fn parse_assignment() {
        let mut types = ColumnTypes::new();
        types.parse_assignment("age=integer").unwrap();
        types.parse_assignment("a=b=string").unwrap();

        assert_eq!(Some(&DataType::Int64), types.get("age"));
        assert_eq!(Some(&DataType::Utf8), types.get("a=b"));
        assert!(types.parse_assignment("age").is_err());
        assert!(types.parse_assignment("=int").is_err());
    }

    #[test]
    fn loadable_types() {
        assert!(check_loadable("a", &DataType::Decimal128(10, 2)).is_ok());
        assert!(check_loadable("a", &DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))).is_ok());

        let err = check_loadable("a", &DataType::Binary).unwrap_err();
        assert_eq!(ErrorKind::Unsupported, err.kind());
    }

    #[test]
    fn display_sorted() {
        let types: ColumnTypes = [
            ("b".to_string(), DataType::Utf8),
            ("a".to_string(), DataType::Int64),
        ]
        .into_iter()
        .collect();

        assert_eq!("{a: Int64, b: Utf8}", types.to_string());
    }
}
