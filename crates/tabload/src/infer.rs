//! Column type inference.
//!
//! Every non-null value narrows the set of candidate types for its column.
//! The final type is the most specific candidate still standing, in order:
//! boolean, integer, float, date, timestamp, string.
use arrow::datatypes::{DataType, TimeUnit};

use crate::temporal::{self, TemporalKind};

/// Candidate types still possible for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInference {
    non_null: usize,
    boolean: bool,
    integer: bool,
    float: bool,
    date: bool,
    datetime: bool,
}

impl Default for ColumnInference {
    fn default() -> Self {
        ColumnInference {
            non_null: 0,
            boolean: true,
            integer: true,
            float: true,
            date: true,
            datetime: true,
        }
    }
}

impl ColumnInference {
    /// Narrow candidates using a single non-null value.
    pub fn update(&mut self, value: &str) {
        self.non_null += 1;

        if self.boolean {
            self.boolean = value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false");
        }

        if self.integer {
            self.integer = looks_like_integer(value) && value.parse::<i64>().is_ok();
        }

        if self.float {
            self.float = looks_like_float(value) && value.parse::<f64>().is_ok();
        }

        if self.date || self.datetime {
            match temporal::classify(value) {
                Some(TemporalKind::Date) => (),
                Some(TemporalKind::DateTime) => self.date = false,
                None => {
                    self.date = false;
                    self.datetime = false;
                }
            }
        }
    }

    pub fn num_values(&self) -> usize {
        self.non_null
    }

    pub fn datatype(&self) -> DataType {
        if self.non_null == 0 {
            return DataType::Utf8;
        }
        if self.boolean {
            DataType::Boolean
        } else if self.integer {
            DataType::Int64
        } else if self.float {
            DataType::Float64
        } else if self.date {
            DataType::Date32
        } else if self.datetime {
            DataType::Timestamp(TimeUnit::Millisecond, None)
        } else {
            DataType::Utf8
        }
    }
}

fn looks_like_integer(s: &str) -> bool {
    let digits = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Plain decimal or scientific notation. Rejects words like "inf" and "NaN"
/// that `f64::from_str` would otherwise accept.
fn looks_like_float(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[&str]) -> DataType {
        let mut inference = ColumnInference::default();
        for v in values {
            inference.update(v);
        }
        inference.datatype()
    }

    #[test]
    fn infer_types() {
        struct TestCase {
            values: Vec<&'static str>,
            expected: DataType,
        }

        let test_cases = [
            TestCase {
                values: vec![],
                expected: DataType::Utf8,
            },
            TestCase {
                values: vec!["true", "FALSE", "True"],
                expected: DataType::Boolean,
            },
            TestCase {
                values: vec!["5", "-7", "+12"],
                expected: DataType::Int64,
            },
            TestCase {
                values: vec!["5", "7.5"],
                expected: DataType::Float64,
            },
            TestCase {
                values: vec!["1e3", "2.5E-2"],
                expected: DataType::Float64,
            },
            // Overflows i64.
            TestCase {
                values: vec!["99999999999999999999"],
                expected: DataType::Float64,
            },
            TestCase {
                values: vec!["inf", "1.0"],
                expected: DataType::Utf8,
            },
            TestCase {
                values: vec!["2024-01-01", "01/31/2024"],
                expected: DataType::Date32,
            },
            TestCase {
                values: vec!["2024-01-01", "2024-01-01 10:00:00"],
                expected: DataType::Timestamp(TimeUnit::Millisecond, None),
            },
            TestCase {
                values: vec!["2024-01-01", "tomorrow"],
                expected: DataType::Utf8,
            },
            TestCase {
                values: vec!["1", "true"],
                expected: DataType::Utf8,
            },
            // Padded numbers are not trimmed by the decoder.
            TestCase {
                values: vec![" 5", "6"],
                expected: DataType::Utf8,
            },
            TestCase {
                values: vec!["a", "b"],
                expected: DataType::Utf8,
            },
        ];

        for tc in test_cases {
            assert_eq!(tc.expected, infer(&tc.values), "values: {:?}", tc.values);
        }
    }

    #[test]
    fn counts_values() {
        let mut inference = ColumnInference::default();
        inference.update("1");
        inference.update("2");
        assert_eq!(2, inference.num_values());
    }
}
