use tabload_error::{ErrorKind, Result, TabloadError};

/// Max number of bytes looked at when detecting a dialect.
const SAMPLE_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectOptions {
    /// Delimiter character.
    pub delimiter: u8,

    /// Quote character.
    pub quote: u8,
}

impl Default for DialectOptions {
    fn default() -> Self {
        DialectOptions {
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Delimiters tried during detection, in order of preference.
const DELIMITERS: [u8; 4] = [b',', b'|', b';', b'\t'];

/// Quotes tried during detection, in order of preference.
const QUOTES: [u8; 2] = [b'"', b'\''];

impl DialectOptions {
    /// Detect the delimiter and quote from the leading records of the input.
    ///
    /// The candidate decoding the most fields per record wins, with ties
    /// going to the earlier candidate. Falls back to the default dialect if
    /// no candidate decodes the sample cleanly.
    pub fn infer_from_sample(input: &[u8]) -> Self {
        let candidates = QUOTES.iter().flat_map(|&quote| {
            DELIMITERS
                .iter()
                .map(move |&delimiter| DialectOptions { delimiter, quote })
        });
        Self::best_candidate(input, candidates).unwrap_or_default()
    }

    /// Detect only the delimiter, keeping `quote` fixed.
    pub fn infer_delimiter_from_sample(input: &[u8], quote: u8) -> Self {
        let candidates = DELIMITERS
            .iter()
            .map(|&delimiter| DialectOptions { delimiter, quote });
        Self::best_candidate(input, candidates).unwrap_or(DialectOptions {
            quote,
            ..Default::default()
        })
    }

    fn best_candidate(input: &[u8], candidates: impl Iterator<Item = Self>) -> Option<Self> {
        let sample = Self::complete_lines(input);

        let mut best: Option<(Self, usize)> = None;
        for candidate in candidates {
            let Some(num_fields) = candidate.consistent_field_count(sample) else {
                continue;
            };
            if best.map_or(true, |(_, most)| num_fields > most) {
                best = Some((candidate, num_fields));
            }
        }

        best.map(|(dialect, _)| dialect)
    }

    /// Parse a single delimiter argument like ",", "tab" or "\t".
    pub fn parse_delimiter(s: &str) -> Result<u8> {
        match s {
            "tab" | "\\t" | "\t" => Ok(b'\t'),
            "comma" => Ok(b','),
            "pipe" => Ok(b'|'),
            "semicolon" => Ok(b';'),
            s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            other => Err(TabloadError::with_kind(
                ErrorKind::Unsupported,
                format!("Delimiter must be a single ASCII character, got '{other}'"),
            )),
        }
    }

    pub(crate) fn csv_reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .flexible(false);
        builder
    }

    /// Number of fields per record if every record in the sample agrees.
    fn consistent_field_count(&self, sample: &[u8]) -> Option<usize> {
        let mut reader = self.csv_reader_builder().has_headers(false).from_reader(sample);

        let mut num_fields = None;
        for record in reader.byte_records() {
            // Any error (inconsistent fields, bad quoting) disqualifies the
            // dialect.
            let record = record.ok()?;
            num_fields = Some(record.len());
        }

        num_fields
    }

    /// Cut the input down to the sample size, dropping a trailing partial
    /// line.
    fn complete_lines(input: &[u8]) -> &[u8] {
        if input.len() <= SAMPLE_SIZE {
            return input;
        }

        let sample = &input[..SAMPLE_SIZE];
        match sample.iter().rposition(|b| *b == b'\n') {
            Some(pos) => &sample[..pos + 1],
            None => sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_infer_ok() {
        struct TestCase {
            csv: String,
            expected: DialectOptions,
        }

        let test_cases = [
            TestCase {
                csv: "id,name\n1,\"Smith, J\"\n2,Lee\n".to_string(),
                expected: DialectOptions::default(),
            },
            TestCase {
                csv: "id;amount\n1;2,50\n2;3,75\n".to_string(),
                expected: DialectOptions {
                    delimiter: b';',
                    quote: b'"',
                },
            },
            TestCase {
                csv: "\u{feff}x;y\n1;2\n".to_string(),
                expected: DialectOptions {
                    delimiter: b';',
                    quote: b'"',
                },
            },
            TestCase {
                csv: "name\tnote\nann\t'a, b'\n".to_string(),
                expected: DialectOptions {
                    delimiter: b'\t',
                    quote: b'"',
                },
            },
            TestCase {
                csv: "name,note\nann,'a, b'\n".to_string(),
                expected: DialectOptions {
                    delimiter: b',',
                    quote: b'\'',
                },
            },
            // Every candidate sees a ragged sample.
            TestCase {
                csv: "a,b;c|d\te\n1\n".to_string(),
                expected: DialectOptions::default(),
            },
            // Single column, every candidate agrees.
            TestCase {
                csv: "age\n5\n7".to_string(),
                expected: DialectOptions::default(),
            },
            // Header only.
            TestCase {
                csv: "a;b;c".to_string(),
                expected: DialectOptions {
                    delimiter: b';',
                    quote: b'"',
                },
            },
        ];

        for tc in test_cases {
            let got = DialectOptions::infer_from_sample(tc.csv.as_bytes());
            assert_eq!(tc.expected, got, "csv: {}", tc.csv);
        }
    }

    #[test]
    fn infer_empty_falls_back_to_default() {
        assert_eq!(
            DialectOptions::default(),
            DialectOptions::infer_from_sample(b"")
        );
    }

    #[test]
    fn infer_delimiter_with_fixed_quote() {
        let got = DialectOptions::infer_delimiter_from_sample(b"a|b\n'x|y'|z\n", b'\'');
        assert_eq!(
            DialectOptions {
                delimiter: b'|',
                quote: b'\'',
            },
            got
        );

        let got = DialectOptions::infer_delimiter_from_sample(b"", b'\'');
        assert_eq!(
            DialectOptions {
                delimiter: b',',
                quote: b'\'',
            },
            got
        );
    }

    #[test]
    fn parse_delimiter_names() {
        assert_eq!(b'\t', DialectOptions::parse_delimiter("tab").unwrap());
        assert_eq!(b';', DialectOptions::parse_delimiter(";").unwrap());
        assert_eq!(b'|', DialectOptions::parse_delimiter("pipe").unwrap());
        assert!(DialectOptions::parse_delimiter("::").is_err());
    }
}
