//! Line-oriented product record loader.
//!
//! Each line reads `id,name,category`. Fields are trimmed. Lines that do not have
//! exactly three fields, or whose id is not an integer, are skipped and listed in the
//! [`LoadReport`]. A read failure stops the load and keeps the rows parsed so far.
//!
//! ```
//! use arbor_index::loader::load_from_reader;
//!
//! let input = "1, Widget, Tools\nnot a record\n2,Gadget,Toys\n";
//! let report = load_from_reader(input.as_bytes());
//! assert_eq!(report.records.len(), 2);
//! assert_eq!(report.records[0].payload(), "Widget, Tools");
//! assert_eq!(report.skipped.len(), 1);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::Key;
use crate::error::{Error, Result};

/// One parsed product row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub id: Key,
    pub name: String,
    pub category: String,
}

impl Record {
    pub fn new(id: Key, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
        }
    }

    /// The index payload: `"name, category"`.
    pub fn payload(&self) -> String {
        format!("{}, {}", self.name, self.category)
    }

    /// Parses one `id,name,category` line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] tagged with `line`.
    pub fn parse(text: &str, line: usize) -> Result<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let &[id, name, category] = fields.as_slice() else {
            return Err(Error::MalformedRecord {
                line,
                reason: format!("expected 3 fields, found {}", fields.len()),
            });
        };
        let id = id.parse::<Key>().map_err(|e| Error::MalformedRecord {
            line,
            reason: format!("invalid id {id:?}: {e}"),
        })?;
        Ok(Self::new(id, name, category))
    }
}

/// Outcome of a load: everything that parsed, plus what did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<Record>,
    /// Lines that were skipped, each as an [`Error::MalformedRecord`].
    pub skipped: Vec<Error>,
    /// Set when reading stopped early.
    pub io_error: Option<Error>,
}

impl LoadReport {
    /// `(id, payload)` pairs ready for insertion.
    pub fn entries(&self) -> impl Iterator<Item = (Key, String)> + '_ {
        self.records.iter().map(|record| (record.id, record.payload()))
    }

    pub fn is_complete(&self) -> bool {
        self.io_error.is_none()
    }
}

/// Reads records from any buffered source. Blank lines are ignored.
pub fn load_from_reader(reader: impl BufRead) -> LoadReport {
    let mut report = LoadReport::default();

    for (number, line) in reader.lines().enumerate() {
        let number = number + 1;
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(line = number, error = %err, "stopped reading records");
                report.io_error = Some(Error::Io(err));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match Record::parse(&line, number) {
            Ok(record) => report.records.push(record),
            Err(err) => {
                warn!(%err, "skipped malformed record");
                report.skipped.push(err);
            }
        }
    }

    report
}

/// Opens `path` and reads records from it.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened. Failures after opening are
/// recorded in the report instead.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadReport> {
    let file = File::open(path.as_ref()).inspect_err(|err| {
        warn!(path = %path.as_ref().display(), error = %err, "cannot open record file");
    })?;
    Ok(load_from_reader(BufReader::new(file)))
}

const NAMES: [&str; 8] = [
    "Widget", "Gadget", "Sprocket", "Gizmo", "Bracket", "Valve", "Lamp", "Cable",
];
const CATEGORIES: [&str; 5] = ["Tools", "Toys", "Hardware", "Lighting", "Electrical"];

/// Deterministic product rows with ids `1..=count`.
pub fn generate_records(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            let id = Key::try_from(i).unwrap_or(Key::MAX);
            Record::new(
                id,
                format!("{} {i}", NAMES[i % NAMES.len()]),
                CATEGORIES[i % CATEGORIES.len()],
            )
        })
        .collect()
}

/// Renders records back into the `id,name,category` text format.
pub fn to_lines(records: &[Record]) -> String {
    records
        .iter()
        .map(|r| format!("{},{},{}\n", r.id, r.name, r.category))
        .collect()
}
