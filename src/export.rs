use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecordsIter, Trim};

use crate::error::{MuportError, Result};

/// Columns the importer maps straight onto account fields. Standard profile
/// columns land in user meta at creation; anything else only reaches user
/// meta through a registered custom-data hook.
pub const CORE_COLUMNS: &[&str] = &[
    "ID",
    "user_login",
    "user_pass",
    "user_nicename",
    "user_email",
    "user_url",
    "user_registered",
    "user_activation_key",
    "user_status",
    "display_name",
    "role",
];

/// Headers the importer cannot work without.
const REQUIRED_COLUMNS: &[&str] = &["ID", "user_login"];

/// Role attached when the export carries no `role` column or an empty value.
pub const DEFAULT_ROLE: &str = "subscriber";

/// One data row of a user export, keyed by header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    /// 1-based data record number (header excluded), for error reporting.
    pub record: u64,
    fields: BTreeMap<String, String>,
}

impl UserRow {
    pub(crate) fn from_fields(record: u64, fields: BTreeMap<String, String>) -> Self {
        Self { record, fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    fn field(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    /// The account's identity on the source site.
    pub fn old_id(&self) -> Result<u64> {
        let raw = self.field("ID");
        match raw.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(MuportError::InvalidIdField {
                record: self.record,
                value: raw.to_string(),
            }),
        }
    }

    /// Extract the source identity and strip it from the attribute set.
    /// The destination never receives `ID` as an attribute, not even
    /// through a custom-data hook.
    pub fn take_old_id(&mut self) -> Result<u64> {
        let id = self.old_id()?;
        self.fields.remove("ID");
        Ok(id)
    }

    pub fn login(&self) -> &str {
        self.field("user_login")
    }

    pub fn role(&self) -> &str {
        match self.field("role") {
            "" => DEFAULT_ROLE,
            role => role,
        }
    }

    /// Non-core columns, for custom-data hooks that want to persist them.
    pub fn meta(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields
            .iter()
            .filter(|(key, _)| !CORE_COLUMNS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Streaming reader over a delimiter-separated user export.
///
/// The header row is consumed at open time and never yielded as data. The
/// handle is owned here and released on drop; iteration is single-pass.
#[derive(Debug)]
pub struct ExportReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl ExportReader {
    pub fn open(path: &Path, delimiter: u8) -> Result<Self> {
        if path.as_os_str().is_empty() || !path.is_file() {
            return Err(MuportError::InvalidInputFile(path.to_path_buf()));
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(MuportError::MissingColumn((*required).to_string()));
            }
        }
        Ok(Self { reader, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in file order. A row whose field count disagrees with the
    /// header aborts with the offending record number instead of being
    /// silently truncated or padded.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows {
            records: self.reader.records(),
            headers: &self.headers,
            record: 0,
        }
    }
}

pub struct Rows<'r> {
    records: StringRecordsIter<'r, File>,
    headers: &'r [String],
    record: u64,
}

impl Iterator for Rows<'_> {
    type Item = Result<UserRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.record += 1;
        Some(match record {
            Ok(fields) => {
                let fields: BTreeMap<String, String> = self
                    .headers
                    .iter()
                    .zip(fields.iter())
                    .map(|(header, value)| (header.clone(), value.to_string()))
                    .collect();
                Ok(UserRow::from_fields(self.record, fields))
            }
            Err(err) => Err(widen_csv_error(err, self.record)),
        })
    }
}

fn widen_csv_error(err: csv::Error, record: u64) -> MuportError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => MuportError::RowWidth {
            record,
            expected: *expected_len as usize,
            got: *len as usize,
        },
        _ => MuportError::Csv(err),
    }
}
