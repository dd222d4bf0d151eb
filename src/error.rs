use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MuportError {
    #[error("invalid input file: {}", .0.display())]
    InvalidInputFile(PathBuf),

    #[error("required column '{0}' is missing from the export header")]
    MissingColumn(String),

    #[error("row {record} has {got} fields but the header declares {expected}")]
    RowWidth {
        record: u64,
        expected: usize,
        got: usize,
    },

    #[error("row {record}: '{value}' is not a valid user ID")]
    InvalidIdField { record: u64, value: String },

    #[error("map file '{}' is empty", .0.display())]
    EmptyMapFile(PathBuf),

    #[error("could not parse map file: {0}")]
    MapParse(String),

    #[error("conflicting map entry for old ID {old}: already {existing}, refusing {new}")]
    DuplicateMapping { old: u64, existing: u64, new: u64 },

    #[error("could not insert user '{login}': {}", .messages.join(", "))]
    UserInsert {
        login: String,
        messages: Vec<String>,
    },

    #[error("destination is not a multisite network")]
    NotMultisite,

    #[error("blog {0} is not registered in the network")]
    UnknownBlog(u64),

    #[error("database import exited with status {0}")]
    BulkLoadFailed(i32),

    #[error("no destination database configured; pass --db or set 'db' in muport.yml")]
    NoDatabase,

    #[error("delimiter '{0}' does not fit in a single byte")]
    InvalidDelimiter(char),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl MuportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInputFile(_) => "invalid_input_file",
            Self::MissingColumn(_) => "missing_column",
            Self::RowWidth { .. } => "row_width_mismatch",
            Self::InvalidIdField { .. } => "invalid_id_field",
            Self::EmptyMapFile(_) => "empty_map_file",
            Self::MapParse(_) => "map_parse_error",
            Self::DuplicateMapping { .. } => "duplicate_mapping",
            Self::UserInsert { .. } => "user_insert_rejected",
            Self::NotMultisite => "not_multisite",
            Self::UnknownBlog(_) => "unknown_blog",
            Self::BulkLoadFailed(_) => "bulk_load_failed",
            Self::NoDatabase => "no_database",
            Self::InvalidDelimiter(_) => "invalid_delimiter",
            Self::Io(_) => "io_error",
            Self::Csv(_) => "csv_error",
            Self::Json(_) => "json_error",
            Self::Yaml(_) => "yaml_error",
            Self::Db(_) => "db_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, MuportError>;
