use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Invalid run configuration (negative tolerance, empty column name, etc.).
    Configuration(String),
    /// A source record could not be mapped into canonical shape.
    Mapping(MappingError),
    /// IO error (CSV read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Mapping(err) => write!(f, "mapping error: {err}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Mapping(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MappingError> for ReconError {
    fn from(err: MappingError) -> Self {
        Self::Mapping(err)
    }
}

/// A malformed or incomplete source record. `record` names the record as
/// `invoice #N` or `statement line #N` (1-based, input order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    MissingField { record: String, field: String },
    AmountParse { record: String, value: String },
    /// Invoice totals must be non-negative.
    NegativeAmount { record: String, value: String },
    CurrencyParse { record: String, value: String },
    DateParse { record: String, value: String },
    /// Neither a document reference nor a date was supplied.
    MissingDocumentAndDate { record: String },
    MatchModeParse { record: String, value: String },
}

impl MappingError {
    pub fn record(&self) -> &str {
        match self {
            Self::MissingField { record, .. }
            | Self::AmountParse { record, .. }
            | Self::NegativeAmount { record, .. }
            | Self::CurrencyParse { record, .. }
            | Self::DateParse { record, .. }
            | Self::MissingDocumentAndDate { record }
            | Self::MatchModeParse { record, .. } => record,
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { record, field } => {
                write!(f, "{record}: missing required field '{field}'")
            }
            Self::AmountParse { record, value } => {
                write!(f, "{record}: cannot parse amount '{value}'")
            }
            Self::NegativeAmount { record, value } => {
                write!(f, "{record}: invoice total must not be negative, got '{value}'")
            }
            Self::CurrencyParse { record, value } => {
                write!(f, "{record}: '{value}' is not a 3-letter currency code")
            }
            Self::DateParse { record, value } => {
                write!(f, "{record}: cannot parse date '{value}'")
            }
            Self::MissingDocumentAndDate { record } => {
                write!(f, "{record}: needs a document reference or a date")
            }
            Self::MatchModeParse { record, value } => {
                write!(f, "{record}: match mode must be 'strict' or 'partial', got '{value}'")
            }
        }
    }
}

impl std::error::Error for MappingError {}
