use parquet_inspect_core::InspectError;
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Failed to open parquet file {path}: {source}"))]
    OpenFile {
        path: String,
        #[snafu(source(from(InspectError, Box::new)))]
        source: Box<InspectError>,
    },

    #[snafu(display("{source}"))]
    Inspect {
        #[snafu(source(from(InspectError, Box::new)))]
        source: Box<InspectError>,
    },

    #[snafu(display("Config file not found or not readable: {path}"))]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Invalid config file {path}: {source}"))]
    ParseConfig {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("Failed to serialize output as JSON: {source}"))]
    Json { source: serde_json::Error },
}
