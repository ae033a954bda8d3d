use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = DoorsError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum DoorsError {
    #[error("DOORS username, password, and server address are required (missing: {})", .0.join(", "))]
    MissingCredentials(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Output directory does not exist or is invalid: {}", .0.display())]
    InvalidOutputDir(PathBuf),

    #[error("DXL script error: {0}")]
    Script(String),

    #[error("Failed to launch DOORS client: {source}, command: {command}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "DXL did not output marker string within {} seconds, command: {}",
        .waited.as_secs_f64(),
        .command
    )]
    Timeout { waited: Duration, command: String },

    #[error("DXL script reported an error: {message}, command: {command}")]
    ClientReported { message: String, command: String },

    #[error("File does not exist: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("File is empty: {}", .0.display())]
    OutputEmpty(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DoorsError {
    /// Stable name of the variant, used in structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            DoorsError::MissingCredentials(_) => "MissingCredentials",
            DoorsError::InvalidConfig(_) => "InvalidConfig",
            DoorsError::InvalidArgument(_) => "InvalidArgument",
            DoorsError::InvalidOutputDir(_) => "InvalidOutputDir",
            DoorsError::Script(_) => "ScriptError",
            DoorsError::Launch { .. } => "LaunchFailed",
            DoorsError::Timeout { .. } => "Timeout",
            DoorsError::ClientReported { .. } => "ClientReported",
            DoorsError::OutputMissing(_) => "OutputMissing",
            DoorsError::OutputEmpty(_) => "OutputEmpty",
            DoorsError::Io { .. } => "IoError",
        }
    }

    /// True when the caller can fix the problem by changing arguments or environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DoorsError::MissingCredentials(_)
                | DoorsError::InvalidConfig(_)
                | DoorsError::InvalidArgument(_)
                | DoorsError::InvalidOutputDir(_)
        )
    }

    /// The masked client command line, when the error happened after launch.
    pub fn command(&self) -> Option<&str> {
        match self {
            DoorsError::Launch { command, .. }
            | DoorsError::Timeout { command, .. }
            | DoorsError::ClientReported { command, .. } => Some(command),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DoorsError::Io {
            path: path.into(),
            source,
        }
    }
}
