use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all jgo operations.
#[derive(Debug, Error, Diagnostic)]
pub enum JgoError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An endpoint, coordinate, POM, or TOML file is ill-formed.
    #[error("Parse error: {message}")]
    #[diagnostic(help("Endpoints look like group:artifact[:version][:classifier][:packaging]"))]
    Parse { message: String },

    /// An artifact or POM could not be obtained from any configured repository.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A version range or metadata lookup produced no candidate.
    #[error("Cannot resolve version: {message}")]
    VersionUnresolved { message: String },

    /// A `${...}` expression survived fixed-point interpolation.
    #[error("Unresolved property expression: {message}")]
    Interpolation { message: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The available JVM is older than the environment requires.
    #[error("Incompatible JVM: {message}")]
    #[diagnostic(help("Install a newer JDK or drop --system-java to let jgo fetch one"))]
    JvmCompatibility { message: String },

    /// The child Java process could not be started.
    #[error("Failed to launch java: {message}")]
    Launch { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl JgoError {
    /// Process exit code for this error class.
    ///
    /// Resolution-class failures exit 2, transport failures exit 3,
    /// everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse { .. }
            | Self::NotFound { .. }
            | Self::VersionUnresolved { .. }
            | Self::Interpolation { .. } => 2,
            Self::Io(_) | Self::Network { .. } => 3,
            _ => 1,
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type JgoResult<T> = miette::Result<T>;
