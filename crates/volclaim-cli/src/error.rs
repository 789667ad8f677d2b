//! Error types for the CLI

use std::path::PathBuf;

use volclaim_common::telemetry::TelemetryError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Controller(#[from] volclaim_common::Error),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} already tracks claim {id}; delete it first or use another state file")]
    AlreadyTracked { path: PathBuf, id: String },

    #[error("state file {path} does not track a claim")]
    NotTracked { path: PathBuf },
}

impl Error {
    /// User-facing rendering: the `Display` chain, with multi-line
    /// diagnostics kept intact
    pub fn report(&self) -> String {
        format!("Error: {}", self)
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volclaim_common::Error as ControllerError;

    #[test]
    fn test_report_keeps_diagnostic_lines_readable() {
        let err = Error::from(ControllerError::diagnosed(
            ControllerError::ConvergenceFailed {
                target: "Bound".to_string(),
                phase: "Lost".to_string(),
            },
            "\n * data (PersistentVolumeClaim): ClaimLost: volume gone",
        ));

        let report = err.report();
        assert!(report.starts_with("Error: "));
        assert!(report.contains("\n * data (PersistentVolumeClaim): ClaimLost: volume gone"));
        assert!(!report.contains("Diagnosed"));
        assert!(!report.contains("\\n"));
    }

    #[test]
    fn test_report_for_local_errors() {
        let err = Error::NotTracked {
            path: PathBuf::from("volclaim-state.json"),
        };
        assert_eq!(
            err.report(),
            "Error: state file volclaim-state.json does not track a claim"
        );
    }
}
