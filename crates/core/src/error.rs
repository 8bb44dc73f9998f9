use caravan::CaravanError;
use companion_types::{CareRequestId, TaskId};
use dashboard::DashboardError;

#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("care request {0} not found")]
    CareRequestNotFound(CareRequestId),
    #[error("companion link {0} not found")]
    CompanionLinkNotFound(String),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("care request {0} has no service line")]
    MissingServiceLine(CareRequestId),
    #[error("unknown consent type: {0}")]
    UnknownConsentType(String),
    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("Caravan error: {0}")]
    Caravan(#[from] CaravanError),
    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),

    #[error("failed to read companion storage: {0}")]
    StorageRead(std::io::Error),
    #[error("failed to write companion storage: {0}")]
    StorageWrite(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML at {path}: {source}")]
    YamlDeserialization {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl CompanionError {
    /// True for errors caused by the caller's input rather than by this service or an upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CompanionError::InvalidInput(_) | CompanionError::MissingServiceLine(_)
        )
    }

    /// True for errors meaning the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CompanionError::CareRequestNotFound(_)
                | CompanionError::CompanionLinkNotFound(_)
                | CompanionError::TaskNotFound(_)
        )
    }
}

pub type CompanionResult<T> = std::result::Result<T, CompanionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resources_are_not_found_not_client_errors() {
        for e in [
            CompanionError::CareRequestNotFound(CareRequestId(1)),
            CompanionError::CompanionLinkNotFound("abc".into()),
            CompanionError::TaskNotFound(TaskId(1)),
        ] {
            assert!(e.is_not_found(), "{e}");
            assert!(!e.is_client_error(), "{e}");
        }
    }

    #[test]
    fn caller_mistakes_are_client_errors() {
        for e in [
            CompanionError::InvalidInput("signerId".into()),
            CompanionError::MissingServiceLine(CareRequestId(1)),
        ] {
            assert!(e.is_client_error(), "{e}");
            assert!(!e.is_not_found(), "{e}");
        }
    }

    #[test]
    fn server_side_failures_are_neither() {
        for e in [
            CompanionError::UnknownConsentType("hipaa".into()),
            CompanionError::InvalidTask("corrupt index".into()),
            CompanionError::StorageWrite(std::io::Error::other("disk full")),
        ] {
            assert!(!e.is_client_error(), "{e}");
            assert!(!e.is_not_found(), "{e}");
        }
    }
}
