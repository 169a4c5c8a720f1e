use crate::settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Flavortown api key not set: please set it in the settings")]
    MissingCredential,

    /// Any non-2xx response. The API has no structured error codes, so callers
    /// branch on the status (404 means "not configured yet").
    #[error("Failed to {action}: {status} {body}")]
    Remote {
        action: &'static str,
        status: u16,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode {context} response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_message_carries_status_and_body() {
        let err = ApiError::Remote {
            action: "get Project",
            status: 404,
            body: "{\"error\":\"Not found\"}".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to get Project: 404 {\"error\":\"Not found\"}");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_credential_has_no_status() {
        assert_eq!(ApiError::MissingCredential.status(), None);
        assert!(!ApiError::MissingCredential.is_not_found());
    }
}
