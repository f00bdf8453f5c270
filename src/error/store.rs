use serde::{Deserialize, Serialize};

/// Error code the server returns when `maxTimeMS` is exceeded.
pub const MAX_TIME_MS_EXPIRED: i32 = 50;

/// Structured error information extracted from MongoDB driver errors.
///
/// Used to classify driver failures and to log them as compact JSON; it is
/// never handed to callers outside the store binding.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip)]
    pub(crate) unreachable: bool,
}

impl ErrorInfo {
    /// Convert error info to compact JSON string (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether the server gave up because the operation's time budget ran out.
    pub fn is_time_limit(&self) -> bool {
        self.code == Some(MAX_TIME_MS_EXPIRED)
    }

    /// Whether the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        self.unreachable
    }

    /// Best available one-line description.
    pub fn summary(&self) -> String {
        match (&self.name, &self.message) {
            (Some(name), Some(msg)) => format!("{name}: {msg}"),
            (None, Some(msg)) => msg.clone(),
            (Some(name), None) => name.clone(),
            (None, None) => "unknown store error".to_string(),
        }
    }
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::ErrorKind;

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
            info.name = get_error_name(command_error.code);
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
            info.unreachable = true;
        }
        ErrorKind::ConnectionPoolCleared { message, .. } => {
            info.error_type = Some("mongo.pool_cleared".to_string());
            info.message = Some(message.clone());
            info.unreachable = true;
        }
        ErrorKind::DnsResolve { message, .. } => {
            info.error_type = Some("mongo.dns_error".to_string());
            info.message = Some(message.clone());
            info.unreachable = true;
        }
        ErrorKind::Io(io_error) => {
            info.error_type = Some("mongo.io_error".to_string());
            info.message = Some(io_error.to_string());
            info.unreachable = true;
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    info
}

/// Get a human-readable error name from a MongoDB error code.
fn get_error_name(code: i32) -> Option<String> {
    let name = match code {
        2 => "BadValue",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        43 => "CursorNotFound",
        MAX_TIME_MS_EXPIRED => "MaxTimeMSExpired",
        96 => "OperationFailed",
        _ => return None,
    };

    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(get_error_name(50).as_deref(), Some("MaxTimeMSExpired"));
        assert_eq!(get_error_name(43).as_deref(), Some("CursorNotFound"));
        assert_eq!(get_error_name(12345), None);
    }

    #[test]
    fn test_summary_prefers_name_and_message() {
        let info = ErrorInfo {
            code: Some(50),
            name: Some("MaxTimeMSExpired".to_string()),
            message: Some("operation exceeded time limit".to_string()),
            ..Default::default()
        };
        assert!(info.is_time_limit());
        assert_eq!(
            info.summary(),
            "MaxTimeMSExpired: operation exceeded time limit"
        );
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let info = ErrorInfo {
            message: Some("boom".to_string()),
            unreachable: true,
            ..Default::default()
        };
        assert_eq!(info.to_json_compact().unwrap(), r#"{"message":"boom"}"#);
    }
}
