//! User-facing notifications raised by the client and the CRUD engine.

/// Severity of a [`Notification`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation succeeded.
    Success,
    /// Something was skipped or needs attention.
    Warning,
    /// Operation failed.
    Error,
}

/// A toast/notification for the host UI to display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Optional headline.
    pub title: Option<String>,
    /// Body text.
    pub message: String,
}

impl Notification {
    /// A success message without a title.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: None,
            message: message.into(),
        }
    }

    /// A warning without a title.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            title: None,
            message: message.into(),
        }
    }

    /// An error without a title.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: None,
            message: message.into(),
        }
    }

    /// An error with only a title.
    pub fn error_titled(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: Some(title.into()),
            message: String::new(),
        }
    }

    /// An error built from a backend message of the form `"Title:Body"`.
    ///
    /// The message is split at the first `:`; without one the whole text is
    /// the body.
    pub fn from_api_message(message: &str) -> Self {
        match message.split_once(':') {
            Some((title, body)) => Self {
                level: NotificationLevel::Error,
                title: Some(title.to_string()),
                message: body.to_string(),
            },
            None => Self::error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_split_at_first_colon() {
        let n = Notification::from_api_message("Permission denied:role:admin required");
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.title.as_deref(), Some("Permission denied"));
        assert_eq!(n.message, "role:admin required");
    }

    #[test]
    fn test_api_message_without_colon() {
        let n = Notification::from_api_message("Something failed");
        assert_eq!(n.title, None);
        assert_eq!(n.message, "Something failed");
    }
}
