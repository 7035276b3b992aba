use std::fmt;

use reqwest::header::COOKIE;
use reqwest::RequestBuilder;

use crate::error::{RemoteError, Result};

/// Cookie name used by googlesource.com style deployments.
pub const DEFAULT_COOKIE_NAME: &str = "o";

/// How requests authenticate against the review server.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic { user: String, password: String },
    Cookie { name: String, value: String },
}

impl Credentials {
    /// Parse `USER:PASSWORD`. The password may itself contain colons.
    pub fn parse_basic(spec: &str) -> Result<Self> {
        let (user, password) = spec.split_once(':').ok_or_else(|| {
            RemoteError::InvalidCredentials("expected USER:PASSWORD".to_string())
        })?;
        if user.is_empty() {
            return Err(RemoteError::InvalidCredentials(
                "user name must not be empty".to_string(),
            ));
        }
        Ok(Self::Basic {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn cookie(value: impl Into<String>) -> Self {
        Self::Cookie {
            name: DEFAULT_COOKIE_NAME.to_string(),
            value: value.into(),
        }
    }

    /// Authenticated requests go through the `/a/` endpoint prefix.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Anonymous => request,
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
            Self::Cookie { name, value } => request.header(COOKIE, format!("{name}={value}")),
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::Cookie { name, .. } => f
                .debug_struct("Cookie")
                .field("name", name)
                .field("value", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_splits_on_first_colon() {
        let creds = Credentials::parse_basic("admin:s3cr:et").unwrap();
        assert_eq!(
            creds,
            Credentials::Basic {
                user: "admin".into(),
                password: "s3cr:et".into()
            }
        );
        assert!(creds.is_authenticated());
    }

    #[test]
    fn parse_basic_rejects_malformed() {
        assert!(Credentials::parse_basic("admin").is_err());
        assert!(Credentials::parse_basic(":pw").is_err());
    }

    #[test]
    fn cookie_uses_default_name() {
        match Credentials::cookie("abc") {
            Credentials::Cookie { name, value } => {
                assert_eq!(name, "o");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn anonymous_is_default() {
        assert!(!Credentials::default().is_authenticated());
    }

    #[test]
    fn debug_hides_secrets() {
        let rendered = format!("{:?}", Credentials::parse_basic("u:hunter2").unwrap());
        assert!(!rendered.contains("hunter2"));
        let rendered = format!("{:?}", Credentials::cookie("tok"));
        assert!(!rendered.contains("tok"));
    }
}
