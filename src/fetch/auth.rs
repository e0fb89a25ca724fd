use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Credentials sent in the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP Basic: `Basic base64(user:password)`.
    Basic { user: String, password: String },
    /// OAuth2-style token: `Bearer <token>`.
    Bearer(String),
}

impl Credentials {
    pub fn basic(user: &str, password: &str) -> Self {
        Credentials::Basic {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    pub fn bearer(token: &str) -> Self {
        Credentials::Bearer(token.to_string())
    }

    /// Renders the value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Credentials::Basic { user, password } => {
                format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
            }
            Credentials::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_value() {
        // RFC 7617 example
        let creds = Credentials::basic("Aladdin", "open sesame");
        assert_eq!(creds.header_value(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_bearer_header_value() {
        assert_eq!(Credentials::bearer("abc.def").header_value(), "Bearer abc.def");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let basic = format!("{:?}", Credentials::basic("alice", "hunter2"));
        assert!(basic.contains("alice"));
        assert!(!basic.contains("hunter2"));

        let bearer = format!("{:?}", Credentials::bearer("s3cr3t"));
        assert!(!bearer.contains("s3cr3t"));
    }
}
