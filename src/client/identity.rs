//! Enrollee identity carried in the Register message.

use crate::core::{ConfigError, IDENTITY_SEPARATOR};

/// Who is enrolling.
///
/// Rendered on the wire as `email CRLF first_name CRLF last_name`, so no field
/// may contain a line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    email: String,
    first_name: String,
    last_name: String,
}

impl Identity {
    /// Create an identity, rejecting values that cannot be encoded.
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let identity = Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        };

        if identity.email.trim().is_empty() {
            return Err(ConfigError::InvalidIdentity("email is empty".into()));
        }
        for (name, value) in [
            ("email", &identity.email),
            ("first name", &identity.first_name),
            ("last name", &identity.last_name),
        ] {
            if value.contains(['\r', '\n']) {
                return Err(ConfigError::InvalidIdentity(format!(
                    "{name} contains a line break"
                )));
            }
        }

        Ok(identity)
    }

    /// Email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// First name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Last name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Wire text of this identity.
    pub fn to_text(&self) -> String {
        [
            self.email.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
        ]
        .join(IDENTITY_SEPARATOR)
    }

    /// Wire bytes of this identity (UTF-8).
    pub fn payload(&self) -> Vec<u8> {
        self.to_text().into_bytes()
    }
}
