use std::fmt;

use log::debug;

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// AWS credentials used to sign CodePipeline requests.
///
/// The secret is never printed by `Debug`.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Reads the standard AWS environment variables.
    ///
    /// Returns `None` unless both the access key id and the secret are set
    /// and non-empty.
    pub fn from_env() -> Option<Self> {
        let lookup = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self::from_lookup(lookup)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let access_key_id = lookup(ACCESS_KEY_ENV)?;
        let secret_access_key = lookup(SECRET_KEY_ENV)?;
        let session_token = lookup(SESSION_TOKEN_ENV);

        debug!(
            "Loaded AWS credentials for key {} (session token: {})",
            access_key_id,
            session_token.is_some()
        );

        Some(Self::new(access_key_id, secret_access_key, session_token))
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_require_key_and_secret() {
        assert!(Credentials::from_lookup(lookup_from(&[(ACCESS_KEY_ENV, "AKID")])).is_none());
        assert!(Credentials::from_lookup(lookup_from(&[(SECRET_KEY_ENV, "secret")])).is_none());
    }

    #[test]
    fn test_credentials_with_session_token() {
        let creds = Credentials::from_lookup(lookup_from(&[
            (ACCESS_KEY_ENV, "AKID"),
            (SECRET_KEY_ENV, "secret"),
            (SESSION_TOKEN_ENV, "token"),
        ]))
        .unwrap();

        assert_eq!(creds.access_key_id, "AKID");
        assert_eq!(creds.secret_access_key(), "secret");
        assert_eq!(creds.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::new("AKID", "super-secret", Some("token".to_string()));
        let printed = format!("{creds:?}");
        assert!(printed.contains("AKID"));
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("token\""));
    }
}
