use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// One bearer token and the scopes it carries
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: String,

    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

impl AuthConfig {
    /// Outside dev mode at least one grant is required, otherwise nobody could
    /// ever open a stream.
    pub fn validate(
        &self,
        dev_mode: bool,
    ) -> Result<()> {
        if let Some(grant) = self.tokens.iter().find(|g| g.token.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "token grant with scopes {:?} has an empty token",
                grant.scopes
            )));
        }

        if !dev_mode && self.tokens.is_empty() {
            return Err(Error::InvalidConfig(
                "auth.tokens must contain at least one grant when dev_mode is off".into(),
            ));
        }

        Ok(())
    }
}
