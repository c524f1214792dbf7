use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;

use super::TokenValidator;
use crate::AuthError;
use crate::TokenGrant;

const BEARER_SCHEME: &str = "bearer";

/// Accepts every caller. Only wired in when `server.dev_mode` is on.
#[derive(Debug, Default, Clone)]
pub struct NullTokenValidator;

impl TokenValidator for NullTokenValidator {
    fn decode_token(
        &self,
        _authorization: &str,
        _scope: &str,
    ) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Validates `bearer <token>` headers against a fixed grant table
#[derive(Debug, Default, Clone)]
pub struct StaticTokenValidator {
    grants: HashMap<String, HashSet<String>>,
}

impl StaticTokenValidator {
    pub fn new(grants: &[TokenGrant]) -> Self {
        let mut table: HashMap<String, HashSet<String>> = HashMap::new();
        for grant in grants {
            table
                .entry(grant.token.clone())
                .or_default()
                .extend(grant.scopes.iter().cloned());
        }
        Self { grants: table }
    }

    fn bearer_token(authorization: &str) -> Result<&str, AuthError> {
        let authorization = authorization.trim();
        if authorization.is_empty() {
            return Err(AuthError::MissingToken);
        }
        // Scheme alone, its token trimmed away
        if authorization.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(AuthError::MissingToken);
        }

        let (scheme, token) = authorization
            .split_once(char::is_whitespace)
            .ok_or_else(|| AuthError::InvalidToken("expected `bearer <token>`".into()))?;

        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(AuthError::InvalidToken(format!(
                "unsupported authorization scheme `{scheme}`"
            )));
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(token)
    }
}

impl TokenValidator for StaticTokenValidator {
    fn decode_token(
        &self,
        authorization: &str,
        scope: &str,
    ) -> Result<(), AuthError> {
        let token = Self::bearer_token(authorization)?;

        let scopes = self
            .grants
            .get(token)
            .ok_or_else(|| AuthError::InvalidToken("token is not recognized".into()))?;

        if !scopes.contains(scope) {
            debug!(required = scope, granted = ?scopes, "token lacks required scope");
            return Err(AuthError::InsufficientScope {
                required: scope.to_string(),
            });
        }

        Ok(())
    }
}
