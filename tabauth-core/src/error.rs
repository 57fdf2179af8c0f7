use thiserror::Error;

/// Errors reported by an identity provider client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The user closed or cancelled the interactive surface.
    #[error("User cancelled the interaction")]
    Cancelled,
    /// The provider needs the user to interact (expired session, consent required).
    #[error("Interaction required: {0}")]
    InteractionRequired(String),
    /// The provider could not be reached.
    #[error("Network error: {0}")]
    Network(String),
    /// The provider rejected the client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Any other provider failure.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Coarse classification of an [`AuthError`], for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Interactive sign-in was aborted, denied or failed.
    Login,
    /// Silent token renewal failed.
    TokenAcquisition,
    /// The client configuration is missing or invalid.
    Configuration,
}

/// Normalized errors surfaced through session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Interactive sign-in failed.
    #[error("Login failed: {0}")]
    Login(#[source] ProviderError),
    /// Silent token acquisition failed.
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(#[source] ProviderError),
    /// The client configuration is invalid. Not recoverable at runtime.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Login(_) => ErrorKind::Login,
            AuthError::TokenAcquisition(_) => ErrorKind::TokenAcquisition,
            AuthError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The underlying provider error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            AuthError::Login(e) | AuthError::TokenAcquisition(e) => Some(e),
            AuthError::Configuration(_) => None,
        }
    }

    /// Whether the user cancelled the interactive flow.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.provider_error(), Some(ProviderError::Cancelled))
    }

    /// A message safe to show to end users. Never includes provider details.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::Login(ProviderError::Cancelled) => "Sign-in was cancelled.",
            AuthError::Login(_) => "Sign-in failed. Please try again.",
            AuthError::TokenAcquisition(_) => "Your session needs to be refreshed. Please sign in again.",
            AuthError::Configuration(_) => "Sign-in is not available right now.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_source() {
        let err = AuthError::Login(ProviderError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Login);
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Login failed: User cancelled the interaction");

        let err = AuthError::TokenAcquisition(ProviderError::Network("timeout".into()));
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert!(!err.is_cancelled());
        assert_eq!(
            err.provider_error(),
            Some(&ProviderError::Network("timeout".into()))
        );

        let err = AuthError::Configuration("missing client id".into());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.provider_error().is_none());
    }

    #[test]
    fn test_user_message_hides_provider_details() {
        let err = AuthError::Login(ProviderError::Provider("AADSTS50011: reply url mismatch".into()));
        assert!(!err.user_message().contains("AADSTS"));
    }
}
