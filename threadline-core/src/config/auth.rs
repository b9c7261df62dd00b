//! Identity resolution configuration.

/// Settings used to turn a request credential into a user id.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// Identity assigned when no valid credential is presented.
    pub fallback_user_id: String,
}
