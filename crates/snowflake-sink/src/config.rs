use std::time::Duration;

/// Default per-request HTTP timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default delay between status polls of an in-progress statement, in milliseconds
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Kind of bearer token sent in `Authorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    /// Programmatic access token
    #[default]
    ProgrammaticAccessToken,
    /// OAuth access token
    OAuth,
    /// Key-pair JWT signed by the caller
    KeypairJwt,
}

impl TokenType {
    /// Value of the `X-Snowflake-Authorization-Token-Type` header.
    pub fn header_value(&self) -> &'static str {
        match self {
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
            TokenType::OAuth => "OAUTH",
            TokenType::KeypairJwt => "KEYPAIR_JWT",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenType::ProgrammaticAccessToken => "pat",
            TokenType::OAuth => "oauth",
            TokenType::KeypairJwt => "jwt",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pat" | "programmatic_access_token" => Ok(TokenType::ProgrammaticAccessToken),
            "oauth" => Ok(TokenType::OAuth),
            "jwt" | "keypair_jwt" => Ok(TokenType::KeypairJwt),
            _ => Err(format!(
                "Invalid token type: '{s}'. Expected 'pat', 'oauth', or 'jwt'"
            )),
        }
    }
}

/// Snowflake connection settings.
#[derive(Clone)]
pub struct SnowflakeConfig {
    /// Account identifier (`orgname-accountname` or legacy `locator.region`)
    pub account: String,
    /// Login name, for logging only; the token carries the identity
    pub user: String,
    pub token: String,
    pub token_type: TokenType,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: String,
    pub schema: String,
    /// HTTP timeout for each request
    pub request_timeout: Duration,
    /// Delay between polls of a statement still running
    pub poll_interval: Duration,
    base_url: Option<String>,
}

impl SnowflakeConfig {
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        token: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            user: user.into(),
            token: token.into(),
            token_type: TokenType::default(),
            role: None,
            warehouse: None,
            database: database.into(),
            schema: schema.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            base_url: None,
        }
    }

    /// Send requests to `base_url` instead of the account's public endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Root URL of the account's REST endpoint.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.snowflakecomputing.com",
                self.account.to_lowercase()
            ),
        }
    }
}

impl std::fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let config = SnowflakeConfig::new("MYORG-ACCOUNT123", "sync", "t", "META", "PUBLIC");
        assert_eq!(
            config.base_url(),
            "https://myorg-account123.snowflakecomputing.com"
        );

        let config = config.with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SnowflakeConfig::new("acct", "sync", "super-secret-token", "META", "PUBLIC");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_token_type_from_str() {
        assert_eq!("pat".parse::<TokenType>().unwrap(), TokenType::ProgrammaticAccessToken);
        assert_eq!("OAUTH".parse::<TokenType>().unwrap(), TokenType::OAuth);
        assert_eq!("keypair_jwt".parse::<TokenType>().unwrap(), TokenType::KeypairJwt);
        assert!("password".parse::<TokenType>().is_err());
        assert_eq!(TokenType::KeypairJwt.header_value(), "KEYPAIR_JWT");
    }
}
