use crate::error::{DriverError, Result};

/// Connection parameters for one adapter.
///
/// Recognized options mirror the historical connect surface: host, port,
/// extra engine options, a legacy tty field, database name, user and
/// password. `from_pairs` additionally accepts the aliases older callers
/// used, resolving by precedence (the engine's own field name wins over a
/// generic alias).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectParams {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Extra engine options passed through verbatim.
    pub options: Option<String>,
    /// Legacy, engine-specific terminal field. Accepted and ignored.
    pub tty: Option<String>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ConnectParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Builds parameters from string key/value pairs.
    ///
    /// Database name is accepted under `dbname`, `database` or `db` (in that
    /// precedence); password under `password` or `auth`. Unknown keys are a
    /// `Config` error rather than being silently dropped.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        let mut database = None;
        let mut db = None;
        let mut auth = None;

        for (key, value) in pairs {
            match key {
                "host" => params.host = Some(value.to_string()),
                "port" => {
                    let port = value.parse::<u16>().map_err(|_| {
                        DriverError::Config(format!("port is not a number: {value}"))
                    })?;
                    params.port = Some(port);
                }
                "options" => params.options = Some(value.to_string()),
                "tty" => params.tty = Some(value.to_string()),
                "dbname" => params.dbname = Some(value.to_string()),
                "database" => database = Some(value.to_string()),
                "db" => db = Some(value.to_string()),
                "user" => params.user = Some(value.to_string()),
                "password" => params.password = Some(value.to_string()),
                "auth" => auth = Some(value.to_string()),
                other => {
                    return Err(DriverError::Config(format!(
                        "unrecognized connection parameter: {other}"
                    )))
                }
            }
        }

        if params.dbname.is_none() {
            params.dbname = database.or(db);
        }
        if params.password.is_none() {
            params.password = auth;
        }
        Ok(params)
    }

    /// Renders a keyword/value connection string for the native client.
    pub fn to_connection_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(host) = &self.host {
            parts.push(format!("host={host}"));
        }
        if let Some(port) = self.port {
            parts.push(format!("port={port}"));
        }
        if let Some(dbname) = &self.dbname {
            parts.push(format!("dbname={dbname}"));
        }
        if let Some(user) = &self.user {
            parts.push(format!("user={user}"));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={password}"));
        }
        if let Some(options) = &self.options {
            parts.push(format!("options={options}"));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let params = ConnectParams::new()
            .host("localhost")
            .port(5432)
            .dbname("app")
            .user("app")
            .password("secret");
        assert_eq!(
            params.to_connection_string(),
            "host=localhost port=5432 dbname=app user=app password=secret"
        );
    }

    #[test]
    fn dbname_alias_precedence() {
        let params =
            ConnectParams::from_pairs([("db", "third"), ("database", "second")]).unwrap();
        assert_eq!(params.dbname.as_deref(), Some("second"));

        let params = ConnectParams::from_pairs([
            ("database", "second"),
            ("dbname", "first"),
            ("db", "third"),
        ])
        .unwrap();
        assert_eq!(params.dbname.as_deref(), Some("first"));
    }

    #[test]
    fn password_alias_precedence() {
        let params = ConnectParams::from_pairs([("auth", "fallback")]).unwrap();
        assert_eq!(params.password.as_deref(), Some("fallback"));

        let params =
            ConnectParams::from_pairs([("auth", "fallback"), ("password", "real")]).unwrap();
        assert_eq!(params.password.as_deref(), Some("real"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = ConnectParams::from_pairs([("hots", "typo")]).unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ConnectParams::from_pairs([("port", "not-a-port")]).unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn tty_is_accepted_and_ignored_in_connection_string() {
        let params = ConnectParams::from_pairs([("tty", "/dev/tty0"), ("host", "h")]).unwrap();
        assert_eq!(params.tty.as_deref(), Some("/dev/tty0"));
        assert_eq!(params.to_connection_string(), "host=h");
    }
}
