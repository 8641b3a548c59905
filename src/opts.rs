use crate::error::Error;

/// Connection options derived from the DSN
///
/// ```rs
/// let opts = Opts::try_from("mysql://db.example.com:3307/sales")?;
/// let opts = Opts::try_from("localhost/sales")?.with_credentials("scott", "tiger");
/// ```
#[derive(Debug, Clone)]
pub struct Opts {
    /// Enable TCP_NODELAY socket option to disable Nagle's algorithm
    pub tcp_nodelay: bool,

    /// Database to select on connect
    pub db: Option<String>,

    pub host: String,

    pub port: u16,

    /// Username for authentication
    pub user: String,

    pub password: String,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            db: None,
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl Opts {
    /// Override credentials taken from the DSN
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.user = user.to_string();
        self.password = password.to_string();
        self
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(dsn: &str) -> Result<Self, Self::Error> {
        // A bare `host[:port][/db]` is read as a mysql URL
        let url = if dsn.contains("://") {
            dsn.to_string()
        } else {
            format!("mysql://{dsn}")
        };

        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::BadConfigError(format!("Failed to parse DSN {dsn}: {e}")))?;

        if parsed.scheme() != "mysql" {
            return Err(Error::BadConfigError(format!(
                "Invalid DSN scheme '{}', expected 'mysql'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::BadConfigError(format!("Missing host in DSN {dsn}")))?
            .to_string();

        let mut opts = Self {
            host,
            port: parsed.port().unwrap_or(3306),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or_default().to_string(),
            db: parsed
                .path()
                .strip_prefix('/')
                .filter(|db| !db.is_empty())
                .map(ToString::to_string),
            ..Default::default()
        };

        for (key, value) in parsed.query_pairs() {
            if key == "tcp_nodelay" {
                opts.tcp_nodelay = !matches!(value.as_ref(), "false" | "0");
            }
        }

        Ok(opts)
    }
}
