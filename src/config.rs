use crate::error::Error;
use log::debug;
use serde::Deserialize;
use tokio::fs::read_to_string;
use url::Url;

const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Deserialize)]
pub struct ConfigBuilder {
    database: Option<Database>,
    cache: Option<CacheBuilder>,
    web: Option<WebBuilder>,
    identity: Option<IdentityBuilder>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    username: String,
    password: String,
    host: String,
    database: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct CacheBuilder {
    redis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebBuilder {
    ip: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct IdentityBuilder {
    userinfo_url: Option<Url>,
    token_cache_seconds: Option<u32>,
}

impl ConfigBuilder {
    pub async fn load(path: String) -> Result<Self, Error> {
        debug!("loading config from: {}", path);
        let raw = read_to_string(path).await?;

        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, Error> {
        let config = toml::from_str(raw)?;

        Ok(config)
    }

    pub fn build(self) -> Result<Config, Error> {
        let web = match self.web {
            Some(web) => Web {
                ip: web.ip.unwrap_or(String::from("0.0.0.0")),
                port: web.port.unwrap_or(8080),
            },
            None => Web {
                ip: String::from("0.0.0.0"),
                port: 8080,
            },
        };

        let cache = Cache {
            redis: self
                .cache
                .and_then(|c| c.redis)
                .unwrap_or(String::from("redis://127.0.0.1")),
        };

        let identity = match self.identity {
            Some(identity) => Identity {
                userinfo_url: match identity.userinfo_url {
                    Some(url) => url,
                    None => GOOGLE_USERINFO_URL.parse()?,
                },
                token_cache_seconds: identity.token_cache_seconds.unwrap_or(300),
            },
            None => Identity {
                userinfo_url: GOOGLE_USERINFO_URL.parse()?,
                token_cache_seconds: 300,
            },
        };

        Ok(Config {
            database: self.database,
            cache,
            web,
            identity,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: Option<Database>,
    pub cache: Cache,
    pub web: Web,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub struct Cache {
    pub redis: String,
}

#[derive(Debug, Clone)]
pub struct Web {
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub userinfo_url: Url,
    pub token_cache_seconds: u32,
}

impl Database {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}
