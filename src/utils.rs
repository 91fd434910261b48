use axum::http::{HeaderMap, header::AUTHORIZATION};
use hex::encode;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Error;

pub fn get_auth_header(headers: &HeaderMap) -> Result<&str, Error> {
    let auth_token = headers.get(AUTHORIZATION);

    let Some(auth_token) = auth_token else {
        return Err(Error::Unauthorized(
            "No authorization header provided".to_string(),
        ));
    };

    let auth_raw = auth_token.to_str()?;

    let mut auth = auth_raw.split_whitespace();

    let auth_type = auth.next();

    let auth_value = auth.next();

    if auth_type.is_none() {
        return Err(Error::Unauthorized(
            "Authorization header is empty".to_string(),
        ));
    } else if auth_type.is_some_and(|at| at != "Bearer") {
        return Err(Error::Unauthorized(
            "Only token auth is supported".to_string(),
        ));
    }

    auth_value.ok_or(Error::Unauthorized("No token provided".to_string()))
}

pub trait CacheFns {
    async fn set_cache_key(
        &self,
        key: String,
        value: impl Serialize + Send,
        expire: u32,
    ) -> Result<(), Error>;
    async fn get_cache_key<T: DeserializeOwned>(&self, key: String) -> Result<T, Error>;
    async fn del_cache_key(&self, key: String) -> Result<(), Error>;
}

impl CacheFns for redis::Client {
    async fn set_cache_key(
        &self,
        key: String,
        value: impl Serialize + Send,
        expire: u32,
    ) -> Result<(), Error> {
        let mut conn = self.get_multiplexed_tokio_connection().await?;

        let key_encoded = encode(key);

        let value_json = serde_json::to_string(&value)?;

        redis::cmd("SET")
            .arg(&[key_encoded, value_json])
            .arg("EX")
            .arg(expire)
            .exec_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn get_cache_key<T: DeserializeOwned>(&self, key: String) -> Result<T, Error> {
        let mut conn = self.get_multiplexed_tokio_connection().await?;

        let key_encoded = encode(key);

        let value: String = redis::cmd("GET")
            .arg(key_encoded)
            .query_async(&mut conn)
            .await?;

        Ok(serde_json::from_str(&value)?)
    }

    async fn del_cache_key(&self, key: String) -> Result<(), Error> {
        let mut conn = self.get_multiplexed_tokio_connection().await?;

        let key_encoded = encode(key);

        redis::cmd("DEL")
            .arg(key_encoded)
            .exec_async(&mut conn)
            .await?;

        Ok(())
    }
}
