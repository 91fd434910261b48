//! Asks the external identity provider who a bearer token belongs to

use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::{error::Error, objects::NewUser};

#[derive(Clone)]
pub struct IdentityProvider {
    http: reqwest::Client,
    userinfo_url: Url,
}

/// Standard OpenID Connect userinfo claims
#[derive(Deserialize, Debug, Clone)]
pub struct UserInfo {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

impl UserInfo {
    pub fn into_new_user(self) -> Result<NewUser, Error> {
        let Some(email) = self.email else {
            return Err(Error::Unauthorized(
                "Identity provider did not share an email address".to_string(),
            ));
        };

        // users.name is varchar(100)
        let name = self.name.map(|n| n.chars().take(100).collect());

        Ok(NewUser::new(self.sub, name, email, self.picture))
    }
}

impl IdentityProvider {
    pub fn new(userinfo_url: Url) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { http, userinfo_url })
    }

    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!("identity provider rejected token: {}", response.status());
            return Err(Error::Unauthorized("Invalid access token".to_string()));
        }

        let user_info = response.error_for_status()?.json().await?;

        Ok(user_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_become_new_user() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({
            "sub": "1098",
            "name": "Alice",
            "email": "alice@example.com",
            "picture": "https://img.example.com/alice.png",
            "email_verified": true,
        }))
        .unwrap();

        let new_user = info.into_new_user().unwrap();

        assert_eq!(new_user.subject, "1098");
        assert_eq!(new_user.email, "alice@example.com");
        assert_eq!(new_user.name.as_deref(), Some("Alice"));
        assert_eq!(
            new_user.image.as_deref(),
            Some("https://img.example.com/alice.png")
        );
    }

    #[test]
    fn claims_without_email_are_rejected() {
        let info: UserInfo = serde_json::from_value(serde_json::json!({ "sub": "1098" })).unwrap();

        assert!(matches!(info.into_new_user(), Err(Error::Unauthorized(_))));
    }
}
