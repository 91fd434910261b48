use serde::Serialize;
use uuid::Uuid;

use crate::{error::Error, store::Store};

use super::User;

/// The authenticated caller, every friend, message and trip operation is made on behalf of one
#[derive(Serialize, Clone, Debug)]
#[serde(transparent)]
pub struct Me {
    pub user: User,
}

impl Me {
    pub async fn get(store: &dyn Store, user_uuid: Uuid) -> Result<Self, Error> {
        let user = store.fetch_user(user_uuid).await?;

        Ok(Self { user })
    }

    pub fn uuid(&self) -> Uuid {
        self.user.uuid
    }
}
