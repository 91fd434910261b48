use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Error, schema::users, store::Store, utils::CacheFns};

/// Minimum search length, shorter queries match too much of the directory
pub const MIN_SEARCH_LENGTH: usize = 3;
pub const SEARCH_LIMIT: i64 = 20;

/// A user as the identity provider last described them
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

/// Profile fields received on sign-in, keyed by the provider's subject
#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser {
    pub uuid: Uuid,
    pub subject: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

impl NewUser {
    pub fn new(subject: String, name: Option<String>, email: String, image: Option<String>) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            subject,
            name,
            email,
            image,
        }
    }

    pub fn build(&self) -> User {
        User {
            uuid: self.uuid,
            name: self.name.clone(),
            email: self.email.clone(),
            image: self.image.clone(),
        }
    }
}

impl User {
    pub async fn fetch_one(
        store: &dyn Store,
        cache_pool: &redis::Client,
        user_uuid: Uuid,
    ) -> Result<Self, Error> {
        if let Ok(cache_hit) = cache_pool.get_cache_key(user_uuid.to_string()).await {
            return Ok(cache_hit);
        }

        let user = store.fetch_user(user_uuid).await?;

        cache_pool
            .set_cache_key(user_uuid.to_string(), user.clone(), 1800)
            .await?;

        Ok(user)
    }

    /// Inserts or refreshes the user behind an identity provider subject
    pub async fn upsert(
        store: &dyn Store,
        cache_pool: &redis::Client,
        new_user: NewUser,
    ) -> Result<Self, Error> {
        let user = store.upsert_user(new_user).await?;

        if cache_pool.get_cache_key::<User>(user.uuid.to_string()).await.is_ok() {
            cache_pool.del_cache_key(user.uuid.to_string()).await?
        }

        Ok(user)
    }

    pub async fn search(
        store: &dyn Store,
        searcher: Uuid,
        query: &str,
    ) -> Result<Vec<Self>, Error> {
        let query = query.trim();

        if query.chars().count() < MIN_SEARCH_LENGTH {
            return Err(Error::BadRequest(format!(
                "Search query must be at least {MIN_SEARCH_LENGTH} characters"
            )));
        }

        store.search_users(query, searcher, SEARCH_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn search_matches_name_or_email_and_skips_searcher() {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice Smith", "alice@example.com").await;
        let bob = store.add_user("Bob", "bob@smithmail.com").await;
        let carol = store.add_user("Carol", "carol@example.com").await;

        let found = User::search(&store, alice, "SMITH").await.unwrap();
        let uuids: Vec<Uuid> = found.iter().map(|u| u.uuid).collect();
        assert_eq!(uuids, vec![bob]);

        let found = User::search(&store, bob, "example").await.unwrap();
        let uuids: Vec<Uuid> = found.iter().map(|u| u.uuid).collect();
        assert_eq!(uuids, vec![alice, carol]);
    }

    #[tokio::test]
    async fn short_queries_are_rejected() {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice", "alice@example.com").await;

        assert!(matches!(
            User::search(&store, alice, " al ").await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn upsert_keeps_uuid_for_same_subject() {
        let store = MemoryStore::default();

        let first = store
            .upsert_user(NewUser::new(
                "google|1".to_string(),
                Some("Alice".to_string()),
                "alice@example.com".to_string(),
                None,
            ))
            .await
            .unwrap();

        let second = store
            .upsert_user(NewUser::new(
                "google|1".to_string(),
                Some("Alice B".to_string()),
                "alice@example.com".to_string(),
                Some("https://img.example.com/a.png".to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(first.uuid, second.uuid);
        assert_eq!(second.name.as_deref(), Some("Alice B"));
        assert_eq!(store.fetch_user(first.uuid).await.unwrap(), second);
    }

    #[tokio::test]
    async fn email_owned_by_another_subject_conflicts() {
        let store = MemoryStore::default();
        store.add_user("Alice", "alice@example.com").await;

        let result = store
            .upsert_user(NewUser::new(
                "google|other".to_string(),
                None,
                "alice@example.com".to_string(),
                None,
            ))
            .await;

        assert!(matches!(result, Err(Error::Conflict(_))));
    }
}
