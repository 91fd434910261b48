use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::Error,
    objects::{
        FriendPair, FriendRequest, Friendship, Message, NewUser, RequestStatus, Trip, User,
    },
};

use super::Store;

#[derive(Default)]
struct Tables {
    /// Keyed by identity provider subject
    users: HashMap<String, User>,
    friend_requests: HashMap<Uuid, FriendRequest>,
    friendships: HashMap<FriendPair, Friendship>,
    messages: Vec<Message>,
    trips: Vec<Trip>,
}

impl Tables {
    fn user(&self, user_uuid: Uuid) -> Option<&User> {
        self.users.values().find(|u| u.uuid == user_uuid)
    }
}

/// Keeps everything in process memory, nothing survives a restart
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn upsert_user(&self, new_user: NewUser) -> Result<User, Error> {
        let mut tables = self.tables.lock().await;

        if tables
            .users
            .iter()
            .any(|(subject, u)| u.email == new_user.email && *subject != new_user.subject)
        {
            return Err(Error::Conflict("Email is already in use".to_string()));
        }

        let user = match tables.users.get(&new_user.subject) {
            Some(existing) => User {
                uuid: existing.uuid,
                ..new_user.build()
            },
            None => new_user.build(),
        };

        tables.users.insert(new_user.subject, user.clone());

        Ok(user)
    }

    async fn fetch_user(&self, user_uuid: Uuid) -> Result<User, Error> {
        self.tables
            .lock()
            .await
            .user(user_uuid)
            .cloned()
            .ok_or(Error::NotFound("User not found".to_string()))
    }

    async fn fetch_users(&self, user_uuids: &[Uuid]) -> Result<Vec<User>, Error> {
        let tables = self.tables.lock().await;

        Ok(tables
            .users
            .values()
            .filter(|u| user_uuids.contains(&u.uuid))
            .cloned()
            .collect())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<User>, Error> {
        let tables = self.tables.lock().await;
        let query = query.to_lowercase();

        let mut found: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.uuid != exclude)
            .filter(|u| {
                u.email.to_lowercase().contains(&query)
                    || u.name
                        .as_ref()
                        .is_some_and(|n| n.to_lowercase().contains(&query))
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| (a.name.is_none(), &a.name).cmp(&(b.name.is_none(), &b.name)));
        found.truncate(limit.max(0) as usize);

        Ok(found)
    }

    async fn fetch_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error> {
        Ok(self
            .tables
            .lock()
            .await
            .friend_requests
            .get(&request_uuid)
            .cloned())
    }

    async fn fetch_request_between(
        &self,
        sender: Uuid,
        receiver: Uuid,
    ) -> Result<Option<FriendRequest>, Error> {
        Ok(self
            .tables
            .lock()
            .await
            .friend_requests
            .values()
            .find(|r| r.sender == sender && r.receiver == receiver)
            .cloned())
    }

    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;

        if tables
            .friend_requests
            .values()
            .any(|r| r.sender == request.sender && r.receiver == request.receiver)
        {
            return Err(Error::Conflict("Friend request already exists".to_string()));
        }

        tables
            .friend_requests
            .insert(request.uuid, request.clone());

        Ok(())
    }

    async fn delete_request(&self, request_uuid: Uuid) -> Result<(), Error> {
        self.tables
            .lock()
            .await
            .friend_requests
            .remove(&request_uuid);

        Ok(())
    }

    async fn accept_request(&self, request_uuid: Uuid, friendship: Friendship) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;

        let (sender, receiver) = match tables.friend_requests.get_mut(&request_uuid) {
            Some(request) if request.status == RequestStatus::Pending => {
                request.status = RequestStatus::Accepted;
                (request.sender, request.receiver)
            }
            Some(_) => {
                return Err(Error::Conflict(
                    "Friend request was already accepted".to_string(),
                ));
            }
            None => return Err(Error::NotFound("Friend request not found".to_string())),
        };

        // The reverse request is settled by this friendship
        tables.friend_requests.retain(|_, r| {
            !(r.status == RequestStatus::Pending && r.sender == receiver && r.receiver == sender)
        });

        tables
            .friendships
            .entry(friendship.pair())
            .or_insert(friendship);

        Ok(())
    }

    async fn fetch_friendship(&self, pair: FriendPair) -> Result<Option<Friendship>, Error> {
        Ok(self.tables.lock().await.friendships.get(&pair).copied())
    }

    async fn delete_friendship(&self, pair: FriendPair) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;

        tables.friendships.remove(&pair);
        tables
            .friend_requests
            .retain(|_, r| FriendPair::new(r.sender, r.receiver) != pair);

        Ok(())
    }

    async fn fetch_friendships(&self, user_uuid: Uuid) -> Result<Vec<Friendship>, Error> {
        let tables = self.tables.lock().await;

        let mut friendships: Vec<Friendship> = tables
            .friendships
            .values()
            .filter(|f| f.user_a == user_uuid || f.user_b == user_uuid)
            .copied()
            .collect();

        friendships.sort_by_key(|f| f.accepted_at);

        Ok(friendships)
    }

    async fn fetch_pending_for_receiver(&self, receiver: Uuid) -> Result<Vec<FriendRequest>, Error> {
        let tables = self.tables.lock().await;

        Ok(pending(&tables, |r| r.receiver == receiver))
    }

    async fn fetch_pending_from_sender(&self, sender: Uuid) -> Result<Vec<FriendRequest>, Error> {
        let tables = self.tables.lock().await;

        Ok(pending(&tables, |r| r.sender == sender))
    }

    async fn insert_message(&self, message: &Message) -> Result<(), Error> {
        self.tables.lock().await.messages.push(message.clone());

        Ok(())
    }

    async fn fetch_conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, Error> {
        let tables = self.tables.lock().await;

        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| {
                (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a)
            })
            .cloned()
            .collect();

        messages.sort_by_key(|m| (m.created_at, m.uuid));

        Ok(messages)
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;

        if let Some(missing) = trip
            .participants
            .iter()
            .find(|p| tables.user(**p).is_none())
        {
            return Err(Error::NotFound(format!("User {missing} not found")));
        }

        tables.trips.push(trip.clone());

        Ok(())
    }

    async fn fetch_trips_for(&self, user_uuid: Uuid) -> Result<Vec<Trip>, Error> {
        let tables = self.tables.lock().await;

        let mut trips: Vec<Trip> = tables
            .trips
            .iter()
            .filter(|t| t.creator == user_uuid || t.participants.contains(&user_uuid))
            .cloned()
            .collect();

        trips.sort_by(|a, b| (b.created_at, b.uuid).cmp(&(a.created_at, a.uuid)));

        Ok(trips)
    }
}

fn pending(tables: &Tables, filter: impl Fn(&FriendRequest) -> bool) -> Vec<FriendRequest> {
    let mut requests: Vec<FriendRequest> = tables
        .friend_requests
        .values()
        .filter(|r| r.status == RequestStatus::Pending && filter(r))
        .cloned()
        .collect();

    requests.sort_by_key(|r| (r.requested_at, r.uuid));

    requests
}

#[cfg(test)]
impl MemoryStore {
    /// Signs a user up as if they came through the identity provider
    pub async fn add_user(&self, name: &str, email: &str) -> Uuid {
        let new_user = NewUser::new(
            format!("test|{email}"),
            Some(name.to_string()),
            email.to_string(),
            None,
        );

        self.upsert_user(new_user)
            .await
            .map(|u| u.uuid)
            .expect("test user is unique")
    }
}
