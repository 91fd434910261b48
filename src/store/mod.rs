//! Persistence behind every directory, friend graph, message and trip operation

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Error,
    objects::{FriendPair, FriendRequest, Friendship, Message, NewUser, Trip, User},
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Backing store for the service
///
/// Methods that touch more than one row apply all of their writes or none of them.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Inserts a user or refreshes the profile of the one with the same subject
    async fn upsert_user(&self, new_user: NewUser) -> Result<User, Error>;

    async fn fetch_user(&self, user_uuid: Uuid) -> Result<User, Error>;

    /// Users with the given uuids, unknown uuids are skipped
    async fn fetch_users(&self, user_uuids: &[Uuid]) -> Result<Vec<User>, Error>;

    /// Case-insensitive match on name or email, ordered by name
    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<User>, Error>;

    async fn fetch_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error>;

    async fn fetch_request_between(
        &self,
        sender: Uuid,
        receiver: Uuid,
    ) -> Result<Option<FriendRequest>, Error>;

    /// Fails with `Conflict` if a request for the same sender and receiver exists
    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error>;

    async fn delete_request(&self, request_uuid: Uuid) -> Result<(), Error>;

    /// Marks a pending request accepted, drops a pending request in the
    /// opposite direction and stores the friendship
    ///
    /// Fails with `NotFound` if the request is gone and `Conflict` if it is no
    /// longer pending. An existing friendship for the pair is kept as is.
    async fn accept_request(&self, request_uuid: Uuid, friendship: Friendship) -> Result<(), Error>;

    async fn fetch_friendship(&self, pair: FriendPair) -> Result<Option<Friendship>, Error>;

    /// Removes the friendship and every request between the two users
    async fn delete_friendship(&self, pair: FriendPair) -> Result<(), Error>;

    /// Every friendship `user_uuid` is part of, oldest first
    async fn fetch_friendships(&self, user_uuid: Uuid) -> Result<Vec<Friendship>, Error>;

    async fn fetch_pending_for_receiver(&self, receiver: Uuid) -> Result<Vec<FriendRequest>, Error>;

    async fn fetch_pending_from_sender(&self, sender: Uuid) -> Result<Vec<FriendRequest>, Error>;

    async fn insert_message(&self, message: &Message) -> Result<(), Error>;

    /// Messages between the two users in either direction, oldest first
    async fn fetch_conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, Error>;

    /// Stores the trip together with its participants
    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error>;

    async fn fetch_trips_for(&self, user_uuid: Uuid) -> Result<Vec<Trip>, Error>;
}
