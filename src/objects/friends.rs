use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable, result::Error as DieselError};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error,
    schema::{friend_requests, friendships},
    store::Store,
};

use super::{Me, User};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i16)]
pub enum RequestStatus {
    Pending = 0,
    Accepted = 1,
}

impl TryFrom<i16> for RequestStatus {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Accepted),
            other => Err(Error::SqlError(DieselError::DeserializationError(
                format!("unknown friend request status {other}").into(),
            ))),
        }
    }
}

/// Unordered pair of users, `low` is always the smaller uuid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FriendPair {
    low: Uuid,
    high: Uuid,
}

impl FriendPair {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }
}

/// The single row backing a friendship in both directions
#[derive(Serialize, Queryable, Selectable, Insertable, Clone, Copy, Debug, PartialEq)]
#[diesel(table_name = friendships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub accepted_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(pair: FriendPair, accepted_at: DateTime<Utc>) -> Self {
        Self {
            user_a: pair.low(),
            user_b: pair.high(),
            accepted_at,
        }
    }

    pub fn pair(&self) -> FriendPair {
        FriendPair::new(self.user_a, self.user_b)
    }

    /// The counterparty of `user_uuid` in this friendship
    pub fn other(&self, user_uuid: Uuid) -> Uuid {
        if self.user_a == user_uuid {
            self.user_b
        } else {
            self.user_a
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = friend_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendRequestBuilder {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub status: i16,
    pub requested_at: DateTime<Utc>,
}

impl FriendRequestBuilder {
    pub fn build(self) -> Result<FriendRequest, Error> {
        Ok(FriendRequest {
            uuid: self.uuid,
            sender: self.sender,
            receiver: self.receiver,
            status: self.status.try_into()?,
            requested_at: self.requested_at,
        })
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn builder(&self) -> FriendRequestBuilder {
        FriendRequestBuilder {
            uuid: self.uuid,
            sender: self.sender,
            receiver: self.receiver,
            status: self.status as i16,
            requested_at: self.requested_at,
        }
    }
}

/// A friend request together with the user on the other end of it
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestWithUser {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub user: User,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    #[serde(flatten)]
    pub user: User,
    pub friends_since: DateTime<Utc>,
}

impl Me {
    pub async fn friends_with(
        &self,
        store: &dyn Store,
        user_uuid: Uuid,
    ) -> Result<Option<Friendship>, Error> {
        store
            .fetch_friendship(FriendPair::new(self.uuid(), user_uuid))
            .await
    }

    pub async fn send_friend_request(
        &self,
        store: &dyn Store,
        receiver: Uuid,
    ) -> Result<FriendRequest, Error> {
        if receiver == self.uuid() {
            return Err(Error::BadRequest(
                "Can't send a friend request to yourself".to_string(),
            ));
        }

        store.fetch_user(receiver).await?;

        if store
            .fetch_request_between(self.uuid(), receiver)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("Friend request already exists".to_string()));
        }

        if self.friends_with(store, receiver).await?.is_some() {
            return Err(Error::Conflict("Already friends".to_string()));
        }

        let request = FriendRequest {
            uuid: Uuid::now_v7(),
            sender: self.uuid(),
            receiver,
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
        };

        store.insert_request(&request).await?;

        debug!(
            "{} sent friend request {} to {}",
            self.uuid(),
            request.uuid,
            receiver
        );

        Ok(request)
    }

    /// Looks up a request the caller takes part in, hiding requests that belong to other users
    async fn owned_request(
        &self,
        store: &dyn Store,
        request_uuid: Uuid,
        as_receiver: bool,
    ) -> Result<FriendRequest, Error> {
        let request = store
            .fetch_request(request_uuid)
            .await?
            .filter(|r| {
                if as_receiver {
                    r.receiver == self.uuid()
                } else {
                    r.sender == self.uuid()
                }
            })
            .ok_or(Error::NotFound("Friend request not found".to_string()))?;

        if request.status == RequestStatus::Accepted {
            return Err(Error::Conflict(
                "Friend request was already accepted".to_string(),
            ));
        }

        Ok(request)
    }

    pub async fn accept_friend_request(
        &self,
        store: &dyn Store,
        request_uuid: Uuid,
    ) -> Result<Friendship, Error> {
        let request = self.owned_request(store, request_uuid, true).await?;

        let friendship = Friendship::new(
            FriendPair::new(request.sender, request.receiver),
            Utc::now(),
        );

        store.accept_request(request.uuid, friendship).await?;

        debug!("{} accepted friend request {}", self.uuid(), request.uuid);

        Ok(friendship)
    }

    pub async fn cancel_friend_request(
        &self,
        store: &dyn Store,
        request_uuid: Uuid,
    ) -> Result<(), Error> {
        let request = self.owned_request(store, request_uuid, false).await?;

        store.delete_request(request.uuid).await
    }

    pub async fn decline_friend_request(
        &self,
        store: &dyn Store,
        request_uuid: Uuid,
    ) -> Result<(), Error> {
        let request = self.owned_request(store, request_uuid, true).await?;

        store.delete_request(request.uuid).await
    }

    pub async fn remove_friend(&self, store: &dyn Store, user_uuid: Uuid) -> Result<(), Error> {
        store
            .delete_friendship(FriendPair::new(self.uuid(), user_uuid))
            .await
    }

    pub async fn get_friends(&self, store: &dyn Store) -> Result<Vec<Friend>, Error> {
        let friendships = store.fetch_friendships(self.uuid()).await?;

        let uuids: Vec<Uuid> = friendships.iter().map(|f| f.other(self.uuid())).collect();

        let users = store.fetch_users(&uuids).await?;

        let friends = friendships
            .iter()
            .filter_map(|friendship| {
                let other = friendship.other(self.uuid());
                users.iter().find(|u| u.uuid == other).map(|user| Friend {
                    user: user.clone(),
                    friends_since: friendship.accepted_at,
                })
            })
            .collect();

        Ok(friends)
    }

    pub async fn get_pending_requests(
        &self,
        store: &dyn Store,
    ) -> Result<Vec<FriendRequestWithUser>, Error> {
        let requests = store.fetch_pending_for_receiver(self.uuid()).await?;

        with_users(store, requests, |r| r.sender).await
    }

    pub async fn get_outgoing_requests(
        &self,
        store: &dyn Store,
    ) -> Result<Vec<FriendRequestWithUser>, Error> {
        let requests = store.fetch_pending_from_sender(self.uuid()).await?;

        with_users(store, requests, |r| r.receiver).await
    }
}

async fn with_users(
    store: &dyn Store,
    requests: Vec<FriendRequest>,
    counterparty: fn(&FriendRequest) -> Uuid,
) -> Result<Vec<FriendRequestWithUser>, Error> {
    let uuids: Vec<Uuid> = requests.iter().map(counterparty).collect();

    let users = store.fetch_users(&uuids).await?;

    Ok(requests
        .into_iter()
        .filter_map(|request| {
            let other = counterparty(&request);
            users
                .iter()
                .find(|u| u.uuid == other)
                .map(|user| FriendRequestWithUser {
                    request,
                    user: user.clone(),
                })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, Me, Me, Me) {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice", "alice@example.com").await;
        let bob = store.add_user("Bob", "bob@example.com").await;
        let carol = store.add_user("Carol", "carol@example.com").await;

        let alice = Me::get(&store, alice).await.unwrap();
        let bob = Me::get(&store, bob).await.unwrap();
        let carol = Me::get(&store, carol).await.unwrap();

        (store, alice, bob, carol)
    }

    fn friend_uuids(friends: &[Friend]) -> Vec<Uuid> {
        friends.iter().map(|f| f.user.uuid).collect()
    }

    #[test]
    fn pair_is_order_independent() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        assert_eq!(FriendPair::new(a, b), FriendPair::new(b, a));
        assert_eq!(FriendPair::new(b, a).low(), a);
        assert_eq!(FriendPair::new(a, b).high(), b);
    }

    #[test]
    fn friendship_other_side() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let friendship = Friendship::new(FriendPair::new(b, a), Utc::now());

        assert_eq!(friendship.other(a), b);
        assert_eq!(friendship.other(b), a);
    }

    #[test]
    fn request_status_from_column() {
        assert_eq!(RequestStatus::try_from(0).unwrap(), RequestStatus::Pending);
        assert_eq!(RequestStatus::try_from(1).unwrap(), RequestStatus::Accepted);
        assert!(RequestStatus::try_from(7).is_err());
    }

    #[tokio::test]
    async fn accept_makes_friendship_visible_from_both_sides() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let pending = bob.get_pending_requests(&store).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.uuid, request.uuid);
        assert_eq!(pending[0].user.uuid, alice.uuid());

        bob.accept_friend_request(&store, request.uuid).await.unwrap();

        assert_eq!(
            friend_uuids(&alice.get_friends(&store).await.unwrap()),
            vec![bob.uuid()]
        );
        assert_eq!(
            friend_uuids(&bob.get_friends(&store).await.unwrap()),
            vec![alice.uuid()]
        );
        assert!(bob.get_pending_requests(&store).await.unwrap().is_empty());

        let stored = store.fetch_request(request.uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Accepted);
    }

    #[tokio::test]
    async fn duplicate_request_conflicts() {
        let (store, alice, bob, _) = setup().await;

        alice.send_friend_request(&store, bob.uuid()).await.unwrap();

        assert!(matches!(
            alice.send_friend_request(&store, bob.uuid()).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn request_to_existing_friend_conflicts() {
        let (store, alice, bob, _) = setup().await;

        let request = bob.send_friend_request(&store, alice.uuid()).await.unwrap();
        alice.accept_friend_request(&store, request.uuid).await.unwrap();

        assert!(matches!(
            alice.send_friend_request(&store, bob.uuid()).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn request_to_self_or_unknown_user_fails() {
        let (store, alice, _, _) = setup().await;

        assert!(matches!(
            alice.send_friend_request(&store, alice.uuid()).await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            alice.send_friend_request(&store, Uuid::now_v7()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_receiver_can_accept() {
        let (store, alice, bob, carol) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();

        assert!(matches!(
            alice.accept_friend_request(&store, request.uuid).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            carol.accept_friend_request(&store, request.uuid).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            bob.accept_friend_request(&store, Uuid::now_v7()).await,
            Err(Error::NotFound(_))
        ));
        assert!(alice.get_friends(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepting_twice_conflicts() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, request.uuid).await.unwrap();

        assert!(matches!(
            bob.accept_friend_request(&store, request.uuid).await,
            Err(Error::Conflict(_))
        ));
        assert_eq!(bob.get_friends(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_leaves_no_trace() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        assert_eq!(alice.get_outgoing_requests(&store).await.unwrap().len(), 1);

        alice.cancel_friend_request(&store, request.uuid).await.unwrap();

        assert!(bob.get_pending_requests(&store).await.unwrap().is_empty());
        assert!(alice.get_outgoing_requests(&store).await.unwrap().is_empty());
        assert!(store.fetch_request(request.uuid).await.unwrap().is_none());

        alice.send_friend_request(&store, bob.uuid()).await.unwrap();
    }

    #[tokio::test]
    async fn only_sender_can_cancel() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();

        assert!(matches!(
            bob.cancel_friend_request(&store, request.uuid).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(bob.get_pending_requests(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn decline_deletes_request() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();

        assert!(matches!(
            alice.decline_friend_request(&store, request.uuid).await,
            Err(Error::NotFound(_))
        ));

        bob.decline_friend_request(&store, request.uuid).await.unwrap();

        assert!(bob.get_pending_requests(&store).await.unwrap().is_empty());
        assert!(alice.get_friends(&store).await.unwrap().is_empty());
        alice.send_friend_request(&store, bob.uuid()).await.unwrap();
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, request.uuid).await.unwrap();

        alice.remove_friend(&store, bob.uuid()).await.unwrap();
        alice.remove_friend(&store, bob.uuid()).await.unwrap();
        bob.remove_friend(&store, alice.uuid()).await.unwrap();

        assert!(alice.get_friends(&store).await.unwrap().is_empty());
        assert!(bob.get_friends(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removed_friends_can_request_again() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, request.uuid).await.unwrap();
        bob.remove_friend(&store, alice.uuid()).await.unwrap();

        alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.send_friend_request(&store, alice.uuid()).await.unwrap();
    }

    #[tokio::test]
    async fn mutual_requests_yield_one_friend_entry() {
        let (store, alice, bob, _) = setup().await;

        let from_alice = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        let from_bob = bob.send_friend_request(&store, alice.uuid()).await.unwrap();

        bob.accept_friend_request(&store, from_alice.uuid).await.unwrap();

        assert!(alice.get_pending_requests(&store).await.unwrap().is_empty());
        assert!(bob.get_pending_requests(&store).await.unwrap().is_empty());
        assert!(alice.get_outgoing_requests(&store).await.unwrap().is_empty());
        assert!(bob.get_outgoing_requests(&store).await.unwrap().is_empty());
        assert!(matches!(
            alice.accept_friend_request(&store, from_bob.uuid).await,
            Err(Error::NotFound(_))
        ));

        assert_eq!(
            friend_uuids(&alice.get_friends(&store).await.unwrap()),
            vec![bob.uuid()]
        );
        assert_eq!(
            friend_uuids(&bob.get_friends(&store).await.unwrap()),
            vec![alice.uuid()]
        );
    }

    #[tokio::test]
    async fn removal_is_not_undone_by_reverse_request() {
        let (store, alice, bob, _) = setup().await;

        let from_alice = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        let from_bob = bob.send_friend_request(&store, alice.uuid()).await.unwrap();

        bob.accept_friend_request(&store, from_alice.uuid).await.unwrap();
        bob.remove_friend(&store, alice.uuid()).await.unwrap();

        assert!(alice.accept_friend_request(&store, from_bob.uuid).await.is_err());
        assert!(alice.get_friends(&store).await.unwrap().is_empty());
        assert!(bob.get_friends(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accepting_onto_existing_friendship_keeps_one_edge() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, request.uuid).await.unwrap();
        let original = alice.friends_with(&store, bob.uuid()).await.unwrap().unwrap();

        // A request that predates the friendship, inserted below the service checks
        let stale = FriendRequest {
            uuid: Uuid::now_v7(),
            sender: alice.uuid(),
            receiver: bob.uuid(),
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
        };
        store.delete_request(request.uuid).await.unwrap();
        store.insert_request(&stale).await.unwrap();

        bob.accept_friend_request(&store, stale.uuid).await.unwrap();

        assert_eq!(
            alice.friends_with(&store, bob.uuid()).await.unwrap(),
            Some(original)
        );
        assert_eq!(bob.get_friends(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removal_clears_every_request_between_the_pair() {
        let (store, alice, bob, _) = setup().await;

        let request = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, request.uuid).await.unwrap();
        alice.remove_friend(&store, bob.uuid()).await.unwrap();

        assert!(store.fetch_request(request.uuid).await.unwrap().is_none());
        assert!(
            store
                .fetch_request_between(alice.uuid(), bob.uuid())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn friends_list_spans_both_directions() {
        let (store, alice, bob, carol) = setup().await;

        let to_bob = alice.send_friend_request(&store, bob.uuid()).await.unwrap();
        bob.accept_friend_request(&store, to_bob.uuid).await.unwrap();

        let from_carol = carol.send_friend_request(&store, alice.uuid()).await.unwrap();
        alice.accept_friend_request(&store, from_carol.uuid).await.unwrap();

        let mut friends = friend_uuids(&alice.get_friends(&store).await.unwrap());
        friends.sort();
        let mut expected = vec![bob.uuid(), carol.uuid()];
        expected.sort();
        assert_eq!(friends, expected);

        assert!(alice.friends_with(&store, carol.uuid()).await.unwrap().is_some());
        assert!(bob.friends_with(&store, carol.uuid()).await.unwrap().is_none());
    }
}
