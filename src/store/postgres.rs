use async_trait::async_trait;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgTextExpressionMethods, QueryDsl,
    SelectableHelper, delete, insert_into,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
    upsert::excluded,
};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
    pooled_connection::{
        AsyncDieselConnectionManager,
        deadpool::{Object, Pool},
    },
    scoped_futures::ScopedFutureExt,
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::info;
use uuid::Uuid;

use crate::{
    config::Database,
    error::Error,
    objects::{
        FriendPair, FriendRequest, FriendRequestBuilder, Friendship, Message, NewUser,
        RequestStatus, Trip, TripBuilder, TripParticipant, User,
    },
    schema::{friend_requests, friendships, messages, trip_participants, trips, users},
};

use super::Store;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type Conn = Object<AsyncPgConnection>;

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn connect(database: &Database) -> Result<Self, Error> {
        Self::connect_url(database.url())
    }

    pub fn connect_url(database_url: String) -> Result<Self, Error> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let pool = Pool::builder(manager).build()?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(database: &Database) -> Result<(), Error> {
        Self::run_migrations_url(database.url()).await
    }

    /// Applies pending migrations over a blocking connection
    pub async fn run_migrations_url(database_url: String) -> Result<(), Error> {
        tokio::task::spawn_blocking(move || {
            use diesel::prelude::Connection;
            use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;

            let mut conn =
                <AsyncConnectionWrapper<AsyncPgConnection> as Connection>::establish(&database_url)?;

            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| Error::MigrationError(e.to_string()))?;

            info!("applied {} migrations", applied.len());

            Ok::<_, Error>(())
        })
        .await?
    }

    async fn conn(&self) -> Result<Conn, Error> {
        Ok(self.pool.get().await?)
    }
}

fn conflict_on_unique(message: &'static str) -> impl Fn(DieselError) -> Error {
    move |error| match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Error::Conflict(message.to_string())
        }
        error => Error::from(error),
    }
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Store for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn upsert_user(&self, new_user: NewUser) -> Result<User, Error> {
        let mut conn = self.conn().await?;

        use users::dsl;
        let user = insert_into(users::table)
            .values(&new_user)
            .on_conflict(dsl::subject)
            .do_update()
            .set((
                dsl::name.eq(excluded(dsl::name)),
                dsl::email.eq(excluded(dsl::email)),
                dsl::image.eq(excluded(dsl::image)),
            ))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(conflict_on_unique("Email is already in use"))?;

        Ok(user)
    }

    async fn fetch_user(&self, user_uuid: Uuid) -> Result<User, Error> {
        let mut conn = self.conn().await?;

        use users::dsl;
        dsl::users
            .filter(dsl::uuid.eq(user_uuid))
            .select(User::as_select())
            .get_result(&mut conn)
            .await
            .map_err(|error| match error {
                DieselError::NotFound => Error::NotFound("User not found".to_string()),
                error => Error::from(error),
            })
    }

    async fn fetch_users(&self, user_uuids: &[Uuid]) -> Result<Vec<User>, Error> {
        if user_uuids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn().await?;

        use users::dsl;
        let users: Vec<User> = dsl::users
            .filter(dsl::uuid.eq_any(user_uuids.to_vec()))
            .select(User::as_select())
            .load(&mut conn)
            .await?;

        Ok(users)
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<User>, Error> {
        let mut conn = self.conn().await?;

        let pattern = format!("%{}%", escape_like(query));

        use users::dsl;
        let users: Vec<User> = dsl::users
            .filter(dsl::uuid.ne(exclude))
            .filter(
                dsl::email
                    .ilike(pattern.clone())
                    .or(dsl::name.ilike(pattern)),
            )
            .order(dsl::name.asc())
            .limit(limit)
            .select(User::as_select())
            .load(&mut conn)
            .await?;

        Ok(users)
    }

    async fn fetch_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error> {
        let mut conn = self.conn().await?;

        use friend_requests::dsl;
        let request: Option<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::uuid.eq(request_uuid))
            .select(FriendRequestBuilder::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        request.map(|r| r.build()).transpose()
    }

    async fn fetch_request_between(
        &self,
        sender: Uuid,
        receiver: Uuid,
    ) -> Result<Option<FriendRequest>, Error> {
        let mut conn = self.conn().await?;

        use friend_requests::dsl;
        let request: Option<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::sender.eq(sender))
            .filter(dsl::receiver.eq(receiver))
            .select(FriendRequestBuilder::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        request.map(|r| r.build()).transpose()
    }

    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        insert_into(friend_requests::table)
            .values(request.builder())
            .execute(&mut conn)
            .await
            .map_err(conflict_on_unique("Friend request already exists"))?;

        Ok(())
    }

    async fn delete_request(&self, request_uuid: Uuid) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        use friend_requests::dsl;
        delete(friend_requests::table)
            .filter(dsl::uuid.eq(request_uuid))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn accept_request(&self, request_uuid: Uuid, friendship: Friendship) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, Error, _>(|conn| {
            async move {
                use friend_requests::dsl;
                let request: FriendRequest = dsl::friend_requests
                    .filter(dsl::uuid.eq(request_uuid))
                    .select(FriendRequestBuilder::as_select())
                    .for_update()
                    .get_result(conn)
                    .await
                    .optional()?
                    .ok_or(Error::NotFound("Friend request not found".to_string()))?
                    .build()?;

                if request.status != RequestStatus::Pending {
                    return Err(Error::Conflict(
                        "Friend request was already accepted".to_string(),
                    ));
                }

                update(friend_requests::table)
                    .filter(dsl::uuid.eq(request_uuid))
                    .set(dsl::status.eq(RequestStatus::Accepted as i16))
                    .execute(conn)
                    .await?;

                // The reverse request is settled by this friendship
                delete(friend_requests::table)
                    .filter(dsl::sender.eq(request.receiver))
                    .filter(dsl::receiver.eq(request.sender))
                    .filter(dsl::status.eq(RequestStatus::Pending as i16))
                    .execute(conn)
                    .await?;

                insert_into(friendships::table)
                    .values(friendship)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn fetch_friendship(&self, pair: FriendPair) -> Result<Option<Friendship>, Error> {
        let mut conn = self.conn().await?;

        use friendships::dsl;
        let friendship = dsl::friendships
            .filter(dsl::user_a.eq(pair.low()))
            .filter(dsl::user_b.eq(pair.high()))
            .select(Friendship::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(friendship)
    }

    async fn delete_friendship(&self, pair: FriendPair) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, Error, _>(|conn| {
            async move {
                delete(friendships::table)
                    .filter(friendships::user_a.eq(pair.low()))
                    .filter(friendships::user_b.eq(pair.high()))
                    .execute(conn)
                    .await?;

                use friend_requests::dsl;
                delete(friend_requests::table)
                    .filter(
                        dsl::sender
                            .eq(pair.low())
                            .and(dsl::receiver.eq(pair.high()))
                            .or(dsl::sender.eq(pair.high()).and(dsl::receiver.eq(pair.low()))),
                    )
                    .execute(conn)
                    .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn fetch_friendships(&self, user_uuid: Uuid) -> Result<Vec<Friendship>, Error> {
        let mut conn = self.conn().await?;

        use friendships::dsl;
        let friendships: Vec<Friendship> = dsl::friendships
            .filter(dsl::user_a.eq(user_uuid).or(dsl::user_b.eq(user_uuid)))
            .order(dsl::accepted_at.asc())
            .select(Friendship::as_select())
            .load(&mut conn)
            .await?;

        Ok(friendships)
    }

    async fn fetch_pending_for_receiver(&self, receiver: Uuid) -> Result<Vec<FriendRequest>, Error> {
        let mut conn = self.conn().await?;

        use friend_requests::dsl;
        let requests: Vec<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::receiver.eq(receiver))
            .filter(dsl::status.eq(RequestStatus::Pending as i16))
            .order((dsl::requested_at.asc(), dsl::uuid.asc()))
            .select(FriendRequestBuilder::as_select())
            .load(&mut conn)
            .await?;

        requests.into_iter().map(|r| r.build()).collect()
    }

    async fn fetch_pending_from_sender(&self, sender: Uuid) -> Result<Vec<FriendRequest>, Error> {
        let mut conn = self.conn().await?;

        use friend_requests::dsl;
        let requests: Vec<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::sender.eq(sender))
            .filter(dsl::status.eq(RequestStatus::Pending as i16))
            .order((dsl::requested_at.asc(), dsl::uuid.asc()))
            .select(FriendRequestBuilder::as_select())
            .load(&mut conn)
            .await?;

        requests.into_iter().map(|r| r.build()).collect()
    }

    async fn insert_message(&self, message: &Message) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        insert_into(messages::table)
            .values(message)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn fetch_conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>, Error> {
        let mut conn = self.conn().await?;

        use messages::dsl;
        let messages: Vec<Message> = dsl::messages
            .filter(
                dsl::sender
                    .eq(a)
                    .and(dsl::receiver.eq(b))
                    .or(dsl::sender.eq(b).and(dsl::receiver.eq(a))),
            )
            .order((dsl::created_at.asc(), dsl::uuid.asc()))
            .select(Message::as_select())
            .load(&mut conn)
            .await?;

        Ok(messages)
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut conn = self.conn().await?;

        let builder = trip.builder();
        let participants = trip.participant_rows();

        conn.transaction::<_, Error, _>(|conn| {
            async move {
                insert_into(trips::table)
                    .values(&builder)
                    .execute(conn)
                    .await?;

                if !participants.is_empty() {
                    insert_into(trip_participants::table)
                        .values(&participants)
                        .execute(conn)
                        .await
                        .map_err(|error| match error {
                            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                                Error::NotFound("Participant not found".to_string())
                            }
                            error => Error::from(error),
                        })?;
                }

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn fetch_trips_for(&self, user_uuid: Uuid) -> Result<Vec<Trip>, Error> {
        let mut conn = self.conn().await?;

        let shared = trip_participants::table
            .filter(trip_participants::user_uuid.eq(user_uuid))
            .select(trip_participants::trip_uuid);

        use trips::dsl;
        let builders: Vec<TripBuilder> = dsl::trips
            .filter(dsl::creator.eq(user_uuid).or(dsl::uuid.eq_any(shared)))
            .order((dsl::created_at.desc(), dsl::uuid.desc()))
            .select(TripBuilder::as_select())
            .load(&mut conn)
            .await?;

        let trip_uuids: Vec<Uuid> = builders.iter().map(|t| t.uuid).collect();

        let participants: Vec<TripParticipant> = trip_participants::table
            .filter(trip_participants::trip_uuid.eq_any(trip_uuids))
            .select(TripParticipant::as_select())
            .load(&mut conn)
            .await?;

        builders
            .into_iter()
            .map(|builder| {
                let members = participants
                    .iter()
                    .filter(|p| p.trip_uuid == builder.uuid)
                    .map(|p| p.user_uuid)
                    .collect();

                builder.build(members)
            })
            .collect()
    }
}
