use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Insertable, Queryable, Selectable, result::Error as DieselError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error,
    schema::{trip_participants, trips},
    store::Store,
};

use super::Me;

const MAX_NAME_LENGTH: usize = 100;
const MAX_DESTINATION_LENGTH: usize = 200;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TripStatus {
    #[default]
    Draft = 0,
    Active = 1,
    Completed = 2,
}

impl TryFrom<i16> for TripStatus {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::Draft),
            1 => Ok(Self::Active),
            2 => Ok(Self::Completed),
            other => Err(Error::SqlError(DieselError::DeserializationError(
                format!("unknown trip status {other}").into(),
            ))),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = trips)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TripBuilder {
    pub uuid: Uuid,
    pub creator: Uuid,
    pub name: String,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
}

impl TripBuilder {
    pub fn build(self, participants: Vec<Uuid>) -> Result<Trip, Error> {
        Ok(Trip {
            uuid: self.uuid,
            creator: self.creator,
            name: self.name,
            destination: self.destination,
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            status: self.status.try_into()?,
            participants,
            created_at: self.created_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = trip_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TripParticipant {
    pub trip_uuid: Uuid,
    pub user_uuid: Uuid,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub uuid: Uuid,
    pub creator: Uuid,
    pub name: String,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub status: TripStatus,
    pub participants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn builder(&self) -> TripBuilder {
        TripBuilder {
            uuid: self.uuid,
            creator: self.creator,
            name: self.name.clone(),
            destination: self.destination.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            status: self.status as i16,
            created_at: self.created_at,
        }
    }

    pub fn participant_rows(&self) -> Vec<TripParticipant> {
        self.participants
            .iter()
            .map(|user_uuid| TripParticipant {
                trip_uuid: self.uuid,
                user_uuid: *user_uuid,
            })
            .collect()
    }
}

/// Trip fields as sent by the planner
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub name: String,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub participants: Vec<Uuid>,
}

impl Me {
    pub async fn create_trip(&self, store: &dyn Store, new_trip: NewTrip) -> Result<Trip, Error> {
        let name = new_trip.name.trim().to_string();

        if name.is_empty() {
            return Err(Error::BadRequest("Trip name is empty".to_string()));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::BadRequest(format!(
                "Trip name is longer than {MAX_NAME_LENGTH} characters"
            )));
        }

        if new_trip
            .destination
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESTINATION_LENGTH)
        {
            return Err(Error::BadRequest(format!(
                "Destination is longer than {MAX_DESTINATION_LENGTH} characters"
            )));
        }

        let participants: Vec<Uuid> = new_trip
            .participants
            .into_iter()
            .collect::<BTreeSet<Uuid>>()
            .into_iter()
            .collect();

        let found = store.fetch_users(&participants).await?;

        if let Some(missing) = participants
            .iter()
            .find(|p| !found.iter().any(|u| u.uuid == **p))
        {
            return Err(Error::NotFound(format!("User {missing} not found")));
        }

        let trip = Trip {
            uuid: Uuid::now_v7(),
            creator: self.uuid(),
            name,
            destination: new_trip.destination,
            start_date: new_trip.start_date,
            end_date: new_trip.end_date,
            budget: new_trip.budget,
            status: new_trip.status,
            participants,
            created_at: Utc::now(),
        };

        store.insert_trip(&trip).await?;

        Ok(trip)
    }

    /// Trips created by or shared with the caller, newest first
    pub async fn fetch_trips(&self, store: &dyn Store) -> Result<Vec<Trip>, Error> {
        store.fetch_trips_for(self.uuid()).await
    }
}
