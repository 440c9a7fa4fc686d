//! [`SqliteStore`], the SQLite implementation of [`RideStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, types::Value};
use uuid::Uuid;

use wayfare_core::{
  geo::{BoundingBox, Coordinate, FixedCoordinate},
  location::{LocationPatch, LocationReport, Role, UserLocation},
  ride::{GuardPolicy, NewRide, Ride, RidePatch, RideStatus, Transition},
  store::{RideQuery, RideStore},
  trail::LocationTrail,
  user::UserId,
};

use crate::{
  Error, Result,
  encode::{
    LOCATION_COLUMNS, RIDE_COLUMNS, RawLocation, RawRide, RawSample, decode_dt,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Widening applied to the candidate bounding box so that rounding in the
/// box computation can never exclude a driver sitting on its edge.
const BOX_MARGIN_DEG: f64 = 1e-6;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Wayfare store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_locations(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<UserLocation>> {
    let raws: Vec<RawLocation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawLocation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocation::into_location).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, usually inside a transaction.

fn select_ride(conn: &Connection, id: Uuid) -> Result<Option<Ride>> {
  let raw = conn
    .query_row(
      &format!("SELECT {RIDE_COLUMNS} FROM rides WHERE ride_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawRide::from_row,
    )
    .optional()?;
  raw.map(RawRide::into_ride).transpose()
}

fn insert_ride(conn: &Connection, ride: &Ride) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO rides ({RIDE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    ),
    rusqlite::params![
      encode_uuid(ride.ride_id),
      ride.rider_id.0,
      ride.driver_id.map(|d| d.0),
      ride.pickup_location,
      ride.dropoff_location,
      ride.status.as_str(),
      ride.current.latitude.micros(),
      ride.current.longitude.micros(),
      encode_dt(ride.created_at),
      encode_dt(ride.updated_at),
    ],
  )?;
  Ok(())
}

/// Overwrite every mutable column of `ride`.
fn write_ride(conn: &Connection, ride: &Ride) -> Result<()> {
  conn.execute(
    "UPDATE rides
     SET driver_id = ?2, pickup_location = ?3, dropoff_location = ?4,
         status = ?5, current_lat_e6 = ?6, current_lon_e6 = ?7, updated_at = ?8
     WHERE ride_id = ?1",
    rusqlite::params![
      encode_uuid(ride.ride_id),
      ride.driver_id.map(|d| d.0),
      ride.pickup_location,
      ride.dropoff_location,
      ride.status.as_str(),
      ride.current.latitude.micros(),
      ride.current.longitude.micros(),
      encode_dt(ride.updated_at),
    ],
  )?;
  Ok(())
}

/// Append one sample to a ride's trail, creating the trail on first use.
fn append_sample(
  conn: &Connection,
  ride_id: Uuid,
  position: FixedCoordinate,
  at: DateTime<Utc>,
) -> Result<()> {
  let id_str = encode_uuid(ride_id);
  let at_str = encode_dt(at);

  let trail_exists = conn
    .query_row(
      "SELECT 1 FROM trails WHERE ride_id = ?1",
      rusqlite::params![id_str],
      |_| Ok(()),
    )
    .optional()?
    .is_some();

  if trail_exists {
    conn.execute(
      "UPDATE trails SET updated_at = ?2 WHERE ride_id = ?1",
      rusqlite::params![id_str, at_str],
    )?;
  } else {
    conn.execute(
      "INSERT INTO trails (ride_id, updated_at) VALUES (?1, ?2)",
      rusqlite::params![id_str, at_str],
    )?;
  }

  conn.execute(
    "INSERT INTO trail_samples (ride_id, seq, lat_e6, lon_e6, recorded_at)
     SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2, ?3, ?4
     FROM trail_samples WHERE ride_id = ?1",
    rusqlite::params![
      id_str,
      position.latitude.micros(),
      position.longitude.micros(),
      at_str,
    ],
  )?;

  tracing::debug!(
    %ride_id,
    latitude = %position.latitude,
    longitude = %position.longitude,
    "trail sample appended"
  );
  Ok(())
}

fn update_ride_tx(
  conn: &mut Connection,
  id: Uuid,
  patch: RidePatch,
  now: DateTime<Utc>,
) -> Result<Ride> {
  let tx = conn.transaction()?;
  let mut ride =
    select_ride(&tx, id)?.ok_or(wayfare_core::Error::RideNotFound(id))?;

  let moved = ride.apply_patch(patch, now)?;
  write_ride(&tx, &ride)?;
  if let Some(position) = moved {
    append_sample(&tx, id, position, now)?;
  }

  tx.commit()?;
  Ok(ride)
}

fn transition_tx(
  conn: &mut Connection,
  id: Uuid,
  transition: Transition,
  actor: Option<UserId>,
  guard: GuardPolicy,
  now: DateTime<Utc>,
) -> Result<Ride> {
  let tx = conn.transaction()?;
  let mut ride =
    select_ride(&tx, id)?.ok_or(wayfare_core::Error::RideNotFound(id))?;

  let from = ride.status;
  ride.apply(transition, actor, guard, now)?;

  // Compare-and-set on the status read above.
  let changed = tx.execute(
    "UPDATE rides SET status = ?2, driver_id = ?3, updated_at = ?4
     WHERE ride_id = ?1 AND status = ?5",
    rusqlite::params![
      encode_uuid(id),
      ride.status.as_str(),
      ride.driver_id.map(|d| d.0),
      encode_dt(ride.updated_at),
      from.as_str(),
    ],
  )?;
  if changed != 1 {
    return Err(
      wayfare_core::Error::InvalidTransition { ride_id: id, from, transition }.into(),
    );
  }

  tx.commit()?;
  Ok(ride)
}

fn update_location_tx(
  conn: &mut Connection,
  user_id: UserId,
  patch: LocationPatch,
  now: DateTime<Utc>,
) -> Result<UserLocation> {
  let tx = conn.transaction()?;
  let raw = tx
    .query_row(
      &format!("SELECT {LOCATION_COLUMNS} FROM user_locations WHERE user_id = ?1"),
      rusqlite::params![user_id.0],
      RawLocation::from_row,
    )
    .optional()?;
  let mut location = raw
    .map(RawLocation::into_location)
    .transpose()?
    .ok_or(wayfare_core::Error::LocationNotFound(user_id))?;

  patch.apply_to(&mut location, now)?;
  tx.execute(
    "UPDATE user_locations
     SET role = ?2, latitude = ?3, longitude = ?4, updated_at = ?5
     WHERE user_id = ?1",
    rusqlite::params![
      user_id.0,
      location.role.as_str(),
      location.latitude,
      location.longitude,
      encode_dt(location.updated_at),
    ],
  )?;

  tx.commit()?;
  Ok(location)
}

fn status_params(statuses: &[RideStatus]) -> (String, Vec<Value>) {
  let placeholders = vec!["?"; statuses.len()].join(", ");
  let values = statuses
    .iter()
    .map(|s| Value::Text(s.as_str().to_owned()))
    .collect();
  (placeholders, values)
}

// ─── RideStore impl ──────────────────────────────────────────────────────────

impl RideStore for SqliteStore {
  type Error = Error;

  // ── Rides ─────────────────────────────────────────────────────────────────

  async fn create_ride(&self, input: NewRide) -> Result<Ride> {
    let ride = Ride::new(input, Utc::now())?;

    let row = ride.clone();
    self
      .conn
      .call(move |conn| Ok(insert_ride(conn, &row)))
      .await??;

    tracing::debug!(ride_id = %ride.ride_id, rider_id = %ride.rider_id, "ride created");
    Ok(ride)
  }

  async fn get_ride(&self, id: Uuid) -> Result<Option<Ride>> {
    self.conn.call(move |conn| Ok(select_ride(conn, id))).await?
  }

  async fn list_rides(&self, query: &RideQuery) -> Result<Vec<Ride>> {
    if query.statuses.is_empty() {
      return Ok(Vec::new());
    }

    let (placeholders, mut params) = status_params(&query.statuses);
    let mut sql =
      format!("SELECT {RIDE_COLUMNS} FROM rides WHERE status IN ({placeholders})");
    if let Some(rider) = query.rider_id {
      sql.push_str(" AND rider_id = ?");
      params.push(Value::Integer(rider.0));
    }
    sql.push_str(" ORDER BY rowid");

    let raws: Vec<RawRide> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRide::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRide::into_ride).collect()
  }

  async fn update_ride(&self, id: Uuid, patch: RidePatch) -> Result<Ride> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(update_ride_tx(conn, id, patch, now)))
      .await?
  }

  async fn transition(
    &self,
    id: Uuid,
    transition: Transition,
    actor: Option<UserId>,
    guard: GuardPolicy,
  ) -> Result<Ride> {
    let now = Utc::now();
    let result = self
      .conn
      .call(move |conn| Ok(transition_tx(conn, id, transition, actor, guard, now)))
      .await?;

    match &result {
      Ok(ride) => tracing::info!(ride_id = %id, %transition, status = %ride.status, "ride transitioned"),
      Err(e) => tracing::debug!(ride_id = %id, %transition, error = %e, "transition refused"),
    }
    result
  }

  async fn delete_ride(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM rides WHERE ride_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn engaged_driver_ids(&self, engaged: &[RideStatus]) -> Result<HashSet<UserId>> {
    if engaged.is_empty() {
      return Ok(HashSet::new());
    }

    let (placeholders, params) = status_params(engaged);
    let sql = format!(
      "SELECT DISTINCT driver_id FROM rides
       WHERE driver_id IS NOT NULL AND status IN ({placeholders})"
    );

    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids.into_iter().map(UserId).collect())
  }

  // ── Trails ────────────────────────────────────────────────────────────────

  async fn get_trail(&self, ride_id: Uuid) -> Result<Option<LocationTrail>> {
    let id_str = encode_uuid(ride_id);

    let raw: Option<(String, Vec<RawSample>)> = self
      .conn
      .call(move |conn| {
        let updated_at: Option<String> = conn
          .query_row(
            "SELECT updated_at FROM trails WHERE ride_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(updated_at) = updated_at else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT lat_e6, lon_e6, recorded_at FROM trail_samples
           WHERE ride_id = ?1 ORDER BY seq",
        )?;
        let samples = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawSample {
              lat_e6:      row.get(0)?,
              lon_e6:      row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some((updated_at, samples)))
      })
      .await?;

    let Some((updated_at, samples)) = raw else {
      return Ok(None);
    };
    Ok(Some(LocationTrail {
      ride_id,
      samples: samples
        .into_iter()
        .map(RawSample::into_sample)
        .collect::<Result<_>>()?,
      updated_at: decode_dt(&updated_at)?,
    }))
  }

  // ── Location registry ─────────────────────────────────────────────────────

  async fn report_location(&self, report: LocationReport) -> Result<UserLocation> {
    let location = report.into_location(Utc::now());

    let row = location.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_locations (user_id, role, latitude, longitude, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (user_id) DO UPDATE SET
             role = excluded.role,
             latitude = excluded.latitude,
             longitude = excluded.longitude,
             updated_at = excluded.updated_at",
          rusqlite::params![
            row.user_id.0,
            row.role.as_str(),
            row.latitude,
            row.longitude,
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(location)
  }

  async fn get_location(&self, user_id: UserId) -> Result<Option<UserLocation>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LOCATION_COLUMNS} FROM user_locations WHERE user_id = ?1"),
              rusqlite::params![user_id.0],
              RawLocation::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLocation::into_location).transpose()
  }

  async fn update_location(
    &self,
    user_id: UserId,
    patch: LocationPatch,
  ) -> Result<UserLocation> {
    let now = Utc::now();
    self
      .conn
      .call(move |conn| Ok(update_location_tx(conn, user_id, patch, now)))
      .await?
  }

  async fn list_locations(&self, role: Role) -> Result<Vec<UserLocation>> {
    self
      .query_locations(
        format!(
          "SELECT {LOCATION_COLUMNS} FROM user_locations WHERE role = ?1 ORDER BY user_id"
        ),
        vec![Value::Text(role.as_str().to_owned())],
      )
      .await
  }

  /// Bounding-box prefilter over `user_locations_geo_idx`; exact distances
  /// are left to the matcher.
  async fn candidate_drivers(
    &self,
    origin: Coordinate,
    radius_km: f64,
  ) -> Result<Vec<UserLocation>> {
    let bbox = BoundingBox::around(origin, radius_km);
    let (min_lat, max_lat) = bbox.latitude;

    let mut sql = format!(
      "SELECT {LOCATION_COLUMNS} FROM user_locations
       WHERE role = ?1 AND latitude BETWEEN ?2 AND ?3"
    );
    let mut params = vec![
      Value::Text(Role::Driver.as_str().to_owned()),
      Value::Real(min_lat - BOX_MARGIN_DEG),
      Value::Real(max_lat + BOX_MARGIN_DEG),
    ];
    if let Some((min_lon, max_lon)) = bbox.longitude {
      sql.push_str(" AND longitude BETWEEN ?4 AND ?5");
      params.push(Value::Real(min_lon - BOX_MARGIN_DEG));
      params.push(Value::Real(max_lon + BOX_MARGIN_DEG));
    }
    sql.push_str(" ORDER BY user_id");

    self.query_locations(sql, params).await
  }
}
