//! SQL schema for the Wayfare SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS rides (
    ride_id          TEXT PRIMARY KEY,
    rider_id         INTEGER NOT NULL,
    driver_id        INTEGER,
    pickup_location  TEXT NOT NULL,
    dropoff_location TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    current_lat_e6   INTEGER NOT NULL,   -- micro-degrees
    current_lon_e6   INTEGER NOT NULL,   -- micro-degrees
    created_at       TEXT NOT NULL,      -- ISO 8601 UTC; never changes
    updated_at       TEXT NOT NULL,
    CHECK (status IN ('pending', 'accepted', 'started', 'completed', 'cancelled')),
    CHECK (status != 'pending' OR driver_id IS NULL)
);

-- One row per user; reports overwrite in place.
CREATE TABLE IF NOT EXISTS user_locations (
    user_id    INTEGER PRIMARY KEY,
    role       TEXT NOT NULL,            -- 'driver' | 'rider'
    latitude   REAL NOT NULL,
    longitude  REAL NOT NULL,
    updated_at TEXT NOT NULL
);

-- Created on a ride's first coordinate change; removed with the ride.
CREATE TABLE IF NOT EXISTS trails (
    ride_id    TEXT PRIMARY KEY REFERENCES rides(ride_id) ON DELETE CASCADE,
    updated_at TEXT NOT NULL
);

-- Strictly append-only. `seq` is the chronological position in the trail.
CREATE TABLE IF NOT EXISTS trail_samples (
    ride_id     TEXT NOT NULL REFERENCES trails(ride_id) ON DELETE CASCADE,
    seq         INTEGER NOT NULL,
    lat_e6      INTEGER NOT NULL,
    lon_e6      INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (ride_id, seq)
);

CREATE INDEX IF NOT EXISTS rides_status_idx         ON rides(status);
CREATE INDEX IF NOT EXISTS rides_rider_idx          ON rides(rider_id);
CREATE INDEX IF NOT EXISTS user_locations_geo_idx   ON user_locations(role, latitude, longitude);

PRAGMA user_version = 1;
";
