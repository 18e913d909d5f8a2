//! SQL schema for the Tizeta SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Seat exclusivity is enforced twice: by the conditional logic inside each
/// transaction, and by `holds_occupied_seat_idx`, which makes a second
/// `PENDING`/`CONFIRMED` row for the same seat impossible to insert.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schedules (
    schedule_id     INTEGER PRIMARY KEY,
    capacity        INTEGER NOT NULL CHECK (capacity >= 0),
    price           INTEGER NOT NULL CHECK (price >= 0),  -- minor units
    starts_at       TEXT NOT NULL,
    ends_at         TEXT NOT NULL,
    available_seats INTEGER NOT NULL,
    updated_at      TEXT NOT NULL,
    CHECK (available_seats BETWEEN 0 AND capacity)
);

CREATE TABLE IF NOT EXISTS payment_attempts (
    payment_ref       TEXT PRIMARY KEY,
    amount            INTEGER NOT NULL,
    currency          TEXT NOT NULL,
    status            TEXT NOT NULL
                      CHECK (status IN ('INITIATED', 'SUCCEEDED', 'FAILED')),
    checkout_url      TEXT,
    gateway_reference TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS holds (
    hold_id       TEXT PRIMARY KEY,
    schedule_id   INTEGER NOT NULL REFERENCES schedules(schedule_id),
    seat_id       TEXT NOT NULL,
    holder_id     TEXT NOT NULL,
    price         INTEGER NOT NULL,
    payment_ref   TEXT NOT NULL REFERENCES payment_attempts(payment_ref),
    status        TEXT NOT NULL
                  CHECK (status IN ('PENDING', 'CONFIRMED', 'CANCELLED')),
    cancel_reason TEXT,
    created_at    TEXT NOT NULL,    -- RFC 3339 UTC, fixed width
    expires_at    TEXT NOT NULL,
    finalized_at  TEXT,
    reinstates    TEXT UNIQUE REFERENCES holds(hold_id),
    CHECK ((status = 'CANCELLED') = (cancel_reason IS NOT NULL)),
    CHECK ((status = 'PENDING') = (finalized_at IS NULL))
);

-- At most one live claim per seat.
CREATE UNIQUE INDEX IF NOT EXISTS holds_occupied_seat_idx
    ON holds(schedule_id, seat_id)
    WHERE status IN ('PENDING', 'CONFIRMED');

-- One original hold per payment reference. A reinstatement reuses its
-- origin's reference, so one reference names one lineage of at most two
-- rows: the cancelled original and the hold that reinstates it
-- (`reinstates` is UNIQUE).
CREATE UNIQUE INDEX IF NOT EXISTS holds_payment_ref_idx
    ON holds(payment_ref)
    WHERE reinstates IS NULL;

CREATE INDEX IF NOT EXISTS holds_pending_expiry_idx
    ON holds(expires_at)
    WHERE status = 'PENDING';

CREATE INDEX IF NOT EXISTS holds_holder_idx ON holds(holder_id);

CREATE TABLE IF NOT EXISTS refund_obligations (
    payment_ref TEXT PRIMARY KEY REFERENCES payment_attempts(payment_ref),
    hold_id     TEXT NOT NULL REFERENCES holds(hold_id),
    holder_id   TEXT NOT NULL,
    amount      INTEGER NOT NULL,
    currency    TEXT NOT NULL,
    reason      TEXT NOT NULL,   -- 'seat_reassigned' | 'schedule_closed' | 'sold_out'
    recorded_at TEXT NOT NULL,
    resolved_at TEXT
);

PRAGMA user_version = 1;
";
