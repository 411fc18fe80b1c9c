//! SQLite event store implementing both store ports.
//!
//! All queries run on a pooled connection via `spawn_blocking`. Every
//! mutation re-queries the affected collection and pushes it through the
//! watch channel backing `observe_*`, which is what makes the store
//! reactive: subscribers always converge on the latest persisted state.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chime_core::{AlarmStore, TimerStore};
use chime_domain::constants::UNSAVED_ID;
use chime_domain::{
    AlarmState, ChimeError, Countdown, DatabaseConfig, Result, ScheduledAlarm, SnoozeConfig,
    SoundRef, TimerStatus,
};
use chrono::{DateTime, TimeZone, Utc, Weekday};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tokio::sync::watch;
use tokio::task;
use tracing::info;

use crate::errors::{map_join_error, map_pool_error, map_sqlite_error};

const SCHEMA_VERSION: i64 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

type SqlitePool = Pool<SqliteConnectionManager>;
type SqliteConn = PooledConnection<SqliteConnectionManager>;

/// Persistent event store over a pooled SQLite database.
pub struct SqliteEventStore {
    pool: SqlitePool,
    alarms_tx: Arc<watch::Sender<Vec<ScheduledAlarm>>>,
    timers_tx: Arc<watch::Sender<Vec<Countdown>>>,
}

impl SqliteEventStore {
    /// Open (creating if needed) the database at the configured path, run
    /// migrations, and prime the reactive channels with current state.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let manager = SqliteConnectionManager::file(&config.path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .build(manager)
            .map_err(map_pool_error)?;

        let conn = pool.get().map_err(map_pool_error)?;
        create_schema(&conn)?;

        let alarms = query_alarms(&conn)?;
        let timers = query_timers(&conn)?;
        drop(conn);

        info!(
            db_path = %config.path,
            alarms = alarms.len(),
            timers = timers.len(),
            "event store opened"
        );

        let (alarms_tx, _) = watch::channel(alarms);
        let (timers_tx, _) = watch::channel(timers);
        Ok(Self { pool, alarms_tx: Arc::new(alarms_tx), timers_tx: Arc::new(timers_tx) })
    }

    fn conn(pool: &SqlitePool) -> Result<SqliteConn> {
        pool.get().map_err(map_pool_error)
    }
}

#[async_trait]
impl AlarmStore for SqliteEventStore {
    fn observe_alarms(&self) -> watch::Receiver<Vec<ScheduledAlarm>> {
        self.alarms_tx.subscribe()
    }

    async fn alarm_by_id(&self, id: i64) -> Result<ScheduledAlarm> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> Result<ScheduledAlarm> {
            let conn = Self::conn(&pool)?;
            query_alarm(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_alarm(&self, alarm: ScheduledAlarm) -> Result<i64> {
        if alarm.id != UNSAVED_ID {
            return Err(ChimeError::ConstraintViolation(format!(
                "save_alarm requires an unsaved record, got id {}",
                alarm.id
            )));
        }
        let pool = self.pool.clone();
        let (id, alarms) = task::spawn_blocking(move || -> Result<(i64, Vec<ScheduledAlarm>)> {
            let conn = Self::conn(&pool)?;
            let id = insert_alarm(&conn, &alarm)?;
            Ok((id, query_alarms(&conn)?))
        })
        .await
        .map_err(map_join_error)??;

        self.alarms_tx.send_replace(alarms);
        Ok(id)
    }

    async fn update_alarm(&self, alarm: ScheduledAlarm) -> Result<()> {
        if alarm.id == UNSAVED_ID {
            return Err(ChimeError::ConstraintViolation(
                "update_alarm requires a saved record".into(),
            ));
        }
        let pool = self.pool.clone();
        let alarms = task::spawn_blocking(move || -> Result<Vec<ScheduledAlarm>> {
            let conn = Self::conn(&pool)?;
            update_alarm_row(&conn, &alarm)?;
            query_alarms(&conn)
        })
        .await
        .map_err(map_join_error)??;

        self.alarms_tx.send_replace(alarms);
        Ok(())
    }

    async fn delete_alarm(&self, id: i64) -> Result<()> {
        let pool = self.pool.clone();
        let alarms = task::spawn_blocking(move || -> Result<Vec<ScheduledAlarm>> {
            let conn = Self::conn(&pool)?;
            conn.execute("DELETE FROM alarms WHERE id = ?1", params![id])
                .map_err(map_sqlite_error)?;
            query_alarms(&conn)
        })
        .await
        .map_err(map_join_error)??;

        self.alarms_tx.send_replace(alarms);
        Ok(())
    }
}

#[async_trait]
impl TimerStore for SqliteEventStore {
    fn observe_timers(&self) -> watch::Receiver<Vec<Countdown>> {
        self.timers_tx.subscribe()
    }

    async fn timer_snapshot(&self) -> Result<Vec<Countdown>> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> Result<Vec<Countdown>> {
            let conn = Self::conn(&pool)?;
            query_timers(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn timer_by_id(&self, id: i64) -> Result<Countdown> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> Result<Countdown> {
            let conn = Self::conn(&pool)?;
            query_timer(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_timer(&self, timer: Countdown) -> Result<i64> {
        let pool = self.pool.clone();
        let (id, timers) = task::spawn_blocking(move || -> Result<(i64, Vec<Countdown>)> {
            let conn = Self::conn(&pool)?;
            let id = if timer.id == UNSAVED_ID {
                insert_timer(&conn, &timer)?
            } else {
                update_timer_row(&conn, &timer)?;
                timer.id
            };
            Ok((id, query_timers(&conn)?))
        })
        .await
        .map_err(map_join_error)??;

        self.timers_tx.send_replace(timers);
        Ok(id)
    }

    async fn delete_timer(&self, id: i64) -> Result<()> {
        let pool = self.pool.clone();
        let timers = task::spawn_blocking(move || -> Result<Vec<Countdown>> {
            let conn = Self::conn(&pool)?;
            conn.execute("DELETE FROM timers WHERE id = ?1", params![id])
                .map_err(map_sqlite_error)?;
            query_timers(&conn)
        })
        .await
        .map_err(map_join_error)??;

        self.timers_tx.send_replace(timers);
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sqlite_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) \
         VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(map_sqlite_error)?;
    Ok(())
}

// ── Alarm rows ───────────────────────────────────────────────────────

const ALARM_COLUMNS: &str = "id, hour, minute, is_daily, repeat_days, enabled, sound, vibrate, \
                             volume_percent, snooze_enabled, snooze_limit, snooze_remaining, \
                             snooze_interval_min, state";

fn query_alarms(conn: &Connection) -> Result<Vec<ScheduledAlarm>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {ALARM_COLUMNS} FROM alarms ORDER BY id"))
        .map_err(map_sqlite_error)?;
    let rows = stmt.query_map([], alarm_from_row).map_err(map_sqlite_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sqlite_error)
}

fn query_alarm(conn: &Connection, id: i64) -> Result<ScheduledAlarm> {
    conn.query_row(
        &format!("SELECT {ALARM_COLUMNS} FROM alarms WHERE id = ?1"),
        params![id],
        alarm_from_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => ChimeError::NotFound(format!("alarm {id}")),
        other => map_sqlite_error(other),
    })
}

fn alarm_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledAlarm> {
    let repeat_json: String = row.get(4)?;
    let repeat_days: HashSet<Weekday> = serde_json::from_str(&repeat_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let state_text: String = row.get(13)?;
    let state = alarm_state_from_db(&state_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, e.into()))?;

    Ok(ScheduledAlarm {
        id: row.get(0)?,
        hour: row.get(1)?,
        minute: row.get(2)?,
        is_daily: row.get(3)?,
        repeat_days,
        enabled: row.get(5)?,
        sound: SoundRef(row.get(6)?),
        vibrate: row.get(7)?,
        volume_percent: row.get(8)?,
        snooze: SnoozeConfig {
            enabled: row.get(9)?,
            limit: row.get(10)?,
            remaining: row.get(11)?,
            interval_minutes: row.get(12)?,
        },
        state,
    })
}

fn insert_alarm(conn: &Connection, alarm: &ScheduledAlarm) -> Result<i64> {
    let repeat_json = serde_json::to_string(&alarm.repeat_days)
        .map_err(|e| ChimeError::Unexpected(e.to_string()))?;
    conn.execute(
        "INSERT INTO alarms (hour, minute, is_daily, repeat_days, enabled, sound, vibrate, \
         volume_percent, snooze_enabled, snooze_limit, snooze_remaining, snooze_interval_min, \
         state) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            alarm.hour,
            alarm.minute,
            alarm.is_daily,
            repeat_json,
            alarm.enabled,
            alarm.sound.0,
            alarm.vibrate,
            alarm.volume_percent,
            alarm.snooze.enabled,
            alarm.snooze.limit,
            alarm.snooze.remaining,
            alarm.snooze.interval_minutes,
            alarm_state_to_db(alarm.state),
        ],
    )
    .map_err(map_sqlite_error)?;
    Ok(conn.last_insert_rowid())
}

fn update_alarm_row(conn: &Connection, alarm: &ScheduledAlarm) -> Result<()> {
    let repeat_json = serde_json::to_string(&alarm.repeat_days)
        .map_err(|e| ChimeError::Unexpected(e.to_string()))?;
    let affected = conn
        .execute(
            "UPDATE alarms SET hour = ?2, minute = ?3, is_daily = ?4, repeat_days = ?5, \
             enabled = ?6, sound = ?7, vibrate = ?8, volume_percent = ?9, snooze_enabled = ?10, \
             snooze_limit = ?11, snooze_remaining = ?12, snooze_interval_min = ?13, state = ?14 \
             WHERE id = ?1",
            params![
                alarm.id,
                alarm.hour,
                alarm.minute,
                alarm.is_daily,
                repeat_json,
                alarm.enabled,
                alarm.sound.0,
                alarm.vibrate,
                alarm.volume_percent,
                alarm.snooze.enabled,
                alarm.snooze.limit,
                alarm.snooze.remaining,
                alarm.snooze.interval_minutes,
                alarm_state_to_db(alarm.state),
            ],
        )
        .map_err(map_sqlite_error)?;
    if affected == 0 {
        return Err(ChimeError::NotFound(format!("alarm {}", alarm.id)));
    }
    Ok(())
}

fn alarm_state_to_db(state: AlarmState) -> &'static str {
    match state {
        AlarmState::Upcoming => "upcoming",
        AlarmState::Ringing => "ringing",
        AlarmState::Snoozed => "snoozed",
        AlarmState::Missed => "missed",
    }
}

fn alarm_state_from_db(text: &str) -> std::result::Result<AlarmState, String> {
    match text {
        "upcoming" => Ok(AlarmState::Upcoming),
        "ringing" => Ok(AlarmState::Ringing),
        "snoozed" => Ok(AlarmState::Snoozed),
        "missed" => Ok(AlarmState::Missed),
        other => Err(format!("unknown alarm state '{other}'")),
    }
}

// ── Timer rows ───────────────────────────────────────────────────────

const TIMER_COLUMNS: &str = "id, label, target_duration_ms, remaining_ms, started_at, \
                             is_running, status, snoozed_target_at";

fn query_timers(conn: &Connection) -> Result<Vec<Countdown>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {TIMER_COLUMNS} FROM timers ORDER BY id"))
        .map_err(map_sqlite_error)?;
    let rows = stmt.query_map([], timer_from_row).map_err(map_sqlite_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sqlite_error)
}

fn query_timer(conn: &Connection, id: i64) -> Result<Countdown> {
    conn.query_row(
        &format!("SELECT {TIMER_COLUMNS} FROM timers WHERE id = ?1"),
        params![id],
        timer_from_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => ChimeError::NotFound(format!("timer {id}")),
        other => map_sqlite_error(other),
    })
}

fn timer_from_row(row: &Row<'_>) -> rusqlite::Result<Countdown> {
    let status_text: String = row.get(6)?;
    let status = timer_status_from_db(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, e.into()))?;

    Ok(Countdown {
        id: row.get(0)?,
        label: row.get(1)?,
        target_duration_ms: row.get(2)?,
        remaining_ms: row.get(3)?,
        started_at: epoch_ms_from_column(row, 4)?,
        is_running: row.get(5)?,
        status,
        snoozed_target_at: epoch_ms_from_column(row, 7)?,
    })
}

fn epoch_ms_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis
        .map(|ms| {
            Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    Type::Integer,
                    format!("timestamp {ms} out of range").into(),
                )
            })
        })
        .transpose()
}

fn insert_timer(conn: &Connection, timer: &Countdown) -> Result<i64> {
    conn.execute(
        "INSERT INTO timers (label, target_duration_ms, remaining_ms, started_at, is_running, \
         status, snoozed_target_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            timer.label,
            timer.target_duration_ms,
            timer.remaining_ms,
            timer.started_at.map(|t| t.timestamp_millis()),
            timer.is_running,
            timer_status_to_db(timer.status),
            timer.snoozed_target_at.map(|t| t.timestamp_millis()),
        ],
    )
    .map_err(map_sqlite_error)?;
    Ok(conn.last_insert_rowid())
}

fn update_timer_row(conn: &Connection, timer: &Countdown) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE timers SET label = ?2, target_duration_ms = ?3, remaining_ms = ?4, \
             started_at = ?5, is_running = ?6, status = ?7, snoozed_target_at = ?8 WHERE id = ?1",
            params![
                timer.id,
                timer.label,
                timer.target_duration_ms,
                timer.remaining_ms,
                timer.started_at.map(|t| t.timestamp_millis()),
                timer.is_running,
                timer_status_to_db(timer.status),
                timer.snoozed_target_at.map(|t| t.timestamp_millis()),
            ],
        )
        .map_err(map_sqlite_error)?;
    if affected == 0 {
        return Err(ChimeError::NotFound(format!("timer {}", timer.id)));
    }
    Ok(())
}

fn timer_status_to_db(status: TimerStatus) -> &'static str {
    match status {
        TimerStatus::Idle => "idle",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
        TimerStatus::Stopped => "stopped",
    }
}

fn timer_status_from_db(text: &str) -> std::result::Result<TimerStatus, String> {
    match text {
        "idle" => Ok(TimerStatus::Idle),
        "running" => Ok(TimerStatus::Running),
        "paused" => Ok(TimerStatus::Paused),
        "stopped" => Ok(TimerStatus::Stopped),
        other => Err(format!("unknown timer status '{other}'")),
    }
}
