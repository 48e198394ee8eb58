//! `SQLite`-backed storage for studies shared between processes.

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};

use super::{Storage, check_existing_param, check_study_distribution, summarize};
use crate::distribution::{Distribution, distribution_from_json, distribution_to_json};
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary, TrialParam};
use crate::types::{Direction, StudyId, TrialId, TrialState};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS studies (
    study_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    study_name TEXT NOT NULL UNIQUE,
    direction  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS study_user_attributes (
    study_id INTEGER NOT NULL REFERENCES studies(study_id) ON DELETE CASCADE,
    key      TEXT NOT NULL,
    value    TEXT NOT NULL,
    UNIQUE (study_id, key)
);
CREATE TABLE IF NOT EXISTS trials (
    trial_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    number            INTEGER NOT NULL,
    study_id          INTEGER NOT NULL REFERENCES studies(study_id) ON DELETE CASCADE,
    state             TEXT NOT NULL,
    value             REAL,
    datetime_start    TEXT NOT NULL,
    datetime_complete TEXT,
    UNIQUE (study_id, number)
);
CREATE TABLE IF NOT EXISTS trial_params (
    trial_id          INTEGER NOT NULL REFERENCES trials(trial_id) ON DELETE CASCADE,
    param_name        TEXT NOT NULL,
    param_value       REAL NOT NULL,
    distribution_json TEXT NOT NULL,
    UNIQUE (trial_id, param_name)
);
CREATE TABLE IF NOT EXISTS trial_intermediate_values (
    trial_id INTEGER NOT NULL REFERENCES trials(trial_id) ON DELETE CASCADE,
    step     INTEGER NOT NULL,
    value    REAL NOT NULL,
    UNIQUE (trial_id, step)
);
CREATE TABLE IF NOT EXISTS trial_user_attributes (
    trial_id INTEGER NOT NULL REFERENCES trials(trial_id) ON DELETE CASCADE,
    key      TEXT NOT NULL,
    value    TEXT NOT NULL,
    UNIQUE (trial_id, key)
);
CREATE TABLE IF NOT EXISTS trial_system_attributes (
    trial_id INTEGER NOT NULL REFERENCES trials(trial_id) ON DELETE CASCADE,
    key      TEXT NOT NULL,
    value    TEXT NOT NULL,
    UNIQUE (trial_id, key)
);
";

/// A storage backend that keeps studies in a `SQLite` database.
///
/// Several processes may open the same file: every mutation runs in an
/// `IMMEDIATE` transaction, so trial numbers are allocated exactly once and
/// two processes racing to finish the same trial cannot both succeed.  WAL
/// mode lets readers proceed alongside the single writer.
///
/// # Examples
///
/// ```no_run
/// use hyperstudy::storage::SqliteStorage;
///
/// let storage = SqliteStorage::new("studies.db").unwrap();
/// ```
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: rusqlite::Error) -> Error {
    Error::StorageUnavailable(e.to_string())
}

fn to_sql(id: u64) -> Result<i64> {
    i64::try_from(id)
        .map_err(|_| Error::StorageUnavailable(format!("{id} exceeds the SQLite integer range")))
}

fn from_sql(v: i64) -> Result<u64> {
    u64::try_from(v).map_err(|_| Error::StorageUnavailable(format!("negative id {v} in database")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::StorageUnavailable(format!("bad timestamp {s:?}: {e}")))
}

fn parse_state(s: &str) -> Result<TrialState> {
    TrialState::parse(s).ok_or_else(|| Error::StorageUnavailable(format!("bad trial state {s:?}")))
}

fn parse_direction(s: &str) -> Result<Direction> {
    Direction::parse(s).ok_or_else(|| Error::StorageUnavailable(format!("bad direction {s:?}")))
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageUnavailable`](Error::StorageUnavailable) if the file
    /// cannot be opened or the schema cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path).map_err(db_err)?)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageUnavailable`](Error::StorageUnavailable) if the schema
    /// cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL mode: concurrent readers, single writer.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(db_err)?;
        conn.busy_timeout(Duration::from_secs(30)).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside an `IMMEDIATE` transaction, committing on success.
    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        let out = f(&tx)?;
        tx.commit().map_err(db_err)?;
        Ok(out)
    }

    /// Runs `f` inside a read transaction so multi-table reads see one state.
    fn read<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let out = f(&tx)?;
        tx.commit().map_err(db_err)?;
        Ok(out)
    }
}

fn study_row(conn: &Connection, study_id: StudyId) -> Result<(String, Direction)> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT study_name, direction FROM studies WHERE study_id = ?1",
            params![to_sql(study_id)?],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(db_err)?;
    let (name, direction) = row.ok_or_else(|| Error::StudyNotFound(study_id.to_string()))?;
    Ok((name, parse_direction(&direction)?))
}

/// Returns the study id of a trial that must still be running.
fn running_trial(conn: &Connection, trial_id: TrialId) -> Result<StudyId> {
    let row: Option<(i64, i64, String)> = conn
        .query_row(
            "SELECT study_id, number, state FROM trials WHERE trial_id = ?1",
            params![to_sql(trial_id)?],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()
        .map_err(db_err)?;
    let (study_id, number, state) = row.ok_or(Error::TrialNotFound(trial_id))?;
    let state = parse_state(&state)?;
    if state.is_finished() {
        return Err(Error::TrialAlreadyFinished {
            number: from_sql(number)?,
            state,
        });
    }
    from_sql(study_id)
}

fn upsert_attr(conn: &Connection, table: &str, trial_id: TrialId, key: &str, value: &str) -> Result<()> {
    running_trial(conn, trial_id)?;
    conn.execute(
        &format!(
            "INSERT INTO {table} (trial_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (trial_id, key) DO UPDATE SET value = excluded.value"
        ),
        params![to_sql(trial_id)?, key, value],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Which trials a load covers.
#[derive(Clone, Copy)]
enum Scope {
    Study(i64),
    Trial(i64),
}

impl Scope {
    fn column(self) -> &'static str {
        match self {
            Scope::Study(_) => "study_id",
            Scope::Trial(_) => "trial_id",
        }
    }

    fn key(self) -> i64 {
        match self {
            Scope::Study(k) | Scope::Trial(k) => k,
        }
    }
}

/// Runs a query whose `{col}` placeholder filters on `trials.<scope column>`.
fn scoped<T, F>(conn: &Connection, sql: &str, scope: Scope, f: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let sql = sql.replace("{col}", scope.column());
    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt.query_map(params![scope.key()], f).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

type TrialRow = (i64, i64, i64, String, Option<f64>, String, Option<String>);

fn load_trials(conn: &Connection, scope: Scope) -> Result<Vec<FrozenTrial>> {
    let rows: Vec<TrialRow> = scoped(
        conn,
        "SELECT trial_id, number, study_id, state, value, datetime_start, datetime_complete
         FROM trials t WHERE t.{col} = ?1 ORDER BY number",
        scope,
        |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
            ))
        },
    )?;

    let mut trials = Vec::with_capacity(rows.len());
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
    for (id, number, study_id, state, value, start, complete) in rows {
        index.insert(id, trials.len());
        trials.push(FrozenTrial {
            id: from_sql(id)?,
            study_id: from_sql(study_id)?,
            number: from_sql(number)?,
            state: parse_state(&state)?,
            value,
            params: HashMap::new(),
            intermediate_values: BTreeMap::new(),
            user_attrs: BTreeMap::new(),
            system_attrs: BTreeMap::new(),
            datetime_start: parse_time(&start)?,
            datetime_complete: complete.as_deref().map(parse_time).transpose()?,
        });
    }

    let params: Vec<(i64, String, f64, String)> = scoped(
        conn,
        "SELECT p.trial_id, p.param_name, p.param_value, p.distribution_json
         FROM trial_params p JOIN trials t ON t.trial_id = p.trial_id WHERE t.{col} = ?1",
        scope,
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    for (id, name, value, json) in params {
        if let Some(&i) = index.get(&id) {
            let distribution = distribution_from_json(&json)?;
            trials[i]
                .params
                .insert(name, TrialParam { value, distribution });
        }
    }

    let values: Vec<(i64, i64, f64)> = scoped(
        conn,
        "SELECT v.trial_id, v.step, v.value
         FROM trial_intermediate_values v JOIN trials t ON t.trial_id = v.trial_id
         WHERE t.{col} = ?1",
        scope,
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    for (id, step, value) in values {
        if let Some(&i) = index.get(&id) {
            trials[i].intermediate_values.insert(from_sql(step)?, value);
        }
    }

    for (table, system) in [
        ("trial_user_attributes", false),
        ("trial_system_attributes", true),
    ] {
        let attrs: Vec<(i64, String, String)> = scoped(
            conn,
            &format!(
                "SELECT a.trial_id, a.key, a.value
                 FROM {table} a JOIN trials t ON t.trial_id = a.trial_id WHERE t.{{col}} = ?1"
            ),
            scope,
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        for (id, key, value) in attrs {
            if let Some(&i) = index.get(&id) {
                let target = if system {
                    &mut trials[i].system_attrs
                } else {
                    &mut trials[i].user_attrs
                };
                target.insert(key, value);
            }
        }
    }

    Ok(trials)
}

fn study_user_attrs(conn: &Connection, study_id: StudyId) -> Result<BTreeMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM study_user_attributes WHERE study_id = ?1")
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![to_sql(study_id)?], |r| Ok((r.get(0)?, r.get(1)?)))
        .map_err(db_err)?;
    rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()
        .map_err(db_err)
}

impl Storage for SqliteStorage {
    fn create_new_study(&self, name: &str, direction: Direction) -> Result<StudyId> {
        self.write(|tx| {
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT study_id FROM studies WHERE study_name = ?1",
                    params![name],
                    |r| r.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if taken.is_some() {
                return Err(Error::StudyAlreadyExists(name.to_owned()));
            }
            tx.execute(
                "INSERT INTO studies (study_name, direction) VALUES (?1, ?2)",
                params![name, direction.as_str()],
            )
            .map_err(db_err)?;
            from_sql(tx.last_insert_rowid())
        })
    }

    fn get_study_id_from_name(&self, name: &str) -> Result<StudyId> {
        let id: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT study_id FROM studies WHERE study_name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()
            .map_err(db_err)?;
        from_sql(id.ok_or_else(|| Error::StudyNotFound(name.to_owned()))?)
    }

    fn get_study_name(&self, study_id: StudyId) -> Result<String> {
        study_row(&self.conn.lock(), study_id).map(|(name, _)| name)
    }

    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction> {
        study_row(&self.conn.lock(), study_id).map(|(_, direction)| direction)
    }

    fn delete_study(&self, study_id: StudyId) -> Result<()> {
        self.write(|tx| {
            study_row(tx, study_id)?;
            tx.execute(
                "DELETE FROM studies WHERE study_id = ?1",
                params![to_sql(study_id)?],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>> {
        self.read(|tx| {
            let studies: Vec<(i64, String, String)> = {
                let mut stmt = tx
                    .prepare("SELECT study_id, study_name, direction FROM studies ORDER BY study_id")
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
                    .map_err(db_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?
            };
            let mut summaries = Vec::with_capacity(studies.len());
            for (id, name, direction) in studies {
                let study_id = from_sql(id)?;
                let trials = load_trials(tx, Scope::Study(id))?;
                summaries.push(summarize(
                    study_id,
                    name,
                    parse_direction(&direction)?,
                    study_user_attrs(tx, study_id)?,
                    &trials,
                ));
            }
            Ok(summaries)
        })
    }

    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: &str) -> Result<()> {
        self.write(|tx| {
            study_row(tx, study_id)?;
            tx.execute(
                "INSERT INTO study_user_attributes (study_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (study_id, key) DO UPDATE SET value = excluded.value",
                params![to_sql(study_id)?, key, value],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<BTreeMap<String, String>> {
        self.read(|tx| {
            study_row(tx, study_id)?;
            study_user_attrs(tx, study_id)
        })
    }

    fn create_new_trial(&self, study_id: StudyId) -> Result<TrialId> {
        self.write(|tx| {
            study_row(tx, study_id)?;
            let study = to_sql(study_id)?;
            let number: i64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(number) + 1, 0) FROM trials WHERE study_id = ?1",
                    params![study],
                    |r| r.get(0),
                )
                .map_err(db_err)?;
            tx.execute(
                "INSERT INTO trials (number, study_id, state, datetime_start)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    number,
                    study,
                    TrialState::Running.as_str(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(db_err)?;
            from_sql(tx.last_insert_rowid())
        })
    }

    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<()> {
        let json = distribution_to_json(distribution)?;
        self.write(|tx| {
            let study_id = running_trial(tx, trial_id)?;
            let id = to_sql(trial_id)?;

            let existing: Option<(f64, String)> = tx
                .query_row(
                    "SELECT param_value, distribution_json FROM trial_params
                     WHERE trial_id = ?1 AND param_name = ?2",
                    params![id, name],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()
                .map_err(db_err)?;
            let existing = existing
                .map(|(value, json)| {
                    distribution_from_json(&json).map(|distribution| TrialParam {
                        value,
                        distribution,
                    })
                })
                .transpose()?;
            if check_existing_param(name, existing.as_ref(), internal, distribution)? {
                return Ok(());
            }

            let known: Option<String> = tx
                .query_row(
                    "SELECT p.distribution_json FROM trial_params p
                     JOIN trials t ON t.trial_id = p.trial_id
                     WHERE t.study_id = ?1 AND p.param_name = ?2 LIMIT 1",
                    params![to_sql(study_id)?, name],
                    |r| r.get(0),
                )
                .optional()
                .map_err(db_err)?;
            let known = known.as_deref().map(distribution_from_json).transpose()?;
            check_study_distribution(name, known.as_ref(), distribution)?;

            tx.execute(
                "INSERT INTO trial_params (trial_id, param_name, param_value, distribution_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, name, internal, json],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn set_trial_intermediate_value(
        &self,
        trial_id: TrialId,
        step: u64,
        value: f64,
    ) -> Result<()> {
        self.write(|tx| {
            running_trial(tx, trial_id)?;
            tx.execute(
                "INSERT INTO trial_intermediate_values (trial_id, step, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (trial_id, step) DO UPDATE SET value = excluded.value",
                params![to_sql(trial_id)?, to_sql(step)?, value],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()> {
        self.write(|tx| {
            running_trial(tx, trial_id)?;
            tx.execute(
                "UPDATE trials SET value = ?1 WHERE trial_id = ?2",
                params![value, to_sql(trial_id)?],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()> {
        self.write(|tx| {
            running_trial(tx, trial_id)?;
            let completed = state.is_finished().then(|| Utc::now().to_rfc3339());
            tx.execute(
                "UPDATE trials SET state = ?1, datetime_complete = ?2 WHERE trial_id = ?3",
                params![state.as_str(), completed, to_sql(trial_id)?],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()> {
        self.write(|tx| upsert_attr(tx, "trial_user_attributes", trial_id, key, value))
    }

    fn set_trial_system_attr(&self, trial_id: TrialId, key: &str, value: &str) -> Result<()> {
        self.write(|tx| upsert_attr(tx, "trial_system_attributes", trial_id, key, value))
    }

    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial> {
        let id = to_sql(trial_id)?;
        self.read(|tx| load_trials(tx, Scope::Trial(id)))?
            .pop()
            .ok_or(Error::TrialNotFound(trial_id))
    }

    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        let id = to_sql(study_id)?;
        self.read(|tx| {
            study_row(tx, study_id)?;
            load_trials(tx, Scope::Study(id))
        })
    }

    fn get_trial_number_from_id(&self, trial_id: TrialId) -> Result<u64> {
        let number: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT number FROM trials WHERE trial_id = ?1",
                params![to_sql(trial_id)?],
                |r| r.get(0),
            )
            .optional()
            .map_err(db_err)?;
        from_sql(number.ok_or(Error::TrialNotFound(trial_id))?)
    }
}
