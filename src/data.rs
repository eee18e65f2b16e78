use rocket::fairing;
use rocket::{Build, Rocket};
use rusqlite::Connection;
use tracing::{error, info, warn};

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::internal_error::{InternalError, InternalResult};

const LOCK_POLL: Duration = Duration::from_millis(5);

/// The shared SQLite connection. A request waits at most `deadline` for it.
pub struct DBConnection {
    connection: Mutex<Connection>,
    deadline: Duration,
}

impl DBConnection {
    pub fn new(connection: Connection, deadline: Duration) -> DBConnection {
        DBConnection {
            connection: Mutex::new(connection),
            deadline,
        }
    }

    pub fn lock(&self) -> InternalResult<MutexGuard<'_, Connection>> {
        let started = Instant::now();
        loop {
            match self.connection.try_lock() {
                Ok(connection) => return Ok(connection),
                Err(TryLockError::Poisoned(e)) => return Err(e.into()),
                Err(TryLockError::WouldBlock) if started.elapsed() >= self.deadline => {
                    warn!(deadline_ms = self.deadline.as_millis() as u64, "database connection wait timed out");
                    return Err(InternalError::Timeout(format!(
                        "database busy for more than {}ms",
                        self.deadline.as_millis()
                    )));
                }
                Err(TryLockError::WouldBlock) => thread::sleep(LOCK_POLL),
            }
        }
    }
}

pub const IN_MEMORY_DATABASE: &str = ":memory:";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    priority TEXT NOT NULL,
    category TEXT NOT NULL,
    due_date TEXT,
    status TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    progress INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE TABLE IF NOT EXISTS task_tags (
    task_id INTEGER NOT NULL,
    num INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (task_id, num)
);
CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    priority TEXT NOT NULL,
    progress REAL NOT NULL DEFAULT 0,
    target_date TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);
CREATE TABLE IF NOT EXISTS goal_milestones (
    goal_id INTEGER NOT NULL,
    num INTEGER NOT NULL,
    text TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (goal_id, num)
);
CREATE TABLE IF NOT EXISTS health_entries (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL,
    duration INTEGER,
    calories INTEGER,
    weight REAL,
    water REAL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS finance_entries (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL,
    category TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    date TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY,
    text TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Declares a closed set of string values stored as TEXT and exchanged in
/// JSON by their wire name.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(text: &str) -> Option<$name> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for rusqlite::types::Value {
            fn from(value: $name) -> rusqlite::types::Value {
                rusqlite::types::Value::Text(value.as_str().to_string())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                $name::parse(text).ok_or_else(|| {
                    rusqlite::types::FromSqlError::Other(
                        format!("unknown {} `{}`", stringify!($name), text).into(),
                    )
                })
            }
        }
    };
}

pub(crate) use text_enum;

text_enum!(
    /// Shared by tasks and goals.
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

pub fn open_database(path: &str) -> InternalResult<Connection> {
    let connection = if path == IN_MEMORY_DATABASE {
        Connection::open_in_memory()?
    } else {
        Connection::open(path)?
    };

    connection.execute_batch(SCHEMA)?;

    Ok(connection)
}

pub async fn attach_database(rocket: Rocket<Build>) -> fairing::Result {
    let config = match rocket.figment().extract::<AppConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid application configuration");
            return Err(rocket);
        }
    };

    let deadline = config.request_timeout();
    match open_database(&config.database).and_then(|connection| {
        connection.busy_timeout(deadline)?;
        Ok(connection)
    }) {
        Ok(connection) => {
            info!(database = %config.database, timeout_secs = deadline.as_secs(), "database ready");
            Ok(rocket.manage(DBConnection::new(connection, deadline)))
        }
        Err(e) => {
            error!(database = %config.database, error = %e, "could not open database");
            Err(rocket)
        }
    }
}

/// Rounded share of `part` in `whole`, 0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }

    ((part as f64 / whole as f64) * 100.0).round() as u32
}
