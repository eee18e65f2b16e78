use chrono::{DateTime, Utc};
use rocket::{get, routes, Route, State};
use rusqlite::Connection;
use serde::Serialize;

use std::collections::BTreeMap;

use crate::data::DBConnection;
use crate::envelope::Reply;
use crate::internal_error::InternalResult;
use crate::rate_limit::{General, RateLimited};

pub const SERVICE_NAME: &str = "lifeplanner";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Launch time, managed at build.
pub struct StartedAt(pub DateTime<Utc>);

const COLLECTIONS: &[(&str, &str)] = &[
    ("tasks", "tasks"),
    ("goals", "goals"),
    ("health", "health_entries"),
    ("finance", "finance_entries"),
    ("notes", "notes"),
];

const ENDPOINTS: &[(&str, &str)] = &[
    ("health", "/health"),
    ("dashboard", "/api/dashboard"),
    ("tasks", "/api/tasks"),
    ("goals", "/api/goals"),
    ("healthEntries", "/api/health"),
    ("finance", "/api/finance"),
    ("notes", "/api/notes"),
];

pub fn health_routes() -> Vec<Route> {
    routes![get_health]
}

pub fn api_routes() -> Vec<Route> {
    routes![get_api_root]
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub records: BTreeMap<&'static str, i64>,
}

#[derive(Serialize, Debug)]
pub struct ApiRoot {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

pub fn count_records(db_connection: &Connection) -> InternalResult<BTreeMap<&'static str, i64>> {
    let mut records = BTreeMap::new();
    for (name, table) in COLLECTIONS {
        let count: i64 =
            db_connection.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        records.insert(*name, count);
    }

    Ok(records)
}

#[get("/health")]
pub fn get_health(
    started_at: &State<StartedAt>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<HealthReport>> {
    let records = count_records(&*db_connection.lock()?)?;
    let now = Utc::now();

    Ok(Reply::ok(HealthReport {
        status: "ok",
        version: VERSION,
        started_at: started_at.0,
        uptime_secs: (now - started_at.0).num_seconds(),
        records,
    }))
}

#[get("/")]
pub fn get_api_root(_limit: RateLimited<General>) -> Reply<ApiRoot> {
    Reply::ok(ApiRoot {
        name: SERVICE_NAME,
        version: VERSION,
        endpoints: ENDPOINTS.iter().copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{open_database, IN_MEMORY_DATABASE};

    #[test]
    fn counts_every_collection() {
        let connection = open_database(IN_MEMORY_DATABASE).unwrap();
        connection
            .execute(
                "INSERT INTO notes (text, completed, created_at, updated_at) VALUES ('a', 0, '', '')",
                [],
            )
            .unwrap();

        let records = count_records(&connection).unwrap();
        assert_eq!(records.len(), COLLECTIONS.len());
        assert_eq!(records["notes"], 1);
        assert_eq!(records["tasks"], 0);
    }
}
