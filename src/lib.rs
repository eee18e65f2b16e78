use chrono::Utc;
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::{Build, Config, Rocket};

pub mod catchers;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod envelope;
pub mod finance;
pub mod goals;
pub mod health;
pub mod internal_error;
pub mod listing;
pub mod logging;
pub mod notes;
pub mod rate_limit;
pub mod status;
pub mod tasks;
pub mod validation;

use config::AppConfig;
use status::StartedAt;

/// The service configured from `Rocket.toml` and `ROCKET_*` variables.
pub fn rocket() -> Rocket<Build> {
    build(Config::figment())
}

pub fn build(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(AdHoc::config::<AppConfig>())
        .attach(AdHoc::try_on_ignite("SQLite database", data::attach_database))
        .attach(AdHoc::try_on_ignite("Rate limiter", rate_limit::attach_limiter))
        .attach(rate_limit::RateLimitHeaders)
        .attach(logging::RequestLogger)
        .manage(StartedAt(Utc::now()))
        .mount("/", status::health_routes())
        .mount("/api", status::api_routes())
        .mount("/api", dashboard::routes())
        .mount("/api/tasks", tasks::endpoints::routes())
        .mount("/api/goals", goals::endpoints::routes())
        .mount("/api/health", health::endpoints::routes())
        .mount("/api/finance", finance::endpoints::routes())
        .mount("/api/notes", notes::endpoints::routes())
        .register("/", catchers::catchers())
}
