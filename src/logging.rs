use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use std::time::Instant;

use crate::rate_limit::client_key;

/// Installs the global subscriber, filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

struct RequestStart(Option<Instant>);

/// Logs one line per request once its response is ready.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        req.local_cache(|| RequestStart(Some(Instant::now())));
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let latency_ms = req
            .local_cache(|| RequestStart(None))
            .0
            .map(|start| start.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or_default();
        let status = res.status().code;
        let client = client_key(req);

        if status >= 500 {
            warn!(method = %req.method(), path = %req.uri().path(), status, %client, latency_ms, "request completed");
        } else {
            info!(method = %req.method(), path = %req.uri().path(), status, %client, latency_ms, "request completed");
        }
    }
}
