//! Fixed-window request limiting.
//!
//! Every `/api` route carries the [`General`] guard and search routes
//! additionally carry [`Search`]. Counters live in a [`CounterStore`]:
//! Redis when `rate_limit.redis_url` is configured and reachable, with an
//! in-process fallback otherwise.

pub mod redis_store;
pub mod store;

use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use rocket::{Build, Response, Rocket};
use tracing::{info, warn};

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, RateLimitConfig, WindowConfig};
use crate::internal_error::InternalError;

use redis_store::RedisStore;
use store::{CounterStore, FallbackStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    General,
    Search,
}

impl LimitKind {
    pub fn name(&self) -> &'static str {
        match self {
            LimitKind::General => "general",
            LimitKind::Search => "search",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LimitKind::General => "RATE_LIMIT_EXCEEDED",
            LimitKind::Search => "SEARCH_RATE_LIMIT_EXCEEDED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LimitKind::General => "Too many requests from this IP, please try again later",
            LimitKind::Search => "Too many search requests, please try again later",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u64,
    pub remaining: u64,
    pub reset_after: Duration,
}

impl Quota {
    /// Whole seconds until the window resets, never zero.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub kind: LimitKind,
    pub retry_after: u64,
}

impl From<&Rejection> for InternalError {
    fn from(rejection: &Rejection) -> InternalError {
        InternalError::RateLimited {
            code: rejection.kind.code(),
            message: rejection.kind.message(),
            retry_after: Some(rejection.retry_after),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Exempt,
    Allowed(Quota),
    Rejected(Rejection, Quota),
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> RateLimiter {
        RateLimiter { store, config }
    }

    fn window(&self, kind: LimitKind) -> WindowConfig {
        match kind {
            LimitKind::General => self.config.general,
            LimitKind::Search => self.config.search,
        }
    }

    pub async fn check(&self, kind: LimitKind, client: &str) -> Result<Decision, StoreError> {
        if !self.config.enabled {
            return Ok(Decision::Exempt);
        }

        let window = self.window(kind);
        let key = format!("{}:{}", kind.name(), client);
        let hits = self.store.hit(&key, window.length()).await?;

        let quota = Quota {
            limit: window.max,
            remaining: window.max.saturating_sub(hits.count),
            reset_after: hits.reset_after,
        };

        if hits.count > window.max {
            let rejection = Rejection {
                kind,
                retry_after: quota.reset_secs(),
            };
            Ok(Decision::Rejected(rejection, quota))
        } else {
            Ok(Decision::Allowed(quota))
        }
    }
}

/// Ties a guard to the window it counts against.
pub trait Policy: Send + Sync + 'static {
    const KIND: LimitKind;
}

pub struct General;

impl Policy for General {
    const KIND: LimitKind = LimitKind::General;
}

pub struct Search;

impl Policy for Search {
    const KIND: LimitKind = LimitKind::Search;
}

/// Request guard that counts the request against `P` and fails with 429
/// once the window is exhausted.
pub struct RateLimited<P: Policy>(PhantomData<P>);

struct CachedQuota<P: Policy>(Option<Quota>, PhantomData<P>);

/// Read by the 429 catcher to build the envelope.
pub struct CachedRejection(pub Option<Rejection>);

pub fn client_key(req: &Request<'_>) -> String {
    req.client_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| String::from("unknown"))
}

#[rocket::async_trait]
impl<'r, P: Policy> FromRequest<'r> for RateLimited<P> {
    type Error = InternalError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let limiter = match req.rocket().state::<RateLimiter>() {
            Some(limiter) => limiter,
            None => return request::Outcome::Success(RateLimited(PhantomData)),
        };

        let client = client_key(req);
        match limiter.check(P::KIND, &client).await {
            Ok(Decision::Exempt) => request::Outcome::Success(RateLimited(PhantomData)),
            Ok(Decision::Allowed(quota)) => {
                req.local_cache(|| CachedQuota::<P>(Some(quota), PhantomData));
                request::Outcome::Success(RateLimited(PhantomData))
            }
            Ok(Decision::Rejected(rejection, quota)) => {
                req.local_cache(|| CachedQuota::<P>(Some(quota), PhantomData));
                req.local_cache(|| CachedRejection(Some(rejection)));
                warn!(%client, limit = P::KIND.name(), retry_after = rejection.retry_after, "rate limit exceeded");
                request::Outcome::Error((Status::TooManyRequests, InternalError::from(&rejection)))
            }
            Err(e) => {
                warn!(error = %e, %client, "rate limit check failed, letting request through");
                request::Outcome::Success(RateLimited(PhantomData))
            }
        }
    }
}

/// Adds `RateLimit-*` headers for the most specific window a request was
/// counted against.
pub struct RateLimitHeaders;

#[rocket::async_trait]
impl Fairing for RateLimitHeaders {
    fn info(&self) -> Info {
        Info {
            name: "Rate limit headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let search = req.local_cache(|| CachedQuota::<Search>(None, PhantomData)).0;
        let general = req.local_cache(|| CachedQuota::<General>(None, PhantomData)).0;

        if let Some(quota) = search.or(general) {
            res.set_raw_header("RateLimit-Limit", quota.limit.to_string());
            res.set_raw_header("RateLimit-Remaining", quota.remaining.to_string());
            res.set_raw_header("RateLimit-Reset", quota.reset_secs().to_string());
        }
    }
}

/// Ignite step that installs the [`RateLimiter`].
pub async fn attach_limiter(rocket: Rocket<Build>) -> fairing::Result {
    let config = match rocket.figment().extract::<AppConfig>() {
        Ok(config) => config.rate_limit,
        Err(e) => {
            tracing::error!(error = %e, "invalid rate limit configuration");
            return Err(rocket);
        }
    };

    let primary: Option<Box<dyn CounterStore>> = match &config.redis_url {
        Some(url) if config.enabled => match RedisStore::connect(url).await {
            Ok(store) => Some(Box::new(store)),
            Err(e) => {
                warn!(error = %e, "redis unavailable, rate limit counters stay in process");
                None
            }
        },
        _ => None,
    };

    info!(
        enabled = config.enabled,
        shared = primary.is_some(),
        general_max = config.general.max,
        search_max = config.search.max,
        "rate limiter ready"
    );

    let store: Arc<dyn CounterStore> = Arc::new(FallbackStore::new(primary));
    Ok(rocket.manage(RateLimiter::new(store, config)))
}
