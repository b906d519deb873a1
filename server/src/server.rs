use serde::{Deserialize, Serialize};
use shared::models::FleetPayload;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::fleet::FleetEngine;
use crate::http_fetch::HttpFetch;

/// Serves the latest payload, recomputing at most once per `ttl` unless asked
/// for a fresh one. Each aggregation is bounded by `deadline`.
pub struct FleetCache<C> {
    engine: FleetEngine<C>,
    ttl: Duration,
    deadline: Duration,
    latest: RwLock<Option<CachedPayload>>,
}

struct CachedPayload {
    computed_at: Instant,
    payload: Arc<FleetPayload>,
}

impl<C: HttpFetch> FleetCache<C> {
    pub fn new(engine: FleetEngine<C>, ttl: Duration, deadline: Duration) -> Self {
        Self {
            engine,
            ttl,
            deadline,
            latest: RwLock::new(None),
        }
    }

    pub async fn payload(&self, force_refresh: bool) -> anyhow::Result<Arc<FleetPayload>> {
        if !force_refresh {
            if let Some(cached) = self.cached().await {
                return Ok(cached);
            }
        }

        let payload = tokio::time::timeout(self.deadline, self.engine.aggregate())
            .await
            .map_err(|_| anyhow::anyhow!("Aggregation exceeded {:?} deadline", self.deadline))??;
        let payload = Arc::new(payload);

        *self.latest.write().await = Some(CachedPayload {
            computed_at: Instant::now(),
            payload: payload.clone(),
        });

        Ok(payload)
    }

    async fn cached(&self) -> Option<Arc<FleetPayload>> {
        let latest = self.latest.read().await;
        latest
            .as_ref()
            .filter(|entry| entry.computed_at.elapsed() < self.ttl)
            .map(|entry| entry.payload.clone())
    }
}

pub async fn run<C: HttpFetch + 'static>(address: std::net::SocketAddr, cache: FleetCache<C>) {
    log::info!("Listening on {}", address);
    warp::serve(routes(Arc::new(cache))).run(address).await
}

pub fn routes<C: HttpFetch + 'static>(
    cache: Arc<FleetCache<C>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path!("health").map(|| StatusCode::OK);

    let balloons_route = warp::path!("api" / "balloons")
        .and(warp::get())
        .and(warp::query::<FleetQuery>())
        .and(with_cache(cache))
        .and_then(balloons::<C>);

    health_route.or(balloons_route).recover(rejection)
}

fn with_cache<C: HttpFetch + 'static>(
    cache: Arc<FleetCache<C>>,
) -> impl Filter<Extract = (Arc<FleetCache<C>>,), Error = Infallible> + Clone {
    warp::any().map(move || cache.clone())
}

#[derive(Debug, Default, Deserialize)]
pub struct FleetQuery {
    fresh: Option<String>,
}

impl FleetQuery {
    fn force_refresh(&self) -> bool {
        self.fresh.as_deref() == Some("1")
    }
}

pub async fn balloons<C: HttpFetch + 'static>(
    query: FleetQuery,
    cache: Arc<FleetCache<C>>,
) -> Result<Response, Rejection> {
    let payload = cache
        .payload(query.force_refresh())
        .await
        .map_err(|e| warp::reject::custom(Error(e)))?;

    let json = warp::reply::json(payload.as_ref());
    Ok(warp::reply::with_header(json, "Cache-Control", "no-store").into_response())
}

#[derive(Debug)]
struct Error(anyhow::Error);
impl warp::reject::Reject for Error {}

#[derive(Serialize)]
struct ErrorMessage {
    error: String,
}

pub async fn rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&ErrorMessage {
                error: "Not found".into(),
            }),
            StatusCode::NOT_FOUND,
        ));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&ErrorMessage {
                error: "Method not allowed".into(),
            }),
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }

    match err.find::<Error>() {
        Some(Error(e)) => log::error!("Failed to fetch live fleet data: {:#}", e),
        None => log::error!("Error: {:?}", err),
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorMessage {
            error: "Failed to fetch fleet data".into(),
        }),
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sources;
    use crate::http_fetch::testing::StaticFetch;
    use crate::snapshots::build_url;
    use anyhow::{anyhow, Result};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TELEMETRY: &str = "https://telemetry.test/treasure";

    fn sources() -> Sources {
        Sources {
            telemetry_base_url: TELEMETRY.to_string(),
            hazard_feed_url: "https://hazards.test/events".to_string(),
        }
    }

    /// Counts how many times the most recent snapshot was requested.
    struct CountingFetch {
        inner: StaticFetch,
        latest_hits: Arc<AtomicUsize>,
    }

    impl HttpFetch for CountingFetch {
        async fn get(&self, url: &str) -> Result<Bytes> {
            if url == build_url(TELEMETRY, 0) {
                self.latest_hits.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.get(url).await
        }
    }

    /// Never answers.
    struct StalledFetch;

    impl HttpFetch for StalledFetch {
        async fn get(&self, _url: &str) -> Result<Bytes> {
            futures::future::pending::<()>().await;
            Err(anyhow!("unreachable"))
        }
    }

    fn counting_cache(ttl: Duration) -> (Arc<FleetCache<CountingFetch>>, Arc<AtomicUsize>) {
        let latest_hits = Arc::new(AtomicUsize::new(0));
        let client = CountingFetch {
            inner: StaticFetch::new().with(build_url(TELEMETRY, 0), "[[10, 20, 5]]"),
            latest_hits: latest_hits.clone(),
        };
        let engine = FleetEngine::new(client, sources());
        let cache = Arc::new(FleetCache::new(engine, ttl, Duration::from_secs(5)));
        (cache, latest_hits)
    }

    #[tokio::test]
    async fn test_balloons_route() {
        let (cache, _) = counting_cache(Duration::from_secs(60));
        let res = warp::test::request()
            .method("GET")
            .path("/api/balloons")
            .reply(&routes(cache))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["cache-control"], "no-store");
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["balloons"][0]["id"], "WB-0000");
        assert_eq!(body["stats"]["totalBalloons"], 1);
        assert!(body["hazardEvents"].as_array().unwrap().is_empty());
        assert!(body["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_cache_reused_until_fresh_requested() {
        let (cache, hits) = counting_cache(Duration::from_secs(60));
        let filter = routes(cache);

        for path in ["/api/balloons", "/api/balloons", "/api/balloons?fresh=0"] {
            let res = warp::test::request().path(path).reply(&filter).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let res = warp::test::request().path("/api/balloons?fresh=1").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_expires() {
        let (cache, hits) = counting_cache(Duration::ZERO);

        cache.payload(false).await.unwrap();
        cache.payload(false).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_server_error() {
        let engine = FleetEngine::new(StalledFetch, sources());
        let cache = Arc::new(FleetCache::new(
            engine,
            Duration::from_secs(60),
            Duration::from_millis(20),
        ));

        let res = warp::test::request().path("/api/balloons").reply(&routes(cache)).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["error"], "Failed to fetch fleet data");
    }

    #[tokio::test]
    async fn test_health_and_unknown_routes() {
        let (cache, _) = counting_cache(Duration::from_secs(60));
        let filter = routes(cache);

        let res = warp::test::request().path("/health").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request().path("/nope").reply(&filter).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_not_a_server_error() {
        let (cache, hits) = counting_cache(Duration::from_secs(60));

        let res = warp::test::request()
            .method("POST")
            .path("/api/balloons")
            .reply(&routes(cache))
            .await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["error"], "Method not allowed");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
