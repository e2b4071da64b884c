use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::FeedbackDb;
use crate::model::{Analysis, Submission};

const MAX_BODY_BYTES: u64 = 64 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    pub message: String,
    pub analysis: Analysis,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Legacy payload; insights are computed client-side now.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct InsightsResponse {
    pub insights: Vec<serde_json::Value>,
}

pub struct VerdictServer {
    db: Arc<FeedbackDb>,
}

impl VerdictServer {
    pub fn new(db: Arc<FeedbackDb>) -> Self {
        Self { db }
    }

    /// Serves until `shutdown` resolves. Fails only if the address cannot be bound.
    pub async fn run<S>(&self, addr: SocketAddr, shutdown: S) -> Result<(), warp::Error>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(routes(self.db.clone()))
            .try_bind_with_graceful_shutdown(addr, shutdown)?;

        info!("Verdict listening on {}", bound);
        server.await;
        Ok(())
    }
}

pub fn routes(db: Arc<FeedbackDb>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // GET /
    let index = warp::path::end()
    .and(warp::get())
    .map(|| warp::reply::html(INDEX_HTML));

    // POST /api/feedback
    let submit = warp::path!("api" / "feedback")
    .and(warp::post())
    .and(warp::body::content_length_limit(MAX_BODY_BYTES))
    .and(warp::body::json())
    .and(with_db(db.clone()))
    .and_then(handle_submit);

    // GET /api/feedback/<product_id>
    let product = warp::path!("api" / "feedback" / String)
    .and(warp::get())
    .and(with_db(db))
    .and_then(handle_product_feedback);

    // GET /api/insights/<product_id>
    let insights = warp::path!("api" / "insights" / String)
    .and(warp::get())
    .map(|_product_id: String| warp::reply::json(&InsightsResponse::default()));

    index
    .or(submit)
    .or(product)
    .or(insights)
    .recover(handle_rejection)
    .with(warp::trace::request())
}

fn with_db(db: Arc<FeedbackDb>) -> impl Filter<Extract = (Arc<FeedbackDb>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse { error: message.to_string() };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_submit(submission: Submission, db: Arc<FeedbackDb>) -> Result<Response, Rejection> {
    let feedback = match submission.validate() {
        Ok(feedback) => feedback,
        Err(e) => {
            warn!("Rejected submission: {}", e);
            return Ok(error_reply(StatusCode::BAD_REQUEST, &e.to_string()));
        }
    };

    let product_id = feedback.product_id.clone();

    // File rewrite is blocking I/O
    let res = tokio::task::spawn_blocking(move || db.submit(feedback)).await;

    match res {
        Ok(Ok(analysis)) => {
            info!(%product_id, sentiment = %analysis.sentiment, themes = ?analysis.themes, "Feedback received");
            let body = SubmitResponse {
                message: "Feedback received".to_string(),
                analysis,
            };
            Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::CREATED).into_response())
        }
        Ok(Err(e)) => {
            error!(%product_id, "Persist Failed: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to persist feedback"))
        }
        Err(e) => {
            error!(%product_id, "Submit Task Error: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to persist feedback"))
        }
    }
}

async fn handle_product_feedback(product_id: String, db: Arc<FeedbackDb>) -> Result<Response, Rejection> {
    let product_id = urlencoding::decode(&product_id)
    .map(|decoded| decoded.into_owned())
    .unwrap_or(product_id);

    // A submit may hold the lock through a full file rewrite
    match tokio::task::spawn_blocking(move || db.product_feedback(&product_id)).await {
        Ok(feedback) => Ok(warp::reply::json(&feedback).into_response()),
        Err(e) => {
            error!("Read Task Error: {}", e);
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid JSON body")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(error_reply(status, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_routes() -> (TempDir, impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(FeedbackDb::open(&dir.path().join("feedback.json")));
        (dir, routes(db))
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let (_dir, api) = test_routes();
        let res = warp::test::request().method("GET").path("/").reply(&api).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(res.body()).contains("Product Feedback"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (_dir, api) = test_routes();
        let res = warp::test::request().method("GET").path("/nope").reply(&api).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.error, "Not found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (_dir, api) = test_routes();
        let res = warp::test::request().method("GET").path("/api/feedback").reply(&api).await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (_dir, api) = test_routes();
        let res = warp::test::request()
        .method("POST")
        .path("/api/feedback")
        .header("content-type", "application/json")
        .body("{\"product_id\": ")
        .reply(&api)
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body.error, "Invalid JSON body");
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let (_dir, api) = test_routes();
        let text = "a".repeat(MAX_BODY_BYTES as usize);
        let res = warp::test::request()
        .method("POST")
        .path("/api/feedback")
        .json(&serde_json::json!({"product_id": "P1", "rating": 5, "text": text}))
        .reply(&api)
        .await;

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_product_read_does_not_stall_runtime_during_write() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(FeedbackDb::open(&dir.path().join("feedback.json")));
        let api = routes(db.clone());
        let ticked = Arc::new(AtomicBool::new(false));
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();

        // Stands in for a submit holding the lock across a slow fsync
        let writer = {
            let db = db.clone();
            let ticked = ticked.clone();
            std::thread::spawn(move || {
                let _guard = db.records.lock().unwrap();
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(300));
                ticked.load(Ordering::SeqCst)
            })
        };
        locked_rx.recv().unwrap();

        let tick = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ticked.store(true, Ordering::SeqCst);
        };
        let read = warp::test::request().method("GET").path("/api/feedback/P1").reply(&api);
        let (_, res) = tokio::join!(tick, read);

        assert_eq!(res.status(), StatusCode::OK);
        assert!(writer.join().unwrap(), "timer could not fire while the read waited on the lock");
    }
}
