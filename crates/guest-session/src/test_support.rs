//! Shared test fakes for the session crate.

use futures_util::future::BoxFuture;
use guest_api::{ApiError, ApiRequest, ApiResponse, ApiResult, HttpTransport};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport fake that replays scripted results and records every request.
pub struct MockTransport {
    results: Mutex<VecDeque<ApiResult<ApiResponse>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(results: Vec<ApiResult<ApiResponse>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.path == path)
            .count()
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpTransport for MockTransport {
    fn execute(&self, request: ApiRequest) -> BoxFuture<'static, ApiResult<ApiResponse>> {
        self.calls.lock().unwrap().push(request);
        let result = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ApiResponse {
                status: 200,
                body: Value::Null,
            }));
        // Yield once so concurrent callers actually interleave, the way a
        // real network round trip would let them.
        Box::pin(async move {
            tokio::task::yield_now().await;
            result
        })
    }
}

pub fn ok(body: Value) -> ApiResult<ApiResponse> {
    Ok(ApiResponse { status: 200, body })
}

pub fn status(status: u16) -> ApiResult<ApiResponse> {
    Ok(ApiResponse {
        status,
        body: Value::Null,
    })
}

pub fn network_error() -> ApiResult<ApiResponse> {
    Err(ApiError::UnexpectedResponse(
        "scripted network failure".to_string(),
    ))
}
