use serde::Deserialize;
use serde::Serialize;
use warp::http::header;
use warp::http::HeaderValue;
use warp::http::Response;
use warp::http::StatusCode;
use warp::hyper::Body;

pub const UNAUTHORIZED_ERROR: &str = "UnauthorizedError";
pub const DB_COMMUNICATION_ERROR: &str = "DBCommunicationError";

const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// JSON body of every error answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

pub fn error_response(
    status: StatusCode,
    name: &str,
    message: impl Into<String>,
) -> Response<Body> {
    let body = ErrorBody {
        name: name.to_string(),
        message: message.into(),
    };
    // Serializing two strings cannot fail
    let payload = serde_json::to_vec(&body).unwrap_or_default();

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

pub fn unauthorized_response(message: impl Into<String>) -> Response<Body> {
    error_response(StatusCode::UNAUTHORIZED, UNAUTHORIZED_ERROR, message)
}

/// 200 with event-stream headers around a streamed body
pub fn event_stream_response(body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
