use crate::mock::http::Status;
use crate::types::{ErrorBody, GenerateRequest, ModelList, TokenStream};

pub const TAGS_PATH: &str = "/api/tags";
pub const GENERATE_PATH: &str = "/api/generate";

/// What a request resolves to, before anything is written to the socket.
pub enum Reply {
    /// Headers only; used for preflight.
    Empty,
    Json(JsonReply),
    Stream(TokenStream),
}

pub struct JsonReply {
    pub status: Status,
    pub body: serde_json::Value,
}

impl Reply {
    fn json<T: serde::Serialize>(status: Status, body: &T) -> Self {
        let body = serde_json::to_value(body).unwrap_or(serde_json::Value::Null);
        Reply::Json(JsonReply { status, body })
    }

    fn not_found() -> Self {
        Reply::json(Status::Ok, &ErrorBody::endpoint_not_found())
    }

    pub fn bad_request(message: &str) -> Self {
        Reply::json(Status::BadRequest, &ErrorBody::new(message))
    }

    pub fn status(&self) -> Status {
        match self {
            Reply::Json(json) => json.status,
            Reply::Empty | Reply::Stream(_) => Status::Ok,
        }
    }
}

/// Maps a request onto its reply. Holds no state between calls.
///
/// Unknown paths answer `200` with an error body, which is what the
/// extension under development expects from this mock.
pub fn dispatch(method: &str, path: &str, body: &[u8]) -> Reply {
    match (method, path) {
        ("OPTIONS", _) => Reply::Empty,
        ("GET", TAGS_PATH) => Reply::json(Status::Ok, &ModelList::builtin()),
        ("GET", _) => Reply::not_found(),
        ("POST", GENERATE_PATH) => {
            let request = GenerateRequest::from_body(body);
            if request.stream {
                Reply::Stream(request.into_stream())
            } else {
                Reply::json(Status::Ok, &request.into_response())
            }
        }
        ("POST", _) => Reply::not_found(),
        (other, _) => Reply::json(
            Status::NotImplemented,
            &ErrorBody::new(format!("Unsupported method ('{}')", other)),
        ),
    }
}
