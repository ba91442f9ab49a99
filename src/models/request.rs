use http::Method;
use serde::Serialize;
use serde_json::Value;

/// How a successful response body should be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    Json,
    /// Raw bytes, e.g. an exported spreadsheet or PDF.
    Blob,
}

/// A decoded 2xx response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Blob(Vec<u8>),
}

impl ResponseBody {
    /// Returns the JSON payload, or `None` for blob responses.
    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Blob(_) => None,
        }
    }

    /// Returns the raw payload. JSON bodies are re-serialized.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ResponseBody::Blob(bytes) => bytes,
            ResponseBody::Json(value) => value.to_string().into_bytes(),
        }
    }
}

/// A request against the backend, described independently of the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative to the configured base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub response_kind: ResponseKind,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            response_kind: ResponseKind::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes any payload into the request body.
    pub fn try_json<T: Serialize>(self, body: &T) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(body)?;
        Ok(self.json(value))
    }

    pub fn blob(mut self) -> Self {
        self.response_kind = ResponseKind::Blob;
        self
    }
}

/// An in-flight request plus the flag that bounds it to a single retry.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: ApiRequest,
    retried: bool,
}

impl PendingRequest {
    pub fn new(request: ApiRequest) -> Self {
        PendingRequest {
            request,
            retried: false,
        }
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Flags the request as retried. Returns `false` if it already was.
    pub fn mark_retried(&mut self) -> bool {
        !std::mem::replace(&mut self.retried, true)
    }
}
