//! Request dispatcher
//!
//! Decodes the request envelope, routes `Service.Method` through the registry,
//! coerces parameters, invokes the method and builds the response envelope.
//! Protocol errors and application failures share the `error` string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::DispatchError;
use crate::rpc::coerce::{coerce_params, decode_params};
use crate::rpc::registry::Server;

pub const RESPONSE_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const FALLBACK_RESPONSE: &[u8] = br#"{"id":null,"error":"Invalid JSON-RPC."}"#;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: &DispatchError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// How a dispatched call ended, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    Rejected,
    Invalid,
}

impl CallOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
            Self::Invalid => "invalid",
        }
    }

    fn of(outcome: &Result<Value, DispatchError>) -> Self {
        match outcome {
            Ok(_) => Self::Success,
            Err(DispatchError::Application(_)) => Self::Failure,
            Err(_) => Self::Rejected,
        }
    }
}

/// The routed method name and outcome of one call. `method` is empty when the
/// body did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAudit {
    pub method: String,
    pub outcome: CallOutcome,
}

impl Server {
    /// Handles one raw request body and returns the serialized response body.
    pub fn handle(&self, body: &[u8]) -> Vec<u8> {
        self.handle_audited(body).0
    }

    /// Like [`Server::handle`], also returning the audit record of the call.
    pub fn handle_audited(&self, body: &[u8]) -> (Vec<u8>, CallAudit) {
        let (response, audit) = self.dispatch_audited(body);
        let reply =
            serde_json::to_vec(&response).unwrap_or_else(|_| FALLBACK_RESPONSE.to_vec());
        (reply, audit)
    }

    /// Handles one raw request body.
    pub fn dispatch(&self, body: &[u8]) -> Response {
        self.dispatch_audited(body).0
    }

    fn dispatch_audited(&self, body: &[u8]) -> (Response, CallAudit) {
        let request: Request = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => {
                let audit = CallAudit {
                    method: String::new(),
                    outcome: CallOutcome::Invalid,
                };
                return (
                    Response::failure(Value::Null, &DispatchError::InvalidRequest),
                    audit,
                );
            }
        };

        let outcome = self.call(&request.method, request.params);
        let audit = CallAudit {
            method: request.method,
            outcome: CallOutcome::of(&outcome),
        };

        info!(
            method = %audit.method,
            outcome = audit.outcome.as_str(),
            "rpc call audited"
        );

        let response = match outcome {
            Ok(result) => Response::success(request.id, result),
            Err(err) => Response::failure(request.id, &err),
        };
        (response, audit)
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, DispatchError> {
        let (service_name, method_name) = method
            .split_once('.')
            .ok_or(DispatchError::ServiceNotFound)?;

        let service = self
            .service(service_name)
            .ok_or(DispatchError::ServiceNotFound)?;
        let descriptor = service
            .method(method_name)
            .ok_or(DispatchError::MethodNotFound)?;

        let values = decode_params(params)?;
        let args = coerce_params(&values, descriptor.param_types())?;

        match descriptor.invoke(args) {
            Ok(result) => Ok(result),
            Err(failure) if failure.message().is_empty() => Ok(Value::Null),
            Err(failure) => Err(DispatchError::Application(failure)),
        }
    }
}
