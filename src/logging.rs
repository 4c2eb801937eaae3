use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::rpc::{CallAudit, CallOutcome};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Per-request summary. Responses from the RPC endpoint carry a [`CallAudit`]
/// extension, so the routed `Service.Method` name is logged alongside the HTTP line.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let audit = response.extensions().get::<CallAudit>();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        rpc_method = audit.map(|audit| audit.method.as_str()),
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );

    if let Some(audit) = audit {
        if let Some(reason) = call_warning(audit) {
            warn!(
                rpc_method = %audit.method,
                outcome = audit.outcome.as_str(),
                "{reason}"
            );
        }
    } else if status.is_client_error() && path == crate::RPC_ENDPOINT {
        warn!(method = %method, status = status.as_u16(), "rpc endpoint refused request");
    }

    response
}

// Successful calls are covered by the summary line.
fn call_warning(audit: &CallAudit) -> Option<&'static str> {
    match audit.outcome {
        CallOutcome::Success => None,
        CallOutcome::Failure => Some("rpc method returned an error"),
        CallOutcome::Rejected => Some("rpc call rejected before invocation"),
        CallOutcome::Invalid => Some("rpc body is not a valid request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit(method: &str, outcome: CallOutcome) -> CallAudit {
        CallAudit {
            method: method.to_string(),
            outcome,
        }
    }

    #[test]
    fn only_unsuccessful_calls_warn() {
        assert_eq!(
            call_warning(&audit("Service.Add", CallOutcome::Success)),
            None
        );
        assert_eq!(
            call_warning(&audit("Terminal.Login", CallOutcome::Failure)),
            Some("rpc method returned an error")
        );
        assert_eq!(
            call_warning(&audit("Missing.Add", CallOutcome::Rejected)),
            Some("rpc call rejected before invocation")
        );
        assert_eq!(
            call_warning(&audit("", CallOutcome::Invalid)),
            Some("rpc body is not a valid request")
        );
    }
}
