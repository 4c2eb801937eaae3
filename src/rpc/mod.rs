//! Service registry and introspection-based dispatch engine
//!
//! Services are registered once, ahead of traffic; every request then goes
//! through [`Server::dispatch`] to be routed, coerced and invoked.

pub mod coerce;
pub mod dispatch;
pub mod method;
pub mod registry;
pub mod types;

pub use dispatch::{CallAudit, CallOutcome, Request, Response, RESPONSE_CONTENT_TYPE};
pub use method::{Handler, MethodDescriptor, MethodSet, MethodSignature, RpcService};
pub use registry::{MethodSummary, Server, Service, ServiceSummary};
pub use types::{Argument, FromArgument, Obj, ResultValue, TypeDescriptor};
