//! Demo services exposed by the binary

pub mod calculator;
pub mod terminal;

use crate::{errors::RegistrationError, rpc::Server};

/// Registers every demo service on `server`.
pub fn register_demo_services(server: &Server) -> Result<(), RegistrationError> {
    server.register(calculator::Service)?;
    server.register(terminal::Terminal)?;
    Ok(())
}
