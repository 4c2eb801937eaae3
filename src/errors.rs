use thiserror::Error;

/// Failure reported by a service method in its status slot.
///
/// The message is passed to the caller verbatim in the response `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Failure {
    message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{}", describe_invalid_name(.name, .type_name))]
    InvalidServiceName {
        name: String,
        type_name: &'static str,
    },
    #[error("rpc: service already defined: {name}")]
    DuplicateService { name: String },
    #[error("rpc Register: type {name} has no exported methods of suitable type")]
    NoEligibleMethods { name: String },
}

fn describe_invalid_name(name: &str, type_name: &str) -> String {
    if name.is_empty() {
        format!("rpc: no service name for type {type_name}")
    } else {
        format!("rpc Register: type {name} is not exported")
    }
}

/// Reason a single method was left out of a service's method table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodRejection {
    #[error("argument {position} type not exported: {type_name}")]
    ParamNotExported { position: usize, type_name: String },
    #[error("argument {position} has unsupported type: {type_name}")]
    UnsupportedParam { position: usize, type_name: String },
    #[error("has wrong number of outs: {count}")]
    WrongReturnCount { count: usize },
    #[error("return type not exported: {type_name}")]
    ResultNotExported { type_name: String },
    #[error("returns unsupported type: {type_name}")]
    UnsupportedResult { type_name: String },
    #[error("returns {type_name} not Failure")]
    MissingFailureSlot { type_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Parameters must be an array.")]
    MalformedParams,
    #[error("Incorrect number of parameters.")]
    WrongParamCount { expected: usize, actual: usize },
    #[error("Type mismatch parameter {position}.")]
    TypeMismatch { position: usize },
}

/// Request-time failure. `Display` yields the literal `error` string sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid JSON-RPC.")]
    InvalidRequest,
    #[error("Service not found.")]
    ServiceNotFound,
    #[error("Method not found.")]
    MethodNotFound,
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Application(#[from] Failure),
}
