//! Service registry
//!
//! Owns the mapping from service name to the validated method table of a
//! registered object. One lock guards the map; it is held for map access only,
//! never while a method runs.

use std::{
    any::Any,
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::RegistrationError;
use crate::rpc::method::{validate_signature, BoundCall, MethodDescriptor, MethodSet, RpcService};
use crate::rpc::types::{is_exported, short_type_name, Argument};

/// A registered object and its invocable methods.
pub struct Service {
    name: String,
    target: Arc<dyn Any + Send + Sync>,
    methods: HashMap<String, MethodDescriptor>,
}

impl Service {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.target
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    pub fn summary(&self) -> ServiceSummary {
        let mut methods: Vec<MethodSummary> = self
            .methods
            .values()
            .map(|method| MethodSummary {
                name: method.name().to_string(),
                params: method
                    .param_types()
                    .iter()
                    .map(|param| param.type_name())
                    .collect(),
                result: method.result_type().type_name(),
                calls: method.call_count(),
            })
            .collect();
        methods.sort_by(|left, right| left.name.cmp(&right.name));

        ServiceSummary {
            name: self.name.clone(),
            methods,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceSummary {
    pub name: String,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MethodSummary {
    pub name: String,
    pub params: Vec<String>,
    pub result: String,
    pub calls: u64,
}

/// Process-wide routing table from service name to [`Service`].
#[derive(Default)]
pub struct Server {
    services: Mutex<HashMap<String, Arc<Service>>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its type name, which must be exported.
    pub fn register<S: RpcService>(&self, service: S) -> Result<(), RegistrationError> {
        self.install(service, None)
    }

    /// Registers `service` under `name`, used verbatim.
    pub fn register_name<S: RpcService>(
        &self,
        name: &str,
        service: S,
    ) -> Result<(), RegistrationError> {
        self.install(service, Some(name))
    }

    pub fn service(&self, name: &str) -> Option<Arc<Service>> {
        self.services.lock().get(name).cloned()
    }

    /// Summaries of every registered service, sorted by name.
    pub fn services(&self) -> Vec<ServiceSummary> {
        let services: Vec<Arc<Service>> = self.services.lock().values().cloned().collect();
        let mut summaries: Vec<ServiceSummary> =
            services.iter().map(|service| service.summary()).collect();
        summaries.sort_by(|left, right| left.name.cmp(&right.name));
        summaries
    }

    fn install<S: RpcService>(
        &self,
        service: S,
        explicit_name: Option<&str>,
    ) -> Result<(), RegistrationError> {
        let type_name = std::any::type_name::<S>();
        let name = explicit_name.unwrap_or_else(|| short_type_name::<S>());

        if name.is_empty() || (explicit_name.is_none() && !is_exported(name)) {
            let err = RegistrationError::InvalidServiceName {
                name: name.to_string(),
                type_name,
            };
            warn!(error = %err, "service registration rejected");
            return Err(err);
        }

        if self.services.lock().contains_key(name) {
            return Err(RegistrationError::DuplicateService {
                name: name.to_string(),
            });
        }

        let target = Arc::new(service);
        let methods = build_method_table(name, &target);
        if methods.is_empty() {
            let err = RegistrationError::NoEligibleMethods {
                name: name.to_string(),
            };
            warn!(error = %err, "service registration rejected");
            return Err(err);
        }

        let method_count = methods.len();
        let registered = Arc::new(Service {
            name: name.to_string(),
            target,
            methods,
        });

        match self.services.lock().entry(name.to_string()) {
            Entry::Occupied(_) => {
                return Err(RegistrationError::DuplicateService {
                    name: name.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(registered);
            }
        }

        info!(service = %name, methods = method_count, "service registered");
        Ok(())
    }
}

fn build_method_table<S: RpcService>(
    service_name: &str,
    target: &Arc<S>,
) -> HashMap<String, MethodDescriptor> {
    let mut declared = MethodSet::new();
    S::methods(&mut declared);

    let mut methods = HashMap::new();
    for candidate in declared.into_candidates() {
        if !is_exported(&candidate.name) {
            debug!(service = %service_name, method = %candidate.name, "skipping unexported method");
            continue;
        }

        if let Err(rejection) = validate_signature(&candidate.signature) {
            warn!(
                service = %service_name,
                method = %candidate.name,
                reason = %rejection,
                "method skipped"
            );
            continue;
        }

        if methods.contains_key(&candidate.name) {
            warn!(
                service = %service_name,
                method = %candidate.name,
                "method declared more than once, keeping the first"
            );
            continue;
        }

        let mut returns = candidate.signature.returns.into_iter();
        let Some(result_type) = returns.next() else {
            continue;
        };

        let receiver = Arc::clone(target);
        let call = candidate.call;
        let bound: BoundCall =
            Box::new(move |args: Vec<Argument>| call(receiver.as_ref(), args));

        methods.insert(
            candidate.name.clone(),
            MethodDescriptor::new(
                candidate.name,
                candidate.signature.params,
                result_type,
                bound,
            ),
        );
    }

    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Failure;
    use crate::rpc::method::MethodSignature;
    use crate::rpc::types::TypeDescriptor;
    use serde_json::Value;

    struct Calculator;

    impl Calculator {
        fn add(&self, a: f64, b: f64) -> Result<f64, Failure> {
            Ok(a + b)
        }

        fn negate(&self, value: i64) -> Result<i64, Failure> {
            Ok(-value)
        }
    }

    impl RpcService for Calculator {
        fn methods(methods: &mut MethodSet<Self>) {
            methods
                .method("Add", Self::add)
                .method("Negate", Self::negate)
                .method("helper", Self::negate)
                .declare(
                    "Broken",
                    MethodSignature {
                        params: vec![],
                        returns: vec![TypeDescriptor::String],
                    },
                    |_, _| Ok(Value::Null),
                );
        }
    }

    struct Empty;

    impl RpcService for Empty {
        fn methods(methods: &mut MethodSet<Self>) {
            methods.declare(
                "Status",
                MethodSignature {
                    params: vec![],
                    returns: vec![TypeDescriptor::String, TypeDescriptor::Bool],
                },
                |_, _| Ok(Value::Null),
            );
        }
    }

    #[allow(non_camel_case_types)]
    struct calc;

    impl RpcService for calc {
        fn methods(methods: &mut MethodSet<Self>) {
            methods.method("Ping", |_: &calc| -> Result<String, Failure> {
                Ok("pong".to_string())
            });
        }
    }

    #[test]
    fn registers_under_type_name_with_valid_methods_only() {
        let server = Server::new();
        server.register(Calculator).expect("registers");

        let service = server.service("Calculator").expect("service present");
        let mut names: Vec<&str> = service.methods().map(MethodDescriptor::name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Add", "Negate"]);
        assert!(service.method("helper").is_none());
        assert!(service.method("Broken").is_none());
        assert!(service.target().downcast_ref::<Calculator>().is_some());
    }

    #[test]
    fn registers_under_explicit_name() {
        let server = Server::new();
        server.register_name("math", Calculator).expect("registers");

        assert!(server.service("math").is_some());
        assert!(server.service("Calculator").is_none());
    }

    #[test]
    fn explicit_name_skips_exported_check() {
        let server = Server::new();
        server.register_name("lower", calc).expect("registers");
        assert!(server.service("lower").is_some());
    }

    #[test]
    fn duplicate_names_are_rejected_and_first_stays() {
        let server = Server::new();
        server.register_name("Svc", Calculator).expect("first registration");

        let err = server
            .register_name("Svc", calc)
            .expect_err("duplicate must fail");
        assert!(matches!(err, RegistrationError::DuplicateService { ref name } if name == "Svc"));

        let service = server.service("Svc").expect("first service kept");
        let add = service.method("Add").expect("add still present");
        let value = add
            .invoke(vec![Argument::Float(40.0), Argument::Float(2.0)])
            .expect("invokes");
        assert_eq!(value, Value::from(42));
    }

    #[test]
    fn unexported_type_name_is_rejected() {
        let server = Server::new();
        let err = server.register(calc).expect_err("lower case type");
        assert_eq!(err.to_string(), "rpc Register: type calc is not exported");
    }

    #[test]
    fn empty_name_is_rejected() {
        let server = Server::new();
        let err = server.register_name("", Calculator).expect_err("empty name");
        assert!(matches!(err, RegistrationError::InvalidServiceName { .. }));
        assert!(err.to_string().starts_with("rpc: no service name for type"));
    }

    #[test]
    fn service_without_eligible_methods_fails() {
        let server = Server::new();
        let err = server.register(Empty).expect_err("no methods");
        assert_eq!(
            err.to_string(),
            "rpc Register: type Empty has no exported methods of suitable type"
        );
        assert!(server.service("Empty").is_none());
    }

    #[test]
    fn summaries_list_methods_and_types() {
        let server = Server::new();
        server.register(Calculator).expect("registers");
        server.register_name("Other", calc).expect("registers");

        let summaries = server.services();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Calculator");
        assert_eq!(
            summaries[0].methods[0],
            MethodSummary {
                name: "Add".to_string(),
                params: vec!["f64".to_string(), "f64".to_string()],
                result: "f64".to_string(),
                calls: 0,
            }
        );
        assert_eq!(summaries[1].name, "Other");
    }
}
