//! Demo calculator service backing the bundled web page

use crate::errors::Failure;
use crate::rpc::{MethodSet, RpcService};

#[derive(Debug, Default)]
pub struct Service;

impl Service {
    fn add(&self, a: f64, b: f64) -> Result<f64, Failure> {
        Ok(a + b)
    }

    fn get_name(&self, name: String) -> Result<String, Failure> {
        Ok(format!("hello {name}"))
    }
}

impl RpcService for Service {
    fn methods(methods: &mut MethodSet<Self>) {
        methods
            .method("Add", Self::add)
            .method("GetName", Self::get_name);
    }
}
