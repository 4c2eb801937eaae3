//! Demo terminal service: a toy login plus two commands

use crate::errors::Failure;
use crate::rpc::{MethodSet, RpcService};

const DEMO_USER: &str = "demo";
const DEMO_PASSWORD: &str = "demo";
const DEMO_TOKEN: &str = "token-1234";

#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    fn login(&self, username: String, password: String) -> Result<String, Failure> {
        if username == DEMO_USER && password == DEMO_PASSWORD {
            Ok(DEMO_TOKEN.to_string())
        } else {
            Err(Failure::from("Wrong password"))
        }
    }

    fn ls(&self, _token: String) -> Result<Vec<String>, Failure> {
        Ok(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    }

    fn help(&self) -> Result<String, Failure> {
        Ok("Help\nHelp\nHelp\n".to_string())
    }
}

impl RpcService for Terminal {
    fn methods(methods: &mut MethodSet<Self>) {
        methods
            .method("Login", Self::login)
            .method("Ls", Self::ls)
            .method("Help", Self::help);
    }
}
