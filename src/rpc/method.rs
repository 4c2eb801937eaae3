//! Method declaration, signature validation and the per-method descriptor
//!
//! A service lists its remote methods in [`RpcService::methods`]. Each declaration
//! becomes a candidate signature; [`validate_signature`] decides at registration
//! time whether it can be invoked remotely. Survivors are bound to the receiver
//! and stored as immutable [`MethodDescriptor`]s.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::{CoercionError, Failure, MethodRejection};
use crate::rpc::types::{is_exported, Argument, FromArgument, ResultValue, TypeDescriptor};

/// An object whose methods can be exposed through the dispatcher.
pub trait RpcService: Sized + Send + Sync + 'static {
    fn methods(methods: &mut MethodSet<Self>);
}

/// Declared shape of one method: positional parameters and every return slot.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    pub params: Vec<TypeDescriptor>,
    pub returns: Vec<TypeDescriptor>,
}

/// Invocation thunk bound to its receiver.
pub type BoundCall = Box<dyn Fn(Vec<Argument>) -> Result<Value, Failure> + Send + Sync>;

type UnboundCall<S> = Arc<dyn Fn(&S, Vec<Argument>) -> Result<Value, Failure> + Send + Sync>;

/// Typed method implementation, implemented for `Fn(&S, A1, .., An) -> Result<R, Failure>`.
pub trait Handler<S, Args>: Send + Sync + 'static {
    fn params() -> Vec<TypeDescriptor>;

    fn result() -> TypeDescriptor;

    fn invoke(&self, target: &S, args: Vec<Argument>) -> Result<Value, Failure>;
}

fn take_argument<T: FromArgument>(
    args: &mut std::vec::IntoIter<Argument>,
    position: usize,
) -> Result<T, Failure> {
    args.next()
        .and_then(T::from_argument)
        .ok_or_else(|| Failure::new(CoercionError::TypeMismatch { position }.to_string()))
}

fn check_arity(expected: usize, actual: usize) -> Result<(), Failure> {
    if expected == actual {
        return Ok(());
    }
    Err(Failure::new(
        CoercionError::WrongParamCount { expected, actual }.to_string(),
    ))
}

fn encode_result<R: ResultValue>(value: R) -> Result<Value, Failure> {
    value
        .into_value()
        .map_err(|err| Failure::new(format!("failed to encode result: {err}")))
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<S, F, R, $($arg,)*> Handler<S, ($($arg,)*)> for F
        where
            S: 'static,
            F: Fn(&S, $($arg),*) -> Result<R, Failure> + Send + Sync + 'static,
            R: ResultValue,
            $($arg: FromArgument,)*
        {
            fn params() -> Vec<TypeDescriptor> {
                vec![$($arg::descriptor()),*]
            }

            fn result() -> TypeDescriptor {
                R::descriptor()
            }

            fn invoke(&self, target: &S, args: Vec<Argument>) -> Result<Value, Failure> {
                let arity = <[&str]>::len(&[$(stringify!($arg)),*]);
                check_arity(arity, args.len())?;
                let mut args = args.into_iter();
                let mut position = 0;
                $(
                    position += 1;
                    let $arg = take_argument::<$arg>(&mut args, position)?;
                )*
                encode_result((self)(target, $($arg),*)?)
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);

pub(crate) struct Candidate<S> {
    pub name: String,
    pub signature: MethodSignature,
    pub call: UnboundCall<S>,
}

/// Collects the method declarations of one service.
pub struct MethodSet<S> {
    candidates: Vec<Candidate<S>>,
}

impl<S: 'static> MethodSet<S> {
    pub(crate) fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// Declares a typed method. The signature is always a result slot plus a failure slot.
    pub fn method<Args, H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        Args: 'static,
        H: Handler<S, Args>,
    {
        let signature = MethodSignature {
            params: H::params(),
            returns: vec![H::result(), TypeDescriptor::Failure],
        };
        self.candidates.push(Candidate {
            name: name.to_string(),
            signature,
            call: Arc::new(move |target: &S, args: Vec<Argument>| handler.invoke(target, args)),
        });
        self
    }

    /// Declares a method with a hand-written signature and an untyped thunk.
    pub fn declare<F>(&mut self, name: &str, signature: MethodSignature, call: F) -> &mut Self
    where
        F: Fn(&S, Vec<Argument>) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        self.candidates.push(Candidate {
            name: name.to_string(),
            signature,
            call: Arc::new(call),
        });
        self
    }

    pub(crate) fn into_candidates(self) -> Vec<Candidate<S>> {
        self.candidates
    }
}

/// Checks one declared signature against the rules for remote invocation.
pub fn validate_signature(signature: &MethodSignature) -> Result<(), MethodRejection> {
    for (index, param) in signature.params.iter().enumerate() {
        let position = index + 1;
        if let Some(type_name) = param.object_name() {
            if !is_exported(type_name) {
                return Err(MethodRejection::ParamNotExported {
                    position,
                    type_name: type_name.to_string(),
                });
            }
        }
        if !param.is_param_kind() {
            return Err(MethodRejection::UnsupportedParam {
                position,
                type_name: param.type_name(),
            });
        }
    }

    let [result, status] = signature.returns.as_slice() else {
        return Err(MethodRejection::WrongReturnCount {
            count: signature.returns.len(),
        });
    };

    if let Some(type_name) = result.object_name() {
        if !is_exported(type_name) {
            return Err(MethodRejection::ResultNotExported {
                type_name: type_name.to_string(),
            });
        }
    }
    if !result.is_result_kind() {
        return Err(MethodRejection::UnsupportedResult {
            type_name: result.type_name(),
        });
    }

    if !matches!(status, TypeDescriptor::Failure) {
        return Err(MethodRejection::MissingFailureSlot {
            type_name: status.type_name(),
        });
    }

    Ok(())
}

/// Validated, receiver-bound method of a registered service.
pub struct MethodDescriptor {
    name: String,
    param_types: Vec<TypeDescriptor>,
    result_type: TypeDescriptor,
    call: BoundCall,
    calls: Mutex<u64>,
}

impl MethodDescriptor {
    pub(crate) fn new(
        name: String,
        param_types: Vec<TypeDescriptor>,
        result_type: TypeDescriptor,
        call: BoundCall,
    ) -> Self {
        Self {
            name,
            param_types,
            result_type,
            call,
            calls: Mutex::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_types(&self) -> &[TypeDescriptor] {
        &self.param_types
    }

    pub fn result_type(&self) -> &TypeDescriptor {
        &self.result_type
    }

    pub fn call_count(&self) -> u64 {
        *self.calls.lock()
    }

    /// Counts the call, then runs the method with already coerced arguments.
    pub fn invoke(&self, args: Vec<Argument>) -> Result<Value, Failure> {
        *self.calls.lock() += 1;
        (self.call)(args)
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("param_types", &self.param_types)
            .field("result_type", &self.result_type)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::types::{FloatKind, IntKind, Obj, ObjectType};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Deserialize, Serialize)]
    #[allow(non_camel_case_types)]
    struct hidden {
        #[allow(dead_code)]
        value: i32,
    }

    struct Calc;

    impl Calc {
        fn add(&self, a: f64, b: f64) -> Result<f64, Failure> {
            Ok(a + b)
        }

        fn half(&self, value: i32) -> Result<i32, Failure> {
            if value % 2 != 0 {
                return Err(Failure::from("odd value"));
            }
            Ok(value / 2)
        }
    }

    fn signature(params: Vec<TypeDescriptor>, returns: Vec<TypeDescriptor>) -> MethodSignature {
        MethodSignature { params, returns }
    }

    #[test]
    fn typed_handler_reports_its_signature() {
        let params = <fn(&Calc, f64, f64) -> Result<f64, Failure> as Handler<Calc, (f64, f64)>>::params();
        assert_eq!(params.len(), 2);
        assert!(matches!(params[0], TypeDescriptor::Float(FloatKind::F64)));

        let mut set = MethodSet::<Calc>::new();
        set.method("Add", Calc::add).method("Half", Calc::half);
        let candidates = set.into_candidates();
        assert_eq!(candidates.len(), 2);
        assert!(matches!(
            candidates[1].signature.returns.as_slice(),
            [TypeDescriptor::Integer(IntKind::I32), TypeDescriptor::Failure]
        ));
    }

    #[test]
    fn typed_handler_invokes_with_arguments() {
        let mut set = MethodSet::<Calc>::new();
        set.method("Half", Calc::half);
        let candidate = set.into_candidates().remove(0);

        let value = (candidate.call)(&Calc, vec![Argument::Int(8)]).expect("even value");
        assert_eq!(value, Value::from(4));

        let failure = (candidate.call)(&Calc, vec![Argument::Int(3)]).expect_err("odd value");
        assert_eq!(failure.message(), "odd value");

        let mismatch = (candidate.call)(&Calc, vec![Argument::Str("x".into())])
            .expect_err("wrong argument kind");
        assert_eq!(mismatch.message(), "Type mismatch parameter 1.");
    }

    #[test]
    fn accepts_two_slot_signatures() {
        let ok = signature(
            vec![TypeDescriptor::String, TypeDescriptor::Integer(IntKind::I64)],
            vec![TypeDescriptor::Bool, TypeDescriptor::Failure],
        );
        assert_eq!(validate_signature(&ok), Ok(()));

        let list = signature(
            vec![],
            vec![
                TypeDescriptor::List(Box::new(TypeDescriptor::String)),
                TypeDescriptor::Failure,
            ],
        );
        assert_eq!(validate_signature(&list), Ok(()));
    }

    #[test]
    fn rejects_wrong_return_count() {
        let single = signature(vec![], vec![TypeDescriptor::String]);
        assert_eq!(
            validate_signature(&single),
            Err(MethodRejection::WrongReturnCount { count: 1 })
        );
    }

    #[test]
    fn rejects_missing_failure_slot() {
        let status = signature(vec![], vec![TypeDescriptor::String, TypeDescriptor::Bool]);
        assert_eq!(
            validate_signature(&status),
            Err(MethodRejection::MissingFailureSlot {
                type_name: "bool".to_string()
            })
        );
    }

    #[test]
    fn rejects_unexported_object_types() {
        let param = signature(
            vec![TypeDescriptor::Object(ObjectType::of::<hidden>())],
            vec![TypeDescriptor::String, TypeDescriptor::Failure],
        );
        assert_eq!(
            validate_signature(&param),
            Err(MethodRejection::ParamNotExported {
                position: 1,
                type_name: "hidden".to_string()
            })
        );

        let result = signature(
            vec![],
            vec![
                TypeDescriptor::Object(ObjectType::of::<hidden>()),
                TypeDescriptor::Failure,
            ],
        );
        assert_eq!(
            validate_signature(&result),
            Err(MethodRejection::ResultNotExported {
                type_name: "hidden".to_string()
            })
        );
    }

    #[test]
    fn rejects_unsupported_kinds() {
        let param = signature(
            vec![TypeDescriptor::Bool, TypeDescriptor::Unsupported("Channel")],
            vec![TypeDescriptor::String, TypeDescriptor::Failure],
        );
        assert_eq!(
            validate_signature(&param),
            Err(MethodRejection::UnsupportedParam {
                position: 2,
                type_name: "Channel".to_string()
            })
        );

        let list_param = signature(
            vec![TypeDescriptor::List(Box::new(TypeDescriptor::String))],
            vec![TypeDescriptor::String, TypeDescriptor::Failure],
        );
        assert!(matches!(
            validate_signature(&list_param),
            Err(MethodRejection::UnsupportedParam { position: 1, .. })
        ));
    }

    #[test]
    fn descriptor_counts_calls() {
        let descriptor = MethodDescriptor::new(
            "Ping".to_string(),
            vec![],
            TypeDescriptor::String,
            Box::new(|_| Ok(Value::from("pong"))),
        );
        assert_eq!(descriptor.call_count(), 0);
        descriptor.invoke(vec![]).expect("ping");
        descriptor.invoke(vec![]).expect("ping");
        assert_eq!(descriptor.call_count(), 2);
    }

    #[test]
    fn object_parameters_extract_through_handler() {
        #[derive(Debug, Default, Deserialize, Serialize)]
        struct Pair {
            x: String,
            y: i32,
        }

        struct Echo;

        let mut set = MethodSet::<Echo>::new();
        set.method(
            "Join",
            |_: &Echo, Obj(pair): Obj<Pair>| -> Result<String, Failure> {
                Ok(format!("{}{}", pair.x, pair.y))
            },
        );
        let candidate = set.into_candidates().remove(0);
        let decoded = (ObjectType::of::<Pair>().decode)(&serde_json::json!({"x": "a", "y": 2}))
            .expect("decodes");
        let value = (candidate.call)(&Echo, vec![Argument::Object(decoded)]).expect("joins");
        assert_eq!(value, Value::from("a2"));
    }
}
