//! Flow programs: operations glued together by continuations.
//!
//! A `Flow<T>` is a tree of binds over single operations. Binding is O(1): a
//! continuation is attached to the program as it stands, never pushed down
//! into existing continuations. Evaluation goes through a [`Cursor`], which
//! walks the tree with an explicit stack of pending continuations, so neither
//! building nor running a program grows the call stack with its length.
//!
//! Results travel between operations and continuations type-erased; each
//! constructor fixes the result type of the operation it wraps and the
//! dispatcher produces exactly that type.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::time::Duration;

use super::control::Control;
use crate::types::{
    ApiRequest, ApiResponse, ErrorResponse, ForeignState, Headers, Outcome, Permission,
    PermissionResponse, PermissionStatus, RestEndpoint, Store,
};
use crate::FlowError;

/// Asynchronous action run through `RunExternalAsync`
pub type ExternalAction = BoxFuture<'static, anyhow::Result<Value>>;

/// Result of an operation or program, with its type erased
pub(crate) type Erased = Box<dyn Any + Send>;

type Continuation = Box<dyn FnOnce(Erased) -> Program + Send>;

pub(crate) fn erase<A: Send + 'static>(value: A) -> Erased {
    Box::new(value)
}

pub(crate) fn unerase<T: 'static>(value: Erased) -> Result<T, FlowError> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| FlowError::TypeMismatch(type_name::<T>().to_string()))
}

/// Untyped program tree
pub(crate) enum Program {
    Done(Erased),
    Throw(FlowError),
    Step(Operation),
    Bind(Box<Program>, Continuation),
}

impl Program {
    fn placeholder() -> Self {
        Program::Done(Box::new(()))
    }
}

/// A Flow program producing a `T`
///
/// Programs are consumed by running them and cannot be reused.
pub struct Flow<T> {
    program: Program,
    _result: PhantomData<fn() -> T>,
}

/// One atomic step of a program
///
/// The doc of each variant names the result it hands to the continuation.
pub enum Operation {
    /// Execute a request through the API collaborator. Yields `ApiResponse`.
    CallApi {
        /// Request to execute
        request: ApiRequest,
    },
    /// Run a UI interaction and wait for the host's answer. Yields `Value`.
    RunUi {
        /// Interaction serialized for the UI collaborator
        interaction: Value,
    },
    /// Run a UI interaction in the background without waiting. Yields `()`.
    ForkUi {
        /// Interaction serialized for the UI collaborator
        interaction: Value,
    },
    /// Read a key from a store. Yields `Option<String>`.
    Read {
        /// Store to read from
        store: Store,
        /// Key to read
        key: String,
    },
    /// Write a key to a store. Yields `()`.
    Write {
        /// Store to write to
        store: Store,
        /// Key to write
        key: String,
        /// Value to write
        value: String,
    },
    /// Delete a key from a store. Yields `()`.
    Delete {
        /// Store to delete from
        store: Store,
        /// Key to delete
        key: String,
    },
    /// Read the whole foreign state. Yields `ForeignState`.
    ReadForeignAll,
    /// Write one foreign state key. Yields `()`.
    WriteForeign {
        /// Key to write
        key: String,
        /// Value to write
        value: Value,
    },
    /// Launch a sub-program concurrently against the same state. Yields `Control`.
    Fork {
        /// Program to launch
        program: Box<Flow<Value>>,
    },
    /// Run an opaque asynchronous action. Yields `Value`.
    RunExternalAsync {
        /// Action to run
        action: ExternalAction,
    },
    /// Wait for a forked program's result. Yields `Value`.
    Await {
        /// Handle returned by `Fork`
        handle: Control,
    },
    /// Suspend the current task. Yields `()`.
    Delay {
        /// How long to sleep
        duration: Duration,
    },
    /// Run branches concurrently and continue with the first result. Yields `Value`.
    Race {
        /// Competing programs
        programs: Vec<Flow<Value>>,
    },
    /// Run a sub-program behind an error-recovery boundary.
    /// Yields `Result<Value, FlowError>`.
    Recover {
        /// Guarded program
        program: Box<Flow<Outcome>>,
    },
    /// Check permissions with the host. Yields `PermissionStatus`.
    CheckPermissions {
        /// Permissions to check
        permissions: Vec<Permission>,
    },
    /// Ask the host to grant permissions. Yields `Vec<PermissionResponse>`.
    RequestPermissions {
        /// Permissions to request
        permissions: Vec<Permission>,
    },
    /// Emit a structured log event. Yields `()`.
    Log {
        /// Short tag
        tag: String,
        /// Message
        message: String,
    },
}

impl Operation {
    /// Short name of the operation kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CallApi { .. } => "call_api",
            Operation::RunUi { .. } => "run_ui",
            Operation::ForkUi { .. } => "fork_ui",
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::Delete { .. } => "delete",
            Operation::ReadForeignAll => "read_foreign_all",
            Operation::WriteForeign { .. } => "write_foreign",
            Operation::Fork { .. } => "fork",
            Operation::RunExternalAsync { .. } => "run_external_async",
            Operation::Await { .. } => "await",
            Operation::Delay { .. } => "delay",
            Operation::Race { .. } => "race",
            Operation::Recover { .. } => "recover",
            Operation::CheckPermissions { .. } => "check_permissions",
            Operation::RequestPermissions { .. } => "request_permissions",
            Operation::Log { .. } => "log",
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Flow<T> {
    fn drop(&mut self) {
        // Unwind left-nested binds one level at a time.
        let mut current = mem::replace(&mut self.program, Program::placeholder());
        while let Program::Bind(inner, next) = current {
            drop(next);
            current = *inner;
        }
    }
}

impl<T> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current = &self.program;
        while let Program::Bind(inner, _) = current {
            current = inner;
        }
        match current {
            Program::Done(_) => f.write_str("Flow::Done(..)"),
            Program::Throw(err) => write!(f, "Flow::Throw({err:?})"),
            Program::Step(op) => write!(f, "Flow::Step({})", op.kind()),
            Program::Bind(..) => f.write_str("Flow::Bind(..)"),
        }
    }
}

impl<T: Send + 'static> Flow<T> {
    fn from_program(program: Program) -> Self {
        Self {
            program,
            _result: PhantomData,
        }
    }

    fn step(operation: Operation) -> Self {
        Self::from_program(Program::Step(operation))
    }

    pub(crate) fn into_program(mut self) -> Program {
        mem::replace(&mut self.program, Program::placeholder())
    }

    /// A finished program
    pub fn pure(value: T) -> Self {
        Self::from_program(Program::Done(erase(value)))
    }

    /// A program that fails immediately
    pub fn throw(error: FlowError) -> Self {
        Self::from_program(Program::Throw(error))
    }

    /// Sequence `f` after this program
    ///
    /// On a finished program `f` runs immediately; otherwise it is attached
    /// in constant time and runs once the program's result is available.
    pub fn and_then<U, F>(self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Flow<U> + Send + 'static,
    {
        match self.into_program() {
            Program::Done(value) => match unerase::<T>(value) {
                Ok(value) => f(value),
                Err(err) => Flow::throw(err),
            },
            Program::Throw(err) => Flow::throw(err),
            program => Flow::from_program(Program::Bind(
                Box::new(program),
                Box::new(move |value| match unerase::<T>(value) {
                    Ok(value) => f(value).into_program(),
                    Err(err) => Program::Throw(err),
                }),
            )),
        }
    }

    /// Transform the result
    pub fn map<U, F>(self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Flow::pure(f(value)))
    }

    /// Run `next` after this program, discarding this program's value
    pub fn then<U: Send + 'static>(self, next: Flow<U>) -> Flow<U> {
        self.and_then(move |_| next)
    }

    /// Whether the program has already finished or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self.program, Program::Done(_) | Program::Throw(_))
    }
}

impl<T: Serialize + Send + 'static> Flow<T> {
    /// Convert the result into a JSON value, as Fork and Race branches expect
    pub fn into_value(self) -> Flow<Value> {
        self.and_then(|value| match serde_json::to_value(value) {
            Ok(value) => Flow::pure(value),
            Err(err) => Flow::throw(err.into()),
        })
    }
}

/// What a [`Cursor`] needs next
pub(crate) enum Advance<T> {
    /// The program finished
    Finished(Result<T, FlowError>),
    /// The operation must be executed and its result passed to `resume`
    Execute(Operation),
}

/// Worklist evaluator for one task
///
/// Left-nested binds are flattened onto `pending`, so each continuation runs
/// at constant stack depth no matter how the program was assembled.
pub(crate) struct Cursor<T> {
    current: Program,
    pending: Vec<Continuation>,
    _result: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Cursor<T> {
    pub(crate) fn new(flow: Flow<T>) -> Self {
        Self {
            current: flow.into_program(),
            pending: Vec::new(),
            _result: PhantomData,
        }
    }

    /// Walk the program until an operation must run or the program ends
    pub(crate) fn advance(&mut self) -> Advance<T> {
        loop {
            match mem::replace(&mut self.current, Program::placeholder()) {
                Program::Bind(inner, next) => {
                    self.pending.push(next);
                    self.current = *inner;
                }
                Program::Done(value) => match self.pending.pop() {
                    Some(next) => self.current = next(value),
                    None => return Advance::Finished(unerase::<T>(value)),
                },
                Program::Throw(err) => {
                    self.pending.clear();
                    return Advance::Finished(Err(err));
                }
                Program::Step(operation) => return Advance::Execute(operation),
            }
        }
    }

    /// Feed the result of the operation returned by `advance`
    pub(crate) fn resume(&mut self, result: Erased) {
        self.current = Program::Done(result);
    }
}

impl Flow<ApiResponse> {
    /// Execute a request through the API collaborator
    pub fn call_api(request: ApiRequest) -> Self {
        Flow::step(Operation::CallApi { request })
    }
}

impl Flow<Value> {
    /// Run a UI interaction and wait for the parsed response
    pub fn run_ui(interaction: Value) -> Self {
        Flow::step(Operation::RunUi { interaction })
    }

    /// Run an opaque asynchronous action
    pub fn run_external<Fut>(action: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Flow::step(Operation::RunExternalAsync {
            action: Box::pin(action),
        })
    }

    /// Wait for a forked program's result
    pub fn await_control(handle: Control) -> Self {
        Flow::step(Operation::Await { handle })
    }

    /// Run branches concurrently; the first to succeed provides the result
    pub fn race(programs: Vec<Flow<Value>>) -> Self {
        Flow::step(Operation::Race { programs })
    }
}

impl<R: DeserializeOwned + Send + 'static> Flow<R> {
    /// Typed RunUi: serialize `interaction`, decode the response into `R`
    pub fn run_ui_as<I: Serialize>(interaction: &I) -> Flow<R> {
        let interaction = match serde_json::to_value(interaction) {
            Ok(value) => value,
            Err(err) => return Flow::throw(err.into()),
        };
        Flow::<Value>::run_ui(interaction).and_then(|response| {
            match serde_json::from_value::<R>(response.clone()) {
                Ok(decoded) => Flow::pure(decoded),
                Err(err) => Flow::throw(FlowError::decode(response.to_string(), err)),
            }
        })
    }
}

impl<R: DeserializeOwned + Send + 'static> Flow<Result<R, ErrorResponse>> {
    /// Call a typed endpoint; non-2xx responses come back as `Err`
    pub fn call_endpoint<E>(endpoint: &E, headers: &Headers) -> Self
    where
        E: RestEndpoint<Response = R>,
    {
        Flow::<ApiResponse>::call_api(endpoint.make_request(headers)).and_then(|response| {
            if !response.is_success() {
                return Flow::pure(Err(response.into()));
            }
            match serde_json::from_str::<R>(&response.body) {
                Ok(decoded) => Flow::pure(Ok(decoded)),
                Err(err) => Flow::throw(FlowError::decode(response.body, err)),
            }
        })
    }
}

impl Flow<()> {
    /// Run a UI interaction in the background
    pub fn fork_ui(interaction: Value) -> Self {
        Flow::step(Operation::ForkUi { interaction })
    }

    /// Write a key to a store
    pub fn write(store: Store, key: impl Into<String>, value: impl Into<String>) -> Self {
        Flow::step(Operation::Write {
            store,
            key: key.into(),
            value: value.into(),
        })
    }

    /// Delete a key from a store
    pub fn delete(store: Store, key: impl Into<String>) -> Self {
        Flow::step(Operation::Delete {
            store,
            key: key.into(),
        })
    }

    /// Insert or overwrite one foreign state key
    pub fn write_foreign(key: impl Into<String>, value: Value) -> Self {
        Flow::step(Operation::WriteForeign {
            key: key.into(),
            value,
        })
    }

    /// Suspend the current task for `duration`
    pub fn delay(duration: Duration) -> Self {
        Flow::step(Operation::Delay { duration })
    }

    /// Emit a log event tagged with `tag`
    pub fn log(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Flow::step(Operation::Log {
            tag: tag.into(),
            message: message.into(),
        })
    }
}

impl Flow<Option<String>> {
    /// Read a key from a store
    pub fn read(store: Store, key: impl Into<String>) -> Self {
        Flow::step(Operation::Read {
            store,
            key: key.into(),
        })
    }
}

impl Flow<ForeignState> {
    /// Read the entire foreign state mapping
    pub fn read_foreign_all() -> Self {
        Flow::step(Operation::ReadForeignAll)
    }
}

impl Flow<Control> {
    /// Launch `program` concurrently; the handle is available immediately
    pub fn fork(program: Flow<Value>) -> Self {
        Flow::step(Operation::Fork {
            program: Box::new(program),
        })
    }
}

impl Flow<Result<Value, FlowError>> {
    /// Run `program` behind a recovery boundary
    ///
    /// `Outcome::Succeed(v)` yields `Ok(v)`. `Outcome::Fail(m)` aborts the
    /// enclosing run with `FlowError::Explicit(m)`. Any failure raised inside
    /// `program` is absorbed here and handed to the continuation as `Err`.
    pub fn recover(program: Flow<Outcome>) -> Self {
        Flow::step(Operation::Recover {
            program: Box::new(program),
        })
    }
}

impl Flow<PermissionStatus> {
    /// Check permissions with the host
    pub fn check_permissions(permissions: Vec<Permission>) -> Self {
        Flow::step(Operation::CheckPermissions { permissions })
    }
}

impl Flow<Vec<PermissionResponse>> {
    /// Ask the host to grant permissions
    pub fn request_permissions(permissions: Vec<Permission>) -> Self {
        Flow::step(Operation::RequestPermissions { permissions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect_step<T: Send + 'static>(cursor: &mut Cursor<T>) -> Operation {
        match cursor.advance() {
            Advance::Execute(operation) => operation,
            Advance::Finished(_) => panic!("expected an operation"),
        }
    }

    fn expect_finished<T: Send + 'static>(cursor: &mut Cursor<T>) -> Result<T, FlowError> {
        match cursor.advance() {
            Advance::Finished(result) => result,
            Advance::Execute(operation) => panic!("unexpected {operation:?}"),
        }
    }

    #[test]
    fn test_and_then_on_done_applies_immediately() {
        let flow = Flow::pure(2).and_then(|x| Flow::pure(x * 10)).map(|x| x + 1);
        assert!(flow.is_terminal());
        assert_eq!(expect_finished(&mut Cursor::new(flow)), Ok(21));
    }

    #[test]
    fn test_and_then_on_throw_short_circuits() {
        let flow: Flow<i32> = Flow::<i32>::throw(FlowError::EmptyRace)
            .and_then(|_| -> Flow<i32> { panic!("continuation must not run") });
        assert_eq!(
            expect_finished(&mut Cursor::new(flow)),
            Err(FlowError::EmptyRace)
        );
    }

    #[test]
    fn test_continuation_receives_operation_result() {
        let flow = Flow::read(Store::Ephemeral, "name")
            .map(|value| value.unwrap_or_default().len());
        let mut cursor = Cursor::new(flow);

        let Operation::Read { store, key } = expect_step(&mut cursor) else {
            panic!("expected a read step");
        };
        assert_eq!(store, Store::Ephemeral);
        assert_eq!(key, "name");

        cursor.resume(erase(Some("abcd".to_string())));
        assert_eq!(expect_finished(&mut cursor), Ok(4));
    }

    #[test]
    fn test_left_nested_binds_run_in_order() {
        let mut flow = Flow::pure(Vec::new());
        for i in 0..5 {
            flow = flow
                .then(Flow::delay(Duration::from_millis(1)))
                .map(move |_| i)
                .and_then(|i| Flow::pure(vec![i]));
        }
        let mut cursor = Cursor::new(flow.map(|last| last.len()));

        for _ in 0..5 {
            assert!(matches!(expect_step(&mut cursor), Operation::Delay { .. }));
            cursor.resume(erase(()));
        }
        assert_eq!(expect_finished(&mut cursor), Ok(1));
    }

    #[test]
    fn test_long_programs_build_and_drop_without_recursion() {
        let mut flow = Flow::pure(());
        for i in 0..200_000 {
            flow = flow.then(Flow::write(Store::Ephemeral, "k", i.to_string()));
        }
        assert!(!flow.is_terminal());
        drop(flow);
    }

    #[test]
    fn test_wrong_result_type_is_reported() {
        let mut cursor = Cursor::new(Flow::read(Store::Ephemeral, "k"));
        expect_step(&mut cursor);
        cursor.resume(erase(42u8));

        match expect_finished(&mut cursor) {
            Err(FlowError::TypeMismatch(expected)) => assert!(expected.contains("Option")),
            other => panic!("expected a type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(format!("{:?}", Flow::delay(Duration::from_millis(1))), "Flow::Step(delay)");
        assert_eq!(format!("{:?}", Flow::read_foreign_all()), "Flow::Step(read_foreign_all)");
        assert_eq!(
            format!("{:?}", Flow::recover(Flow::pure(Outcome::succeed(1))).map(|r| r.is_ok())),
            "Flow::Step(recover)"
        );
        assert!(Flow::pure(()).is_terminal());
        assert!(!Flow::log("t", "m").is_terminal());
    }

    #[test]
    fn test_run_ui_as_decodes_response() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Choice {
            action: String,
        }

        let flow: Flow<Choice> = Flow::run_ui_as(&json!({"screen": "menu"}));
        let mut cursor = Cursor::new(flow);
        let Operation::RunUi { interaction } = expect_step(&mut cursor) else {
            panic!("expected a run_ui step");
        };
        assert_eq!(interaction, json!({"screen": "menu"}));

        cursor.resume(erase(json!({"action": "pay"})));
        assert_eq!(
            expect_finished(&mut cursor),
            Ok(Choice {
                action: "pay".into()
            })
        );
    }

    #[test]
    fn test_run_ui_as_raises_decode_error_on_shape_mismatch() {
        let flow: Flow<Vec<u32>> = Flow::run_ui_as(&json!("list"));
        let mut cursor = Cursor::new(flow);
        expect_step(&mut cursor);
        cursor.resume(erase(json!({"not": "a list"})));

        match expect_finished(&mut cursor) {
            Err(FlowError::Decode { payload, .. }) => assert_eq!(payload, r#"{"not":"a list"}"#),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_into_value() {
        let flow = Flow::pure(vec![1, 2]).into_value();
        assert_eq!(expect_finished(&mut Cursor::new(flow)), Ok(json!([1, 2])));
    }
}
