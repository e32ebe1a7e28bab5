//! Request envelope handling.
//!
//! One request in, one response out. The raw bytes are decoded into a
//! `{"cmd": ..., "payload": ...}` envelope and handed to the [`Router`].
//! Every error becomes `{"error": "<message>"}`; only undecodable input
//! changes the exit code.
//!
//! With a task store, every decoded request gets one task row: `running`
//! before routing, then `completed` with the result or `failed` with the
//! error message. A failure to write the row is logged and does not change
//! the response.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use friday_core::{SidecarContext, SidecarError, SidecarResult, Task, TaskStore};

use crate::router::Router;

/// The request was handled, successfully or not.
pub const EXIT_OK: i32 = 0;
/// The request could not be decoded as a JSON object.
pub const EXIT_MALFORMED_INPUT: i32 = 1;
/// stdin or stdout failed.
pub const EXIT_FATAL: i32 = 2;

/// Decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub cmd: String,
    pub payload: Map<String, Value>,
}

impl Request {
    /// Decode a raw request.
    pub fn parse(raw: &[u8]) -> SidecarResult<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| SidecarError::Parse(e.to_string()))?;
        let value: Value =
            serde_json::from_str(text).map_err(|e| SidecarError::Parse(e.to_string()))?;
        let mut envelope = match value {
            Value::Object(map) => map,
            other => {
                return Err(SidecarError::Parse(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let cmd = match envelope.remove("cmd") {
            Some(Value::String(cmd)) if !cmd.trim().is_empty() => cmd,
            _ => return Err(SidecarError::MissingField("cmd".to_string())),
        };
        let payload = match envelope.remove("payload") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(SidecarError::InvalidArgument(format!(
                    "'payload' must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self { cmd, payload })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Body written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Result(Value),
    Error(String),
}

/// Response plus the process exit code.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: Response,
    pub exit_code: i32,
}

impl Outcome {
    pub fn success(value: Value) -> Self {
        Self {
            response: Response::Result(value),
            exit_code: EXIT_OK,
        }
    }

    pub fn failure(err: &SidecarError) -> Self {
        let exit_code = if err.is_malformed_input() {
            EXIT_MALFORMED_INPUT
        } else {
            EXIT_OK
        };
        Self {
            response: Response::Error(err.to_string()),
            exit_code,
        }
    }

    /// Single-line JSON rendering of the response.
    pub fn to_line(&self) -> String {
        serde_json::to_string(&self.response).unwrap_or_else(|e| {
            json!({ "error": SidecarError::from(e).to_string() }).to_string()
        })
    }
}

/// Turns a raw request into an [`Outcome`].
#[derive(Clone)]
pub struct Dispatcher {
    router: Router,
    tasks: Option<Arc<dyn TaskStore>>,
}

impl Dispatcher {
    pub fn new(ctx: SidecarContext) -> Self {
        let tasks = ctx.task_store().cloned();
        Self {
            router: Router::new(ctx),
            tasks,
        }
    }

    pub fn with_router(router: Router) -> Self {
        Self {
            router,
            tasks: None,
        }
    }

    /// Record every request in `tasks`.
    pub fn with_task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Handle one request. Never fails; errors are part of the outcome.
    pub async fn process(&self, raw: &[u8]) -> Outcome {
        match self.handle(raw).await {
            Ok(value) => Outcome::success(value),
            Err(err) => {
                error!(code = err.code().as_str(), "{}", err);
                Outcome::failure(&err)
            }
        }
    }

    async fn handle(&self, raw: &[u8]) -> SidecarResult<Value> {
        let request = Request::parse(raw)?;
        let mut task = Task::new(
            Uuid::new_v4(),
            &request.cmd,
            Value::Object(request.payload.clone()),
        );
        info!(cmd = %request.cmd, task = %task.id, "Received command");

        task.start();
        self.record(&task, true);

        let result = self
            .router
            .dispatch(&task.id, &request.cmd, request.payload)
            .await;

        match &result {
            Ok(value) => task.complete(value.clone()),
            Err(err) => task.fail(err.to_string()),
        }
        self.record(&task, false);

        result
    }

    fn record(&self, task: &Task, new: bool) {
        let tasks = match &self.tasks {
            Some(tasks) => tasks,
            None => return,
        };
        let saved = if new {
            tasks.create_task(task)
        } else {
            tasks.update_task(task).map(|_| ())
        };
        if let Err(e) = saved {
            warn!(task = %task.id, status = %task.status, "Task not recorded: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friday_core::{MemoryProgress, SidecarConfig, TaskStatus};
    use mockall::mock;
    use tempfile::TempDir;

    mock! {
        pub Tasks {}

        impl TaskStore for Tasks {
            fn create_task(&self, task: &Task) -> SidecarResult<()>;
            fn update_task(&self, task: &Task) -> SidecarResult<bool>;
            fn get_task(&self, id: &str) -> SidecarResult<Option<Task>>;
            fn list_tasks(&self, limit: usize) -> SidecarResult<Vec<Task>>;
        }
    }

    fn dispatcher(dir: &TempDir, tasks: MockTasks) -> Dispatcher {
        let config = SidecarConfig::builder()
            .library_path(dir.path().join("library"))
            .build();
        let ctx = SidecarContext::new(config)
            .unwrap()
            .with_progress(Arc::new(MemoryProgress::new()));
        Dispatcher::new(ctx).with_task_store(Arc::new(tasks))
    }

    #[tokio::test]
    async fn test_task_runs_then_completes() {
        let dir = TempDir::new().unwrap();
        let mut tasks = MockTasks::new();
        tasks
            .expect_create_task()
            .withf(|task| task.status == TaskStatus::Running && task.cmd == "execute_command")
            .times(1)
            .returning(|_| Ok(()));
        tasks
            .expect_update_task()
            .withf(|task| {
                task.status == TaskStatus::Completed
                    && task.result.as_ref().map(|r| &r["id"]) == Some(&json!(task.id))
            })
            .times(1)
            .returning(|_| Ok(true));

        let outcome = dispatcher(&dir, tasks)
            .process(br#"{"cmd":"execute_command","payload":{"command":"read a.pdf"}}"#)
            .await;
        assert_eq!(outcome.exit_code, EXIT_OK);
        assert!(matches!(outcome.response, Response::Result(_)));
    }

    #[tokio::test]
    async fn test_task_failure_keeps_error_response() {
        let dir = TempDir::new().unwrap();
        let mut tasks = MockTasks::new();
        tasks.expect_create_task().times(1).returning(|_| Ok(()));
        tasks
            .expect_update_task()
            .withf(|task| {
                task.status == TaskStatus::Failed
                    && task.error.as_deref() == Some("Unknown command: teleport")
            })
            .times(1)
            .returning(|_| Err(SidecarError::database("disk full")));

        let outcome = dispatcher(&dir, tasks)
            .process(br#"{"cmd":"teleport"}"#)
            .await;
        assert_eq!(
            outcome.response,
            Response::Error("Unknown command: teleport".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_input_records_no_task() {
        let dir = TempDir::new().unwrap();
        let mut tasks = MockTasks::new();
        tasks.expect_create_task().never();
        tasks.expect_update_task().never();

        let outcome = dispatcher(&dir, tasks).process(b"not json").await;
        assert_eq!(outcome.exit_code, EXIT_MALFORMED_INPUT);
    }

    #[test]
    fn test_parse_envelope() {
        let request = Request::parse(br#"{"cmd":"parse_pdf","payload":{"path":"a.pdf"}}"#).unwrap();
        assert_eq!(request.cmd, "parse_pdf");
        assert_eq!(request.payload["path"], "a.pdf");
    }

    #[test]
    fn test_payload_defaults_to_empty() {
        let request = Request::parse(br#"{"cmd":"x"}"#).unwrap();
        assert!(request.payload.is_empty());

        let request = Request::parse(br#"{"cmd":"x","payload":null}"#).unwrap();
        assert!(request.payload.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Request::parse(b"not json"),
            Err(SidecarError::Parse(_))
        ));
        assert!(matches!(
            Request::parse(&[0xff, 0xfe, b'{']),
            Err(SidecarError::Parse(_))
        ));
        assert!(matches!(Request::parse(b"[1,2]"), Err(SidecarError::Parse(_))));
        assert!(matches!(
            Request::parse(br#"{"payload":{}}"#),
            Err(SidecarError::MissingField(_))
        ));
        assert!(matches!(
            Request::parse(br#"{"cmd":7}"#),
            Err(SidecarError::MissingField(_))
        ));
        assert!(matches!(
            Request::parse(br#"{"cmd":"x","payload":"path"}"#),
            Err(SidecarError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_response_shapes() {
        let ok = Outcome::success(json!({"a": 1}));
        assert_eq!(ok.to_line(), r#"{"result":{"a":1}}"#);
        assert_eq!(ok.exit_code, EXIT_OK);

        let err = Outcome::failure(&SidecarError::UnknownCommand("nope".to_string()));
        assert_eq!(err.to_line(), r#"{"error":"Unknown command: nope"}"#);
        assert_eq!(err.exit_code, EXIT_OK);

        let err = Outcome::failure(&SidecarError::Parse("eof".to_string()));
        assert_eq!(err.exit_code, EXIT_MALFORMED_INPUT);
    }
}
