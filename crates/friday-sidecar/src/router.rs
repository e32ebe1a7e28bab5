//! Command routing.
//!
//! A request's `cmd` is parsed into a [`CommandKind`], its payload is
//! validated into a [`Command`], and the command is executed. Validation runs
//! before any pipeline, so a rejected request never touches the library.

use std::sync::Arc;

use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, info};
use uuid::Uuid;

use friday_core::{Resource, ResourceType, SidecarContext, SidecarError, SidecarResult};
use friday_extractors::{AudioIngestor, Ingestor, PdfIngestor, VideoIngestor};

use crate::agent::Agent;
use crate::plugins::PluginRegistry;

/// Every command the sidecar accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    ParsePdf,
    ProcessVideo,
    ProcessAudio,
    ExecuteCommand,
    RunPlugin,
}

/// A command with its validated arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ParsePdf { path: String },
    ProcessVideo { url: String },
    ProcessAudio { path: String },
    ExecuteCommand { command: String },
    RunPlugin { name: String, payload: Map<String, Value> },
}

impl Command {
    /// Validate `payload` for `kind`.
    pub fn from_request(kind: CommandKind, payload: &Map<String, Value>) -> SidecarResult<Self> {
        Ok(match kind {
            CommandKind::ParsePdf => Command::ParsePdf {
                path: required_str(payload, "path")?,
            },
            CommandKind::ProcessVideo => Command::ProcessVideo {
                url: required_str(payload, "url")?,
            },
            CommandKind::ProcessAudio => Command::ProcessAudio {
                path: required_str(payload, "path")?,
            },
            CommandKind::ExecuteCommand => Command::ExecuteCommand {
                command: required_str(payload, "command")?,
            },
            CommandKind::RunPlugin => Command::RunPlugin {
                name: required_str(payload, "name")?,
                payload: optional_object(payload, "payload")?,
            },
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ParsePdf { .. } => CommandKind::ParsePdf,
            Command::ProcessVideo { .. } => CommandKind::ProcessVideo,
            Command::ProcessAudio { .. } => CommandKind::ProcessAudio,
            Command::ExecuteCommand { .. } => CommandKind::ExecuteCommand,
            Command::RunPlugin { .. } => CommandKind::RunPlugin,
        }
    }
}

/// Non-empty string value of `key`.
fn required_str(payload: &Map<String, Value>, key: &str) -> SidecarResult<String> {
    match payload.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(SidecarError::MissingArgument(key.to_string())),
    }
}

/// Object value of `key`; absent or null means empty.
fn optional_object(payload: &Map<String, Value>, key: &str) -> SidecarResult<Map<String, Value>> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(SidecarError::InvalidArgument(format!(
            "'{}' must be a JSON object",
            key
        ))),
    }
}

/// Routes commands to ingestors, the agent and plugins.
#[derive(Clone)]
pub struct Router {
    ctx: SidecarContext,
    pdf: Arc<dyn Ingestor>,
    video: Arc<dyn Ingestor>,
    audio: Arc<dyn Ingestor>,
    agent: Agent,
    plugins: PluginRegistry,
}

impl Router {
    /// Router with the built-in ingestors and plugins.
    pub fn new(ctx: SidecarContext) -> Self {
        let plugins = PluginRegistry::discover(ctx.config());
        Self {
            pdf: Arc::new(PdfIngestor::new(ctx.clone())),
            video: Arc::new(VideoIngestor::new(ctx.clone())),
            audio: Arc::new(AudioIngestor::new(ctx.clone())),
            agent: Agent::default(),
            plugins,
            ctx,
        }
    }

    /// Replace the ingestor handling `ingestor.resource_type()`.
    pub fn with_ingestor(mut self, ingestor: Arc<dyn Ingestor>) -> Self {
        match ingestor.resource_type() {
            ResourceType::Pdf => self.pdf = ingestor,
            ResourceType::Video => self.video = ingestor,
            ResourceType::Audio => self.audio = ingestor,
        }
        self
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    /// Parse, validate and execute one command under a fresh task id.
    pub async fn route(&self, cmd: &str, payload: Map<String, Value>) -> SidecarResult<Value> {
        self.dispatch(&Uuid::new_v4().to_string(), cmd, payload).await
    }

    /// Parse, validate and execute one command as task `task_id`.
    pub async fn dispatch(
        &self,
        task_id: &str,
        cmd: &str,
        payload: Map<String, Value>,
    ) -> SidecarResult<Value> {
        let kind: CommandKind = cmd
            .parse()
            .map_err(|_| SidecarError::UnknownCommand(cmd.to_string()))?;
        let command = Command::from_request(kind, &payload)?;
        debug!(command = %kind, task = task_id, "Routing command");
        self.execute(task_id, command).await
    }

    pub async fn execute(&self, task_id: &str, command: Command) -> SidecarResult<Value> {
        match command {
            Command::ParsePdf { path } => self.ingest(self.pdf.as_ref(), &path).await,
            Command::ProcessVideo { url } => self.ingest(self.video.as_ref(), &url).await,
            Command::ProcessAudio { path } => self.ingest(self.audio.as_ref(), &path).await,
            Command::ExecuteCommand { command } => Ok(self.agent.execute(task_id, &command)),
            Command::RunPlugin { name, payload } => self.plugins.run(&name, payload).await,
        }
    }

    async fn ingest(&self, ingestor: &dyn Ingestor, input: &str) -> SidecarResult<Value> {
        let resource = ingestor.ingest(input).await?;
        self.persist(&resource)?;
        info!(
            id = %resource.id,
            kind = %resource.resource_type,
            ingestor = ingestor.name(),
            "Resource ready"
        );
        Ok(serde_json::to_value(&resource)?)
    }

    fn persist(&self, resource: &Resource) -> SidecarResult<()> {
        if let Some(store) = self.ctx.store() {
            store.create(resource)?;
            debug!(id = %resource.id, "Resource stored");
        }
        Ok(())
    }
}
