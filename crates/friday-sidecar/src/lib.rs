//! friday-sidecar - request handling for the Friday sidecar binary.
//!
//! The binary reads one JSON request from stdin, passes it to the
//! [`Dispatcher`], and writes one JSON response to stdout. Progress and logs
//! go to stderr.
//!
//! ```text
//! stdin   {"cmd": "parse_pdf", "payload": {"path": "paper.pdf"}}
//! stdout  {"result": {"id": "...", "type": "pdf", "md_path": "...", ...}}
//! stderr  PROGRESS:text:0:Extracting text from 12 pages
//! ```

pub mod agent;
pub mod dispatcher;
pub mod plugins;
pub mod router;

pub use agent::{Agent, KeywordIntentClassifier};
pub use dispatcher::{
    Dispatcher, Outcome, Request, Response, EXIT_FATAL, EXIT_MALFORMED_INPUT, EXIT_OK,
};
pub use plugins::{ExamplePlugin, Plugin, PluginRegistry};
pub use router::{Command, CommandKind, Router};
