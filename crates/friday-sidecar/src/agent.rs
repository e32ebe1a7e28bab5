//! Natural-language command handling.
//!
//! A command is classified by keyword into an [`Intent`], and the first
//! path or URL that fits the intent is pulled out as its parameter. The
//! agent reports what it understood; it does not start a pipeline itself.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::info;

use friday_core::{Intent, IntentClassifier, IntentKind};

const PDF_KEYWORDS: &[&str] = &["pdf", "论文"];
const VIDEO_KEYWORDS: &[&str] = &["video", "视频", "youtube", "bilibili"];
const AUDIO_KEYWORDS: &[&str] = &["audio", "音频", "录音"];

static PDF_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"([^"]+\.pdf)"|'([^']+\.pdf)'|([^\s"']+\.pdf)\b"#).expect("valid regex")
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("valid regex"));

static AUDIO_PATH: Lazy<Regex> = Lazy::new(|| {
    let ext = r"\.(?:mp3|wav|m4a|flac|ogg|aac)";
    Regex::new(&format!(
        r#"(?i)"([^"]+{ext})"|'([^']+{ext})'|([^\s"']+{ext})\b"#,
        ext = ext
    ))
    .expect("valid regex")
});

/// First capture group that matched, quoted forms first.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
    })
}

/// Keyword-based classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }

    fn kind_of(command: &str) -> IntentKind {
        let lower = command.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if has(PDF_KEYWORDS) {
            IntentKind::Pdf
        } else if has(VIDEO_KEYWORDS) {
            IntentKind::Video
        } else if has(AUDIO_KEYWORDS) {
            IntentKind::Audio
        } else {
            IntentKind::Unknown
        }
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, command: &str) -> Intent {
        let kind = Self::kind_of(command);
        let parameter = match kind {
            IntentKind::Pdf => first_capture(&PDF_PATH, command),
            IntentKind::Video => URL.find(command).map(|m| m.as_str().to_string()),
            IntentKind::Audio => first_capture(&AUDIO_PATH, command),
            IntentKind::Unknown => None,
        };
        Intent::new(kind, parameter)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Executes `execute_command` requests.
#[derive(Clone)]
pub struct Agent {
    classifier: Arc<dyn IntentClassifier>,
}

impl Agent {
    pub fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify `command` and describe the task it maps to. The result
    /// carries `task_id` so the host can match it to the task record.
    pub fn execute(&self, task_id: &str, command: &str) -> Value {
        let intent = self.classifier.classify(command);
        info!(
            classifier = self.classifier.name(),
            intent = %intent.kind,
            parameter = intent.parameter.as_deref().unwrap_or(""),
            "Classified command"
        );

        let message = describe(&intent);
        json!({
            "id": task_id,
            "status": "completed",
            "intent": intent,
            "result": { "message": message },
        })
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(Arc::new(KeywordIntentClassifier))
    }
}

fn describe(intent: &Intent) -> String {
    match (intent.kind, intent.parameter.as_deref()) {
        (IntentKind::Pdf, Some(path)) => {
            format!("PDF task recognized; use parse_pdf with path '{}'", path)
        }
        (IntentKind::Pdf, None) => "PDF task recognized, but no .pdf path was found".to_string(),
        (IntentKind::Video, Some(url)) => {
            format!("Video task recognized; use process_video with url '{}'", url)
        }
        (IntentKind::Video, None) => "Video task recognized, but no URL was found".to_string(),
        (IntentKind::Audio, Some(path)) => {
            format!("Audio task recognized; use process_audio with path '{}'", path)
        }
        (IntentKind::Audio, None) => {
            "Audio task recognized, but no audio file was found".to_string()
        }
        (IntentKind::Unknown, _) => "Could not determine the intent of the command".to_string(),
    }
}
