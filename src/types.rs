pub const DEFAULT_MODEL: &str = "llama2";
pub const RESPONSE_PREFIX: &str = "This is a mock response to: ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    pub stream: bool,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: DEFAULT_MODEL.to_string(),
            stream: false,
        }
    }
}

impl GenerateRequest {
    /// Lenient parse of a request body. Anything that isn't a JSON object
    /// yields the defaults, and each field falls back independently.
    pub fn from_body(body: &[u8]) -> Self {
        let fields = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(fields)) => fields,
            _ => return Self::default(),
        };

        let prompt = match fields.get("prompt") {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(prompt)) => prompt.clone(),
            Some(other) => other.to_string(),
        };

        let model = fields
            .get("model")
            .and_then(|model| model.as_str())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        let stream = fields.get("stream").map(is_truthy).unwrap_or(false);

        Self {
            prompt,
            model,
            stream,
        }
    }

    pub fn response_text(&self) -> String {
        format!("{}{}", RESPONSE_PREFIX, self.prompt)
    }

    pub fn into_response(self) -> GenerateResponse {
        GenerateResponse {
            response: self.response_text(),
            model: self.model,
            done: true,
        }
    }

    pub fn into_stream(self) -> TokenStream {
        let text = self.response_text();
        TokenStream::new(self.model, &text)
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum StreamChunk {
    Token { response: String, model: String },
    Done { done: bool },
}

impl StreamChunk {
    pub fn done() -> Self {
        StreamChunk::Done { done: true }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamChunk::Done { .. })
    }

    /// One ndjson line, newline included.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        line
    }
}

/// Word-by-word chunks of a response text, ending with a single done chunk.
/// Yields nothing once the done chunk has been taken.
pub struct TokenStream {
    model: String,
    words: std::vec::IntoIter<String>,
    finished: bool,
}

impl TokenStream {
    pub fn new(model: impl Into<String>, text: &str) -> Self {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| format!("{} ", word))
            .collect();

        Self {
            model: model.into(),
            words: words.into_iter(),
            finished: false,
        }
    }
}

impl Iterator for TokenStream {
    type Item = StreamChunk;

    fn next(&mut self) -> Option<StreamChunk> {
        if self.finished {
            return None;
        }

        match self.words.next() {
            Some(word) => Some(StreamChunk::Token {
                response: word,
                model: self.model.clone(),
            }),
            None => {
                self.finished = true;
                Some(StreamChunk::done())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub modified_at: String,
    pub size: u64,
}

impl ModelEntry {
    fn new(name: &str, modified_at: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            modified_at: modified_at.to_string(),
            size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelList {
    pub models: Vec<ModelEntry>,
}

impl ModelList {
    /// The fixed listing served from `/api/tags`.
    pub fn builtin() -> Self {
        Self {
            models: vec![
                ModelEntry::new("llama2", "2023-11-04T12:37:36.269425Z", 3791730298),
                ModelEntry::new("mistral", "2023-11-04T12:38:36.269425Z", 4791730298),
                ModelEntry::new("gemma", "2023-11-04T12:39:36.269425Z", 2791730298),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn endpoint_not_found() -> Self {
        Self::new("Endpoint not found")
    }
}
