use crate::config::types::{Result, ScopeError};
use crate::utils::sanitize::{sanitize_class_name, sanitize_source_code};
use serde::{Deserialize, Serialize};

/// Longest accepted class name; keeps derived file names under NAME_MAX
const MAX_SYMBOL_LEN: usize = 200;

/// Which low-level representation a request asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Bytecode,
    Jit,
    Aot,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Bytecode => "bytecode",
            ViewKind::Jit => "jit",
            ViewKind::Aot => "aot",
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bytecode" => Ok(ViewKind::Bytecode),
            "jit" => Ok(ViewKind::Jit),
            "aot" => Ok(ViewKind::Aot),
            other => Err(ScopeError::Config(format!("unknown view: {other}"))),
        }
    }
}

/// Raw request as received on the wire
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompilationRequest {
    #[serde(default)]
    pub source_code: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Sanitized, immutable compilation request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationRequest {
    source_text: String,
    symbol_name: String,
}

impl CompilationRequest {
    /// Sanitize both fields; the symbol must survive sanitization non-empty.
    pub fn new(source_text: &str, symbol_name: &str) -> Result<Self> {
        let symbol_name = sanitize_class_name(symbol_name);
        if symbol_name.is_empty() || symbol_name.chars().all(|c| c == '.') {
            return Err(ScopeError::Config("Invalid class name".to_string()));
        }
        if symbol_name.len() > MAX_SYMBOL_LEN {
            return Err(ScopeError::Config(format!(
                "Class name longer than {} characters",
                MAX_SYMBOL_LEN
            )));
        }

        Ok(Self {
            source_text: sanitize_source_code(source_text),
            symbol_name,
        })
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }
}

impl TryFrom<RawCompilationRequest> for CompilationRequest {
    type Error = ScopeError;

    fn try_from(raw: RawCompilationRequest) -> Result<Self> {
        CompilationRequest::new(
            raw.source_code.as_deref().unwrap_or_default(),
            raw.class_name.as_deref().unwrap_or_default(),
        )
    }
}

/// The only value that crosses the core's outward boundary.
///
/// Exactly one of `text` / `error` is set, matching `succeeded`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassemblyResult {
    #[serde(rename = "success")]
    pub succeeded: bool,
    #[serde(rename = "result")]
    pub text: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error: Option<String>,
}

impl DisassemblyResult {
    pub fn success(text: String) -> Self {
        Self {
            succeeded: true,
            text: Some(text),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            succeeded: false,
            text: None,
            error: Some(error),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
