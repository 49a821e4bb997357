pub mod encoder;

pub use encoder::ExportEncoder;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// A produced export. Lives for the single response that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub content: ExportContent,
    pub size: usize,
    pub is_zip: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportContent {
    Sql(String),
    Zip(Vec<u8>),
}

impl ExportArtifact {
    pub fn new(filename: String, content: ExportContent) -> Self {
        let (size, is_zip) = match &content {
            ExportContent::Sql(text) => (text.len(), false),
            ExportContent::Zip(bytes) => (bytes.len(), true),
        };
        ExportArtifact {
            filename,
            content,
            size,
            is_zip,
        }
    }

    /// Text form for the JSON transport: SQL verbatim, archives base64.
    pub fn content_string(&self) -> String {
        match &self.content {
            ExportContent::Sql(text) => text.clone(),
            ExportContent::Zip(bytes) => STANDARD.encode(bytes),
        }
    }
}
