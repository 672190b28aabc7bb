//! Per-upload analysis context
//!
//! Carries everything one analysis needs explicitly, so no state is shared
//! between uploads.

use uuid::Uuid;

use crate::config::AnalyzerConfig;

#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub request_id: Uuid,
    /// Client-supplied file name, used for the declared format and logs
    pub file_name: String,
    /// Configuration as it was when the upload arrived
    pub config: AnalyzerConfig,
}

impl AnalysisContext {
    pub fn new(file_name: impl Into<String>, config: AnalyzerConfig) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            file_name: file_name.into(),
            config,
        }
    }
}
