//! Common types and data structures

use std::path::PathBuf;

/// The image currently staged for analysis.
#[derive(Clone, Debug)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// Why an analysis did not produce a result image.
///
/// Only two messages ever reach the UI; the payload strings are for the log.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisError {
    /// The request or the follow-up result fetch never completed, or the
    /// response body was not JSON.
    Connection(String),
    /// The server returned JSON with no usable result in it.
    NoPrediction,
}

impl AnalysisError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::Connection(_) => "Server Error: Unable to connect.",
            AnalysisError::NoPrediction => "Prediction failed. Try again.",
        }
    }
}

/// Lifecycle of the single outstanding analysis request.
#[derive(Debug)]
pub enum AnalysisPhase {
    Idle,
    /// Multipart POST in flight, no response yet.
    Uploading,
    /// Prediction succeeded; result image download in progress.
    Fetching,
    /// Result image fetched; bytes waiting for the UI thread to decode.
    Done { result_url: String, bytes: Vec<u8> },
    Failed(AnalysisError),
}

/// Shared between the UI thread and the tokio worker.
#[derive(Debug, Default)]
pub struct AnalysisState {
    pub phase: AnalysisPhase,
}

impl Default for AnalysisPhase {
    fn default() -> Self {
        AnalysisPhase::Idle
    }
}

impl AnalysisState {
    pub fn in_flight(&self) -> bool {
        matches!(
            self.phase,
            AnalysisPhase::Uploading | AnalysisPhase::Fetching
        )
    }
}

/// JSON body returned by `POST /predict`.
#[derive(serde::Deserialize)]
pub struct PredictResponse {
    /// Server-relative or absolute URL of the segmentation result image.
    #[serde(default)]
    pub prediction_path: Option<String>,
    /// Server-side rejection reason, if any (logged, never shown verbatim).
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prediction_path() {
        let resp: PredictResponse =
            serde_json::from_str(r#"{"prediction_path": "/static/predictions/abc.png"}"#).unwrap();
        assert_eq!(
            resp.prediction_path.as_deref(),
            Some("/static/predictions/abc.png")
        );
        assert!(resp.error.is_none());
    }

    #[test]
    fn missing_prediction_path_is_none() {
        let resp: PredictResponse =
            serde_json::from_str(r#"{"error": "No image uploaded"}"#).unwrap();
        assert!(resp.prediction_path.is_none());
        assert_eq!(resp.error.as_deref(), Some("No image uploaded"));
    }

    #[test]
    fn empty_object_parses() {
        let resp: PredictResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.prediction_path.is_none());
    }

    #[test]
    fn error_messages_match_ui_contract() {
        assert_eq!(
            AnalysisError::Connection("refused".into()).user_message(),
            "Server Error: Unable to connect."
        );
        assert_eq!(
            AnalysisError::NoPrediction.user_message(),
            "Prediction failed. Try again."
        );
    }

    #[test]
    fn in_flight_covers_upload_and_fetch() {
        let mut state = AnalysisState::default();
        assert!(!state.in_flight());
        state.phase = AnalysisPhase::Uploading;
        assert!(state.in_flight());
        state.phase = AnalysisPhase::Fetching;
        assert!(state.in_flight());
        state.phase = AnalysisPhase::Failed(AnalysisError::NoPrediction);
        assert!(!state.in_flight());
    }
}
