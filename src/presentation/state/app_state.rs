use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{AnalysisMessage, AnalysisService};
use crate::presentation::config::AnalysisSettings;

#[derive(Clone)]
pub struct AppState {
    pub analysis_service: Arc<AnalysisService>,
    pub analysis_sender: mpsc::Sender<AnalysisMessage>,
    pub analysis_defaults: AnalysisSettings,
}
