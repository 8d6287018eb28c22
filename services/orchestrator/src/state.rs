use std::sync::Arc;

use modelops::ChatEngine;

use crate::config::AppConfig;

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub cfg: AppConfig,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, cfg: AppConfig) -> Self {
        Self { engine, cfg }
    }
}
