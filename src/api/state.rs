use std::sync::Arc;

use crate::config::AppConfig;
use crate::storage::GuildStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GuildStore>,
    pub config: Arc<AppConfig>,
}
