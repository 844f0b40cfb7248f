use std::sync::Arc;

use crate::config::Config;
use crate::repository::Repository;
use crate::scheduler::Scheduler;
use crate::services::history::HistoryStore;
use crate::services::notification::NotificationService;
use crate::templates::TemplateEngine;

/// Everything the HTTP surface needs, constructed once at startup and
/// passed through the router state. No process-wide mutables.
#[derive(Clone)]
pub struct AppContext {
    pub repository: Repository,
    pub history: Arc<dyn HistoryStore>,
    pub notifications: Arc<NotificationService>,
    pub scheduler: Arc<Scheduler>,
    pub templates: Arc<TemplateEngine>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        repository: Repository,
        history: Arc<dyn HistoryStore>,
        notifications: Arc<NotificationService>,
        scheduler: Arc<Scheduler>,
        templates: Arc<TemplateEngine>,
        config: Config
    ) -> Self {
        Self {
            repository,
            history,
            notifications,
            scheduler,
            templates,
            config: Arc::new(config),
        }
    }
}
