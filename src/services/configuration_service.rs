//! Configuration service - per-object settings with crate-level defaults

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::db::{configurations, LearnplaceDb};
use crate::error::LearnplaceError;
use crate::model::Configuration;

use super::events::{EventBus, LearnplaceEvent};

pub struct ConfigurationService {
    db: Arc<LearnplaceDb>,
    events: Arc<EventBus>,
    defaults: Config,
}

impl ConfigurationService {
    pub fn new(db: Arc<LearnplaceDb>, events: Arc<EventBus>, defaults: Config) -> Self {
        Self { db, events, defaults }
    }

    /// Stored configuration of `object_id`, or an unstored default one
    pub fn find_by_object_id(&self, object_id: i64) -> Result<Configuration, LearnplaceError> {
        let row = self
            .db
            .with_conn(|conn| configurations::get_by_object_id(conn, object_id))?;
        match row {
            Some(row) => row.into_configuration(),
            None => Ok(Configuration::defaults_for(object_id, &self.defaults)),
        }
    }

    pub fn store(&self, configuration: Configuration) -> Result<Configuration, LearnplaceError> {
        configuration.validate()?;
        let row = self
            .db
            .with_conn(|conn| configurations::upsert(conn, &configuration))?;

        info!(object_id = configuration.object_id, online = configuration.online, "Stored configuration");
        self.events.emit(LearnplaceEvent::ConfigurationStored {
            object_id: configuration.object_id,
        });
        row.into_configuration()
    }
}
