//! MongoDB handle factory.

use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use tracing::debug;

use crate::error::BackendError;
use crate::pool::HandleFactory;

/// Prefix of the `appName` reported to the server, suffixed with the role key.
const APP_NAME: &str = "backend-cache";

/// Builds one MongoDB client per pool role key.
///
/// Connection options are parsed once; every handle gets its own `Client`
/// so role-specific settings (read preference, app name) never leak between
/// roles. Building a client is lazy and does not touch the network.
#[derive(Debug, Clone)]
pub struct MongoFactory {
    options: ClientOptions,
    db_name: String,
}

impl MongoFactory {
    /// Parse a connection string.
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidUri`] if the URI cannot be parsed or resolved.
    pub async fn from_uri(uri: &str, db_name: &str) -> Result<Self, BackendError> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(BackendError::InvalidUri)?;
        Ok(Self::with_options(options, db_name))
    }

    pub fn with_options(options: ClientOptions, db_name: &str) -> Self {
        Self {
            options,
            db_name: db_name.to_string(),
        }
    }

    /// Name of the database every handle points at.
    pub fn database_name(&self) -> &str {
        &self.db_name
    }
}

/// Read preference implied by a role key. Unknown roles keep the URI's setting.
fn role_selection(role: &str) -> Option<SelectionCriteria> {
    match role {
        "readonly" => Some(SelectionCriteria::ReadPreference(
            ReadPreference::SecondaryPreferred { options: None },
        )),
        "write" => Some(SelectionCriteria::ReadPreference(ReadPreference::Primary)),
        _ => None,
    }
}

impl HandleFactory for MongoFactory {
    type Handle = Database;
    type Error = BackendError;

    fn create(&self, key: &str) -> Result<Database, BackendError> {
        let mut options = self.options.clone();
        options.app_name = Some(format!("{}/{}", APP_NAME, key));
        if let Some(criteria) = role_selection(key) {
            options.selection_criteria = Some(criteria);
        }

        let client = Client::with_options(options).map_err(|source| BackendError::Client {
            role: key.to_string(),
            source,
        })?;

        debug!("MongoDB client built for role '{}'", key);
        Ok(client.database(&self.db_name))
    }
}
