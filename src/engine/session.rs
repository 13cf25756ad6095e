//! Process-wide credential and configuration, passed explicitly

use std::sync::Arc;

use super::row::RowSchema;
use crate::config::DispatchConfig;

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub config: Arc<DispatchConfig>,
    pub case_schema: Arc<RowSchema>,
    pub assignee_schema: Arc<RowSchema>,
    credential: Option<String>,
}

impl SessionContext {
    pub fn new(config: DispatchConfig, credential: Option<String>) -> Self {
        let case_schema = Arc::new(config.case_schema.clone());
        let assignee_schema = Arc::new(config.assignee_schema.clone());
        let mut session = Self {
            config: Arc::new(config),
            case_schema,
            assignee_schema,
            credential: None,
        };
        session.set_credential(credential);
        session
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Blank strings clear the credential
    pub fn set_credential(&mut self, credential: Option<String>) {
        self.credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
    }
}
