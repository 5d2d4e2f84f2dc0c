//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::data_access::DataAccess;
use crate::voting::LocalVotingService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The data access facade. Built once in `main`, never global.
    pub data: Arc<DataAccess>,
    /// Present in voting mode, where it serves `/api/origamis`.
    pub voting: Option<Arc<LocalVotingService>>,
}

impl AppState {
    pub fn new(data: Arc<DataAccess>) -> Self {
        Self { data, voting: None }
    }

    pub fn with_voting(mut self, voting: Arc<LocalVotingService>) -> Self {
        self.voting = Some(voting);
        self
    }
}

crate::impl_from_ref!(Arc<DataAccess>, data);
