//! Child detail page: profile, visits and medications.

use log::{error, info, warn};
use shared::{Child, ChildCard, ChildDashboard, ChildDetail, Medication, Session, Visit};
use std::sync::Arc;

use super::today;
use crate::backend::storage::{select_as, single_as, Query, StorageError, Table, TableStore};

#[derive(Clone)]
pub struct ChildDashboardService {
    store: Arc<dyn TableStore>,
}

impl ChildDashboardService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Load the child, then its visits and medications side by side. A child
    /// that is missing or belongs to someone else is [`ChildDetail::NotFound`];
    /// a failed collection fetch only empties that collection.
    pub async fn load(&self, session: &Session, child_id: &str) -> ChildDetail {
        info!("Loading dashboard for child {}", child_id);

        let query = Query::from(Table::Children).eq("id", child_id);
        let child: Child = match single_as(self.store.as_ref(), session, &query).await {
            Ok(child) => child,
            Err(StorageError::NotFound) => {
                warn!("Child not found: {}", child_id);
                return ChildDetail::NotFound;
            }
            Err(e) => {
                error!("Failed to load child {}: {}", child_id, e);
                return ChildDetail::NotFound;
            }
        };

        let visits_query = Query::from(Table::Visits)
            .eq("child_id", child_id)
            .order("date", false);
        let medications_query = Query::from(Table::Medications)
            .eq("child_id", child_id)
            .order("start_date", false);

        let (visits, medications) = tokio::join!(
            select_as::<Visit>(self.store.as_ref(), session, &visits_query),
            select_as::<Medication>(self.store.as_ref(), session, &medications_query),
        );

        let (visits, visits_error) = match visits {
            Ok(visits) => (visits, None),
            Err(e) => {
                error!("Failed to load visits for child {}: {}", child_id, e);
                (Vec::new(), Some("Failed to load visits".to_string()))
            }
        };
        let (medications, medications_error) = match medications {
            Ok(medications) => (medications, None),
            Err(e) => {
                error!("Failed to load medications for child {}: {}", child_id, e);
                (Vec::new(), Some("Failed to load medications".to_string()))
            }
        };

        info!(
            "Child {} has {} visits and {} medications",
            child_id,
            visits.len(),
            medications.len()
        );

        ChildDetail::Found(Box::new(ChildDashboard {
            child: ChildCard::from_child(child, today()),
            visits,
            medications,
            visits_error,
            medications_error,
        }))
    }
}
