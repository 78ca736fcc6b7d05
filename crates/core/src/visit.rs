//! Pantry visits (append-only foot-traffic log).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::VisitId;
use crate::user::Email;

/// One recorded visit. Anonymous visits carry no email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: VisitId,
    pub email: Option<Email>,
    pub visited_at: DateTime<Utc>,
}

impl Visit {
    pub fn new(email: Option<Email>, visited_at: DateTime<Utc>) -> Self {
        Self {
            id: VisitId::new(),
            email,
            visited_at,
        }
    }
}
