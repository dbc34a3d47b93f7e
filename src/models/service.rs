use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub id: String,
    pub provider_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub daily_rate: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub title: String,
    pub description: String,
    pub category: String,
    pub daily_rate: f64,
}

// A title search wins over the category filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceFilter {
    pub provider_id: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ServiceFilter {
    pub fn new(
        provider_id: Option<String>,
        category: Option<String>,
        search: Option<String>,
    ) -> Self {
        let provider_id = non_blank(provider_id);
        let category = non_blank(category)
            .map(|c| c.to_lowercase())
            .filter(|c| c != "all");
        let search = non_blank(search);
        Self {
            provider_id,
            category,
            search,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
