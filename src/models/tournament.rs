//! Tournament records and resolution targets.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::utils::french_month;

/// A tournament as kept by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TournamentRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub club: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Rules document (usually a PDF) published with the listing.
    #[serde(default)]
    pub rules_url: Option<String>,
    /// Club or tournament website, when known.
    #[serde(default)]
    pub website: Option<String>,
    /// Resolved registration page.
    #[serde(default)]
    pub signup_url: Option<String>,
}

impl TournamentRecord {
    pub fn is_pending(&self) -> bool {
        self.signup_url
            .as_deref()
            .map_or(true, |u| u.trim().is_empty())
    }

    pub fn target(&self) -> TournamentTarget {
        TournamentTarget {
            id: self.id,
            name: self.name.clone(),
            club: self.club.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            rules_url: self.rules_url.clone(),
            website: self.website.clone(),
        }
    }
}

/// Input of one resolution attempt. Never mutated while it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentTarget {
    pub id: i64,
    pub name: String,
    pub club: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rules_url: Option<String>,
    pub website: Option<String>,
}

impl TournamentTarget {
    /// Lowercase French month of the start date.
    pub fn month_name(&self) -> &'static str {
        french_month(self.start_date.month()).unwrap_or_default()
    }

    pub fn year(&self) -> i32 {
        self.start_date.year()
    }

    /// Short label for log lines.
    pub fn label(&self) -> String {
        format!("#{} {}", self.id, self.name)
    }
}

#[cfg(test)]
pub(crate) fn sample_target() -> TournamentTarget {
    TournamentTarget {
        id: 4242,
        name: "Tournoi National de Mondeville".to_string(),
        club: "ASPTT Caen".to_string(),
        city: Some("Mondeville".to_string()),
        postal_code: Some("14120".to_string()),
        start_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(),
        rules_url: None,
        website: None,
    }
}
