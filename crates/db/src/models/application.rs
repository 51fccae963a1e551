//! Applications submitted against a vacancy.

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::error::CoreError;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{mask_phone, trim_in_place, trim_optional, Document, ListFilter};
use crate::store::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        match input.trim() {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "hired" => Ok(ApplicationStatus::Hired),
            other => Err(CoreError::Validation(format!(
                "Unknown application status '{other}'. \
                 Expected submitted, shortlisted, rejected or hired"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Application {
    /// Canonical id of the vacancy. Requests may send a short id or slug;
    /// the handler resolves it before storing.
    #[validate(length(min = 1, message = "must not be empty"))]
    pub vacancy_id: String,
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub cover_letter: Option<String>,
    #[serde(default)]
    #[validate(url(message = "must be a valid URL"))]
    pub resume_url: Option<String>,
    /// Server-controlled; changed through the status endpoint only.
    #[serde(default)]
    pub status: ApplicationStatus,
}

impl Document for Application {
    const COLLECTION: Collection = Collection::Applications;
    type Filter = ApplicationFilter;
    const FILTER_FIELDS: &'static [&'static str] = &["vacancy_id", "email", "status"];
    const SEQUENCED: bool = false;
    const DEFAULT_SORT: SortSpec = SortSpec::NEWEST_FIRST;

    fn slug_candidate(&self) -> Option<String> {
        None
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn redact_private(&mut self) {
        if let Some(phone) = self.phone.as_mut() {
            *phone = mask_phone(phone);
        }
    }

    fn retain_managed(&mut self, existing: &Self) {
        self.vacancy_id.clone_from(&existing.vacancy_id);
        self.status = existing.status;
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.vacancy_id);
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.email);
        trim_optional(&mut self.phone);
        trim_optional(&mut self.cover_letter);
        trim_optional(&mut self.resume_url);
    }
}

/// `GET /api/applications` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    pub vacancy_id: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

impl ListFilter for ApplicationFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals("vacancy_id", self.vacancy_id.as_deref())
            .equals_ignore_case("email", self.email.as_deref())
            .equals("status", self.status.as_deref())
    }
}

/// Body of `PATCH /api/applications/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateApplicationStatus {
    pub status: ApplicationStatus,
}
