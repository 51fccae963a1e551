//! Job vacancies posted by schools, coaching institutes and recruiters.
//!
//! A vacancy posted by a non-admin starts `pending` and only becomes publicly
//! visible once an admin approves it. Approval (at creation for admin posters,
//! or later via the approve endpoint) schedules the vacancy announcement.

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::error::CoreError;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{trim_in_place, trim_optional, Document, ListFilter};
use crate::store::Collection;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacancyStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Closed,
}

impl VacancyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VacancyStatus::Pending => "pending",
            VacancyStatus::Approved => "approved",
            VacancyStatus::Rejected => "rejected",
            VacancyStatus::Closed => "closed",
        }
    }

    pub fn parse(input: &str) -> Result<Self, CoreError> {
        match input.trim() {
            "pending" => Ok(VacancyStatus::Pending),
            "approved" => Ok(VacancyStatus::Approved),
            "rejected" => Ok(VacancyStatus::Rejected),
            "closed" => Ok(VacancyStatus::Closed),
            other => Err(CoreError::Validation(format!(
                "Unknown vacancy status '{other}'. Expected pending, approved, rejected or closed"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Vacancy {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub organization: String,
    /// `school`, `coaching`, `college`, ...
    #[serde(default)]
    pub organization_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub contact_email: String,
    /// Server-controlled; client-supplied values are overwritten.
    #[serde(default)]
    pub status: VacancyStatus,
}

impl Document for Vacancy {
    const COLLECTION: Collection = Collection::Vacancies;
    type Filter = VacancyFilter;
    const FILTER_FIELDS: &'static [&'static str] = &[
        "status",
        "city",
        "subject",
        "organization_type",
        "organization",
        "title",
        "contact_email",
    ];
    const SEQUENCED: bool = true;
    const DEFAULT_SORT: SortSpec = SortSpec::NEWEST_FIRST;

    fn slug_candidate(&self) -> Option<String> {
        Some(format!("{} {}", self.title, self.organization))
    }

    fn email(&self) -> Option<&str> {
        Some(&self.contact_email)
    }

    fn retain_managed(&mut self, existing: &Self) {
        self.status = existing.status;
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.organization);
        trim_optional(&mut self.organization_type);
        trim_optional(&mut self.city);
        trim_optional(&mut self.subject);
        trim_optional(&mut self.description);
        trim_optional(&mut self.salary);
        trim_in_place(&mut self.contact_email);
    }
}

// ---------------------------------------------------------------------------
// List filter
// ---------------------------------------------------------------------------

/// `GET /api/vacancies` filters. `status` is honoured for admins and for
/// `mine=true` listings only; everyone else sees approved vacancies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VacancyFilter {
    pub status: Option<String>,
    pub city: Option<String>,
    pub subject: Option<String>,
    pub organization_type: Option<String>,
    pub organization: Option<String>,
    pub title: Option<String>,
    pub contact_email: Option<String>,
}

impl ListFilter for VacancyFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals("status", self.status.as_deref())
            .contains("city", self.city.as_deref())
            .contains("subject", self.subject.as_deref())
            .equals_ignore_case("organization_type", self.organization_type.as_deref())
            .contains("organization", self.organization.as_deref())
            .contains("title", self.title.as_deref())
            .equals_ignore_case("contact_email", self.contact_email.as_deref())
    }
}
