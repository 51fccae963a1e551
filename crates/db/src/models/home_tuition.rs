//! Home-tuition requests from parents. Requests expire after a retention
//! window and are purged by a background sweeper.

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{mask_phone, trim_in_place, trim_optional, Document, ListFilter};
use crate::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HomeTuition {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub parent_name: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    pub city: String,
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    pub subject: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(email(message = "must be a valid email address"))]
    pub contact_email: Option<String>,
}

impl Document for HomeTuition {
    const COLLECTION: Collection = Collection::HomeTuitions;
    type Filter = HomeTuitionFilter;
    const FILTER_FIELDS: &'static [&'static str] = &["city", "subject", "grade", "locality"];
    const SEQUENCED: bool = false;
    const DEFAULT_SORT: SortSpec = SortSpec::NEWEST_FIRST;

    fn slug_candidate(&self) -> Option<String> {
        None
    }

    fn email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    fn redact_private(&mut self) {
        self.phone = mask_phone(&self.phone);
        self.contact_email = None;
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.parent_name);
        trim_in_place(&mut self.phone);
        trim_in_place(&mut self.city);
        trim_in_place(&mut self.subject);
        trim_optional(&mut self.grade);
        trim_optional(&mut self.locality);
        trim_optional(&mut self.budget);
        trim_optional(&mut self.notes);
        trim_optional(&mut self.contact_email);
    }
}

/// `GET /api/home-tuitions` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeTuitionFilter {
    pub city: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub locality: Option<String>,
}

impl ListFilter for HomeTuitionFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .contains("city", self.city.as_deref())
            .contains("subject", self.subject.as_deref())
            .equals_ignore_case("grade", self.grade.as_deref())
            .contains("locality", self.locality.as_deref())
    }
}
