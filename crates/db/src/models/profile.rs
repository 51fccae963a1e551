//! Parent and student profiles.
//!
//! Profiles carry no display name worth slugging, so their slugs derive from
//! the contact details (email local part plus the last phone digits).

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::slug::contact_candidate;

use super::{mask_phone, trim_in_place, trim_list, trim_optional, Document, ListFilter};
use crate::store::Collection;

// ---------------------------------------------------------------------------
// Parent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParentProfile {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub child_grade: Option<String>,
    #[serde(default)]
    pub subjects_needed: Vec<String>,
}

impl Document for ParentProfile {
    const COLLECTION: Collection = Collection::ParentProfiles;
    type Filter = ParentProfileFilter;
    const FILTER_FIELDS: &'static [&'static str] =
        &["email", "city", "child_grade", "subjects_needed"];
    const SEQUENCED: bool = true;
    const DEFAULT_SORT: SortSpec = SortSpec::NEWEST_FIRST;

    fn slug_candidate(&self) -> Option<String> {
        Some(contact_candidate(&self.email, &self.phone))
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn redact_private(&mut self) {
        self.phone = mask_phone(&self.phone);
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.email);
        trim_in_place(&mut self.phone);
        trim_optional(&mut self.city);
        trim_optional(&mut self.child_grade);
        trim_list(&mut self.subjects_needed);
    }
}

/// `GET /api/parents` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentProfileFilter {
    pub email: Option<String>,
    pub city: Option<String>,
    pub child_grade: Option<String>,
    pub subject: Option<String>,
}

impl ListFilter for ParentProfileFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals_ignore_case("email", self.email.as_deref())
            .contains("city", self.city.as_deref())
            .equals_ignore_case("child_grade", self.child_grade.as_deref())
            .contains("subjects_needed", self.subject.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Student
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StudentProfile {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl Document for StudentProfile {
    const COLLECTION: Collection = Collection::StudentProfiles;
    type Filter = StudentProfileFilter;
    const FILTER_FIELDS: &'static [&'static str] = &["email", "city", "grade", "subjects"];
    const SEQUENCED: bool = true;
    const DEFAULT_SORT: SortSpec = SortSpec::NEWEST_FIRST;

    fn slug_candidate(&self) -> Option<String> {
        Some(contact_candidate(&self.email, &self.phone))
    }

    fn email(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn redact_private(&mut self) {
        self.phone = mask_phone(&self.phone);
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.email);
        trim_in_place(&mut self.phone);
        trim_optional(&mut self.city);
        trim_optional(&mut self.grade);
        trim_list(&mut self.subjects);
    }
}

/// `GET /api/students` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentProfileFilter {
    pub email: Option<String>,
    pub city: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
}

impl ListFilter for StudentProfileFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals_ignore_case("email", self.email.as_deref())
            .contains("city", self.city.as_deref())
            .equals_ignore_case("grade", self.grade.as_deref())
            .contains("subjects", self.subject.as_deref())
    }
}
