//! Teacher directory entries.

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{mask_phone, trim_in_place, trim_list, trim_optional, Document, ListFilter};
use crate::store::Collection;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Teacher {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 70, message = "must be between 0 and 70"))]
    pub experience_years: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,
}

impl Document for Teacher {
    const COLLECTION: Collection = Collection::Teachers;
    type Filter = TeacherFilter;
    const FILTER_FIELDS: &'static [&'static str] =
        &["email", "city", "subjects", "qualification", "name"];
    const SEQUENCED: bool = true;
    const DEFAULT_SORT: SortSpec = SortSpec::BY_SEQUENCE;

    fn slug_candidate(&self) -> Option<String> {
        Some(self.name.clone())
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
        trim_list(&mut self.subjects);
        trim_optional(&mut self.qualification);
        trim_optional(&mut self.bio);
    }
}

// ---------------------------------------------------------------------------
// List filter
// ---------------------------------------------------------------------------

/// `GET /api/teachers` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeacherFilter {
    pub email: Option<String>,
    pub city: Option<String>,
    pub subject: Option<String>,
    pub qualification: Option<String>,
    pub name: Option<String>,
}

impl ListFilter for TeacherFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals_ignore_case("email", self.email.as_deref())
            .contains("city", self.city.as_deref())
            .contains("subjects", self.subject.as_deref())
            .contains("qualification", self.qualification.as_deref())
            .contains("name", self.name.as_deref())
    }
}
