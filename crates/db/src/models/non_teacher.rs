//! Non-teaching staff (lab assistants, admin staff, librarians, ...).

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{mask_phone, trim_in_place, trim_list, trim_optional, Document, ListFilter};
use crate::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NonTeacher {
    #[validate(length(min = 1, max = 120, message = "must be 1-120 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, max = 80, message = "must be 1-80 characters"))]
    pub staff_role: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = 70, message = "must be between 0 and 70"))]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Document for NonTeacher {
    const COLLECTION: Collection = Collection::NonTeachers;
    type Filter = NonTeacherFilter;
    const FILTER_FIELDS: &'static [&'static str] =
        &["email", "city", "staff_role", "name", "skills"];
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
        trim_in_place(&mut self.staff_role);
        trim_optional(&mut self.city);
        trim_list(&mut self.skills);
    }
}

/// `GET /api/non-teachers` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NonTeacherFilter {
    pub email: Option<String>,
    pub city: Option<String>,
    pub staff_role: Option<String>,
    pub name: Option<String>,
    pub skill: Option<String>,
}

impl ListFilter for NonTeacherFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals_ignore_case("email", self.email.as_deref())
            .contains("city", self.city.as_deref())
            .equals_ignore_case("staff_role", self.staff_role.as_deref())
            .contains("name", self.name.as_deref())
            .contains("skills", self.skill.as_deref())
    }
}
