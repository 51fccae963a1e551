//! Schools.

use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::filter::{FilterSpec, SortSpec};

use super::{mask_phone, trim_in_place, trim_optional, Document, ListFilter};
use crate::store::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct School {
    #[validate(length(min = 1, max = 160, message = "must be 1-160 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "must be 7-20 characters"))]
    pub phone: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub address: Option<String>,
    /// Affiliation board (CBSE, ICSE, state board, ...).
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
}

impl Document for School {
    const COLLECTION: Collection = Collection::Schools;
    type Filter = SchoolFilter;
    const FILTER_FIELDS: &'static [&'static str] = &["email", "city", "board", "name"];
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
        trim_optional(&mut self.address);
        trim_optional(&mut self.board);
        trim_optional(&mut self.website);
    }
}

/// `GET /api/schools` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolFilter {
    pub email: Option<String>,
    pub city: Option<String>,
    pub board: Option<String>,
    pub name: Option<String>,
}

impl ListFilter for SchoolFilter {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .equals_ignore_case("email", self.email.as_deref())
            .contains("city", self.city.as_deref())
            .equals_ignore_case("board", self.board.as_deref())
            .contains("name", self.name.as_deref())
    }
}
