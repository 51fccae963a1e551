//! Domain model structs.
//!
//! Each entity submodule contains:
//! - A `Deserialize` + `Validate` body struct stored as the document JSON
//! - A [`Document`] impl describing its collection, slug source and filters
//! - A typed list filter converted into a [`FilterSpec`](eduboard_core::filter::FilterSpec)

pub mod application;
pub mod coaching;
pub mod counter;
pub mod home_tuition;
pub mod non_teacher;
pub mod outbox;
pub mod profile;
pub mod school;
pub mod teacher;
pub mod vacancy;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;
use eduboard_core::authz::Ownership;
use eduboard_core::filter::{FilterSpec, SortSpec};
use eduboard_core::types::{ObjectId, Timestamp};

use crate::store::{Collection, StoreError, StoredDocument};

/// Behaviour shared by every entity body kept in a document collection.
pub trait Document:
    Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static
{
    const COLLECTION: Collection;

    /// Typed list filter accepted by the listing endpoint.
    type Filter: ListFilter;

    /// Body fields that list filters may reference.
    const FILTER_FIELDS: &'static [&'static str];

    /// Whether new documents get a display sequence.
    const SEQUENCED: bool;

    /// Listing order when the caller does not ask for one.
    const DEFAULT_SORT: SortSpec;

    /// Raw input for slug derivation. `None` means the entity has no slug.
    fn slug_candidate(&self) -> Option<String>;

    /// Contact email used for uniqueness and ownership checks.
    fn email(&self) -> Option<&str>;

    /// Mask fields only the owner or an admin may read.
    fn redact_private(&mut self) {}

    /// Tidy user input before validation (trim, drop blank optionals).
    fn normalize(&mut self) {}

    /// Copy server-controlled fields from the stored version onto an
    /// incoming replacement so clients cannot change them.
    fn retain_managed(&mut self, _existing: &Self) {}
}

/// Query parameters of a collection listing, minus paging and sorting.
pub trait ListFilter: DeserializeOwned + Default + Send + Sync + 'static {
    fn to_spec(&self) -> FilterSpec;
}

/// A stored entity as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: ObjectId,
    pub short_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    pub owner_id: Option<String>,
    #[serde(flatten)]
    pub body: T,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<T: Document> Record<T> {
    pub fn from_stored(doc: StoredDocument) -> Result<Self, StoreError> {
        let body: T = serde_json::from_value(doc.body).map_err(|e| {
            StoreError::Corrupt(format!(
                "{} {}: {e}",
                T::COLLECTION.label(),
                doc.id
            ))
        })?;
        Ok(Self {
            short_id: doc.id.short().to_string(),
            id: doc.id,
            slug: doc.slug,
            sequence: doc.sequence,
            owner_id: doc.owner_id,
            body,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }

    pub fn ownership(&self) -> Ownership<'_> {
        Ownership {
            owner_id: self.owner_id.as_deref(),
            owner_email: self.body.email(),
        }
    }

    /// Apply [`Document::redact_private`] and return the record.
    pub fn redacted(mut self) -> Self {
        self.body.redact_private();
        self
    }
}

/// Keep only the last two digits of a phone number.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 2 {
        return "*".repeat(digits.len());
    }
    let visible: String = digits[digits.len() - 2..].iter().collect();
    format!("{}{visible}", "*".repeat(digits.len() - 2))
}

/// Trim a required string in place.
pub(crate) fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trim an optional string, turning blank values into `None`.
pub(crate) fn trim_optional(value: &mut Option<String>) {
    if let Some(v) = value.take() {
        let trimmed = v.trim();
        if !trimmed.is_empty() {
            *value = Some(trimmed.to_string());
        }
    }
}

/// Trim list entries and drop blank ones.
pub(crate) fn trim_list(values: &mut Vec<String>) {
    values.retain_mut(|v| {
        trim_in_place(v);
        !v.is_empty()
    });
}
