//! Slot schema and slot store
//!
//! The schema is the ordered, immutable list of fields collected during the
//! dialogue. The store holds one optional value per schema slot, in
//! declaration order, with first-write-wins semantics.

use crate::error::IntakeError;
use crate::Result;
use lazy_static::lazy_static;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub const MERCHANT_INITIALS: &str = "MerchantInitials";
pub const MERCHANT_SIGNATURE_NAME: &str = "MerchantSignatureName";

/// Merchant Processing Application fields, in the order they are asked for
const MERCHANT_SLOTS: &[&str] = &[
    "SiteCompanyName1",
    "SiteAddress",
    "SiteCity",
    "SiteState",
    "SiteZip",
    "SiteVoice",
    "SiteFax",
    "CorporateCompanyName1",
    "CorporateAddress",
    "CorporateCity",
    "CorporateState",
    "CorporateZip",
    "CorporateName",
    "SiteEmail",
    "CorporateVoice",
    "CorporateFax",
    "BusinessWebsite",
    "CorporateEmail",
    "CustomerSvcEmail",
    "AppRetrievalMail",
    "AppRetrievalFax",
    "AppRetrievalFaxNumber",
    "MCC-Desc",
    // Collected after the core fields
    MERCHANT_INITIALS,
    MERCHANT_SIGNATURE_NAME,
];

/// Identity and contact fields where a misheard value is costly
const CONFIRMATION_SENSITIVE: &[&str] = &[
    "SiteCompanyName1",
    "CorporateCompanyName1",
    "CorporateName",
    "SiteEmail",
    "CorporateEmail",
    "CustomerSvcEmail",
    "SiteZip",
    "CorporateZip",
];

const TRAILING_SLOTS: &[&str] = &[MERCHANT_INITIALS, MERCHANT_SIGNATURE_NAME];

lazy_static! {
    static ref MERCHANT_SCHEMA: Arc<SlotSchema> = Arc::new(SlotSchema {
        slots: MERCHANT_SLOTS.iter().map(|s| s.to_string()).collect(),
        sensitive: CONFIRMATION_SENSITIVE.iter().map(|s| s.to_string()).collect(),
        trailing: TRAILING_SLOTS.iter().map(|s| s.to_string()).collect(),
    });
}

/// Ordered set of named slots
#[derive(Debug, Clone)]
pub struct SlotSchema {
    slots: Vec<String>,
    sensitive: HashSet<String>,
    /// Excluded from the core completeness check
    trailing: HashSet<String>,
}

impl SlotSchema {
    /// Build a schema, rejecting duplicate names and subsets that reference
    /// slots outside the schema.
    pub fn new<S: Into<String>>(
        slots: impl IntoIterator<Item = S>,
        sensitive: impl IntoIterator<Item = S>,
        trailing: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let slots: Vec<String> = slots.into_iter().map(Into::into).collect();

        let mut seen: HashSet<String> = HashSet::with_capacity(slots.len());
        for name in &slots {
            if name.trim().is_empty() {
                return Err(IntakeError::InvalidInput("slot name must not be empty".to_string()));
            }
            if !seen.insert(name.clone()) {
                return Err(IntakeError::InvalidInput(format!("duplicate slot name: {}", name)));
            }
        }

        let collect_subset = |names: Vec<String>, kind: &str| -> Result<HashSet<String>> {
            for name in &names {
                if !seen.contains(name) {
                    return Err(IntakeError::InvalidInput(format!(
                        "{} slot {} is not part of the schema",
                        kind, name
                    )));
                }
            }
            Ok(names.into_iter().collect())
        };

        let sensitive = collect_subset(sensitive.into_iter().map(Into::into).collect(), "sensitive")?;
        let trailing = collect_subset(trailing.into_iter().map(Into::into).collect(), "trailing")?;

        Ok(Self {
            slots,
            sensitive,
            trailing,
        })
    }

    /// The Merchant Processing Application schema (shared instance)
    pub fn merchant_application() -> Arc<Self> {
        Arc::clone(&MERCHANT_SCHEMA)
    }

    pub fn slot_names(&self) -> &[String] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn is_confirmation_sensitive(&self, name: &str) -> bool {
        self.sensitive.contains(name)
    }

    pub fn is_core(&self, name: &str) -> bool {
        self.contains(name) && !self.trailing.contains(name)
    }

    /// Core slots in declaration order
    pub fn core_slots(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|s| !self.trailing.contains(s.as_str()))
            .map(String::as_str)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s == name)
    }
}

/// One optional value per schema slot
#[derive(Debug, Clone)]
pub struct SlotStore {
    schema: Arc<SlotSchema>,
    values: Vec<Option<String>>,
}

impl SlotStore {
    pub fn new(schema: Arc<SlotSchema>) -> Self {
        let values = vec![None; schema.len()];
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<SlotSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.schema
            .position(name)
            .and_then(|i| self.values[i].as_deref())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Commit a value unless the slot is unknown or already holds one.
    /// Returns whether the value was written.
    pub fn set_if_unset(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.schema.position(name) {
            Some(i) if self.values[i].is_none() => {
                self.values[i] = Some(value.into());
                true
            }
            _ => false,
        }
    }

    /// Every core slot holds a value
    pub fn core_complete(&self) -> bool {
        self.schema.core_slots().all(|name| self.is_set(name))
    }

    /// Core slots still missing, in declaration order
    pub fn missing_core_slots(&self) -> Vec<&str> {
        self.schema
            .core_slots()
            .filter(|name| !self.is_set(name))
            .collect()
    }

    /// Iterate `(slot, value)` in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.schema
            .slots
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn filled_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
    }

    /// Plain mapping view; unset slots map to `None`
    pub fn to_map(&self) -> BTreeMap<String, Option<String>> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
            .collect()
    }

    /// JSON object view; unset slots map to `null`
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.values.len());
        for (name, value) in self.iter() {
            object.insert(
                name.to_string(),
                value.map_or(Value::Null, |v| Value::String(v.to_string())),
            );
        }
        Value::Object(object)
    }
}
