//! The persisted document: one keyed collection per record type.

use super::{Category, Client, Configuration, ConsumptionEvent, Instance, Invoice, Resource};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A record with a natural key inside its collection.
pub trait Keyed {
    type Key: PartialEq + Debug;

    fn key(&self) -> &Self::Key;
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Ordered list of records, searched linearly by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> Collection<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append without a key lookup. Used by append-only collections.
    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.records.retain(f);
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.records.clone()
    }
}

impl<T: Keyed> Collection<T> {
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.records.iter().find(|r| r.key() == key)
    }

    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.records.iter_mut().find(|r| r.key() == key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.get(key).is_some()
    }

    /// Replace the record with the same key in place, or append it.
    pub fn upsert(&mut self, record: T) -> Upsert {
        match self.get_mut(record.key()) {
            Some(existing) => {
                *existing = record;
                Upsert::Updated
            }
            None => {
                self.records.push(record);
                Upsert::Inserted
            }
        }
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The whole database. Loaded, mutated and saved as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub resources: Collection<Resource>,
    #[serde(default)]
    pub categories: Collection<Category>,
    #[serde(default)]
    pub configurations: Collection<Configuration>,
    #[serde(default)]
    pub clients: Collection<Client>,
    #[serde(default)]
    pub instances: Collection<Instance>,
    #[serde(default)]
    pub consumptions: Collection<ConsumptionEvent>,
    #[serde(default)]
    pub invoices: Collection<Invoice>,
    /// Next invoice id to hand out. Only ever grows.
    #[serde(default)]
    pub next_invoice_id: i64,
}

impl Document {
    /// Empty document with one empty collection per record type.
    pub fn skeleton() -> Self {
        Self::default()
    }

    /// Reserve a fresh invoice id, never below any id already issued.
    pub fn allocate_invoice_id(&mut self) -> i64 {
        let floor = self
            .invoices
            .iter()
            .map(|invoice| invoice.id + 1)
            .max()
            .unwrap_or(1);
        let id = self.next_invoice_id.max(floor);
        self.next_invoice_id = id + 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Invoice, TaxId};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            description: String::new(),
            workload: "general".to_string(),
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut categories = Collection::default();
        assert_eq!(categories.upsert(category(1, "Compute")), Upsert::Inserted);
        assert_eq!(categories.upsert(category(2, "Storage")), Upsert::Inserted);
        assert_eq!(categories.upsert(category(1, "Compute v2")), Upsert::Updated);

        assert_eq!(categories.len(), 2);
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Compute v2", "Storage"]);
    }

    #[test]
    fn get_misses_unknown_keys() {
        let categories: Collection<Category> = vec![category(7, "Network")].into_iter().collect();
        assert!(categories.get(&7).is_some());
        assert!(categories.get(&8).is_none());
        assert!(!categories.contains(&8));
    }

    #[test]
    fn skeleton_serializes_every_collection() {
        let json = serde_json::to_value(Document::skeleton()).unwrap();
        for name in [
            "resources",
            "categories",
            "configurations",
            "clients",
            "instances",
            "consumptions",
            "invoices",
        ] {
            assert_eq!(json[name], serde_json::json!([]), "{name} should be empty");
        }
    }

    #[test]
    fn invoice_ids_stay_above_existing_invoices() {
        let mut document = Document::skeleton();
        assert_eq!(document.allocate_invoice_id(), 1);
        assert_eq!(document.allocate_invoice_id(), 2);

        document.invoices.upsert(Invoice {
            id: 40,
            client_tax_id: TaxId::parse("1234-5").unwrap(),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            total: Decimal::ZERO,
            line_items: Vec::new(),
        });
        assert_eq!(document.allocate_invoice_id(), 41);
        assert_eq!(document.allocate_invoice_id(), 42);
    }
}
