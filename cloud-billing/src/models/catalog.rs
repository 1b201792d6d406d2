//! Catalog models: resources, categories, configurations and their allocations.

use super::document::Keyed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Whether a resource is physical capacity or a licensed product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Hardware,
    Software,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Hardware => "hardware",
            ResourceKind::Software => "software",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hardware" => Some(ResourceKind::Hardware),
            "software" => Some(ResourceKind::Software),
            _ => None,
        }
    }
}

/// A billable unit type with an hourly rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub unit_of_measure: String,
    pub kind: ResourceKind,
    pub hourly_rate: Decimal,
}

impl Keyed for Resource {
    type Key = i64;

    fn key(&self) -> &i64 {
        &self.id
    }
}

/// Input for creating or updating a resource.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateResource {
    pub id: i64,
    #[validate(length(min = 1, message = "Resource name is required"))]
    pub name: String,
    pub abbreviation: String,
    #[validate(length(min = 1, message = "Unit of measure is required"))]
    pub unit_of_measure: String,
    pub kind: ResourceKind,
    pub hourly_rate: Decimal,
}

impl From<CreateResource> for Resource {
    fn from(input: CreateResource) -> Self {
        Self {
            id: input.id,
            name: input.name,
            abbreviation: input.abbreviation,
            unit_of_measure: input.unit_of_measure,
            kind: input.kind,
            hourly_rate: input.hourly_rate,
        }
    }
}

/// Classification for configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub workload: String,
}

impl Keyed for Category {
    type Key = i64;

    fn key(&self) -> &i64 {
        &self.id
    }
}

/// Input for creating or updating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    pub id: i64,
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub workload: String,
}

impl From<CreateCategory> for Category {
    fn from(input: CreateCategory) -> Self {
        Self {
            id: input.id,
            name: input.name,
            description: input.description,
            workload: input.workload,
        }
    }
}

/// Quantity of one resource allocated to a configuration.
/// Keyed by `(configuration_id, resource_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResource {
    pub configuration_id: i64,
    pub resource_id: i64,
    pub quantity: Decimal,
}

/// A named bundle of resource allocations under one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    /// Allocations in the order they were attached.
    #[serde(default)]
    pub resources: Vec<ConfigurationResource>,
}

impl Keyed for Configuration {
    type Key = i64;

    fn key(&self) -> &i64 {
        &self.id
    }
}

impl Configuration {
    /// Set the quantity for a resource, keeping attachment order for existing ones.
    pub fn set_resource(&mut self, resource_id: i64, quantity: Decimal) -> ConfigurationResource {
        let allocation = ConfigurationResource {
            configuration_id: self.id,
            resource_id,
            quantity,
        };
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_id == resource_id)
        {
            Some(existing) => *existing = allocation.clone(),
            None => self.resources.push(allocation.clone()),
        }
        allocation
    }
}

/// Input for creating or updating a configuration. Allocations are managed
/// separately and survive updates.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateConfiguration {
    pub id: i64,
    #[validate(length(min = 1, message = "Configuration name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
}

/// Input for attaching a resource to a configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SetConfigurationResource {
    pub configuration_id: i64,
    pub resource_id: i64,
    pub quantity: Decimal,
}

/// Allocation joined with the resource it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedResource {
    pub resource_id: i64,
    pub resource_name: String,
    pub quantity: Decimal,
    pub hourly_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn resource_kind_parses_case_insensitively() {
        assert_eq!(
            ResourceKind::from_string("Hardware"),
            Some(ResourceKind::Hardware)
        );
        assert_eq!(
            ResourceKind::from_string("SOFTWARE"),
            Some(ResourceKind::Software)
        );
        assert_eq!(ResourceKind::from_string("firmware"), None);
        assert_eq!(ResourceKind::Software.as_str(), "software");
    }

    #[test]
    fn set_resource_updates_quantity_in_place() {
        let mut configuration = Configuration {
            id: 3,
            name: "Small VM".to_string(),
            description: String::new(),
            category_id: 1,
            resources: Vec::new(),
        };
        configuration.set_resource(10, dec!(2));
        configuration.set_resource(11, dec!(4));
        configuration.set_resource(10, dec!(8));

        let ids: Vec<_> = configuration.resources.iter().map(|r| r.resource_id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(configuration.resources[0].quantity, dec!(8));
        assert_eq!(configuration.resources[0].configuration_id, 3);
    }
}
