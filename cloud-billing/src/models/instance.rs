//! Instance model and lifecycle.

use super::client::TaxId;
use super::document::Keyed;
use crate::error::BillingError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Instance lifecycle state. The only transition is `Active -> Cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    #[default]
    Active,
    Cancelled,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Active => "active",
            InstanceState::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Some(InstanceState::Active),
            "cancelled" => Some(InstanceState::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Cancelled)
    }
}

/// A provisioned unit of infrastructure bound to one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: i64,
    pub client_tax_id: TaxId,
    pub configuration_id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub state: InstanceState,
    /// Present exactly when `state` is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Keyed for Instance {
    type Key = i64;

    fn key(&self) -> &i64 {
        &self.id
    }
}

impl Instance {
    pub fn is_active(&self) -> bool {
        self.state == InstanceState::Active
    }

    /// Move to the terminal state. Re-cancelling overwrites the end date.
    pub fn cancel(&mut self, cancellation_date: NaiveDate) {
        self.state = InstanceState::Cancelled;
        self.end_date = Some(cancellation_date);
    }
}

/// Input for creating or updating an instance.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInstance {
    pub id: i64,
    pub client_tax_id: String,
    pub configuration_id: i64,
    #[validate(length(min = 1, message = "Instance name is required"))]
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub state: InstanceState,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl CreateInstance {
    /// Validate fields and the state/end-date pairing, then build the record.
    /// References are checked by the caller against the document.
    pub fn into_instance(self) -> Result<Instance, BillingError> {
        self.validate()?;
        let client_tax_id = TaxId::parse(&self.client_tax_id)?;

        match (self.state.is_terminal(), self.end_date) {
            (true, None) => {
                return Err(BillingError::ValidationError(anyhow::anyhow!(
                    "Instance {} is cancelled but has no end date",
                    self.id
                )));
            }
            (false, Some(_)) => {
                return Err(BillingError::ValidationError(anyhow::anyhow!(
                    "Instance {} has an end date but is not cancelled",
                    self.id
                )));
            }
            _ => {}
        }

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(BillingError::ValidationError(anyhow::anyhow!(
                    "Instance {} ends on {} before it starts on {}",
                    self.id,
                    end_date,
                    self.start_date
                )));
            }
        }

        Ok(Instance {
            id: self.id,
            client_tax_id,
            configuration_id: self.configuration_id,
            name: self.name,
            start_date: self.start_date,
            state: self.state,
            end_date: self.end_date,
        })
    }
}
