//! Client model and tax id.

use super::document::Keyed;
use crate::error::BillingError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

static TAX_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+-[0-9K]$").expect("tax id pattern is valid"));

/// Client tax id: digits, a dash and a check character (`0-9` or `K`).
/// Always handled as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    pub fn parse(value: &str) -> Result<Self, BillingError> {
        let value = value.trim();
        if TAX_ID_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(BillingError::ValidationError(anyhow::anyhow!(
                "Invalid tax id '{}': expected digits, '-', then 0-9 or K",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer that owns instances and receives invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub tax_id: TaxId,
    pub name: String,
    pub username: String,
    pub secret: String,
    pub address: String,
    pub email: String,
}

impl Keyed for Client {
    type Key = TaxId;

    fn key(&self) -> &TaxId {
        &self.tax_id
    }
}

/// Input for creating or updating a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClient {
    pub tax_id: String,
    #[validate(length(min = 1, message = "Client name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub address: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

impl CreateClient {
    /// Validate every field and build the stored record.
    pub fn into_client(self) -> Result<Client, BillingError> {
        self.validate()?;
        Ok(Client {
            tax_id: TaxId::parse(&self.tax_id)?,
            name: self.name,
            username: self.username,
            secret: self.secret,
            address: self.address,
            email: self.email,
        })
    }
}
