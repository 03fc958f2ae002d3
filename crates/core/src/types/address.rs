//! Delivery address captured at checkout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when validating a [`DeliveryAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// A required field is empty or whitespace.
    #[error("{0} is required")]
    Missing(&'static str),
}

/// The address an order ships to.
///
/// All five fields are required. They are stored individually and also
/// flattened into a single display string (see [`Self::to_composite`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub first_name: String,
    pub last_name: String,
    pub complete_address: String,
    pub phone_number: String,
    pub email_address: String,
}

impl DeliveryAddress {
    /// Return a copy with surrounding whitespace trimmed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            complete_address: self.complete_address.trim().to_owned(),
            phone_number: self.phone_number.trim().to_owned(),
            email_address: self.email_address.trim().to_owned(),
        }
    }

    /// Check that every field is present.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Missing` naming the first blank field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("completeAddress", &self.complete_address),
            ("phoneNumber", &self.phone_number),
            ("emailAddress", &self.email_address),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AddressError::Missing(name));
            }
        }
        Ok(())
    }

    /// Single-line form: `"first, last, address, phone, email"`.
    #[must_use]
    pub fn to_composite(&self) -> String {
        [
            self.first_name.trim(),
            self.last_name.trim(),
            self.complete_address.trim(),
            self.phone_number.trim(),
            self.email_address.trim(),
        ]
        .join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> DeliveryAddress {
        DeliveryAddress {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            complete_address: "12 St James's Square, London".to_string(),
            phone_number: "+44 20 7946 0000".to_string(),
            email_address: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_validate_complete_address() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_blank_field() {
        let mut address = sample();
        address.phone_number = "   ".to_string();
        assert_eq!(
            address.validate(),
            Err(AddressError::Missing("phoneNumber"))
        );
    }

    #[test]
    fn test_composite_joins_trimmed_fields() {
        let mut address = sample();
        address.first_name = "  Ada ".to_string();
        assert_eq!(
            address.to_composite(),
            "Ada, Lovelace, 12 St James's Square, London, +44 20 7946 0000, ada@example.com"
        );
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "firstName": "Ada",
            "lastName": "Lovelace",
            "completeAddress": "12 St James's Square, London",
            "phoneNumber": "+44 20 7946 0000",
            "emailAddress": "ada@example.com"
        }"#;
        let address: DeliveryAddress = serde_json::from_str(json).unwrap();
        assert_eq!(address, sample());
    }
}
