//! Object-type registry.
//!
//! Every object type the platform exchanges is listed exactly once in
//! [`ObjectType::ALL`], together with its API name and multipart upload field.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

/// Object types supported by the bulk exchange API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Product,
    Variant,
    Category,
    Collection,
    Customer,
    Order,
    Inventory,
    PriceBook,
    PriceBookEntry,
}

impl ObjectType {
    /// Registry table, in declaration order.
    pub const ALL: [ObjectType; 9] = [
        ObjectType::Product,
        ObjectType::Variant,
        ObjectType::Category,
        ObjectType::Collection,
        ObjectType::Customer,
        ObjectType::Order,
        ObjectType::Inventory,
        ObjectType::PriceBook,
        ObjectType::PriceBookEntry,
    ];

    /// Lowercase name used in metadata lines, CLI flags and file names.
    pub fn api_name(&self) -> &'static str {
        match self {
            ObjectType::Product => "product",
            ObjectType::Variant => "variant",
            ObjectType::Category => "category",
            ObjectType::Collection => "collection",
            ObjectType::Customer => "customer",
            ObjectType::Order => "order",
            ObjectType::Inventory => "inventory",
            ObjectType::PriceBook => "pricebook",
            ObjectType::PriceBookEntry => "pricebookentry",
        }
    }

    /// Multipart field name for combined imports.
    pub fn upload_field(&self) -> &'static str {
        match self {
            ObjectType::Product => "products",
            ObjectType::Variant => "productVariants",
            ObjectType::Category => "categories",
            ObjectType::Collection => "collections",
            ObjectType::Customer => "customers",
            ObjectType::Order => "orders",
            ObjectType::Inventory => "inventoryLevels",
            ObjectType::PriceBook => "priceLists",
            ObjectType::PriceBookEntry => "priceListEntries",
        }
    }

    /// Look up a type by name, ignoring case and `-`/`_` separators.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.api_name() == normalized)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
            .ok_or_else(|| Error::validation(format!("unknown object type '{s}'")))
    }
}

/// Check the registry table for consistency.
///
/// Runs once when a `BulkJobClient` is constructed.
pub fn validate_registry() -> Result<()> {
    let config_error = |msg: String| Err(Error::new(ErrorKind::Config(msg)));

    for (index, object_type) in ObjectType::ALL.iter().enumerate() {
        // The discriminant doubles as the table position.
        if *object_type as usize != index {
            return config_error(format!(
                "registry entry {index} is {object_type:?}, table is out of order"
            ));
        }
    }

    let mut names = HashSet::new();
    let mut fields = HashSet::new();
    for object_type in ObjectType::ALL {
        let name = object_type.api_name();
        if name.is_empty() || name.contains('-') || name != name.to_lowercase() {
            return config_error(format!("invalid api name '{name}' for {object_type:?}"));
        }
        if !names.insert(name) {
            return config_error(format!("duplicate api name '{name}'"));
        }
        if !fields.insert(object_type.upload_field()) {
            return config_error(format!(
                "duplicate upload field '{}'",
                object_type.upload_field()
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_valid() {
        validate_registry().unwrap();
    }

    #[test]
    fn test_lookup_ignores_case_and_separators() {
        assert_eq!(ObjectType::from_name("Product"), Some(ObjectType::Product));
        assert_eq!(ObjectType::from_name("price-book"), Some(ObjectType::PriceBook));
        assert_eq!(
            ObjectType::from_name("PRICE_BOOK_ENTRY"),
            Some(ObjectType::PriceBookEntry)
        );
        assert_eq!(ObjectType::from_name("widget"), None);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "widget".parse::<ObjectType>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_upload_fields() {
        assert_eq!(ObjectType::Variant.upload_field(), "productVariants");
        assert_eq!(ObjectType::Inventory.upload_field(), "inventoryLevels");
        assert_eq!(ObjectType::PriceBookEntry.upload_field(), "priceListEntries");
    }

    #[test]
    fn test_serde_uses_api_name() {
        assert_eq!(
            serde_json::to_string(&ObjectType::PriceBookEntry).unwrap(),
            "\"pricebookentry\""
        );
    }
}
