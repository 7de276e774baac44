//! Shipping quote shared by cart items and book orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fastprint_core::ValidationErrors;

use super::fields::{self, Field};

/// Shipping rate, tax and the courier service the customer picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub shipping_rate: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub tax_rate: Option<String>,
    pub tax_reason: Option<String>,
    pub courier_name: Option<String>,
    pub estimated_delivery: Option<String>,
    /// Courier service as returned by the rates provider. Not interpreted.
    pub selected_service: Option<serde_json::Value>,
}

/// Partial update of a [`ShippingQuote`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShippingQuotePatch {
    pub shipping_rate: Option<Option<Decimal>>,
    pub tax: Option<Option<Decimal>>,
    pub tax_rate: Option<Option<String>>,
    pub tax_reason: Option<Option<String>>,
    pub courier_name: Option<Option<String>>,
    pub estimated_delivery: Option<Option<String>>,
    pub selected_service: Option<Option<serde_json::Value>>,
}

impl ShippingQuotePatch {
    pub fn apply(self, quote: &mut ShippingQuote) {
        if let Some(value) = self.shipping_rate {
            quote.shipping_rate = value;
        }
        if let Some(value) = self.tax {
            quote.tax = value;
        }
        if let Some(value) = self.tax_rate {
            quote.tax_rate = value;
        }
        if let Some(value) = self.tax_reason {
            quote.tax_reason = value;
        }
        if let Some(value) = self.courier_name {
            quote.courier_name = value;
        }
        if let Some(value) = self.estimated_delivery {
            quote.estimated_delivery = value;
        }
        if let Some(value) = self.selected_service {
            quote.selected_service = value;
        }
    }

    /// Quote built from this patch alone.
    #[must_use]
    pub fn into_quote(self) -> ShippingQuote {
        let mut quote = ShippingQuote::default();
        self.apply(&mut quote);
        quote
    }
}

/// Quote fields as they arrive in a request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuotePayload {
    pub shipping_rate: Field<Decimal>,
    pub tax: Field<Decimal>,
    pub tax_rate: Field<String>,
    pub tax_reason: Field<String>,
    pub courier_name: Field<String>,
    pub estimated_delivery: Field<String>,
    pub selected_service: Field<serde_json::Value>,
}

impl QuotePayload {
    /// Validate into a patch, recording failures in `errors`.
    pub fn into_patch(self, errors: &mut ValidationErrors) -> ShippingQuotePatch {
        ShippingQuotePatch {
            shipping_rate: fields::nullable_amount(errors, "shipping_rate", self.shipping_rate),
            tax: fields::nullable_amount(errors, "tax", self.tax),
            tax_rate: fields::nullable_text(errors, "tax_rate", self.tax_rate, Some(20)),
            tax_reason: fields::nullable_text(errors, "tax_reason", self.tax_reason, None),
            courier_name: fields::nullable_text(errors, "courier_name", self.courier_name, Some(100)),
            estimated_delivery: fields::nullable_text(
                errors,
                "estimated_delivery",
                self.estimated_delivery,
                Some(100),
            ),
            selected_service: match self.selected_service {
                Field::Missing => None,
                Field::Null => Some(None),
                Field::Value(value) => Some(Some(value)),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_accept_strings_and_numbers() {
        let payload: QuotePayload =
            serde_json::from_value(serde_json::json!({"shipping_rate": "4.5", "tax": 1.25}))
                .unwrap();
        let mut errors = ValidationErrors::new();
        let quote = payload.into_patch(&mut errors).into_quote();

        assert!(errors.is_empty());
        assert_eq!(quote.shipping_rate.unwrap().to_string(), "4.50");
        assert_eq!(quote.tax.unwrap().to_string(), "1.25");
    }

    #[test]
    fn test_selected_service_kept_verbatim() {
        let service = serde_json::json!({"carrier": "DHL", "service_code": "EXP", "rate": 12.3});
        let payload: QuotePayload =
            serde_json::from_value(serde_json::json!({"selected_service": service.clone()}))
                .unwrap();
        let mut errors = ValidationErrors::new();
        let quote = payload.into_patch(&mut errors).into_quote();
        assert_eq!(quote.selected_service, Some(service));
    }

    #[test]
    fn test_sub_cent_tax_rejected() {
        let payload: QuotePayload =
            serde_json::from_value(serde_json::json!({"tax": "0.001"})).unwrap();
        let mut errors = ValidationErrors::new();
        let _ = payload.into_patch(&mut errors);
        assert!(errors.has("tax"));
    }
}
