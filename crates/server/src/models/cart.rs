//! Cart item domain models.
//!
//! A cart item is a staged checkout entry: a snapshot of the book being
//! ordered (`preview_form`/`preview_project`, kept as opaque JSON strings),
//! the shipping address, the shipping quote and the price summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fastprint_core::{CartItemId, ProfileId, ValidationErrors};

use super::fields::{self, Field};
use super::quote::{QuotePayload, ShippingQuote, ShippingQuotePatch};

/// Account type stored when the client does not send one.
pub const DEFAULT_ACCOUNT_TYPE: &str = "individual";

/// Everything a client may set on a cart item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItemData {
    pub preview_form: String,
    pub preview_project: String,

    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub address: String,
    pub apt_floor: Option<String>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    pub phone_number: String,

    pub account_type: String,
    pub has_resale_cert: bool,

    #[serde(flatten)]
    pub quote: ShippingQuote,

    pub product_quantity: i32,
    pub product_price: Option<Decimal>,
    pub subtotal: Decimal,
    pub display_total_cost: Decimal,
}

/// A stored cart item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    /// Owning profile. Exposed to clients only as `user_email`.
    #[serde(skip)]
    pub owner: ProfileId,
    #[serde(flatten)]
    pub data: CartItemData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a cart item.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub owner: ProfileId,
    pub data: CartItemData,
}

/// Cart item listing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartItemFilter {
    pub owner: Option<ProfileId>,
}

impl CartItemFilter {
    #[must_use]
    pub const fn owned_by(owner: ProfileId) -> Self {
        Self { owner: Some(owner) }
    }

    #[must_use]
    pub fn matches(&self, item: &CartItem) -> bool {
        self.owner.is_none_or(|owner| owner == item.owner)
    }
}

/// Cart item as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItem,
    pub user_email: Option<String>,
}

/// Explicit partial update of a cart item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartItemPatch {
    pub preview_form: Option<String>,
    pub preview_project: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<Option<String>>,
    pub address: Option<String>,
    pub apt_floor: Option<Option<String>>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<String>,
    pub has_resale_cert: Option<bool>,
    pub quote: ShippingQuotePatch,
    pub product_quantity: Option<i32>,
    pub product_price: Option<Option<Decimal>>,
    pub subtotal: Option<Decimal>,
    pub display_total_cost: Option<Decimal>,
}

impl CartItemPatch {
    /// Apply the patch, leaving unspecified fields unchanged.
    pub fn apply(self, data: &mut CartItemData) {
        macro_rules! assign {
            ($patch:ident, $data:ident; $($field:ident),+ $(,)?) => {
                $(if let Some(value) = $patch.$field {
                    $data.$field = value;
                })+
            };
        }

        let patch = self;
        assign!(
            patch, data;
            preview_form,
            preview_project,
            first_name,
            last_name,
            company,
            address,
            apt_floor,
            country,
            state,
            city,
            postal_code,
            phone_number,
            account_type,
            has_resale_cert,
            product_quantity,
            product_price,
            subtotal,
            display_total_cost,
        );
        patch.quote.apply(&mut data.quote);
    }

    /// Full-update check: every required field must be present.
    ///
    /// # Errors
    ///
    /// Returns a "required" error for each missing field.
    pub fn require_complete(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        fields::require(&mut errors, "preview_form", self.preview_form.as_ref());
        fields::require(&mut errors, "preview_project", self.preview_project.as_ref());
        fields::require(&mut errors, "first_name", self.first_name.as_ref());
        fields::require(&mut errors, "last_name", self.last_name.as_ref());
        fields::require(&mut errors, "address", self.address.as_ref());
        fields::require(&mut errors, "country", self.country.as_ref());
        fields::require(&mut errors, "state", self.state.as_ref());
        fields::require(&mut errors, "city", self.city.as_ref());
        fields::require(&mut errors, "postal_code", self.postal_code.as_ref());
        fields::require(&mut errors, "phone_number", self.phone_number.as_ref());
        fields::require(&mut errors, "subtotal", self.subtotal.as_ref());
        fields::require(
            &mut errors,
            "display_total_cost",
            self.display_total_cost.as_ref(),
        );
        errors.into_result(())
    }

    /// Build creation data, applying defaults for optional fields.
    ///
    /// # Errors
    ///
    /// Returns a "required" error for each missing field.
    pub fn into_data(self) -> Result<CartItemData, ValidationErrors> {
        self.require_complete()?;

        let (
            Some(preview_form),
            Some(preview_project),
            Some(first_name),
            Some(last_name),
            Some(address),
            Some(country),
            Some(state),
            Some(city),
            Some(postal_code),
            Some(phone_number),
            Some(subtotal),
            Some(display_total_cost),
        ) = (
            self.preview_form,
            self.preview_project,
            self.first_name,
            self.last_name,
            self.address,
            self.country,
            self.state,
            self.city,
            self.postal_code,
            self.phone_number,
            self.subtotal,
            self.display_total_cost,
        )
        else {
            return Err(ValidationErrors::single("non_field_errors", "Incomplete cart item."));
        };

        Ok(CartItemData {
            preview_form,
            preview_project,
            first_name,
            last_name,
            company: self.company.flatten(),
            address,
            apt_floor: self.apt_floor.flatten(),
            country,
            state,
            city,
            postal_code,
            phone_number,
            account_type: self
                .account_type
                .unwrap_or_else(|| DEFAULT_ACCOUNT_TYPE.to_owned()),
            has_resale_cert: self.has_resale_cert.unwrap_or(false),
            quote: self.quote.into_quote(),
            product_quantity: self.product_quantity.unwrap_or(1),
            product_price: self.product_price.flatten(),
            subtotal,
            display_total_cost,
        })
    }
}

/// Cart item body. A `user` key, if sent, is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CartItemPayload {
    pub preview_form: Field<String>,
    pub preview_project: Field<String>,
    pub first_name: Field<String>,
    pub last_name: Field<String>,
    pub company: Field<String>,
    pub address: Field<String>,
    pub apt_floor: Field<String>,
    pub country: Field<String>,
    pub state: Field<String>,
    pub city: Field<String>,
    pub postal_code: Field<String>,
    pub phone_number: Field<String>,
    pub account_type: Field<String>,
    pub has_resale_cert: Field<bool>,
    #[serde(flatten)]
    pub quote: QuotePayload,
    pub product_quantity: Field<i32>,
    pub product_price: Field<Decimal>,
    pub subtotal: Field<Decimal>,
    pub display_total_cost: Field<Decimal>,
}

impl CartItemPayload {
    /// Validate the supplied fields into a patch.
    ///
    /// # Errors
    ///
    /// Returns field-keyed errors for null, blank or over-long values and
    /// malformed amounts.
    pub fn into_patch(self) -> Result<CartItemPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let e = &mut errors;

        let patch = CartItemPatch {
            preview_form: fields::text(e, "preview_form", self.preview_form, usize::MAX),
            preview_project: fields::text(e, "preview_project", self.preview_project, usize::MAX),
            first_name: fields::text(e, "first_name", self.first_name, 100),
            last_name: fields::text(e, "last_name", self.last_name, 100),
            company: fields::nullable_text(e, "company", self.company, Some(255)),
            address: fields::text(e, "address", self.address, 255),
            apt_floor: fields::nullable_text(e, "apt_floor", self.apt_floor, Some(100)),
            country: fields::text(e, "country", self.country, 10),
            state: fields::text(e, "state", self.state, 50),
            city: fields::text(e, "city", self.city, 100),
            postal_code: fields::text(e, "postal_code", self.postal_code, 20),
            phone_number: fields::text(e, "phone_number", self.phone_number, 50),
            account_type: fields::text(e, "account_type", self.account_type, 20),
            has_resale_cert: fields::boolean(e, "has_resale_cert", self.has_resale_cert),
            quote: self.quote.into_patch(e),
            product_quantity: fields::integer(e, "product_quantity", self.product_quantity, 1),
            product_price: fields::nullable_amount(e, "product_price", self.product_price),
            subtotal: fields::amount(e, "subtotal", self.subtotal),
            display_total_cost: fields::amount(e, "display_total_cost", self.display_total_cost),
        };

        errors.into_result(patch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A complete, valid cart item body.
    pub(crate) fn sample_payload() -> serde_json::Value {
        serde_json::json!({
            "preview_form": "{\"binding_id\": 3}",
            "preview_project": "{\"projectTitle\": \"Field Notes\"}",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "address": "12 St James's Square",
            "country": "GB",
            "state": "London",
            "city": "London",
            "postal_code": "SW1Y 4JH",
            "phone_number": "+44 20 7946 0000",
            "shipping_rate": "9.99",
            "tax": "2.00",
            "subtotal": "45.00",
            "display_total_cost": "56.99",
        })
    }

    fn patch(json: serde_json::Value) -> Result<CartItemPatch, ValidationErrors> {
        serde_json::from_value::<CartItemPayload>(json)
            .unwrap()
            .into_patch()
    }

    #[test]
    fn test_defaults_applied_on_create() {
        let data = patch(sample_payload()).unwrap().into_data().unwrap();
        assert_eq!(data.account_type, DEFAULT_ACCOUNT_TYPE);
        assert_eq!(data.product_quantity, 1);
        assert!(!data.has_resale_cert);
        assert_eq!(data.subtotal.to_string(), "45.00");
    }

    #[test]
    fn test_missing_required_fields_reported() {
        let errors = patch(serde_json::json!({"first_name": "Ada"}))
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(errors.has("preview_form"));
        assert!(errors.has("subtotal"));
        assert!(!errors.has("first_name"));
        assert!(!errors.has("company"));
    }

    #[test]
    fn test_field_limits() {
        let errors = patch(serde_json::json!({
            "country": "United Kingdom",
            "product_quantity": 0,
            "first_name": null,
        }))
        .unwrap_err();
        assert!(errors.has("country"));
        assert!(errors.has("product_quantity"));
        assert!(errors.has("first_name"));
    }

    #[test]
    fn test_partial_patch_changes_only_subtotal() {
        let mut data = patch(sample_payload()).unwrap().into_data().unwrap();
        let before = data.clone();

        patch(serde_json::json!({"subtotal": "50"}))
            .unwrap()
            .apply(&mut data);

        assert_eq!(data.subtotal.to_string(), "50.00");
        data.subtotal = before.subtotal;
        assert_eq!(data, before);
    }

    #[test]
    fn test_spoofed_user_is_ignored() {
        let mut body = sample_payload();
        body["user"] = serde_json::json!(999);
        assert!(patch(body).is_ok());
    }
}
