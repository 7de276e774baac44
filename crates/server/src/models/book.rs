//! Book project and order models.
//!
//! A book project is an uploaded print job. It becomes an order once paid,
//! after which its `status` follows the workflow in
//! [`fastprint_core::OrderStatus`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fastprint_core::{BookProjectId, OrderStatus, PaymentStatus, ProfileId, ValidationErrors};

use super::cart::CartItemData;
use super::fields::{self, Field, FormFields};
use super::quote::{QuotePayload, ShippingQuote, ShippingQuotePatch};
use crate::media::Upload;

/// Shipping address and account details copied onto an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookShipping {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub apt_floor: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<String>,
    pub has_resale_cert: bool,
}

/// Everything a client may set on a book project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookProjectData {
    pub title: String,
    pub category: Option<String>,
    pub language: Option<String>,
    pub binding_type: Option<String>,
    pub cover_finish: Option<String>,
    pub interior_color: Option<String>,
    pub paper_type: Option<String>,
    pub trim_size: Option<String>,
    pub page_count: i32,

    /// Media-relative path of the interior PDF.
    pub pdf_file: String,
    /// Media-relative path of the cover, if one was uploaded.
    pub cover_file: Option<String>,

    #[serde(flatten)]
    pub shipping: BookShipping,
    #[serde(flatten)]
    pub quote: ShippingQuote,

    pub product_quantity: Option<i32>,
    pub product_price: Option<Decimal>,
    pub subtotal: Option<Decimal>,
}

impl BookProjectData {
    /// Fill every shipping, quote and price field still unset from a cart
    /// item.
    pub fn fill_missing_from(&mut self, cart: &CartItemData) {
        fn fill<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
            if slot.is_none() {
                *slot = value.cloned();
            }
        }

        let s = &mut self.shipping;
        fill(&mut s.first_name, Some(&cart.first_name));
        fill(&mut s.last_name, Some(&cart.last_name));
        fill(&mut s.company, cart.company.as_ref());
        fill(&mut s.address, Some(&cart.address));
        fill(&mut s.apt_floor, cart.apt_floor.as_ref());
        fill(&mut s.country, Some(&cart.country));
        fill(&mut s.state, Some(&cart.state));
        fill(&mut s.city, Some(&cart.city));
        fill(&mut s.postal_code, Some(&cart.postal_code));
        fill(&mut s.phone_number, Some(&cart.phone_number));
        fill(&mut s.account_type, Some(&cart.account_type));
        s.has_resale_cert |= cart.has_resale_cert;

        let q = &mut self.quote;
        fill(&mut q.shipping_rate, cart.quote.shipping_rate.as_ref());
        fill(&mut q.tax, cart.quote.tax.as_ref());
        fill(&mut q.tax_rate, cart.quote.tax_rate.as_ref());
        fill(&mut q.tax_reason, cart.quote.tax_reason.as_ref());
        fill(&mut q.courier_name, cart.quote.courier_name.as_ref());
        fill(&mut q.estimated_delivery, cart.quote.estimated_delivery.as_ref());
        fill(&mut q.selected_service, cart.quote.selected_service.as_ref());

        fill(&mut self.product_quantity, Some(&cart.product_quantity));
        fill(&mut self.product_price, cart.product_price.as_ref());
        fill(&mut self.subtotal, Some(&cart.subtotal));
    }
}

/// A stored book project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookProject {
    pub id: BookProjectId,
    /// Owning profile. Exposed to clients only as `user_email`.
    #[serde(skip)]
    pub owner: ProfileId,
    #[serde(flatten)]
    pub data: BookProjectData,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub shipment_prepared_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookProject {
    /// Whether the project has been paid for and is therefore an order.
    #[must_use]
    pub fn is_order(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Input for creating a book project.
#[derive(Debug, Clone)]
pub struct NewBookProject {
    pub owner: ProfileId,
    pub data: BookProjectData,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

/// Book project listing filter.
#[derive(Debug, Clone, Default)]
pub struct BookProjectFilter {
    pub owner: Option<ProfileId>,
    pub payment_status: Option<PaymentStatus>,
    /// Any of these statuses; `None` means all.
    pub statuses: Option<Vec<OrderStatus>>,
}

impl BookProjectFilter {
    #[must_use]
    pub fn owned_by(owner: ProfileId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    #[must_use]
    pub fn with_statuses(mut self, statuses: &[OrderStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    #[must_use]
    pub fn matches(&self, project: &BookProject) -> bool {
        self.owner.is_none_or(|owner| owner == project.owner)
            && self
                .payment_status
                .is_none_or(|status| status == project.payment_status)
            && self
                .statuses
                .as_ref()
                .is_none_or(|statuses| statuses.contains(&project.status))
    }
}

/// Book project as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct BookProjectView {
    #[serde(flatten)]
    pub project: BookProject,
    pub user_email: Option<String>,
}

/// Partial update of [`BookShipping`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookShippingPatch {
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub apt_floor: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub account_type: Option<Option<String>>,
    pub has_resale_cert: Option<bool>,
}

impl BookShippingPatch {
    pub fn apply(self, shipping: &mut BookShipping) {
        macro_rules! assign {
            ($patch:ident, $target:ident; $($field:ident),+ $(,)?) => {
                $(if let Some(value) = $patch.$field {
                    $target.$field = value;
                })+
            };
        }

        let patch = self;
        assign!(
            patch, shipping;
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
        );
    }
}

/// Explicit partial update of a book project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookProjectPatch {
    pub title: Option<String>,
    pub category: Option<Option<String>>,
    pub language: Option<Option<String>>,
    pub binding_type: Option<Option<String>>,
    pub cover_finish: Option<Option<String>>,
    pub interior_color: Option<Option<String>>,
    pub paper_type: Option<Option<String>>,
    pub trim_size: Option<Option<String>>,
    pub page_count: Option<i32>,
    pub pdf_file: Option<String>,
    pub cover_file: Option<Option<String>>,
    pub shipping: BookShippingPatch,
    pub quote: ShippingQuotePatch,
    pub product_quantity: Option<Option<i32>>,
    pub product_price: Option<Option<Decimal>>,
    pub subtotal: Option<Option<Decimal>>,
}

impl BookProjectPatch {
    /// Apply the patch, leaving unspecified fields unchanged.
    pub fn apply(self, data: &mut BookProjectData) {
        macro_rules! assign {
            ($patch:ident, $target:ident; $($field:ident),+ $(,)?) => {
                $(if let Some(value) = $patch.$field {
                    $target.$field = value;
                })+
            };
        }

        let patch = self;
        assign!(
            patch, data;
            title,
            category,
            language,
            binding_type,
            cover_finish,
            interior_color,
            paper_type,
            trim_size,
            page_count,
            pdf_file,
            cover_file,
            product_quantity,
            product_price,
            subtotal,
        );
        patch.shipping.apply(&mut data.shipping);
        patch.quote.apply(&mut data.quote);
    }

    /// Full-update check for `PUT`.
    ///
    /// # Errors
    ///
    /// Returns a "required" error when the title is missing.
    pub fn require_complete(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        fields::require(&mut errors, "title", self.title.as_ref());
        errors.into_result(())
    }

    /// Build creation data. Title and interior PDF are required.
    ///
    /// # Errors
    ///
    /// Returns a "required" error for each missing field.
    pub fn into_data(self) -> Result<BookProjectData, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        fields::require(&mut errors, "title", self.title.as_ref());
        fields::require(&mut errors, "pdf_file", self.pdf_file.as_ref());

        let (Some(title), Some(pdf_file)) = (self.title.clone(), self.pdf_file.clone()) else {
            return Err(errors);
        };

        let mut data = BookProjectData {
            title,
            category: None,
            language: None,
            binding_type: None,
            cover_finish: None,
            interior_color: None,
            paper_type: None,
            trim_size: None,
            page_count: 0,
            pdf_file,
            cover_file: None,
            shipping: BookShipping::default(),
            quote: ShippingQuote::default(),
            product_quantity: None,
            product_price: None,
            subtotal: None,
        };
        self.apply(&mut data);
        Ok(data)
    }
}

/// Parsed multipart body of the upload, update and save-order endpoints.
#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub fields: FormFields,
    pub pdf_file: Option<Upload>,
    pub cover_file: Option<Upload>,
}

/// Text fields of an upload, update or save-order form.
///
/// Files are handled separately by [`crate::media::MediaStore`].
#[derive(Debug, Clone, Default)]
pub struct BookProjectPayload {
    pub title: Field<String>,
    pub category: Field<String>,
    pub language: Field<String>,
    pub binding_type: Field<String>,
    pub cover_finish: Field<String>,
    pub interior_color: Field<String>,
    pub paper_type: Field<String>,
    pub trim_size: Field<String>,
    pub page_count: Field<i32>,

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

    pub quote: QuotePayload,

    pub product_quantity: Field<i32>,
    pub product_price: Field<Decimal>,
    pub subtotal: Field<Decimal>,
}

pub(crate) const INVALID_INTEGER: &str = "A valid integer is required.";
pub(crate) const INVALID_NUMBER: &str = "A valid number is required.";

impl BookProjectPayload {
    /// Read the payload from form fields, recording parse failures.
    #[must_use]
    pub fn from_form(form: &FormFields, errors: &mut ValidationErrors) -> Self {
        let decimal = |errors: &mut ValidationErrors, name: &str| {
            fields::parse_form::<Decimal>(errors, name, form.get(name), INVALID_NUMBER)
        };
        let integer = |errors: &mut ValidationErrors, name: &str| {
            fields::parse_form::<i32>(errors, name, form.get(name), INVALID_INTEGER)
        };

        let selected_service = match form.text("selected_service") {
            Field::Value(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Field::Value(value),
                Err(_) => {
                    errors.add("selected_service", "Value must be valid JSON.");
                    Field::Missing
                }
            },
            Field::Null => Field::Null,
            Field::Missing => Field::Missing,
        };

        Self {
            title: form.text("title"),
            category: form.text("category"),
            language: form.text("language"),
            binding_type: form.text("binding_type"),
            cover_finish: form.text("cover_finish"),
            interior_color: form.text("interior_color"),
            paper_type: form.text("paper_type"),
            trim_size: form.text("trim_size"),
            page_count: integer(errors, "page_count"),

            first_name: form.text("first_name"),
            last_name: form.text("last_name"),
            company: form.text("company"),
            address: form.text("address"),
            apt_floor: form.text("apt_floor"),
            country: form.text("country"),
            state: form.text("state"),
            city: form.text("city"),
            postal_code: form.text("postal_code"),
            phone_number: form.text("phone_number"),
            account_type: form.text("account_type"),
            has_resale_cert: fields::parse_form_bool(
                errors,
                "has_resale_cert",
                form.get("has_resale_cert"),
            ),

            quote: QuotePayload {
                shipping_rate: decimal(errors, "shipping_rate"),
                tax: decimal(errors, "tax"),
                tax_rate: form.text("tax_rate"),
                tax_reason: form.text("tax_reason"),
                courier_name: form.text("courier_name"),
                estimated_delivery: form.text("estimated_delivery"),
                selected_service,
            },

            product_quantity: integer(errors, "product_quantity"),
            product_price: decimal(errors, "product_price"),
            subtotal: decimal(errors, "subtotal"),
        }
    }

    /// Validate into a patch, recording failures in `errors`.
    pub fn into_patch(self, errors: &mut ValidationErrors) -> BookProjectPatch {
        let e = errors;
        let label = |e: &mut ValidationErrors, name: &str, field: Field<String>| {
            fields::nullable_text(e, name, field, Some(100))
        };

        BookProjectPatch {
            title: fields::text(e, "title", self.title, 255),
            category: label(e, "category", self.category),
            language: label(e, "language", self.language),
            binding_type: label(e, "binding_type", self.binding_type),
            cover_finish: label(e, "cover_finish", self.cover_finish),
            interior_color: label(e, "interior_color", self.interior_color),
            paper_type: label(e, "paper_type", self.paper_type),
            trim_size: label(e, "trim_size", self.trim_size),
            page_count: fields::integer(e, "page_count", self.page_count, 0),
            pdf_file: None,
            cover_file: None,
            shipping: BookShippingPatch {
                first_name: fields::nullable_text(e, "first_name", self.first_name, Some(100)),
                last_name: fields::nullable_text(e, "last_name", self.last_name, Some(100)),
                company: fields::nullable_text(e, "company", self.company, Some(255)),
                address: fields::nullable_text(e, "address", self.address, Some(255)),
                apt_floor: fields::nullable_text(e, "apt_floor", self.apt_floor, Some(100)),
                country: fields::nullable_text(e, "country", self.country, Some(10)),
                state: fields::nullable_text(e, "state", self.state, Some(50)),
                city: fields::nullable_text(e, "city", self.city, Some(100)),
                postal_code: fields::nullable_text(e, "postal_code", self.postal_code, Some(20)),
                phone_number: fields::nullable_text(e, "phone_number", self.phone_number, Some(50)),
                account_type: fields::nullable_text(e, "account_type", self.account_type, Some(20)),
                has_resale_cert: fields::boolean(e, "has_resale_cert", self.has_resale_cert),
            },
            quote: self.quote.into_patch(e),
            product_quantity: match self.product_quantity {
                Field::Null => Some(None),
                other => fields::integer(e, "product_quantity", other, 1).map(Some),
            },
            product_price: fields::nullable_amount(e, "product_price", self.product_price),
            subtotal: fields::nullable_amount(e, "subtotal", self.subtotal),
        }
    }
}

/// Body of the order status update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderStatusPayload {
    pub status: Field<String>,
}

impl OrderStatusPayload {
    /// Parse the requested status.
    ///
    /// # Errors
    ///
    /// Returns a field error for a missing or unknown status.
    pub fn into_status(self) -> Result<OrderStatus, ValidationErrors> {
        match self.status {
            Field::Value(raw) => raw.parse::<OrderStatus>().map_err(|_| {
                ValidationErrors::single("status", format!("\"{raw}\" is not a valid choice."))
            }),
            Field::Missing | Field::Null => Err(ValidationErrors::single(
                "status",
                fastprint_core::validation::REQUIRED,
            )),
        }
    }
}

/// Optional body of the prepare-shipment call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrepareShipmentPayload {
    pub courier_name: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<String>,
}

impl PrepareShipmentPayload {
    /// Check the optional shipment details.
    ///
    /// # Errors
    ///
    /// Returns field errors for over-long values.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(value) = &self.courier_name {
            errors.check_max_len("courier_name", value, 100);
        }
        if let Some(value) = &self.tracking_number {
            errors.check_max_len("tracking_number", value, 100);
        }
        if let Some(value) = &self.estimated_delivery {
            errors.check_max_len("estimated_delivery", value, 100);
        }
        errors.into_result(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::cart::CartItemPayload;

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        let mut form = FormFields::new();
        for (name, value) in pairs {
            form.insert(*name, *value);
        }
        form
    }

    fn patch(pairs: &[(&str, &str)]) -> Result<BookProjectPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let payload = BookProjectPayload::from_form(&form(pairs), &mut errors);
        let patch = payload.into_patch(&mut errors);
        errors.into_result(patch)
    }

    #[test]
    fn test_upload_requires_title_and_pdf() {
        let errors = patch(&[("category", "Novel")])
            .unwrap()
            .into_data()
            .unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("pdf_file"));
    }

    #[test]
    fn test_form_values_are_typed() {
        let mut p = patch(&[
            ("title", "Field Notes"),
            ("page_count", "120"),
            ("subtotal", "45"),
            ("has_resale_cert", "true"),
            ("selected_service", r#"{"carrier":"UPS"}"#),
        ])
        .unwrap();
        p.pdf_file = Some("book_pdfs/a.pdf".to_owned());
        let data = p.into_data().unwrap();

        assert_eq!(data.page_count, 120);
        assert_eq!(data.subtotal.unwrap().to_string(), "45.00");
        assert!(data.shipping.has_resale_cert);
        assert_eq!(
            data.quote.selected_service,
            Some(serde_json::json!({"carrier": "UPS"}))
        );
    }

    #[test]
    fn test_form_parse_errors() {
        let errors = patch(&[
            ("title", "x"),
            ("page_count", "lots"),
            ("subtotal", "ten"),
            ("selected_service", "{not json"),
        ])
        .unwrap_err();
        assert!(errors.has("page_count"));
        assert!(errors.has("subtotal"));
        assert!(errors.has("selected_service"));
    }

    #[test]
    fn test_cart_fills_only_missing_fields() {
        let cart = serde_json::from_value::<CartItemPayload>(
            crate::models::cart::tests::sample_payload(),
        )
        .unwrap()
        .into_patch()
        .unwrap()
        .into_data()
        .unwrap();

        let mut p = patch(&[("title", "Field Notes"), ("city", "Bristol")]).unwrap();
        p.pdf_file = Some("book_pdfs/a.pdf".to_owned());
        let mut data = p.into_data().unwrap();
        data.fill_missing_from(&cart);

        assert_eq!(data.shipping.city.as_deref(), Some("Bristol"));
        assert_eq!(data.shipping.first_name.as_deref(), Some("Ada"));
        assert_eq!(data.quote.shipping_rate, cart.quote.shipping_rate);
        assert_eq!(data.subtotal, Some(cart.subtotal));
        assert_eq!(data.product_quantity, Some(1));
    }

    #[test]
    fn test_status_payload() {
        let payload: OrderStatusPayload =
            serde_json::from_value(serde_json::json!({"status": "shipped"})).unwrap();
        assert_eq!(payload.into_status().unwrap(), OrderStatus::Shipped);

        let payload: OrderStatusPayload =
            serde_json::from_value(serde_json::json!({"status": "lost"})).unwrap();
        assert!(payload.into_status().unwrap_err().has("status"));
    }
}
