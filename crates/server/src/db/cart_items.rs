//! Cart item repository for database operations.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use fastprint_core::{CartItemId, ProfileId};

use super::{Entity, Repository, RepositoryError};
use crate::models::cart::{CartItem, CartItemData, CartItemFilter, NewCartItem};
use crate::models::quote::ShippingQuote;

impl Entity for CartItem {
    type Id = CartItemId;
    type New = NewCartItem;
    type Filter = CartItemFilter;

    const NAME: &'static str = "cart item";

    fn id(&self) -> CartItemId {
        self.id
    }

    fn from_new(id: CartItemId, new: NewCartItem, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner,
            data: new.data,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn matches(&self, filter: &CartItemFilter) -> bool {
        filter.matches(self)
    }

    /// Newest first.
    fn listing_order(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Database row for `cart_items`.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    owner_id: i64,
    preview_form: String,
    preview_project: String,
    first_name: String,
    last_name: String,
    company: Option<String>,
    address: String,
    apt_floor: Option<String>,
    country: String,
    state: String,
    city: String,
    postal_code: String,
    phone_number: String,
    account_type: String,
    has_resale_cert: bool,
    shipping_rate: Option<Decimal>,
    tax: Option<Decimal>,
    tax_rate: Option<String>,
    tax_reason: Option<String>,
    courier_name: Option<String>,
    estimated_delivery: Option<String>,
    selected_service: Option<serde_json::Value>,
    product_quantity: i32,
    product_price: Option<Decimal>,
    subtotal: Decimal,
    display_total_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            owner: ProfileId::new(row.owner_id),
            data: CartItemData {
                preview_form: row.preview_form,
                preview_project: row.preview_project,
                first_name: row.first_name,
                last_name: row.last_name,
                company: row.company,
                address: row.address,
                apt_floor: row.apt_floor,
                country: row.country,
                state: row.state,
                city: row.city,
                postal_code: row.postal_code,
                phone_number: row.phone_number,
                account_type: row.account_type,
                has_resale_cert: row.has_resale_cert,
                quote: ShippingQuote {
                    shipping_rate: row.shipping_rate,
                    tax: row.tax,
                    tax_rate: row.tax_rate,
                    tax_reason: row.tax_reason,
                    courier_name: row.courier_name,
                    estimated_delivery: row.estimated_delivery,
                    selected_service: row.selected_service,
                },
                product_quantity: row.product_quantity,
                product_price: row.product_price,
                subtotal: row.subtotal,
                display_total_cost: row.display_total_cost,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

type RowQuery<'q> = QueryAs<'q, Postgres, CartItemRow, PgArguments>;

/// Bind the client-settable columns as `$2..=$26`, in column order.
fn bind_data<'q>(query: RowQuery<'q>, data: &'q CartItemData) -> RowQuery<'q> {
    query
        .bind(&data.preview_form)
        .bind(&data.preview_project)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.company)
        .bind(&data.address)
        .bind(&data.apt_floor)
        .bind(&data.country)
        .bind(&data.state)
        .bind(&data.city)
        .bind(&data.postal_code)
        .bind(&data.phone_number)
        .bind(&data.account_type)
        .bind(data.has_resale_cert)
        .bind(data.quote.shipping_rate)
        .bind(data.quote.tax)
        .bind(&data.quote.tax_rate)
        .bind(&data.quote.tax_reason)
        .bind(&data.quote.courier_name)
        .bind(&data.quote.estimated_delivery)
        .bind(&data.quote.selected_service)
        .bind(data.product_quantity)
        .bind(data.product_price)
        .bind(data.subtotal)
        .bind(data.display_total_cost)
}

/// `PostgreSQL` repository for cart items.
#[derive(Debug, Clone)]
pub struct PgCartItemRepository {
    pool: PgPool,
}

impl PgCartItemRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<CartItem> for PgCartItemRepository {
    async fn find(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, owner_id, preview_form, preview_project,
                   first_name, last_name, company, address, apt_floor,
                   country, state, city, postal_code, phone_number,
                   account_type, has_resale_cert,
                   shipping_rate, tax, tax_rate, tax_reason, courier_name,
                   estimated_delivery, selected_service,
                   product_quantity, product_price, subtotal, display_total_cost,
                   created_at, updated_at
            FROM cart_items
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn filter(&self, filter: &CartItemFilter) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, owner_id, preview_form, preview_project,
                   first_name, last_name, company, address, apt_floor,
                   country, state, city, postal_code, phone_number,
                   account_type, has_resale_cert,
                   shipping_rate, tax, tax_rate, tax_reason, courier_name,
                   estimated_delivery, selected_service,
                   product_quantity, product_price, subtotal, display_total_cost,
                   created_at, updated_at
            FROM cart_items
            WHERE ($1::bigint IS NULL OR owner_id = $1)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(filter.owner.map(|owner| owner.as_i64()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, new: NewCartItem) -> Result<CartItem, RepositoryError> {
        let query = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (
                owner_id, preview_form, preview_project,
                first_name, last_name, company, address, apt_floor,
                country, state, city, postal_code, phone_number,
                account_type, has_resale_cert,
                shipping_rate, tax, tax_rate, tax_reason, courier_name,
                estimated_delivery, selected_service,
                product_quantity, product_price, subtotal, display_total_cost
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            RETURNING id, owner_id, preview_form, preview_project,
                      first_name, last_name, company, address, apt_floor,
                      country, state, city, postal_code, phone_number,
                      account_type, has_resale_cert,
                      shipping_rate, tax, tax_rate, tax_reason, courier_name,
                      estimated_delivery, selected_service,
                      product_quantity, product_price, subtotal, display_total_cost,
                      created_at, updated_at
            ",
        )
        .bind(new.owner.as_i64());

        let row = bind_data(query, &new.data)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        Ok(row.into())
    }

    async fn save(&self, item: &CartItem) -> Result<CartItem, RepositoryError> {
        let query = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE cart_items
            SET preview_form = $2, preview_project = $3,
                first_name = $4, last_name = $5, company = $6, address = $7,
                apt_floor = $8, country = $9, state = $10, city = $11,
                postal_code = $12, phone_number = $13,
                account_type = $14, has_resale_cert = $15,
                shipping_rate = $16, tax = $17, tax_rate = $18, tax_reason = $19,
                courier_name = $20, estimated_delivery = $21, selected_service = $22,
                product_quantity = $23, product_price = $24, subtotal = $25,
                display_total_cost = $26, updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, preview_form, preview_project,
                      first_name, last_name, company, address, apt_floor,
                      country, state, city, postal_code, phone_number,
                      account_type, has_resale_cert,
                      shipping_rate, tax, tax_rate, tax_reason, courier_name,
                      estimated_delivery, selected_service,
                      product_quantity, product_price, subtotal, display_total_cost,
                      created_at, updated_at
            ",
        )
        .bind(item.id.as_i64());

        let row = bind_data(query, &item.data)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_items
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
