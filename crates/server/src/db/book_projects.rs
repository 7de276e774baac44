//! Book project repository for database operations.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use fastprint_core::{BookProjectId, OrderStatus, PaymentStatus, ProfileId};

use super::{Entity, Repository, RepositoryError};
use crate::models::book::{
    BookProject, BookProjectData, BookProjectFilter, BookShipping, NewBookProject,
};
use crate::models::quote::ShippingQuote;

impl Entity for BookProject {
    type Id = BookProjectId;
    type New = NewBookProject;
    type Filter = BookProjectFilter;

    const NAME: &'static str = "book project";

    fn id(&self) -> BookProjectId {
        self.id
    }

    fn from_new(id: BookProjectId, new: NewBookProject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner,
            data: new.data,
            payment_status: new.payment_status,
            status: new.status,
            tracking_number: None,
            shipment_prepared_at: None,
            shipped_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn matches(&self, filter: &BookProjectFilter) -> bool {
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

/// Database row for `book_projects`.
#[derive(Debug, sqlx::FromRow)]
struct BookProjectRow {
    id: i64,
    owner_id: i64,
    title: String,
    category: Option<String>,
    language: Option<String>,
    binding_type: Option<String>,
    cover_finish: Option<String>,
    interior_color: Option<String>,
    paper_type: Option<String>,
    trim_size: Option<String>,
    page_count: i32,
    pdf_file: String,
    cover_file: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    address: Option<String>,
    apt_floor: Option<String>,
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    phone_number: Option<String>,
    account_type: Option<String>,
    has_resale_cert: bool,
    shipping_rate: Option<Decimal>,
    tax: Option<Decimal>,
    tax_rate: Option<String>,
    tax_reason: Option<String>,
    courier_name: Option<String>,
    estimated_delivery: Option<String>,
    selected_service: Option<serde_json::Value>,
    product_quantity: Option<i32>,
    product_price: Option<Decimal>,
    subtotal: Option<Decimal>,
    payment_status: String,
    status: String,
    tracking_number: Option<String>,
    shipment_prepared_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookProjectRow> for BookProject {
    type Error = RepositoryError;

    fn try_from(row: BookProjectRow) -> Result<Self, Self::Error> {
        let payment_status = row
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: BookProjectId::new(row.id),
            owner: ProfileId::new(row.owner_id),
            data: BookProjectData {
                title: row.title,
                category: row.category,
                language: row.language,
                binding_type: row.binding_type,
                cover_finish: row.cover_finish,
                interior_color: row.interior_color,
                paper_type: row.paper_type,
                trim_size: row.trim_size,
                page_count: row.page_count,
                pdf_file: row.pdf_file,
                cover_file: row.cover_file,
                shipping: BookShipping {
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
                },
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
            },
            payment_status,
            status,
            tracking_number: row.tracking_number,
            shipment_prepared_at: row.shipment_prepared_at,
            shipped_at: row.shipped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

type RowQuery<'q> = QueryAs<'q, Postgres, BookProjectRow, PgArguments>;

/// Bind the client-settable columns as `$2..=$34`, in column order.
fn bind_data<'q>(query: RowQuery<'q>, data: &'q BookProjectData) -> RowQuery<'q> {
    let shipping = &data.shipping;
    let quote = &data.quote;

    query
        .bind(&data.title)
        .bind(&data.category)
        .bind(&data.language)
        .bind(&data.binding_type)
        .bind(&data.cover_finish)
        .bind(&data.interior_color)
        .bind(&data.paper_type)
        .bind(&data.trim_size)
        .bind(data.page_count)
        .bind(&data.pdf_file)
        .bind(&data.cover_file)
        .bind(&shipping.first_name)
        .bind(&shipping.last_name)
        .bind(&shipping.company)
        .bind(&shipping.address)
        .bind(&shipping.apt_floor)
        .bind(&shipping.country)
        .bind(&shipping.state)
        .bind(&shipping.city)
        .bind(&shipping.postal_code)
        .bind(&shipping.phone_number)
        .bind(&shipping.account_type)
        .bind(shipping.has_resale_cert)
        .bind(quote.shipping_rate)
        .bind(quote.tax)
        .bind(&quote.tax_rate)
        .bind(&quote.tax_reason)
        .bind(&quote.courier_name)
        .bind(&quote.estimated_delivery)
        .bind(&quote.selected_service)
        .bind(data.product_quantity)
        .bind(data.product_price)
        .bind(data.subtotal)
}

/// `PostgreSQL` repository for book projects.
#[derive(Debug, Clone)]
pub struct PgBookProjectRepository {
    pool: PgPool,
}

impl PgBookProjectRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<BookProject> for PgBookProjectRepository {
    async fn find(&self, id: BookProjectId) -> Result<Option<BookProject>, RepositoryError> {
        let row = sqlx::query_as::<_, BookProjectRow>(
            r"
            SELECT id, owner_id, title, category, language, binding_type, cover_finish,
                   interior_color, paper_type, trim_size, page_count, pdf_file, cover_file,
                   first_name, last_name, company, address, apt_floor, country, state,
                   city, postal_code, phone_number, account_type, has_resale_cert,
                   shipping_rate, tax, tax_rate, tax_reason, courier_name,
                   estimated_delivery, selected_service,
                   product_quantity, product_price, subtotal,
                   payment_status, status, tracking_number, shipment_prepared_at,
                   shipped_at, created_at, updated_at
            FROM book_projects
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookProject::try_from).transpose()
    }

    async fn filter(
        &self,
        filter: &BookProjectFilter,
    ) -> Result<Vec<BookProject>, RepositoryError> {
        let statuses = filter.statuses.as_ref().map(|statuses| {
            statuses
                .iter()
                .map(|status| status.as_str().to_owned())
                .collect::<Vec<_>>()
        });

        let rows = sqlx::query_as::<_, BookProjectRow>(
            r"
            SELECT id, owner_id, title, category, language, binding_type, cover_finish,
                   interior_color, paper_type, trim_size, page_count, pdf_file, cover_file,
                   first_name, last_name, company, address, apt_floor, country, state,
                   city, postal_code, phone_number, account_type, has_resale_cert,
                   shipping_rate, tax, tax_rate, tax_reason, courier_name,
                   estimated_delivery, selected_service,
                   product_quantity, product_price, subtotal,
                   payment_status, status, tracking_number, shipment_prepared_at,
                   shipped_at, created_at, updated_at
            FROM book_projects
            WHERE
                ($1::bigint IS NULL OR owner_id = $1)
                AND ($2::text IS NULL OR payment_status = $2)
                AND ($3::text[] IS NULL OR status = ANY($3))
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(filter.owner.map(|owner| owner.as_i64()))
        .bind(filter.payment_status.map(PaymentStatus::as_str))
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookProject::try_from).collect()
    }

    async fn insert(&self, new: NewBookProject) -> Result<BookProject, RepositoryError> {
        let query = sqlx::query_as::<_, BookProjectRow>(
            r"
            INSERT INTO book_projects (
                owner_id, title, category, language, binding_type, cover_finish,
                interior_color, paper_type, trim_size, page_count, pdf_file, cover_file,
                first_name, last_name, company, address, apt_floor, country, state,
                city, postal_code, phone_number, account_type, has_resale_cert,
                shipping_rate, tax, tax_rate, tax_reason, courier_name,
                estimated_delivery, selected_service,
                product_quantity, product_price, subtotal,
                payment_status, status
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35, $36
            )
            RETURNING id, owner_id, title, category, language, binding_type, cover_finish,
                      interior_color, paper_type, trim_size, page_count, pdf_file, cover_file,
                      first_name, last_name, company, address, apt_floor, country, state,
                      city, postal_code, phone_number, account_type, has_resale_cert,
                      shipping_rate, tax, tax_rate, tax_reason, courier_name,
                      estimated_delivery, selected_service,
                      product_quantity, product_price, subtotal,
                      payment_status, status, tracking_number, shipment_prepared_at,
                      shipped_at, created_at, updated_at
            ",
        )
        .bind(new.owner.as_i64());

        let row = bind_data(query, &new.data)
            .bind(new.payment_status.as_str())
            .bind(new.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        BookProject::try_from(row)
    }

    async fn save(&self, project: &BookProject) -> Result<BookProject, RepositoryError> {
        let query = sqlx::query_as::<_, BookProjectRow>(
            r"
            UPDATE book_projects
            SET title = $2, category = $3, language = $4, binding_type = $5,
                cover_finish = $6, interior_color = $7, paper_type = $8, trim_size = $9,
                page_count = $10, pdf_file = $11, cover_file = $12,
                first_name = $13, last_name = $14, company = $15, address = $16,
                apt_floor = $17, country = $18, state = $19, city = $20,
                postal_code = $21, phone_number = $22, account_type = $23,
                has_resale_cert = $24,
                shipping_rate = $25, tax = $26, tax_rate = $27, tax_reason = $28,
                courier_name = $29, estimated_delivery = $30, selected_service = $31,
                product_quantity = $32, product_price = $33, subtotal = $34,
                payment_status = $35, status = $36, tracking_number = $37,
                shipment_prepared_at = $38, shipped_at = $39, updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, category, language, binding_type, cover_finish,
                      interior_color, paper_type, trim_size, page_count, pdf_file, cover_file,
                      first_name, last_name, company, address, apt_floor, country, state,
                      city, postal_code, phone_number, account_type, has_resale_cert,
                      shipping_rate, tax, tax_rate, tax_reason, courier_name,
                      estimated_delivery, selected_service,
                      product_quantity, product_price, subtotal,
                      payment_status, status, tracking_number, shipment_prepared_at,
                      shipped_at, created_at, updated_at
            ",
        )
        .bind(project.id.as_i64());

        let row = bind_data(query, &project.data)
            .bind(project.payment_status.as_str())
            .bind(project.status.as_str())
            .bind(&project.tracking_number)
            .bind(project.shipment_prepared_at)
            .bind(project.shipped_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?
            .ok_or(RepositoryError::NotFound)?;

        BookProject::try_from(row)
    }

    async fn delete(&self, id: BookProjectId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM book_projects
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
