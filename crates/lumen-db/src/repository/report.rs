//! # Report Repository
//!
//! Read-only aggregates for the dashboard and the sales report. All date
//! bucketing runs in SQLite (`DATE('now')`, `strftime`) so the numbers
//! reflect the database clock, not the application's.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::DbResult;
use lumen_core::Sale;

/// Appends the optional inclusive date-range filter to a query.
fn push_date_range(
    query: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) {
    if let Some(start) = start_date {
        query
            .push(format!(" AND DATE({column}) >= "))
            .push_bind(start);
    }
    if let Some(end) = end_date {
        query
            .push(format!(" AND DATE({column}) <= "))
            .push_bind(end);
    }
}

// =============================================================================
// Aggregate Types
// =============================================================================

/// Revenue and transaction count of one day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailySales {
    /// `YYYY-MM-DD`, as bucketed by SQLite.
    pub day: String,
    pub transactions: i64,
    pub revenue_cents: i64,
}

/// A product's aggregated sale volume over a period.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Everything the dashboard screen renders in one fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub active_products: i64,
    pub low_stock_products: i64,
    pub today_transactions: i64,
    pub today_revenue_cents: i64,
    pub month_revenue_cents: i64,
    pub month_purchases_cents: i64,
    pub recent_sales: Vec<Sale>,
    pub top_products: Vec<TopProduct>,
    /// One entry per day for the last 7 days; days without sales are absent.
    pub weekly_sales: Vec<DailySales>,
}

/// Aggregated sales figures over an arbitrary date range. Either bound may
/// be absent; a fully open range covers all sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transactions: i64,
    pub revenue_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub daily: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for dashboard and report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the dashboard snapshot.
    pub async fn dashboard(&self) -> DbResult<Dashboard> {
        let active_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        let low_stock_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active = 1 AND stock_quantity <= min_stock_level",
        )
        .fetch_one(&self.pool)
        .await?;

        let (today_transactions, today_revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(final_amount_cents), 0)
            FROM sales
            WHERE DATE(created_at) = DATE('now')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let month_revenue_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(final_amount_cents), 0)
            FROM sales
            WHERE strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let month_purchases_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(final_amount_cents), 0)
            FROM purchases
            WHERE strftime('%Y-%m', created_at) = strftime('%Y-%m', 'now')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let recent_sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                si.product_id,
                p.name AS product_name,
                p.sku,
                SUM(si.quantity) AS quantity_sold,
                SUM(si.total_price_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON si.sale_id = s.id
            JOIN products p ON si.product_id = p.id
            WHERE strftime('%Y-%m', s.created_at) = strftime('%Y-%m', 'now')
            GROUP BY si.product_id
            ORDER BY quantity_sold DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let weekly_sales = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                DATE(created_at) AS day,
                COUNT(*) AS transactions,
                COALESCE(SUM(final_amount_cents), 0) AS revenue_cents
            FROM sales
            WHERE DATE(created_at) >= DATE('now', '-6 days')
            GROUP BY day
            ORDER BY day
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Dashboard {
            active_products,
            low_stock_products,
            today_transactions,
            today_revenue_cents,
            month_revenue_cents,
            month_purchases_cents,
            recent_sales,
            top_products,
            weekly_sales,
        })
    }

    /// Builds the sales report for an inclusive, optionally-bounded date
    /// range.
    pub async fn sales_report(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> DbResult<SalesReport> {
        let mut totals = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(final_amount_cents), 0),
                COALESCE(SUM(discount_cents), 0),
                COALESCE(SUM(tax_cents), 0)
            FROM sales
            WHERE 1=1
            "#,
        );
        push_date_range(&mut totals, "created_at", start_date, end_date);
        let (transactions, revenue_cents, discount_cents, tax_cents): (i64, i64, i64, i64) =
            totals.build_query_as().fetch_one(&self.pool).await?;

        let mut daily_query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                DATE(created_at) AS day,
                COUNT(*) AS transactions,
                COALESCE(SUM(final_amount_cents), 0) AS revenue_cents
            FROM sales
            WHERE 1=1
            "#,
        );
        push_date_range(&mut daily_query, "created_at", start_date, end_date);
        daily_query.push(" GROUP BY day ORDER BY day");
        let daily = daily_query
            .build_query_as::<DailySales>()
            .fetch_all(&self.pool)
            .await?;

        let mut top_query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                si.product_id,
                p.name AS product_name,
                p.sku,
                SUM(si.quantity) AS quantity_sold,
                SUM(si.total_price_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON si.sale_id = s.id
            JOIN products p ON si.product_id = p.id
            WHERE 1=1
            "#,
        );
        push_date_range(&mut top_query, "s.created_at", start_date, end_date);
        top_query.push(" GROUP BY si.product_id ORDER BY revenue_cents DESC LIMIT 10");
        let top_products = top_query
            .build_query_as::<TopProduct>()
            .fetch_all(&self.pool)
            .await?;

        Ok(SalesReport {
            start_date,
            end_date,
            transactions,
            revenue_cents,
            discount_cents,
            tax_cents,
            daily,
            top_products,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use crate::repository::sale::{NewSale, NewSaleItem};
    use chrono::{Duration, Utc};

    async fn setup_with_sale() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let product = db
            .products()
            .create(NewProduct {
                sku: "RPT-001".to_string(),
                name: "Reported Product".to_string(),
                description: None,
                category_id: None,
                unit_price_cents: 500,
                cost_price_cents: 300,
                stock_quantity: 100,
                min_stock_level: 10,
                unit: "pcs".to_string(),
            })
            .await
            .unwrap();

        db.sales()
            .create(NewSale {
                customer_name: None,
                customer_email: None,
                customer_phone: None,
                items: vec![NewSaleItem {
                    product_id: product.id.clone(),
                    quantity: 3,
                    unit_price_cents: 500,
                }],
                discount_cents: 0,
                tax_cents: 0,
                payment_method: Default::default(),
                user_id: "tester".to_string(),
            })
            .await
            .unwrap();

        (db, product.id)
    }

    #[tokio::test]
    async fn test_dashboard_reflects_todays_sale() {
        let (db, product_id) = setup_with_sale().await;

        let dashboard = db.reports().dashboard().await.unwrap();
        assert_eq!(dashboard.active_products, 1);
        assert_eq!(dashboard.today_transactions, 1);
        assert_eq!(dashboard.today_revenue_cents, 1500);
        assert_eq!(dashboard.month_revenue_cents, 1500);
        assert_eq!(dashboard.recent_sales.len(), 1);
        assert_eq!(dashboard.top_products.len(), 1);
        assert_eq!(dashboard.top_products[0].product_id, product_id);
        assert_eq!(dashboard.top_products[0].quantity_sold, 3);
        assert_eq!(dashboard.weekly_sales.len(), 1);
        assert_eq!(dashboard.weekly_sales[0].revenue_cents, 1500);
    }

    #[tokio::test]
    async fn test_dashboard_empty_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dashboard = db.reports().dashboard().await.unwrap();

        assert_eq!(dashboard.active_products, 0);
        assert_eq!(dashboard.today_revenue_cents, 0);
        assert!(dashboard.recent_sales.is_empty());
        assert!(dashboard.weekly_sales.is_empty());
    }

    #[tokio::test]
    async fn test_sales_report_range() {
        let (db, _product_id) = setup_with_sale().await;

        let today = Utc::now().date_naive();
        let report = db
            .reports()
            .sales_report(Some(today - Duration::days(7)), Some(today))
            .await
            .unwrap();

        assert_eq!(report.transactions, 1);
        assert_eq!(report.revenue_cents, 1500);
        assert_eq!(report.daily.len(), 1);
        assert_eq!(report.top_products.len(), 1);

        // A range in the past sees nothing
        let empty = db
            .reports()
            .sales_report(
                Some(today - Duration::days(30)),
                Some(today - Duration::days(20)),
            )
            .await
            .unwrap();
        assert_eq!(empty.transactions, 0);
        assert!(empty.daily.is_empty());
    }

    #[tokio::test]
    async fn test_sales_report_open_and_half_open_ranges() {
        let (db, _product_id) = setup_with_sale().await;
        let today = Utc::now().date_naive();

        // No bounds: everything
        let all = db.reports().sales_report(None, None).await.unwrap();
        assert_eq!(all.transactions, 1);
        assert_eq!(all.revenue_cents, 1500);

        // Start only
        let from = db
            .reports()
            .sales_report(Some(today), None)
            .await
            .unwrap();
        assert_eq!(from.transactions, 1);

        // End only, before the sale
        let until = db
            .reports()
            .sales_report(None, Some(today - Duration::days(1)))
            .await
            .unwrap();
        assert_eq!(until.transactions, 0);
    }
}
