//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::{PaymentMethod, PaymentStatus, SubscriptionPeriod, Transaction};

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on bad data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub const TRANSACTION_COLS: &str = "id, user_id, out_trade_no, trade_no, product_id, product_name, amount_cents, payment_method, status, is_subscription, subscription_period, subscription_starts_at, subscription_ends_at, params, created_at, paid_at";

impl FromRow for Transaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let payment_method: PaymentMethod = parse_enum(row, 7, "payment_method")?;
        let status: PaymentStatus = parse_enum(row, 8, "status")?;
        let subscription_period: Option<SubscriptionPeriod> = row
            .get::<_, Option<String>>(10)?
            .map(|s| {
                s.parse().map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        10,
                        "subscription_period".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })
            })
            .transpose()?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            out_trade_no: row.get(2)?,
            trade_no: row.get(3)?,
            product_id: row.get(4)?,
            product_name: row.get(5)?,
            amount_cents: row.get(6)?,
            payment_method,
            status,
            is_subscription: row.get(9)?,
            subscription_period,
            subscription_starts_at: row.get(11)?,
            subscription_ends_at: row.get(12)?,
            params: row.get(13)?,
            created_at: row.get(14)?,
            paid_at: row.get(15)?,
        })
    }
}
