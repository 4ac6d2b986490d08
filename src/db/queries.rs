use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CreateTransaction, PaymentStatus, Transaction};
use crate::session::hash_session_token;

use super::from_row::{query_all, query_one, TRANSACTION_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Transactions ============

pub fn create_transaction(conn: &Connection, input: &CreateTransaction) -> Result<Transaction> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO transactions
         (id, user_id, out_trade_no, product_id, product_name, amount_cents,
          payment_method, status, is_subscription, subscription_period,
          subscription_starts_at, subscription_ends_at, params, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            &id,
            &input.user_id,
            &input.out_trade_no,
            &input.product_id,
            &input.product_name,
            input.amount_cents,
            input.payment_method.as_str(),
            input.is_subscription,
            input.subscription_period.map(|p| p.as_str()),
            input.subscription_starts_at,
            input.subscription_ends_at,
            &input.params,
            now,
        ],
    )?;

    Ok(Transaction {
        id,
        user_id: input.user_id.clone(),
        out_trade_no: input.out_trade_no.clone(),
        trade_no: None,
        product_id: input.product_id.clone(),
        product_name: input.product_name.clone(),
        amount_cents: input.amount_cents,
        payment_method: input.payment_method,
        status: PaymentStatus::Pending,
        is_subscription: input.is_subscription,
        subscription_period: input.subscription_period,
        subscription_starts_at: input.subscription_starts_at,
        subscription_ends_at: input.subscription_ends_at,
        params: input.params.clone(),
        created_at: now,
        paid_at: None,
    })
}

pub fn get_transaction_by_order_no(
    conn: &Connection,
    out_trade_no: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE out_trade_no = ?1",
            TRANSACTION_COLS
        ),
        &[&out_trade_no],
    )
}

/// Look up an order scoped to its owner (for user-facing endpoints).
pub fn get_transaction_for_user(
    conn: &Connection,
    out_trade_no: &str,
    user_id: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE out_trade_no = ?1 AND user_id = ?2",
            TRANSACTION_COLS
        ),
        &[&out_trade_no, &user_id],
    )
}

/// Atomically move a pending order to success, recording the gateway's
/// trade number and the paid timestamp.
///
/// The `status = 'pending'` guard makes this the sole writer of terminal
/// state: under duplicate webhook delivery (or a webhook/poll race) exactly
/// one caller gets `true`; everyone else gets `false` and must treat the
/// order as already settled.
pub fn mark_transaction_paid(
    conn: &Connection,
    out_trade_no: &str,
    trade_no: Option<&str>,
    paid_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE transactions
         SET status = 'success', trade_no = COALESCE(?1, trade_no), paid_at = ?2
         WHERE out_trade_no = ?3 AND status = 'pending'",
        params![trade_no, paid_at, out_trade_no],
    )?;
    Ok(affected > 0)
}

/// Atomically move a pending order to failed. Same guard as
/// [`mark_transaction_paid`]; a success already recorded is never reversed.
pub fn mark_transaction_failed(
    conn: &Connection,
    out_trade_no: &str,
    trade_no: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE transactions
         SET status = 'failed', trade_no = ?1
         WHERE out_trade_no = ?2 AND status = 'pending'",
        params![trade_no, out_trade_no],
    )?;
    Ok(affected > 0)
}

/// End date of the user's furthest-reaching successful subscription, used
/// at checkout to stack a new period on top of the current one.
pub fn latest_subscription_end(conn: &Connection, user_id: &str) -> Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT subscription_ends_at FROM transactions
         WHERE user_id = ?1 AND is_subscription = 1 AND status = 'success'
           AND subscription_ends_at IS NOT NULL
         ORDER BY subscription_ends_at DESC
         LIMIT 1",
        params![user_id],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map_err(Into::into)
}

/// The user's most recent successful subscription purchase, if any.
pub fn current_subscription(conn: &Connection, user_id: &str) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions
             WHERE user_id = ?1 AND is_subscription = 1 AND status = 'success'
             ORDER BY subscription_ends_at DESC
             LIMIT 1",
            TRANSACTION_COLS
        ),
        &[&user_id],
    )
}

pub fn list_transactions_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Transaction>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE user_id = ?1 ORDER BY created_at DESC",
            TRANSACTION_COLS
        ),
        &[&user_id],
    )
}

// ============ Sessions ============

/// Record a session token for a user. The token itself is never stored,
/// only its hash.
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    token: &str,
    ttl_secs: i64,
) -> Result<()> {
    let now = now();
    conn.execute(
        "INSERT OR REPLACE INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![hash_session_token(token), user_id, now, now + ttl_secs],
    )?;
    Ok(())
}

/// Resolve a bearer token to a user id, honoring expiry.
pub fn get_session_user(conn: &Connection, token: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
        params![hash_session_token(token), now()],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(Into::into)
}

/// Drop sessions past their expiry. Returns the number of deleted rows.
pub fn purge_expired_sessions(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now()],
    )?;
    Ok(deleted)
}
