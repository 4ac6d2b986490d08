use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Payment orders. out_trade_no is the business key; status may only
        -- move pending -> success or pending -> failed, and every terminal
        -- write goes through a conditional UPDATE guarded on 'pending'.
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            out_trade_no TEXT NOT NULL UNIQUE,
            trade_no TEXT,
            product_id TEXT NOT NULL,
            product_name TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            payment_method TEXT NOT NULL CHECK (payment_method IN ('alipay', 'wxpay')),
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'success', 'failed')),
            is_subscription INTEGER NOT NULL DEFAULT 0,
            subscription_period TEXT CHECK (subscription_period IS NULL OR subscription_period IN ('monthly', 'yearly')),
            subscription_starts_at INTEGER,
            subscription_ends_at INTEGER,
            params TEXT,
            created_at INTEGER NOT NULL,
            paid_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user_time ON transactions(user_id, created_at DESC);
        -- Serves the "most recent successful subscription" lookup at checkout
        CREATE INDEX IF NOT EXISTS idx_transactions_active_subs
            ON transactions(user_id, subscription_ends_at DESC)
            WHERE is_subscription = 1 AND status = 'success';

        -- Bearer sessions issued by the external identity provider.
        -- Tokens are stored hashed; rows past expires_at are dead.
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at);
        "#,
    )?;
    Ok(())
}
