use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Cfa, NewOrder, Order, OrderItem, UserId},
    se_api::order_objects::OrderQueryFilter,
};

/// Inserts the order and its items, returning `false` in the second parameter if an order for the same payment
/// reference and seller already exists. In that case nothing is written.
///
/// This is not atomic. Pass `&mut *tx` to keep the order and its items together.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), sqlx::Error> {
    let inserted = match fetch_order_by_ref_and_seller(&order.payment_ref, order.seller_key(), conn).await? {
        Some(existing) => {
            debug!(
                "🗃️ Order for [{}] and seller {} already exists as #{}",
                order.payment_ref,
                order.seller_key(),
                existing.id
            );
            (existing, false)
        },
        None => {
            let order = insert_order(order, conn).await?;
            debug!("🗃️ Order #{} inserted for [{}]", order.id, order.payment_ref);
            (order, true)
        },
    };
    Ok(inserted)
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let seller_key = order.seller_key().to_string();
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                buyer_id,
                seller_id,
                seller_key,
                total_amount,
                status,
                payment_method,
                payout_status,
                escrow_amount,
                seller_amount,
                commission_amount,
                commission_ppb,
                payment_ref
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(seller_key)
    .bind(order.total_amount)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.payout_status)
    .bind(order.escrow_amount)
    .bind(order.seller_amount)
    .bind(order.commission_amount)
    .bind(order.commission_rate)
    .bind(order.payment_ref)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, seller_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5);
            "#,
        )
        .bind(inserted.id)
        .bind(item.product_id)
        .bind(item.seller_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(inserted)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_ref_and_seller(
    payment_ref: &str,
    seller_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_ref = $1 AND seller_key = $2")
        .bind(payment_ref)
        .bind(seller_key)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_payment_ref(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE payment_ref = $1 ORDER BY id ASC")
        .bind(payment_ref)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if let Some(payment_ref) = query.payment_ref {
        where_clause.push("payment_ref = ");
        where_clause.push_bind_unseparated(payment_ref);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(statuses) = query.payout_status.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("payout_status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Moves every order for `payment_ref` that is still awaiting payment into escrow. Returns the orders that changed.
pub async fn secure_escrow_for_reference(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'PAID',
                payout_status = 'ESCROW',
                escrow_amount = seller_amount,
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_ref = $1 AND status = 'PENDING' AND payout_status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(payment_ref)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// The single-order version of [`secure_escrow_for_reference`]. Returns `None` if the order was not awaiting payment.
pub async fn secure_escrow_for_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'PAID',
                payout_status = 'ESCROW',
                escrow_amount = seller_amount,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'PENDING' AND payout_status = 'PENDING'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Marks a paid order as delivered. Returns `None` if the order has not been paid.
pub async fn mark_delivered(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'DELIVERED', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status IN ('PAID', 'DELIVERED')
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Flips the payout flag to `PAID` and empties the escrow. Returns `None` if the payout was already released, in
/// which case the caller must not credit the seller.
pub async fn release_escrow(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payout_status = 'PAID', escrow_amount = 0, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND payout_status != 'PAID'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Sum of the amounts held in escrow for the seller.
pub async fn escrow_total_for_seller(seller: &UserId, conn: &mut SqliteConnection) -> Result<Cfa, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(escrow_amount), 0) FROM orders WHERE seller_id = $1 AND payout_status = 'ESCROW'",
    )
    .bind(seller)
    .fetch_one(conn)
    .await?;
    Ok(Cfa::from(total))
}
