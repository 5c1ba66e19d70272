use crate::models::{InvoiceItem, NewItem};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

/// 单条 INSERT 的最大行数 (8 列, 远低于 65535 个绑定参数)
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// 发票号分配锁的 advisory key
const INVOICE_ID_LOCK_KEY: i64 = 0x1D_0C_E1_D5;

/// 查询全部明细
pub async fn list_items(pool: &PgPool) -> Result<Vec<InvoiceItem>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT id, invoice_id, name, category, unit, unit_price, quantity, price, date
        FROM invoice_items
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 对发票号分配加事务级锁, 提交或回滚时自动释放
///
/// 并发的保存在此排队, 之后的 MAX 读取不会与另一事务的插入交错。
pub async fn lock_invoice_ids(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(INVOICE_ID_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

/// 下一个发票号: 现有最大值 + 1, 空表时为 1
pub async fn next_invoice_id(conn: &mut PgConnection) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(invoice_id), 0) + 1 AS next_invoice_id FROM invoice_items",
    )
    .fetch_one(conn)
    .await
}

/// 批量插入明细, 每行写入同一个发票号和日期
pub async fn insert_items(
    conn: &mut PgConnection,
    invoice_id: i32,
    date: Option<NaiveDate>,
    items: &[NewItem],
) -> Result<u64, sqlx::Error> {
    if items.is_empty() {
        return Ok(0);
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO invoice_items (
            invoice_id, name, category, unit, unit_price, quantity, price, date
        ) ",
    );

    query_builder.push_values(items, |mut b, item| {
        b.push_bind(invoice_id)
            .push_bind(&item.name)
            .push_bind(&item.category)
            .push_bind(&item.unit)
            .push_bind(item.unit_price.clone())
            .push_bind(item.quantity)
            .push_bind(item.price.clone())
            .push_bind(date.unwrap_or(item.date));
    });

    let result = query_builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
