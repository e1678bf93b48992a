//! Postgres-backed store.
//!
//! Expected schema:
//!
//! | table | columns |
//! |-------|---------|
//! | `users` | `id uuid pk`, `email text`, `display_name text` |
//! | `shops` | `id uuid pk`, `owner_id uuid`, `name text` |
//! | `shop_members` | `shop_id uuid`, `user_id uuid`, `roles int4`, `confirmed bool` |
//! | `tabs` | `id uuid pk`, `shop_id uuid`, `owner_id uuid`, `status text` |
//!
//! Shops and memberships are read `FOR SHARE` so a role change cannot land
//! between the authorization check and the mutation; tabs are read
//! `FOR UPDATE` because the usual mutation is a status transition.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | `PoolTimedOut`, `PoolClosed`, `Io` | `Unavailable` |
//! | `RowNotFound` | `NotFound` |
//! | anything else | `Storage` |

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use tabkeep_auth::{RoleMask, Shop, ShopMember, Tab, TabStatus, User};
use tabkeep_core::{ShopId, TabId, UserId};

use super::{Store, StoreError, Transaction, TxHandle};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<TxHandle, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PostgresTx {
    #[instrument(skip(self), err)]
    async fn get_user(&mut self, id: UserId) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT id, email, display_name FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .ok_or(StoreError::NotFound("user"))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("get_user", e))
    }

    #[instrument(skip(self), err)]
    async fn get_shop(&mut self, id: ShopId) -> Result<Shop, StoreError> {
        let row = sqlx::query("SELECT id, owner_id, name FROM shops WHERE id = $1 FOR SHARE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("get_shop", e))?
            .ok_or(StoreError::NotFound("shop"))?;

        let member_rows = sqlx::query(
            "SELECT user_id, roles, confirmed FROM shop_members WHERE shop_id = $1 FOR SHARE",
        )
        .bind(*id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_shop_members", e))?;

        let mut members = Vec::with_capacity(member_rows.len());
        for row in &member_rows {
            members.push(member_from_row(row).map_err(|e| map_sqlx_error("get_shop_members", e))?);
        }

        let owner_id: Uuid = row.try_get("owner_id").map_err(|e| map_sqlx_error("get_shop", e))?;
        let name: String = row.try_get("name").map_err(|e| map_sqlx_error("get_shop", e))?;
        Ok(Shop {
            id,
            owner_id: UserId::from_uuid(owner_id),
            name,
            members,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_tab(&mut self, id: TabId) -> Result<Tab, StoreError> {
        let row = sqlx::query(
            "SELECT id, shop_id, owner_id, status FROM tabs WHERE id = $1 FOR UPDATE",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("get_tab", e))?
        .ok_or(StoreError::NotFound("tab"))?;

        tab_from_row(&row)
    }

    #[instrument(skip(self, name), err)]
    async fn rename_shop(&mut self, id: ShopId, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE shops SET name = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("rename_shop", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("shop"));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_shop(&mut self, id: ShopId) -> Result<(), StoreError> {
        for (op, sql) in [
            ("delete_shop_tabs", "DELETE FROM tabs WHERE shop_id = $1"),
            ("delete_shop_members", "DELETE FROM shop_members WHERE shop_id = $1"),
        ] {
            sqlx::query(sql)
                .bind(*id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error(op, e))?;
        }

        let result = sqlx::query("DELETE FROM shops WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_shop", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("shop"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(status = %status), err)]
    async fn set_tab_status(&mut self, id: TabId, status: TabStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tabs SET status = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_tab_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("tab"));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PostgresTx { tx } = *self;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PostgresTx { tx } = *self;
        tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    Ok(User {
        id: UserId::from_uuid(id),
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
    })
}

fn member_from_row(row: &PgRow) -> Result<ShopMember, sqlx::Error> {
    let user_id: Uuid = row.try_get("user_id")?;
    let roles: i32 = row.try_get("roles")?;
    Ok(ShopMember {
        user_id: UserId::from_uuid(user_id),
        // int4 column holds the raw 32-bit mask.
        roles: RoleMask::from_bits(roles as u32),
        confirmed: row.try_get("confirmed")?,
    })
}

fn tab_from_row(row: &PgRow) -> Result<Tab, StoreError> {
    let read = |e| map_sqlx_error("get_tab", e);
    let id: Uuid = row.try_get("id").map_err(read)?;
    let shop_id: Uuid = row.try_get("shop_id").map_err(read)?;
    let owner_id: Uuid = row.try_get("owner_id").map_err(read)?;
    let status: String = row.try_get("status").map_err(read)?;

    Ok(Tab {
        id: TabId::from_uuid(id),
        shop_id: ShopId::from_uuid(shop_id),
        owner_id: UserId::from_uuid(owner_id),
        status: status.parse().map_err(StoreError::Storage)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound("row"),
        sqlx::Error::Database(db_err) => {
            StoreError::Storage(format!("database error in {operation}: {}", db_err.message()))
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}
