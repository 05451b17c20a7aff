//! Database operations for print designs.

use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::models::{Design, DesignOwner};

#[derive(Debug, sqlx::FromRow)]
struct DesignRow {
    id: i64,
    position: i32,
    preview_url: Option<String>,
    print_url: Option<String>,
}

impl From<DesignRow> for Design {
    fn from(row: DesignRow) -> Self {
        Self {
            id: row.id,
            position: row.position,
            preview_url: row.preview_url,
            print_url: row.print_url,
        }
    }
}

/// Repository for design database operations.
pub struct DesignsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DesignsRepository<'a> {
    /// Create a new designs repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the designs of an owner, ordered by print position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` on query failure.
    #[instrument(skip(self))]
    pub async fn list_for_owner(
        &self,
        owner: &DesignOwner,
    ) -> Result<Vec<Design>, RepositoryError> {
        let (kind, owner_id) = match owner {
            DesignOwner::Transaction(id) => ("transaction", id.as_str().to_owned()),
            DesignOwner::Listing(id) => ("listing", id.to_string()),
        };
        let rows: Vec<DesignRow> = sqlx::query_as(
            "SELECT id, position, preview_url, print_url FROM designs \
             WHERE owner_kind = $1 AND owner_id = $2 \
             ORDER BY position",
        )
        .bind(kind)
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Design::from).collect())
    }
}
