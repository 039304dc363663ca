//! Single-transaction persistence of a post and its analysis.

use sqlx::PgPool;

use crate::analyses::{insert_analysis_if_absent, NewAnalysis};
use crate::posts::{insert_post_if_absent, NewPost};
use crate::DbError;

/// What the transaction actually wrote. Both flags are `false` when a
/// redelivered entry finds everything already persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub post_inserted: bool,
    pub analysis_inserted: bool,
}

/// Persist a post and its analysis atomically.
///
/// Both inserts are insert-if-absent and run in one transaction, so a crash
/// can never leave an analysis without its post or vice versa, and repeating
/// the call with the same input is a no-op. The analysis references the post
/// by natural key; the post row is guaranteed present (inserted here or
/// already stored) before the analysis insert runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either insert or the commit fails; the
/// transaction rolls back on drop.
pub async fn persist_post_analysis(
    pool: &PgPool,
    post: &NewPost,
    analysis: &NewAnalysis,
) -> Result<PersistOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let post_inserted = insert_post_if_absent(&mut *tx, post).await?;
    let analysis_inserted = insert_analysis_if_absent(&mut *tx, analysis).await?;

    tx.commit().await?;

    Ok(PersistOutcome {
        post_inserted,
        analysis_inserted,
    })
}
