use sqlx::PgExecutor;

use crate::Result;

/// Allocates the next id of `collection`. Ids start at 1 and never repeat, even across
/// deletes, because the counter row is bumped in one atomic upsert.
pub async fn next_id<'e, E>(executor: E, collection: &str) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let id: i64 = sqlx::query_scalar(
		"\
INSERT INTO counters (collection, count)
VALUES ($1, 1)
ON CONFLICT (collection) DO UPDATE SET count = counters.count + 1
RETURNING count",
	)
	.bind(collection)
	.fetch_one(executor)
	.await?;

	Ok(id)
}
