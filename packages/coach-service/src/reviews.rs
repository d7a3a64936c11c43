use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse, projects::ClientScopedRequest};
use coach_domain::round1;
use coach_storage::{
	counters,
	models::{Project, Review},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
	pub client_id: i64,
	#[serde(default)]
	pub project_id: Option<i64>,
	pub rating: i32,
	#[serde(default)]
	pub comment: Option<String>,
	#[serde(default)]
	pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsRequest {
	#[serde(default)]
	pub client_id: Option<i64>,
	#[serde(default)]
	pub project_id: Option<i64>,
	#[serde(default)]
	pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
	pub id: i64,
	#[serde(default)]
	pub rating: Option<i32>,
	#[serde(default)]
	pub comment: Option<String>,
	#[serde(default)]
	pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondReviewRequest {
	pub id: i64,
	pub response: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRatingRequest {
	#[serde(default)]
	pub client_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageRating {
	pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithProject {
	#[serde(flatten)]
	pub review: Review,
	pub project: Option<Project>,
}

impl CoachService {
	pub async fn reviews_create(&self, req: CreateReviewRequest) -> Result<Review> {
		validate_rating(req.rating)?;

		let now = OffsetDateTime::now_utc();
		let id = counters::next_id(&self.db.pool, "reviews").await?;
		let review = sqlx::query_as::<_, Review>(
			"\
INSERT INTO reviews (id, client_id, project_id, rating, comment, is_public, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
RETURNING *",
		)
		.bind(id)
		.bind(req.client_id)
		.bind(req.project_id)
		.bind(req.rating)
		.bind(crate::non_blank(req.comment.as_deref()))
		.bind(req.is_public.unwrap_or(true))
		.bind(now)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(review)
	}

	pub async fn reviews_list(&self, req: ListReviewsRequest) -> Result<Vec<Review>> {
		let reviews = sqlx::query_as::<_, Review>(
			"\
SELECT *
FROM reviews
WHERE ($1::bigint IS NULL OR client_id = $1)
	AND ($2::bigint IS NULL OR project_id = $2)
	AND ($3::boolean IS NULL OR is_public = $3)
ORDER BY created_at DESC, id DESC",
		)
		.bind(req.client_id)
		.bind(req.project_id)
		.bind(req.is_public)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(reviews)
	}

	pub async fn reviews_get(&self, req: IdRequest) -> Result<Review> {
		let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
			.bind(req.id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::not_found("Review not found"))?;

		Ok(review)
	}

	pub async fn reviews_update(&self, req: UpdateReviewRequest) -> Result<Review> {
		if let Some(rating) = req.rating {
			validate_rating(rating)?;
		}

		let review = sqlx::query_as::<_, Review>(
			"\
UPDATE reviews
SET
	rating = COALESCE($2, rating),
	comment = COALESCE($3, comment),
	is_public = COALESCE($4, is_public),
	updated_at = $5
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(req.rating)
		.bind(req.comment.as_deref())
		.bind(req.is_public)
		.bind(OffsetDateTime::now_utc())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Review not found"))?;

		Ok(review)
	}

	pub async fn reviews_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM reviews WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	pub async fn reviews_respond(&self, req: RespondReviewRequest) -> Result<Review> {
		let response = crate::require_text("response", Some(req.response.as_str()))?;
		let now = OffsetDateTime::now_utc();
		let review = sqlx::query_as::<_, Review>(
			"\
UPDATE reviews
SET response = $2, responded_at = $3, updated_at = $3
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(response)
		.bind(now)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found("Review not found"))?;

		Ok(review)
	}

	pub async fn reviews_average_rating(&self, req: AverageRatingRequest) -> Result<AverageRating> {
		let average: Option<f64> = sqlx::query_scalar(
			"SELECT avg(rating)::double precision FROM reviews WHERE ($1::bigint IS NULL OR client_id = $1)",
		)
		.bind(req.client_id)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(AverageRating { average: average.map(round1).unwrap_or(0.0) })
	}

	pub async fn reviews_with_projects(
		&self,
		req: ClientScopedRequest,
	) -> Result<Vec<ReviewWithProject>> {
		let reviews = self
			.reviews_list(ListReviewsRequest { client_id: Some(req.client_id), ..Default::default() })
			.await?;
		let mut out = Vec::with_capacity(reviews.len());

		for review in reviews {
			let project = match review.project_id {
				Some(id) => self.find_project(id).await?,
				None => None,
			};

			out.push(ReviewWithProject { review, project });
		}

		Ok(out)
	}
}

fn validate_rating(rating: i32) -> Result<()> {
	if !(1..=5).contains(&rating) {
		return Err(Error::invalid("rating must be between 1 and 5."));
	}

	Ok(())
}
