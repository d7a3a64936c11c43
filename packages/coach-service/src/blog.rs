use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{CoachService, Error, IdRequest, Result, SuccessResponse};
use coach_domain::{slug, status::BlogStatus};
use coach_storage::{counters, models::BlogPost};

const DUPLICATE_SLUG: &str = "Ce slug existe déjà. Veuillez en choisir un autre.";
const NOT_FOUND: &str = "Article non trouvé";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostFields {
	pub title: Option<String>,
	pub slug: Option<String>,
	pub excerpt: Option<String>,
	pub content: Option<String>,
	pub cover_image_url: Option<String>,
	pub author_name: Option<String>,
	pub status: Option<BlogStatus>,
	pub tags: Option<Vec<String>>,
	pub meta_title: Option<String>,
	pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBlogPostRequest {
	pub id: i64,
	#[serde(flatten)]
	pub fields: BlogPostFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlugRequest {
	pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchBlogRequest {
	pub query: String,
	#[serde(default)]
	pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBlogPostResponse {
	pub success: bool,
	pub id: i64,
	pub slug: String,
}

impl CoachService {
	pub async fn blog_list_all(&self) -> Result<Vec<BlogPost>> {
		let posts =
			sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts ORDER BY created_at DESC, id DESC")
				.fetch_all(&self.db.pool)
				.await?;

		Ok(posts)
	}

	pub async fn blog_list_published(&self) -> Result<Vec<BlogPost>> {
		let posts = sqlx::query_as::<_, BlogPost>(
			"\
SELECT *
FROM blog_posts
WHERE status = 'published'
ORDER BY published_at DESC NULLS LAST, id DESC",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(posts)
	}

	pub async fn blog_get(&self, req: IdRequest) -> Result<BlogPost> {
		let post = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
			.bind(req.id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::not_found(NOT_FOUND))?;

		Ok(post)
	}

	/// Public read of a published post. Each read counts as a view.
	pub async fn blog_get_by_slug(&self, req: SlugRequest) -> Result<BlogPost> {
		let post = sqlx::query_as::<_, BlogPost>(
			"\
UPDATE blog_posts
SET view_count = view_count + 1
WHERE slug = $1 AND status = 'published'
RETURNING *",
		)
		.bind(req.slug.trim())
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found(NOT_FOUND))?;

		Ok(post)
	}

	pub async fn blog_create(&self, req: BlogPostFields) -> Result<CreateBlogPostResponse> {
		let title = crate::require_text("title", req.title.as_deref())?;
		let content = crate::require_text("content", req.content.as_deref())?;
		let slug = post_slug(req.slug.as_deref(), title)?;

		if self.slug_taken(&slug, None).await? {
			return Err(Error::conflict(DUPLICATE_SLUG));
		}

		let status = req.status.unwrap_or(BlogStatus::Draft);
		let now = OffsetDateTime::now_utc();
		let published_at = (status == BlogStatus::Published).then_some(now);
		let id = counters::next_id(&self.db.pool, "blog_posts").await?;

		sqlx::query(
			"\
INSERT INTO blog_posts (
	id,
	title,
	slug,
	excerpt,
	content,
	cover_image_url,
	author_name,
	status,
	tags,
	meta_title,
	meta_description,
	published_at,
	view_count,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0, $13, $13)",
		)
		.bind(id)
		.bind(title)
		.bind(&slug)
		.bind(crate::non_blank(req.excerpt.as_deref()))
		.bind(content)
		.bind(crate::non_blank(req.cover_image_url.as_deref()))
		.bind(crate::non_blank(req.author_name.as_deref()))
		.bind(status.as_str())
		.bind(clean_tags(req.tags.unwrap_or_default()))
		.bind(crate::non_blank(req.meta_title.as_deref()))
		.bind(crate::non_blank(req.meta_description.as_deref()))
		.bind(published_at)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		tracing::info!(post_id = id, %slug, "Blog post created.");

		Ok(CreateBlogPostResponse { success: true, id, slug })
	}

	pub async fn blog_update(&self, req: UpdateBlogPostRequest) -> Result<BlogPost> {
		let fields = req.fields;
		let slug = match crate::non_blank(fields.slug.as_deref()) {
			Some(raw) => {
				let slug = post_slug(Some(raw), raw)?;

				if self.slug_taken(&slug, Some(req.id)).await? {
					return Err(Error::conflict(DUPLICATE_SLUG));
				}

				Some(slug)
			},
			None => None,
		};
		let now = OffsetDateTime::now_utc();
		let publishing = (fields.status == Some(BlogStatus::Published)).then_some(now);
		let post = sqlx::query_as::<_, BlogPost>(
			"\
UPDATE blog_posts
SET
	title = COALESCE($2, title),
	slug = COALESCE($3, slug),
	excerpt = COALESCE($4, excerpt),
	content = COALESCE($5, content),
	cover_image_url = COALESCE($6, cover_image_url),
	author_name = COALESCE($7, author_name),
	status = COALESCE($8, status),
	tags = COALESCE($9, tags),
	meta_title = COALESCE($10, meta_title),
	meta_description = COALESCE($11, meta_description),
	published_at = COALESCE(published_at, $12),
	updated_at = $13
WHERE id = $1
RETURNING *",
		)
		.bind(req.id)
		.bind(crate::non_blank(fields.title.as_deref()))
		.bind(slug)
		.bind(fields.excerpt.as_deref())
		.bind(crate::non_blank(fields.content.as_deref()))
		.bind(fields.cover_image_url.as_deref())
		.bind(fields.author_name.as_deref())
		.bind(fields.status.map(BlogStatus::as_str))
		.bind(fields.tags.map(clean_tags))
		.bind(fields.meta_title.as_deref())
		.bind(fields.meta_description.as_deref())
		.bind(publishing)
		.bind(now)
		.fetch_optional(&self.db.pool)
		.await?
		.ok_or_else(|| Error::not_found(NOT_FOUND))?;

		Ok(post)
	}

	pub async fn blog_delete(&self, req: IdRequest) -> Result<SuccessResponse> {
		sqlx::query("DELETE FROM blog_posts WHERE id = $1").bind(req.id).execute(&self.db.pool).await?;

		Ok(SuccessResponse::OK)
	}

	/// Published posts whose title, excerpt or one of the tags contains the query.
	pub async fn blog_search(&self, req: SearchBlogRequest) -> Result<Vec<BlogPost>> {
		let pattern = crate::like_pattern(&req.query);
		let posts = sqlx::query_as::<_, BlogPost>(
			"\
SELECT *
FROM blog_posts
WHERE status = 'published'
	AND (
		title ILIKE $1
		OR excerpt ILIKE $1
		OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $1)
	)
	AND ($2::text IS NULL OR $2 = ANY(tags))
ORDER BY published_at DESC NULLS LAST, id DESC",
		)
		.bind(pattern)
		.bind(crate::non_blank(req.tag.as_deref()))
		.fetch_all(&self.db.pool)
		.await?;

		Ok(posts)
	}

	pub async fn blog_tags(&self) -> Result<Vec<String>> {
		let tags = sqlx::query_scalar::<_, String>(
			"\
SELECT DISTINCT tag
FROM blog_posts, unnest(tags) AS tag
WHERE status = 'published'
ORDER BY tag",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(tags)
	}

	async fn slug_taken(&self, slug: &str, except: Option<i64>) -> Result<bool> {
		let taken: bool = sqlx::query_scalar(
			"SELECT EXISTS (SELECT 1 FROM blog_posts WHERE slug = $1 AND ($2::bigint IS NULL OR id <> $2))",
		)
		.bind(slug)
		.bind(except)
		.fetch_one(&self.db.pool)
		.await?;

		Ok(taken)
	}
}

/// The given slug, normalised, or one derived from the title.
fn post_slug(given: Option<&str>, title: &str) -> Result<String> {
	let source = crate::non_blank(given).unwrap_or(title);
	let slug = slug::slugify(source);

	if slug.is_empty() {
		return Err(Error::invalid("slug must contain at least one letter or digit."));
	}

	Ok(slug)
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
	let mut out = Vec::with_capacity(tags.len());

	for tag in tags {
		let tag = tag.trim();

		if !tag.is_empty() && !out.iter().any(|seen: &String| seen == tag) {
			out.push(tag.to_string());
		}
	}

	out
}
