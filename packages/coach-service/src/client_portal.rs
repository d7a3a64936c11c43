//! Read and write access for a signed-in portal client, always scoped to their own records.

use serde::Serialize;

use crate::{
	CoachService, Error, Result,
	client_requests::CreateClientRequestRequest,
	messages::{ClientUserScopedRequest, SendFromClientRequest, SendMessageResponse},
};
use coach_providers::tokens::SessionClaims;
use coach_storage::models::{Client, ClientRequest, ClientUser, Document, Message, Project};

#[derive(Debug, Clone, Serialize)]
pub struct PortalProfile {
	pub user: ClientUser,
	pub client: Option<Client>,
}

impl CoachService {
	/// The portal user behind a signed session. Sessions of deactivated users, or of users moved
	/// to another client, are refused even before they expire.
	pub async fn client_portal_active_user(&self, session: &SessionClaims) -> Result<ClientUser> {
		self.find_client_user(session.client_user_id)
			.await?
			.filter(|user| user.is_active && user.client_id == session.client_id)
			.ok_or_else(|| Error::unauthorized("Session no longer valid"))
	}

	pub async fn client_portal_me(&self, session: &SessionClaims) -> Result<PortalProfile> {
		let user = self.client_portal_active_user(session).await?;
		let client = self.find_client(user.client_id).await?;

		Ok(PortalProfile { user, client })
	}

	/// Drafts stay private to the back office.
	pub async fn client_portal_documents(&self, session: &SessionClaims) -> Result<Vec<Document>> {
		self.client_portal_active_user(session).await?;

		let documents = sqlx::query_as::<_, Document>(
			"\
SELECT *
FROM documents
WHERE client_id = $1 AND status <> 'draft'
ORDER BY date DESC, id DESC",
		)
		.bind(session.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(documents)
	}

	pub async fn client_portal_projects(&self, session: &SessionClaims) -> Result<Vec<Project>> {
		self.client_portal_active_user(session).await?;

		let projects = sqlx::query_as::<_, Project>(
			"SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
		)
		.bind(session.client_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(projects)
	}

	pub async fn client_portal_requests(
		&self,
		session: &SessionClaims,
	) -> Result<Vec<ClientRequest>> {
		self.client_portal_active_user(session).await?;

		self.client_requests_list_by_client(crate::projects::ClientScopedRequest {
			client_id: session.client_id,
		})
		.await
	}

	pub async fn client_portal_create_request(
		&self,
		session: &SessionClaims,
		req: CreateClientRequestRequest,
	) -> Result<ClientRequest> {
		self.client_portal_active_user(session).await?;

		self.client_requests_create(session.client_id, req).await
	}

	pub async fn client_portal_messages(&self, session: &SessionClaims) -> Result<Vec<Message>> {
		self.client_portal_active_user(session).await?;

		self.messages_conversation(ClientUserScopedRequest {
			client_user_id: session.client_user_id,
		})
		.await
	}

	pub async fn client_portal_send_message(
		&self,
		session: &SessionClaims,
		req: SendFromClientRequest,
	) -> Result<SendMessageResponse> {
		self.client_portal_active_user(session).await?;

		self.messages_send_from_client(session.client_user_id, session.client_id, req).await
	}
}
