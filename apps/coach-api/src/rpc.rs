//! tRPC-shaped procedure dispatch: `router.procedure` paths, JSON input, `{result: {data}}` output.

use axum::http::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{auth::Caller, routes::ApiError};
use coach_providers::tokens::SessionClaims;
use coach_service::CoachService;

const ADMIN_ONLY: &str = "Accès refusé : admin uniquement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
	/// No credentials.
	Public,
	/// A portal session.
	Client,
	/// The admin bearer token.
	Admin,
	/// Admin or portal session.
	Member,
}

pub const PROCEDURES: &[(&str, Access)] = &[
	("clients.list", Access::Admin),
	("clients.getById", Access::Admin),
	("clients.search", Access::Admin),
	("clients.create", Access::Admin),
	("clients.update", Access::Admin),
	("clients.delete", Access::Admin),
	("projects.list", Access::Admin),
	("projects.listByClient", Access::Admin),
	("projects.getById", Access::Admin),
	("projects.create", Access::Admin),
	("projects.update", Access::Admin),
	("projects.delete", Access::Admin),
	("tasks.list", Access::Admin),
	("tasks.listByProject", Access::Admin),
	("tasks.create", Access::Admin),
	("tasks.update", Access::Admin),
	("tasks.delete", Access::Admin),
	("documents.list", Access::Admin),
	("documents.listByClient", Access::Admin),
	("documents.getById", Access::Admin),
	("documents.create", Access::Admin),
	("documents.update", Access::Admin),
	("documents.updateStatus", Access::Admin),
	("documents.delete", Access::Admin),
	("company.get", Access::Admin),
	("company.upsert", Access::Admin),
	("dashboard.stats", Access::Admin),
	("clientRequests.list", Access::Admin),
	("clientRequests.listByClient", Access::Admin),
	("clientRequests.create", Access::Client),
	("clientRequests.updateStatus", Access::Admin),
	("clientRequests.delete", Access::Admin),
	("leads.list", Access::Admin),
	("leads.listByStatus", Access::Admin),
	("leads.getById", Access::Admin),
	("leads.create", Access::Admin),
	("leads.update", Access::Admin),
	("leads.updateStatus", Access::Admin),
	("leads.convertToClient", Access::Admin),
	("leads.delete", Access::Admin),
	("leads.sendEmail", Access::Admin),
	("leads.getEmailHistory", Access::Admin),
	("leads.getStats", Access::Admin),
	("emailTemplates.list", Access::Admin),
	("emailTemplates.getById", Access::Admin),
	("emailTemplates.create", Access::Admin),
	("emailTemplates.update", Access::Admin),
	("emailTemplates.delete", Access::Admin),
	("campaigns.list", Access::Admin),
	("campaigns.getById", Access::Admin),
	("campaigns.create", Access::Admin),
	("campaigns.start", Access::Admin),
	("campaigns.pause", Access::Admin),
	("campaigns.delete", Access::Admin),
	("campaigns.retryFailed", Access::Admin),
	("emailTracking.createTracking", Access::Admin),
	("emailTracking.trackOpen", Access::Public),
	("emailTracking.trackClick", Access::Public),
	("emailTracking.getCampaignStats", Access::Admin),
	("emailTracking.addToBlacklist", Access::Admin),
	("emailTracking.removeFromBlacklist", Access::Admin),
	("emailTracking.listBlacklist", Access::Admin),
	("emailTracking.isBlacklisted", Access::Admin),
	("emailTracking.unsubscribe", Access::Public),
	("documentTracking.createTracking", Access::Admin),
	("documentTracking.getByDocument", Access::Admin),
	("documentTracking.getViews", Access::Admin),
	("documentTracking.recordView", Access::Public),
	("documentTracking.getDocumentByToken", Access::Public),
	("documentTracking.getRecentViews", Access::Admin),
	("signatures.create", Access::Admin),
	("signatures.sendRequest", Access::Admin),
	("signatures.getByDocument", Access::Admin),
	("signatures.getByToken", Access::Public),
	("signatures.sign", Access::Public),
	("signatures.decline", Access::Public),
	("signatures.sendReminder", Access::Admin),
	("signatures.getPendingSignatures", Access::Admin),
	("timeEntries.listByDate", Access::Admin),
	("timeEntries.listByPeriod", Access::Admin),
	("timeEntries.create", Access::Admin),
	("timeEntries.update", Access::Admin),
	("timeEntries.delete", Access::Admin),
	("timeEntries.startTimer", Access::Admin),
	("timeEntries.stopTimer", Access::Admin),
	("timeEntries.statsByClient", Access::Admin),
	("timeInvoice.generate", Access::Admin),
	("timeInvoice.preview", Access::Admin),
	("reminders.getAll", Access::Admin),
	("reminders.getCounts", Access::Admin),
	("reviews.create", Access::Member),
	("reviews.list", Access::Admin),
	("reviews.getById", Access::Admin),
	("reviews.update", Access::Admin),
	("reviews.delete", Access::Admin),
	("reviews.respond", Access::Admin),
	("reviews.getAverageRating", Access::Admin),
	("reviews.getClientReviewsWithProjects", Access::Admin),
	("blog.listAll", Access::Admin),
	("blog.listPublished", Access::Public),
	("blog.getById", Access::Admin),
	("blog.getBySlug", Access::Public),
	("blog.create", Access::Admin),
	("blog.update", Access::Admin),
	("blog.delete", Access::Admin),
	("blog.search", Access::Public),
	("blog.getTags", Access::Public),
	("audiences.list", Access::Admin),
	("audiences.getById", Access::Admin),
	("audiences.create", Access::Admin),
	("audiences.update", Access::Admin),
	("audiences.delete", Access::Admin),
	("audiences.getStats", Access::Admin),
	("audiences.assignToLeads", Access::Admin),
	("audiences.changePhaseForLeads", Access::Admin),
	("notes.list", Access::Admin),
	("notes.listByClient", Access::Admin),
	("notes.listByProject", Access::Admin),
	("notes.create", Access::Admin),
	("notes.update", Access::Admin),
	("notes.delete", Access::Admin),
	("notes.togglePin", Access::Admin),
	("projectNotes.list", Access::Admin),
	("projectNotes.create", Access::Admin),
	("projectNotes.update", Access::Admin),
	("projectNotes.delete", Access::Admin),
	("projectVariables.list", Access::Admin),
	("projectVariables.create", Access::Admin),
	("projectVariables.update", Access::Admin),
	("projectVariables.delete", Access::Admin),
	("documentTemplates.getDefault", Access::Admin),
	("documentTemplates.list", Access::Admin),
	("documentTemplates.get", Access::Admin),
	("documentTemplates.create", Access::Admin),
	("documentTemplates.update", Access::Admin),
	("documentTemplates.delete", Access::Admin),
	("calendar.list", Access::Admin),
	("calendar.getByDateRange", Access::Admin),
	("calendar.getByClient", Access::Admin),
	("calendar.getByProject", Access::Admin),
	("calendar.getById", Access::Admin),
	("calendar.create", Access::Admin),
	("calendar.update", Access::Admin),
	("calendar.delete", Access::Admin),
	("calendar.getUpcomingDeadlines", Access::Admin),
	("messages.listForAdmin", Access::Admin),
	("messages.listForClient", Access::Admin),
	("messages.getConversation", Access::Admin),
	("messages.sendFromAdmin", Access::Admin),
	("messages.sendFromClient", Access::Client),
	("messages.markAsRead", Access::Member),
	("messages.markConversationAsRead", Access::Admin),
	("messages.countUnread", Access::Admin),
	("notifications.list", Access::Admin),
	("notifications.unreadCount", Access::Admin),
	("notifications.markAsRead", Access::Admin),
	("notifications.markAllAsRead", Access::Admin),
	("notifications.delete", Access::Admin),
	("smtp.checkStatus", Access::Admin),
	("smtp.testConfiguration", Access::Admin),
	("export.clients", Access::Admin),
	("export.leads", Access::Admin),
	("export.documents", Access::Admin),
	("export.invoicesDetailed", Access::Admin),
	("export.csv", Access::Admin),
	("admin.exportDatabase", Access::Admin),
	("clientAuth.createClientUser", Access::Admin),
	("clientAuth.authenticate", Access::Public),
	("clientAuth.generateInvitationToken", Access::Admin),
	("clientAuth.acceptInvitation", Access::Public),
	("clientPortal.me", Access::Client),
	("clientPortal.documents", Access::Client),
	("clientPortal.projects", Access::Client),
	("clientPortal.requests", Access::Client),
	("clientPortal.createRequest", Access::Client),
	("clientPortal.messages", Access::Client),
	("clientPortal.sendMessage", Access::Client),
];

pub fn access(path: &str) -> Option<Access> {
	PROCEDURES.iter().find(|(name, _)| *name == path).map(|(_, access)| *access)
}

/// Resolves, authorizes and runs one procedure.
pub async fn call(
	service: &CoachService,
	caller: Caller,
	path: &str,
	input: Value,
) -> Result<Value, ApiError> {
	let Some(access) = access(path) else {
		return Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"NOT_FOUND",
			format!("No procedure on path \"{path}\"."),
		));
	};

	authorize(path, access, caller)?;

	execute(service, caller, path, input).await
}

pub fn authorize(path: &str, access: Access, caller: Caller) -> Result<(), ApiError> {
	match (access, caller) {
		(Access::Public, _)
		| (Access::Admin, Caller::Admin)
		| (Access::Client, Caller::Client(_))
		| (Access::Member, Caller::Admin | Caller::Client(_)) => Ok(()),
		(Access::Admin, _) if path == "admin.exportDatabase" =>
			Err(ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", ADMIN_ONLY)),
		(_, Caller::Anonymous) =>
			Err(ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required.")),
		(Access::Client, Caller::Admin) => Err(ApiError::new(
			StatusCode::FORBIDDEN,
			"FORBIDDEN",
			"This procedure requires a portal session.",
		)),
		_ => Err(ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Admin access required.")),
	}
}

async fn execute(
	svc: &CoachService,
	caller: Caller,
	path: &str,
	input: Value,
) -> Result<Value, ApiError> {
	match path {
		"clients.list" => reply(svc.clients_list().await),
		"clients.getById" => reply(svc.clients_get(parse(input)?).await),
		"clients.search" => reply(svc.clients_search(parse(input)?).await),
		"clients.create" => reply(svc.clients_create(parse(input)?).await),
		"clients.update" => reply(svc.clients_update(parse(input)?).await),
		"clients.delete" => reply(svc.clients_delete(parse(input)?).await),

		"projects.list" => reply(svc.projects_list().await),
		"projects.listByClient" => reply(svc.projects_list_by_client(parse(input)?).await),
		"projects.getById" => reply(svc.projects_get(parse(input)?).await),
		"projects.create" => reply(svc.projects_create(parse(input)?).await),
		"projects.update" => reply(svc.projects_update(parse(input)?).await),
		"projects.delete" => reply(svc.projects_delete(parse(input)?).await),

		"tasks.list" => reply(svc.tasks_list().await),
		"tasks.listByProject" => reply(svc.tasks_list_by_project(parse(input)?).await),
		"tasks.create" => reply(svc.tasks_create(parse(input)?).await),
		"tasks.update" => reply(svc.tasks_update(parse(input)?).await),
		"tasks.delete" => reply(svc.tasks_delete(parse(input)?).await),

		"documents.list" => reply(svc.documents_list().await),
		"documents.listByClient" => reply(svc.documents_list_by_client(parse(input)?).await),
		"documents.getById" => reply(svc.documents_get(parse(input)?).await),
		"documents.create" => reply(svc.documents_create(parse(input)?).await),
		"documents.update" => reply(svc.documents_update(parse(input)?).await),
		"documents.updateStatus" => reply(svc.documents_update_status(parse(input)?).await),
		"documents.delete" => reply(svc.documents_delete(parse(input)?).await),

		"company.get" => reply(svc.company_get().await),
		"company.upsert" => reply(svc.company_upsert(parse(input)?).await),

		"dashboard.stats" => reply(svc.dashboard_stats().await),

		"clientRequests.list" => reply(svc.client_requests_list().await),
		"clientRequests.listByClient" =>
			reply(svc.client_requests_list_by_client(parse(input)?).await),
		"clientRequests.create" => {
			let session = active_session(svc, caller).await?;

			reply(svc.client_requests_create(session.client_id, parse(input)?).await)
		},
		"clientRequests.updateStatus" =>
			reply(svc.client_requests_update_status(parse(input)?).await),
		"clientRequests.delete" => reply(svc.client_requests_delete(parse(input)?).await),

		"leads.list" => reply(svc.leads_list().await),
		"leads.listByStatus" => reply(svc.leads_list_by_status(parse(input)?).await),
		"leads.getById" => reply(svc.leads_get(parse(input)?).await),
		"leads.create" => reply(svc.leads_create(parse(input)?).await),
		"leads.update" => reply(svc.leads_update(parse(input)?).await),
		"leads.updateStatus" => reply(svc.leads_update_status(parse(input)?).await),
		"leads.convertToClient" => reply(svc.leads_convert_to_client(parse(input)?).await),
		"leads.delete" => reply(svc.leads_delete(parse(input)?).await),
		"leads.sendEmail" => reply(svc.leads_send_email(parse(input)?).await),
		"leads.getEmailHistory" => reply(svc.leads_email_history(parse(input)?).await),
		"leads.getStats" => reply(svc.leads_stats().await),

		"emailTemplates.list" => reply(svc.email_templates_list().await),
		"emailTemplates.getById" => reply(svc.email_templates_get(parse(input)?).await),
		"emailTemplates.create" => reply(svc.email_templates_create(parse(input)?).await),
		"emailTemplates.update" => reply(svc.email_templates_update(parse(input)?).await),
		"emailTemplates.delete" => reply(svc.email_templates_delete(parse(input)?).await),

		"campaigns.list" => reply(svc.campaigns_list().await),
		"campaigns.getById" => reply(svc.campaigns_get(parse(input)?).await),
		"campaigns.create" => reply(svc.campaigns_create(parse(input)?).await),
		"campaigns.start" => reply(svc.campaigns_start(parse(input)?).await),
		"campaigns.pause" => reply(svc.campaigns_pause(parse(input)?).await),
		"campaigns.delete" => reply(svc.campaigns_delete(parse(input)?).await),
		"campaigns.retryFailed" => reply(svc.campaigns_retry_failed(parse(input)?).await),

		"emailTracking.createTracking" => reply(svc.email_tracking_create(parse(input)?).await),
		"emailTracking.trackOpen" => reply(svc.email_tracking_track_open(parse(input)?).await),
		"emailTracking.trackClick" => reply(svc.email_tracking_track_click(parse(input)?).await),
		"emailTracking.getCampaignStats" =>
			reply(svc.email_tracking_campaign_stats(parse(input)?).await),
		"emailTracking.addToBlacklist" =>
			reply(svc.email_tracking_add_to_blacklist(parse(input)?).await),
		"emailTracking.removeFromBlacklist" =>
			reply(svc.email_tracking_remove_from_blacklist(parse(input)?).await),
		"emailTracking.listBlacklist" => reply(svc.email_tracking_list_blacklist().await),
		"emailTracking.isBlacklisted" =>
			reply(svc.email_tracking_is_blacklisted(parse(input)?).await),
		"emailTracking.unsubscribe" => reply(svc.email_tracking_unsubscribe(parse(input)?).await),

		"documentTracking.createTracking" =>
			reply(svc.document_tracking_create(parse(input)?).await),
		"documentTracking.getByDocument" =>
			reply(svc.document_tracking_get_by_document(parse(input)?).await),
		"documentTracking.getViews" => reply(svc.document_tracking_get_views(parse(input)?).await),
		"documentTracking.recordView" =>
			reply(svc.document_tracking_record_view(parse(input)?).await),
		"documentTracking.getDocumentByToken" =>
			reply(svc.document_tracking_get_document_by_token(parse(input)?).await),
		"documentTracking.getRecentViews" => reply(svc.document_tracking_recent_views().await),

		"signatures.create" => reply(svc.signatures_create(parse(input)?).await),
		"signatures.sendRequest" => reply(svc.signatures_send_request(parse(input)?).await),
		"signatures.getByDocument" => reply(svc.signatures_get_by_document(parse(input)?).await),
		"signatures.getByToken" => reply(svc.signatures_get_by_token(parse(input)?).await),
		"signatures.sign" => reply(svc.signatures_sign(parse(input)?).await),
		"signatures.decline" => reply(svc.signatures_decline(parse(input)?).await),
		"signatures.sendReminder" => reply(svc.signatures_send_reminder(parse(input)?).await),
		"signatures.getPendingSignatures" => reply(svc.signatures_pending().await),

		"timeEntries.listByDate" => reply(svc.time_entries_list_by_date(parse(input)?).await),
		"timeEntries.listByPeriod" => reply(svc.time_entries_list_by_period(parse(input)?).await),
		"timeEntries.create" => reply(svc.time_entries_create(parse(input)?).await),
		"timeEntries.update" => reply(svc.time_entries_update(parse(input)?).await),
		"timeEntries.delete" => reply(svc.time_entries_delete(parse(input)?).await),
		"timeEntries.startTimer" => reply(svc.time_entries_start_timer(parse(input)?).await),
		"timeEntries.stopTimer" => reply(svc.time_entries_stop_timer(parse(input)?).await),
		"timeEntries.statsByClient" =>
			reply(svc.time_entries_stats_by_client(parse(input)?).await),

		"timeInvoice.generate" => reply(svc.time_invoice_generate(parse(input)?).await),
		"timeInvoice.preview" => reply(svc.time_invoice_preview(parse(input)?).await),

		"reminders.getAll" => reply(svc.reminders_get_all().await),
		"reminders.getCounts" => reply(svc.reminders_get_counts().await),

		"reviews.create" => {
			let input = match caller {
				Caller::Client(_) => {
					let session = active_session(svc, caller).await?;

					with_client_id(input, session.client_id)
				},
				_ => input,
			};

			reply(svc.reviews_create(parse(input)?).await)
		},
		"reviews.list" => reply(svc.reviews_list(parse(input)?).await),
		"reviews.getById" => reply(svc.reviews_get(parse(input)?).await),
		"reviews.update" => reply(svc.reviews_update(parse(input)?).await),
		"reviews.delete" => reply(svc.reviews_delete(parse(input)?).await),
		"reviews.respond" => reply(svc.reviews_respond(parse(input)?).await),
		"reviews.getAverageRating" => reply(svc.reviews_average_rating(parse(input)?).await),
		"reviews.getClientReviewsWithProjects" =>
			reply(svc.reviews_with_projects(parse(input)?).await),

		"blog.listAll" => reply(svc.blog_list_all().await),
		"blog.listPublished" => reply(svc.blog_list_published().await),
		"blog.getById" => reply(svc.blog_get(parse(input)?).await),
		"blog.getBySlug" => reply(svc.blog_get_by_slug(parse(input)?).await),
		"blog.create" => reply(svc.blog_create(parse(input)?).await),
		"blog.update" => reply(svc.blog_update(parse(input)?).await),
		"blog.delete" => reply(svc.blog_delete(parse(input)?).await),
		"blog.search" => reply(svc.blog_search(parse(input)?).await),
		"blog.getTags" => reply(svc.blog_tags().await),

		"audiences.list" => reply(svc.audiences_list().await),
		"audiences.getById" => reply(svc.audiences_get(parse(input)?).await),
		"audiences.create" => reply(svc.audiences_create(parse(input)?).await),
		"audiences.update" => reply(svc.audiences_update(parse(input)?).await),
		"audiences.delete" => reply(svc.audiences_delete(parse(input)?).await),
		"audiences.getStats" => reply(svc.audiences_stats().await),
		"audiences.assignToLeads" => reply(svc.audiences_assign_to_leads(parse(input)?).await),
		"audiences.changePhaseForLeads" =>
			reply(svc.audiences_change_phase_for_leads(parse(input)?).await),

		"notes.list" => reply(svc.notes_list().await),
		"notes.listByClient" => reply(svc.notes_list_by_client(parse(input)?).await),
		"notes.listByProject" => reply(svc.notes_list_by_project(parse(input)?).await),
		"notes.create" => reply(svc.notes_create(parse(input)?).await),
		"notes.update" => reply(svc.notes_update(parse(input)?).await),
		"notes.delete" => reply(svc.notes_delete(parse(input)?).await),
		"notes.togglePin" => reply(svc.notes_toggle_pin(parse(input)?).await),

		"projectNotes.list" => reply(svc.project_notes_list(parse(input)?).await),
		"projectNotes.create" => reply(svc.project_notes_create(parse(input)?).await),
		"projectNotes.update" => reply(svc.project_notes_update(parse(input)?).await),
		"projectNotes.delete" => reply(svc.project_notes_delete(parse(input)?).await),

		"projectVariables.list" => reply(svc.project_variables_list(parse(input)?).await),
		"projectVariables.create" => reply(svc.project_variables_create(parse(input)?).await),
		"projectVariables.update" => reply(svc.project_variables_update(parse(input)?).await),
		"projectVariables.delete" => reply(svc.project_variables_delete(parse(input)?).await),

		"documentTemplates.getDefault" =>
			reply(svc.document_templates_get_default(parse(input)?).await),
		"documentTemplates.list" => reply(svc.document_templates_list(parse(input)?).await),
		"documentTemplates.get" => reply(svc.document_templates_get(parse(input)?).await),
		"documentTemplates.create" => reply(svc.document_templates_create(parse(input)?).await),
		"documentTemplates.update" => reply(svc.document_templates_update(parse(input)?).await),
		"documentTemplates.delete" => reply(svc.document_templates_delete(parse(input)?).await),

		"calendar.list" => reply(svc.calendar_list().await),
		"calendar.getByDateRange" => reply(svc.calendar_get_by_date_range(parse(input)?).await),
		"calendar.getByClient" => reply(svc.calendar_get_by_client(parse(input)?).await),
		"calendar.getByProject" => reply(svc.calendar_get_by_project(parse(input)?).await),
		"calendar.getById" => reply(svc.calendar_get(parse(input)?).await),
		"calendar.create" => reply(svc.calendar_create(parse(input)?).await),
		"calendar.update" => reply(svc.calendar_update(parse(input)?).await),
		"calendar.delete" => reply(svc.calendar_delete(parse(input)?).await),
		"calendar.getUpcomingDeadlines" => reply(svc.calendar_upcoming_deadlines().await),

		"messages.listForAdmin" => reply(svc.messages_list_for_admin().await),
		"messages.listForClient" => reply(svc.messages_list_for_client(parse(input)?).await),
		"messages.getConversation" => reply(svc.messages_conversation(parse(input)?).await),
		"messages.sendFromAdmin" => reply(svc.messages_send_from_admin(parse(input)?).await),
		"messages.sendFromClient" => {
			let session = active_session(svc, caller).await?;

			reply(
				svc.messages_send_from_client(
					session.client_user_id,
					session.client_id,
					parse(input)?,
				)
				.await,
			)
		},
		"messages.markAsRead" => match caller {
			Caller::Client(_) => {
				let session = active_session(svc, caller).await?;

				reply(
					svc.messages_mark_received_as_read(session.client_user_id, parse(input)?).await,
				)
			},
			_ => reply(svc.messages_mark_as_read(parse(input)?).await),
		},
		"messages.markConversationAsRead" =>
			reply(svc.messages_mark_conversation_as_read(parse(input)?).await),
		"messages.countUnread" => reply(svc.messages_count_unread(parse(input)?).await),

		"notifications.list" => reply(svc.notifications_list().await),
		"notifications.unreadCount" => reply(svc.notifications_unread_count().await),
		"notifications.markAsRead" => reply(svc.notifications_mark_as_read(parse(input)?).await),
		"notifications.markAllAsRead" => reply(svc.notifications_mark_all_as_read().await),
		"notifications.delete" => reply(svc.notifications_delete(parse(input)?).await),

		"smtp.checkStatus" => reply(svc.smtp_check_status().await),
		"smtp.testConfiguration" => reply(svc.smtp_test_configuration(parse(input)?).await),

		"export.clients" => reply(svc.export_clients().await),
		"export.leads" => reply(svc.export_leads().await),
		"export.documents" => reply(svc.export_documents().await),
		"export.invoicesDetailed" => reply(svc.export_invoices_detailed().await),
		"export.csv" => reply(svc.export_csv(parse(input)?).await),

		"admin.exportDatabase" => reply(svc.admin_export_database().await),

		"clientAuth.createClientUser" =>
			reply(svc.client_auth_create_client_user(parse(input)?).await),
		"clientAuth.authenticate" => reply(svc.client_auth_authenticate(parse(input)?).await),
		"clientAuth.generateInvitationToken" =>
			reply(svc.client_auth_generate_invitation_token(parse(input)?).await),
		"clientAuth.acceptInvitation" =>
			reply(svc.client_auth_accept_invitation(parse(input)?).await),

		"clientPortal.me" => reply(svc.client_portal_me(&portal_session(caller)?).await),
		"clientPortal.documents" =>
			reply(svc.client_portal_documents(&portal_session(caller)?).await),
		"clientPortal.projects" => reply(svc.client_portal_projects(&portal_session(caller)?).await),
		"clientPortal.requests" => reply(svc.client_portal_requests(&portal_session(caller)?).await),
		"clientPortal.createRequest" => {
			let session = portal_session(caller)?;

			reply(svc.client_portal_create_request(&session, parse(input)?).await)
		},
		"clientPortal.messages" => reply(svc.client_portal_messages(&portal_session(caller)?).await),
		"clientPortal.sendMessage" => {
			let session = portal_session(caller)?;

			reply(svc.client_portal_send_message(&session, parse(input)?).await)
		},

		_ => Err(ApiError::new(
			StatusCode::NOT_FOUND,
			"NOT_FOUND",
			format!("No procedure on path \"{path}\"."),
		)),
	}
}

/// Absent input reads as an empty object so procedures whose fields are all optional accept it.
fn parse<T>(input: Value) -> Result<T, ApiError>
where
	T: DeserializeOwned,
{
	let input = if input.is_null() { Value::Object(Map::new()) } else { input };

	serde_json::from_value(input).map_err(|err| {
		let message = err.to_string();
		let error =
			ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", format!("Invalid input: {message}."));

		match offending_field(&message) {
			Some(field) => error.with_fields(vec![field]),
			None => error,
		}
	})
}

/// The field named by serde's `missing field` and `unknown field` messages.
fn offending_field(message: &str) -> Option<String> {
	let rest = message
		.strip_prefix("missing field `")
		.or_else(|| message.strip_prefix("unknown field `"))?;
	let (field, _) = rest.split_once('`')?;

	Some(field.to_string())
}

fn reply<T>(result: coach_service::Result<T>) -> Result<Value, ApiError>
where
	T: Serialize,
{
	let data = result?;

	serde_json::to_value(data).map_err(|err| {
		tracing::error!(error = %err, "Failed to serialize procedure output.");

		ApiError::internal()
	})
}

fn portal_session(caller: Caller) -> Result<SessionClaims, ApiError> {
	match caller {
		Caller::Client(session) => Ok(session),
		_ => Err(ApiError::new(
			StatusCode::FORBIDDEN,
			"FORBIDDEN",
			"This procedure requires a portal session.",
		)),
	}
}

/// The session of a portal caller whose account is still active.
async fn active_session(svc: &CoachService, caller: Caller) -> Result<SessionClaims, ApiError> {
	let session = portal_session(caller)?;

	svc.client_portal_active_user(&session).await?;

	Ok(session)
}

/// Portal clients can only act for themselves.
fn with_client_id(input: Value, client_id: i64) -> Value {
	let mut object = match input {
		Value::Object(object) => object,
		_ => Map::new(),
	};

	object.insert("clientId".to_string(), Value::from(client_id));

	Value::Object(object)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn procedure_paths_are_unique() {
		let mut paths = PROCEDURES.iter().map(|(path, _)| *path).collect::<Vec<_>>();

		paths.sort_unstable();
		paths.dedup();

		assert_eq!(paths.len(), PROCEDURES.len());
	}

	#[test]
	fn public_procedures_are_limited_to_token_flows() {
		let public = PROCEDURES
			.iter()
			.filter(|(_, access)| *access == Access::Public)
			.map(|(path, _)| *path)
			.collect::<Vec<_>>();

		assert!(public.contains(&"signatures.sign"));
		assert!(public.contains(&"clientAuth.authenticate"));
		assert!(!public.iter().any(|path| path.starts_with("clients.")));
		assert!(!public.iter().any(|path| path.starts_with("admin.")));
	}

	#[test]
	fn database_export_refuses_non_admins_in_french() {
		let claims = SessionClaims { client_user_id: 1, client_id: 1, expires_at: 0 };

		for caller in [Caller::Anonymous, Caller::Client(claims)] {
			let err = authorize("admin.exportDatabase", Access::Admin, caller)
				.expect_err("Non-admins must be refused.");

			assert_eq!(err.status(), StatusCode::FORBIDDEN);
			assert_eq!(err.message(), ADMIN_ONLY);
		}

		assert!(authorize("admin.exportDatabase", Access::Admin, Caller::Admin).is_ok());
	}

	#[test]
	fn anonymous_callers_are_unauthorized_and_clients_forbidden() {
		let claims = SessionClaims { client_user_id: 1, client_id: 1, expires_at: 0 };
		let anonymous = authorize("clients.list", Access::Admin, Caller::Anonymous)
			.expect_err("Anonymous callers must be refused.");
		let client = authorize("clients.list", Access::Admin, Caller::Client(claims))
			.expect_err("Portal clients must be refused.");

		assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(client.status(), StatusCode::FORBIDDEN);
		assert!(authorize("clientPortal.me", Access::Client, Caller::Client(claims)).is_ok());
		assert!(authorize("reviews.create", Access::Member, Caller::Client(claims)).is_ok());
	}

	#[test]
	fn portal_reviews_are_pinned_to_the_session_client() {
		assert_eq!(
			with_client_id(json!({ "clientId": 99, "rating": 5 }), 3),
			json!({ "clientId": 3, "rating": 5 })
		);
		assert_eq!(with_client_id(Value::Null, 3), json!({ "clientId": 3 }));
	}

	#[test]
	fn missing_input_reads_as_empty_object() {
		let parsed: Map<String, Value> = parse(Value::Null).expect("Null input must parse.");

		assert!(parsed.is_empty());
		assert!(parse::<coach_service::IdRequest>(json!({ "id": "x" })).is_err());
	}

	#[test]
	fn missing_fields_are_reported() {
		let err = parse::<coach_service::IdRequest>(json!({})).expect_err("Id is required.");

		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
		assert_eq!(err.fields(), Some(&["id".to_string()][..]));
	}
}
