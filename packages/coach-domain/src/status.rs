//! Enumerated record fields.
//!
//! Rows keep these as text; every enum round-trips through `as_str`/`parse` and serializes to
//! the same snake_case label.

macro_rules! text_enum {
	($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
		pub enum $name {
			$(
				#[serde(rename = $text)]
				$variant,
			)+
		}
		impl $name {
			pub const ALL: &'static [Self] = &[$(Self::$variant),+];

			pub fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $text,)+
				}
			}

			pub fn parse(raw: &str) -> Option<Self> {
				match raw {
					$($text => Some(Self::$variant),)+
					_ => None,
				}
			}
		}
		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(self.as_str())
			}
		}
	};
}

text_enum!(ClientCategory {
	Prospect => "prospect",
	Active => "active",
	Vip => "vip",
	Inactive => "inactive",
});

text_enum!(ActiveStatus {
	Active => "active",
	Inactive => "inactive",
});

text_enum!(ProjectType {
	Website => "website",
	App => "app",
	Coaching => "coaching",
	IaIntegration => "ia_integration",
	Optimization => "optimization",
	Other => "other",
});

text_enum!(ProjectStatus {
	Draft => "draft",
	Active => "active",
	OnHold => "on_hold",
	Completed => "completed",
	Cancelled => "cancelled",
});

text_enum!(
	/// Priority scale shared by projects, tasks and time entries.
	Priority {
		Low => "low",
		Normal => "normal",
		High => "high",
		Urgent => "urgent",
	}
);

text_enum!(TaskStatus {
	Todo => "todo",
	InProgress => "in_progress",
	Review => "review",
	Done => "done",
	Cancelled => "cancelled",
});

text_enum!(DayPeriod {
	AllDay => "all_day",
	Morning => "morning",
	Afternoon => "afternoon",
	Evening => "evening",
});

text_enum!(DocumentType {
	Quote => "quote",
	Invoice => "invoice",
	CreditNote => "credit_note",
});

text_enum!(
	/// Document kinds a layout template can target.
	TemplateDocumentType {
		Quote => "quote",
		Invoice => "invoice",
	}
);

text_enum!(DocumentStatus {
	Draft => "draft",
	Sent => "sent",
	Accepted => "accepted",
	Rejected => "rejected",
	Paid => "paid",
	Cancelled => "cancelled",
});

text_enum!(PaymentMethod {
	BankTransfer => "bank_transfer",
	Check => "check",
	Card => "card",
	Cash => "cash",
	Other => "other",
});

text_enum!(TimeEntryStatus {
	Planned => "planned",
	InProgress => "in_progress",
	Completed => "completed",
	Archived => "archived",
});

text_enum!(
	/// SPANCO pipeline stage.
	LeadStatus {
		Suspect => "suspect",
		Prospect => "prospect",
		Analyse => "analyse",
		Negociation => "negociation",
		Conclusion => "conclusion",
		Ordre => "ordre",
	}
);

text_enum!(TemplateCategory {
	Voeux => "voeux",
	Presentation => "presentation",
	Relance => "relance",
	RendezVous => "rendez_vous",
	Suivi => "suivi",
	Remerciement => "remerciement",
	Autre => "autre",
});

text_enum!(CampaignStatus {
	Draft => "draft",
	Sending => "sending",
	Completed => "completed",
	Paused => "paused",
});

text_enum!(QueueStatus {
	Pending => "pending",
	Sending => "sending",
	Sent => "sent",
	Failed => "failed",
});

text_enum!(LeadEmailStatus {
	Sent => "sent",
	Failed => "failed",
	Opened => "opened",
	Replied => "replied",
});

text_enum!(RequestPriority {
	Low => "low",
	Medium => "medium",
	High => "high",
	Urgent => "urgent",
});

text_enum!(RequestStatus {
	Pending => "pending",
	InReview => "in_review",
	Accepted => "accepted",
	InProgress => "in_progress",
	Completed => "completed",
	Rejected => "rejected",
});

text_enum!(NoteColor {
	Yellow => "yellow",
	Blue => "blue",
	Green => "green",
	Red => "red",
	Purple => "purple",
	Orange => "orange",
});

text_enum!(EventType {
	Meeting => "meeting",
	Call => "call",
	Deadline => "deadline",
	Reminder => "reminder",
	Event => "event",
	Other => "other",
});

text_enum!(UserType {
	Admin => "admin",
	Client => "client",
});

text_enum!(NotificationType {
	Info => "info",
	Success => "success",
	Warning => "warning",
	Error => "error",
});

text_enum!(SignerRole {
	Client => "client",
	Coach => "coach",
});

text_enum!(SignatureStatus {
	Pending => "pending",
	Signed => "signed",
	Declined => "declined",
});

text_enum!(BlogStatus {
	Draft => "draft",
	Published => "published",
	Archived => "archived",
});

impl LeadStatus {
	/// Leads in these stages are won and never show up as overdue.
	pub fn is_closed(self) -> bool {
		matches!(self, Self::Conclusion | Self::Ordre)
	}
}

impl TaskStatus {
	pub fn is_open(self) -> bool {
		!matches!(self, Self::Done | Self::Cancelled)
	}
}

impl DayPeriod {
	/// Sort rank inside a day: morning, afternoon, evening, then whole-day entries.
	pub fn rank(self) -> u8 {
		match self {
			Self::Morning => 0,
			Self::Afternoon => 1,
			Self::Evening => 2,
			Self::AllDay => 3,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Morning => "Matinée",
			Self::Afternoon => "Après-midi",
			Self::Evening => "Soirée",
			Self::AllDay => "Journée",
		}
	}
}

impl DocumentType {
	pub fn label(self) -> &'static str {
		match self {
			Self::Quote => "Devis",
			Self::Invoice => "Facture",
			Self::CreditNote => "Avoir",
		}
	}

	pub fn number_prefix(self) -> &'static str {
		match self {
			Self::Quote => "DEV",
			Self::Invoice => "FACT",
			Self::CreditNote => "AV",
		}
	}
}

impl DocumentStatus {
	pub fn label(self) -> &'static str {
		match self {
			Self::Draft => "Brouillon",
			Self::Sent => "Envoyée",
			Self::Accepted => "Acceptée",
			Self::Rejected => "Refusée",
			Self::Paid => "Payée",
			Self::Cancelled => "Annulée",
		}
	}
}
