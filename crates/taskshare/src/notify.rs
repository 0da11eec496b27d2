//! Invitation delivery.
//!
//! The notifier is the outbound edge of a share request. Delivery is best
//! effort: a failed invitation is reported per recipient and never undoes
//! the grant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskshare_core::{PermissionTier, Timestamp};

/// One invitation to one recipient.
///
/// Carries the sender's display name only. Recipients are outside the
/// workspace and never see principal ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub recipient: String,
    pub resource_title: String,
    pub access_url: String,
    pub tier: PermissionTier,
    pub expires_at: Option<Timestamp>,
    pub sender_name: String,
}

impl Invitation {
    pub fn subject(&self) -> String {
        format!("Task Assignment: {}", self.resource_title)
    }

    /// Plain-text body.
    pub fn text_body(&self) -> String {
        format!(
            "You've been assigned a task!\n\n\
             {sender} has shared: {title}\n\n\
             Open it here:\n{url}\n\n\
             With this link you can {rights}.\n\
             {expiry}\n\n\
             If you believe you received this in error, please ignore it.\n",
            sender = self.sender_name,
            title = self.resource_title,
            url = self.access_url,
            rights = self.rights(),
            expiry = self.expiry_line(),
        )
    }

    /// HTML alternative to [`Invitation::text_body`]. Every interpolated
    /// value is escaped.
    pub fn html_body(&self) -> String {
        let url = escape_html(&self.access_url);
        format!(
            "<html>\n<body style=\"font-family: Arial, sans-serif; color: #333;\">\n\
             <h2>You've been assigned a task!</h2>\n\
             <p><strong>{sender}</strong> has shared:</p>\n\
             <h3>{title}</h3>\n\
             <p><a href=\"{url}\">Open task</a></p>\n\
             <p>Or copy this link into your browser:<br><code>{url}</code></p>\n\
             <p>With this link you can {rights}.</p>\n\
             <p>{expiry}</p>\n\
             <p style=\"color: #666; font-size: 12px;\">If you believe you received this in error, please ignore it.</p>\n\
             </body>\n</html>\n",
            sender = escape_html(&self.sender_name),
            title = escape_html(&self.resource_title),
            url = url,
            rights = self.rights(),
            expiry = escape_html(&self.expiry_line()),
        )
    }

    fn rights(&self) -> &'static str {
        match self.tier {
            PermissionTier::View => "view the task and its progress",
            PermissionTier::Edit => "view the task and update its status and notes",
            PermissionTier::Admin => "view and fully edit the task",
        }
    }

    fn expiry_line(&self) -> String {
        match self.expires_at {
            Some(at) => format!("This link expires on {}.", format_timestamp(at)),
            None => "This link does not expire.".to_string(),
        }
    }
}

/// `2023-12-14 22:13 UTC`. Out-of-range values fall back to raw millis.
pub fn format_timestamp(at: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| at.to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Per-recipient delivery result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

/// Delivers invitations.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one invitation.
    async fn deliver(&self, invitation: &Invitation) -> anyhow::Result<()>;
}

/// Logs invitations instead of sending them.
///
/// For development setups with no mail transport. The access link is
/// not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, invitation: &Invitation) -> anyhow::Result<()> {
        tracing::info!(
            recipient = %invitation.recipient,
            subject = %invitation.subject(),
            tier = %invitation.tier,
            "invitation not sent, no transport configured"
        );
        Ok(())
    }
}

/// A recording notifier for testing.
pub mod memory {
    use super::*;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// Records every invitation it is handed. Addresses registered with
    /// [`MemoryNotifier::fail_for`] are refused.
    #[derive(Default)]
    pub struct MemoryNotifier {
        delivered: Mutex<Vec<Invitation>>,
        failing: Mutex<HashSet<String>>,
    }

    impl MemoryNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// Refuse deliveries to `address` (case-insensitive).
        pub async fn fail_for(&self, address: &str) {
            self.failing.lock().await.insert(address.to_lowercase());
        }

        /// Invitations delivered so far.
        pub async fn delivered(&self) -> Vec<Invitation> {
            self.delivered.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for MemoryNotifier {
        async fn deliver(&self, invitation: &Invitation) -> anyhow::Result<()> {
            if self
                .failing
                .lock()
                .await
                .contains(&invitation.recipient.to_lowercase())
            {
                anyhow::bail!("mailbox unavailable: {}", invitation.recipient);
            }
            self.delivered.lock().await.push(invitation.clone());
            Ok(())
        }
    }
}
