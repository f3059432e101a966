//! Notification delivery seam
//!
//! Transport (mail, chat, flash messages) is an external collaborator; the
//! core only assembles [`Notification`]s. [`NotificationForwarder`] adapts
//! producer-initiated [`NotificationRequest`]s to that collaborator,
//! templating missing fields and loading attachment files.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cip_common::Result;

use crate::producer::{NotificationRequest, NotifySink};

/// A named blob attached to a notification
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A fully assembled notification ready for delivery
#[derive(Debug, Clone)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub attachments: Vec<Attachment>,
}

/// External notification delivery collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Forwards producer notification requests to the notifier
///
/// Handed to producers as their [`NotifySink`] for the lifetime of one run.
pub struct NotificationForwarder {
    notifier: Arc<dyn Notifier>,
    job_name: String,
}

impl NotificationForwarder {
    pub fn new(notifier: Arc<dyn Notifier>, job_name: impl Into<String>) -> Self {
        Self {
            notifier,
            job_name: job_name.into(),
        }
    }
}

#[async_trait]
impl NotifySink for NotificationForwarder {
    async fn notify(&self, request: NotificationRequest) -> Result<()> {
        let subject = request.subject.unwrap_or_else(|| {
            format!(
                "Notification from importer job '{}' at {}",
                self.job_name,
                Utc::now().format("%Y-%m-%d %H:%M:%S")
            )
        });
        let message = request
            .message
            .unwrap_or_else(|| "Job results are attached".to_string());

        let mut attachments = Vec::new();
        if let Some(path) = request.attachment_path {
            let content = tokio::fs::read(&path).await?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            attachments.push(Attachment { filename, content });
        }

        self.notifier
            .notify(Notification {
                subject,
                message,
                attachments,
            })
            .await
    }
}
