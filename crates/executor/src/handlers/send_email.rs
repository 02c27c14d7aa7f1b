//! Sending a compiled email message.

use domain::EmailMessage;

use crate::context::TaskContext;
use crate::error::Result;

pub async fn handle(context: &TaskContext, message: &EmailMessage) -> Result<()> {
    context.notifications.send_email(message).await?;
    tracing::info!(to = %message.to, "notification mail sent");
    Ok(())
}
