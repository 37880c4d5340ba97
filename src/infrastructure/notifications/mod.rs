//! Outbound notifications.
//!
//! There is no mail transport; passcodes are written to the log so they can
//! be picked up in development.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{OtpDelivery, OtpPurpose};
use crate::shared::error::AppError;

/// Delivers passcodes to the application log.
#[derive(Debug, Clone, Default)]
pub struct LogOtpDelivery {
    /// Include the code itself in the log line (never in production)
    reveal_codes: bool,
}

impl LogOtpDelivery {
    pub fn new(reveal_codes: bool) -> Self {
        Self { reveal_codes }
    }
}

#[async_trait]
impl OtpDelivery for LogOtpDelivery {
    async fn deliver(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), AppError> {
        if self.reveal_codes {
            info!(email = %email, purpose = purpose.as_str(), code = %code, "OTP issued");
        } else {
            info!(email = %email, purpose = purpose.as_str(), "OTP issued");
        }
        Ok(())
    }
}
