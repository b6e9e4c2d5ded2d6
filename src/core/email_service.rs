use crate::core::config::SmtpConfig;
use crate::core::AppError;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::str::FromStr;

pub struct EmailService {
    smtp_config: SmtpConfig,
}

impl EmailService {
    pub fn new(smtp_config: SmtpConfig) -> Self {
        Self { smtp_config }
    }

    fn create_smtp_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
        let credentials = Credentials::new(
            self.smtp_config.username.clone(),
            self.smtp_config.password.expose_secret().clone(),
        );

        // Mailtrap and most submission ports (2525, 587) expect STARTTLS
        let builder = if self.smtp_config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_config.host)
        }
        .map_err(|e| AppError::internal_error(format!("Failed to create SMTP transport: {}", e)))?;

        Ok(builder
            .port(self.smtp_config.port)
            .credentials(credentials)
            .build())
    }

    async fn send_html(&self, to_email: &str, subject: &str, body: String) -> Result<(), AppError> {
        let from_mailbox = Mailbox::from_str(&format!(
            "{} <{}>",
            self.smtp_config.from_name, self.smtp_config.from_email
        ))
        .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to_email)
            .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = self.create_smtp_transport()?;

        match mailer.send(email).await {
            Ok(_) => {
                tracing::info!("Email '{}' sent successfully to: {}", subject, to_email);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to send email '{}' to {}: {}", subject, to_email, e);
                Err(AppError::internal_error(format!("Failed to send email: {}", e)))
            }
        }
    }

    pub async fn send_otp_email(&self, to_email: &str, otp: &str) -> Result<(), AppError> {
        self.send_html(
            to_email,
            "Password Reset OTP - Tutor Connect",
            otp_email_body(&self.smtp_config.from_name, otp),
        )
        .await
    }

    pub async fn send_password_reset_confirmation(&self, to_email: &str) -> Result<(), AppError> {
        self.send_html(
            to_email,
            "Password Reset Successful - Tutor Connect",
            confirmation_email_body(&self.smtp_config.from_name),
        )
        .await
    }
}

fn otp_email_body(app_name: &str, otp: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1>Password Reset Request</h1>
    <p>Hello,</p>
    <p>We received a request to reset the password of your {app} account.
       Enter the code below on the reset page to choose a new password:</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{otp}</p>
    <p><small>This code expires in 10 minutes.</small></p>
    <p>Never share this code. If you did not ask for a reset you can ignore this email.</p>
    <p style="font-size: 12px; color: #666;">This is an automated message from {app}. Please do not reply.</p>
</body>
</html>"#,
        app = app_name,
        otp = otp
    )
}

fn confirmation_email_body(app_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1>Password Reset Successful</h1>
    <p>Hello,</p>
    <p>The password of your {app} account was just changed. You can now log in with your new password.</p>
    <p>If you did not make this change, contact our support team immediately.</p>
    <p style="font-size: 12px; color: #666;">This is an automated message from {app}. Please do not reply.</p>
</body>
</html>"#,
        app = app_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_body_contains_the_code_and_expiry() {
        let body = otp_email_body("Tutor Connect", "482913");
        assert!(body.contains("482913"));
        assert!(body.contains("10 minutes"));
        assert!(body.contains("Tutor Connect"));
    }
}
