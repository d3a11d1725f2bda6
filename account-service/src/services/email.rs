use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        first_name: &str,
    ) -> Result<(), AppError>;

    async fn send_welcome(&self, to_email: &str, first_name: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
    code_ttl_minutes: i64,
}

impl EmailService {
    /// `code_ttl_minutes` is quoted in the verification email body.
    pub fn new(config: &SmtpConfig, code_ttl_minutes: i64) -> Result<Self, AppError> {
        let mut builder = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e.to_string())))?
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));

        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.expose_secret().clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, "Email service initialized with SMTP relay");

        Ok(Self {
            mailer: builder.build(),
            from_email: config.from_address.clone(),
            code_ttl_minutes,
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        // SmtpTransport is synchronous.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

fn verification_bodies(code: &str, first_name: &str, ttl_minutes: i64) -> (String, String) {
    let html_body = format!(
        r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Hello {first_name},</h2>
        <p>Your email verification code is:</p>
        <p style="font-size: 28px; font-weight: bold; letter-spacing: 6px;">{code}</p>
        <p style="color: #666; font-size: 12px;">
            This code expires in {ttl_minutes} minutes. If you didn't create an account, please ignore this email.
        </p>
    </body>
</html>
"###
    );

    let plain_body = format!(
        "Hello {first_name},\n\nYour email verification code is: {code}\n\n\
         This code expires in {ttl_minutes} minutes. If you didn't create an account, please ignore this email."
    );

    (plain_body, html_body)
}

fn welcome_bodies(first_name: &str) -> (String, String) {
    let html_body = format!(
        r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Welcome, {first_name}!</h2>
        <p>Your email has been verified and your account is ready. You can now log in.</p>
    </body>
</html>
"###
    );

    let plain_body = format!(
        "Welcome, {first_name}!\n\nYour email has been verified and your account is ready. You can now log in."
    );

    (plain_body, html_body)
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        first_name: &str,
    ) -> Result<(), AppError> {
        let (plain_body, html_body) = verification_bodies(code, first_name, self.code_ttl_minutes);
        self.send_email(to_email, "Email Verification Code", plain_body, html_body)
            .await
    }

    async fn send_welcome(&self, to_email: &str, first_name: &str) -> Result<(), AppError> {
        let (plain_body, html_body) = welcome_bodies(first_name);
        self.send_email(
            to_email,
            "Welcome! Your Account is Verified",
            plain_body,
            html_body,
        )
        .await
    }
}

/// Used when SMTP is not configured: the code only reaches the log.
#[derive(Clone, Default)]
pub struct LogEmailService;

#[async_trait]
impl EmailProvider for LogEmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        _first_name: &str,
    ) -> Result<(), AppError> {
        tracing::warn!(
            to = %to_email,
            code = %code,
            "=== VERIFICATION CODE FOR {} === (SMTP not configured)",
            to_email
        );
        Ok(())
    }

    async fn send_welcome(&self, to_email: &str, _first_name: &str) -> Result<(), AppError> {
        tracing::info!(to = %to_email, "Welcome email skipped (SMTP not configured)");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmail {
    VerificationCode { to: String, code: String },
    Welcome { to: String },
}

/// Records every send; can be told to fail.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Most recent code sent to `to_email`.
    pub fn last_code_for(&self, to_email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|email| match email {
            SentEmail::VerificationCode { to, code } if to == to_email => Some(code),
            _ => None,
        })
    }

    fn record(&self, email: SentEmail) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("mock delivery failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email);
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_code(
        &self,
        to_email: &str,
        code: &str,
        _first_name: &str,
    ) -> Result<(), AppError> {
        self.record(SentEmail::VerificationCode {
            to: to_email.to_string(),
            code: code.to_string(),
        })
    }

    async fn send_welcome(&self, to_email: &str, _first_name: &str) -> Result<(), AppError> {
        self.record(SentEmail::Welcome {
            to: to_email.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    #[test]
    fn test_email_service_creation() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "mailer@example.com".to_string(),
            password: Secret::new("app-password".to_string()),
            from_address: "mailer@example.com".to_string(),
        };

        assert!(EmailService::new(&config, 15).is_ok());
    }

    #[test]
    fn verification_body_carries_code_and_expiry() {
        let (plain, html) = verification_bodies("482913", "Ada", 30);
        assert!(plain.contains("482913"));
        assert!(plain.contains("expires in 30 minutes"));
        assert!(html.contains("482913"));
        assert!(html.contains("expires in 30 minutes"));
    }

    #[tokio::test]
    async fn mock_records_and_fails_on_demand() {
        let mock = MockEmailService::new();
        mock.send_verification_code("a@x.com", "111111", "A").await.unwrap();
        assert_eq!(mock.last_code_for("a@x.com").as_deref(), Some("111111"));

        mock.set_failing(true);
        assert!(mock.send_welcome("a@x.com", "A").await.is_err());
        assert_eq!(mock.sent().len(), 1);
    }
}
