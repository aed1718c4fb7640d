use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info, instrument};

use rollcall_config::EmailConfig;
use rollcall_core::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, code))]
    pub async fn send_signup_otp(
        &self,
        to_email: &str,
        institution_name: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hello,\n\n\
             Use this code to verify your email and finish signing up for {}:\n\n\
             {}\n\n\
             The code expires in {} minutes. If you did not start a signup, ignore this email.\n\n\
             Rollcall",
            institution_name, code, ttl_minutes
        );
        let html_body = layout(
            "Verify your email",
            &format!(
                r#"<p>Use this code to finish signing up for <strong>{}</strong>:</p>
{}
<p>The code expires in {} minutes. If you did not start a signup, ignore this email.</p>"#,
                institution_name,
                code_block(code),
                ttl_minutes
            ),
        );

        self.send_email(to_email, "Your Rollcall verification code", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self, code))]
    pub async fn send_password_reset_otp(
        &self,
        to_email: &str,
        to_name: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), AppError> {
        let text_body = format!(
            "Hi {},\n\n\
             Use this code to reset your password:\n\n\
             {}\n\n\
             The code expires in {} minutes. If you did not ask for a reset, ignore this email.\n\n\
             Rollcall",
            to_name, code, ttl_minutes
        );
        let html_body = layout(
            "Reset your password",
            &format!(
                r#"<p>Hi <strong>{}</strong>,</p>
<p>Use this code to reset your password:</p>
{}
<p>The code expires in {} minutes. If you did not ask for a reset, ignore this email.</p>"#,
                to_name,
                code_block(code),
                ttl_minutes
            ),
        );

        self.send_email(to_email, "Reset your Rollcall password", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self))]
    pub async fn send_welcome(
        &self,
        to_email: &str,
        to_name: &str,
        institution_name: &str,
    ) -> Result<(), AppError> {
        let login_link = format!("{}/login", self.config.frontend_url);
        let text_body = format!(
            "Hi {},\n\n\
             Your account at {} is ready. Sign in at {}\n\n\
             Rollcall",
            to_name, institution_name, login_link
        );
        let html_body = layout(
            "Welcome to Rollcall",
            &format!(
                r#"<p>Hi <strong>{}</strong>,</p>
<p>Your account at <strong>{}</strong> is ready.</p>
<p><a href="{}" style="display: inline-block; padding: 12px 32px; background-color: #0F766E; color: #ffffff; text-decoration: none; border-radius: 6px;">Sign in</a></p>"#,
                to_name, institution_name, login_link
            ),
        );

        self.send_email(to_email, "Welcome to Rollcall", &text_body, &html_body)
            .await
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            info!(to = %to_email, subject, "SMTP disabled, email not sent");
            debug!(body = %text_body, "Unsent email body");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn code_block(code: &str) -> String {
    format!(
        r#"<p style="margin: 24px 0; font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #0F766E; text-align: center;">{}</p>"#,
        code
    )
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px;">
        <tr>
            <td align="center">
                <table width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px; overflow: hidden;">
                    <tr>
                        <td style="background-color: #0F766E; padding: 24px; text-align: center;">
                            <h1 style="margin: 0; color: #ffffff; font-size: 26px;">Rollcall</h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 32px 30px; color: #444444; font-size: 16px; line-height: 1.5;">
                            <h2 style="margin: 0 0 16px 0; color: #222222;">{title}</h2>
                            {content}
                        </td>
                    </tr>
                    <tr>
                        <td style="background-color: #f8f9fa; padding: 16px 30px; text-align: center; color: #999999; font-size: 12px;">
                            This is an automated email from Rollcall. Please do not reply.
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>"#
    )
}
