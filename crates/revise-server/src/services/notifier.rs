//! Daily selection email via EmailJS

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use reqwest::Client as ReqwestClient;
use revise_core::SelectedProblem;
use serde::Serialize;
use tracing::info;

const SUBJECT: &str = "Your Random Questions";

pub struct EmailNotifier {
    http: ReqwestClient,
    endpoint: String,
    service_id: String,
    template_id: String,
    user_id: String,
    private_key: String,
    to_email: String,
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    subject: &'a str,
    first_question_id: i64,
    first_question_url: &'a str,
    second_question_id: i64,
    second_question_url: &'a str,
}

impl EmailNotifier {
    /// Build from configuration; `None` unless every EmailJS setting is present
    pub fn from_config(config: &ServerConfig) -> Option<Self> {
        Some(Self {
            http: ReqwestClient::new(),
            endpoint: config.emailjs_endpoint.clone(),
            service_id: config.emailjs_service_id.clone()?,
            template_id: config.emailjs_template_id.clone()?,
            user_id: config.emailjs_user_id.clone()?,
            private_key: config.emailjs_private_key.clone()?,
            to_email: config.notify_email.clone()?,
        })
    }

    fn payload<'a>(
        &'a self,
        first: &'a SelectedProblem,
        second: &'a SelectedProblem,
    ) -> EmailPayload<'a> {
        EmailPayload {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.user_id,
            template_params: TemplateParams {
                to_email: &self.to_email,
                subject: SUBJECT,
                first_question_id: first.id,
                first_question_url: &first.url,
                second_question_id: second.id,
                second_question_url: &second.url,
            },
        }
    }

    pub async fn send(&self, first: &SelectedProblem, second: &SelectedProblem) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.private_key)
            .json(&self.payload(first, second))
            .send()
            .await
            .context("Failed to send email request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to send email: {} {}", status, body);
        }

        info!("Email sent for problems {} and {}", first.id, second.id);
        Ok(())
    }
}
