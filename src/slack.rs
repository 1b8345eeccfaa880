use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct SlackPayload {
    pub text: String,
}

pub fn build_slack_payload(report: &str) -> SlackPayload {
    SlackPayload { text: report.to_string() }
}

/// Deliver the finished report to a Slack incoming webhook.
pub async fn send_to_slack(client: &reqwest::Client, webhook_url: &str, report: &str) -> Result<()> {
    let payload = build_slack_payload(report);
    let res = client
        .post(webhook_url)
        .json(&payload)
        .send()
        .await
        .context("Failed to send Slack request")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Slack webhook failed: {} - {}", status, body);
        return Err(anyhow!("Slack webhook returned non-success status"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_slack_payload() {
        let payload = build_slack_payload("title\nmessage");
        assert_eq!(payload.text, "title\nmessage");
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"text":"title\nmessage"}"#
        );
    }

    #[tokio::test]
    async fn test_send_to_slack_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_body(r#"{"text":"report"}"#)
            .with_status(200)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/webhook", server.url());
        send_to_slack(&client, &url, "report").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_to_slack_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/webhook")
            .with_status(500)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/webhook", server.url());
        let result = send_to_slack(&client, &url, "report").await;
        assert!(result.is_err());
    }
}
