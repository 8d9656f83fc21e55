//! # Order Export Module
//!
//! Renders the day's orders as a plain-text table and, for large lists,
//! hands it to the chat platform's file upload endpoint instead of
//! posting it inline.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::order_store::Order;

pub const SLACK_UPLOAD_URL: &str = "https://slack.com/api/files.upload";

const HEADERS: [&str; 3] = ["Name", "Restaurant", "Order"];

/// Render orders as a fixed-width `Name | Restaurant | Order` table
pub fn render_order_table(orders: &[Order]) -> String {
    let rows: Vec<[String; 3]> = orders
        .iter()
        .map(|order| {
            let (restaurant, entree) = order.display_parts();
            [order.user.clone(), restaurant, entree]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 3]| {
        let line = format!(
            "{:<w0$} | {:<w1$} | {}",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1]
        );
        line.trim_end().to_string()
    };

    let mut table = String::new();
    table.push_str(&format_row(HEADERS));
    table.push('\n');
    table.push_str(&format!(
        "{}-+-{}-+-{}\n",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    ));
    for row in &rows {
        table.push_str(&format_row([row[0].as_str(), row[1].as_str(), row[2].as_str()]));
        table.push('\n');
    }
    table
}

/// A file the bot wants posted to the channel
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub channel: String,
    pub title: String,
    pub filename: String,
    pub content: String,
}

/// Destination for exported order tables
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: &FileUpload) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    ok: bool,
    error: Option<String>,
}

/// Uploads through Slack's `files.upload` API with a bearer token
pub struct SlackFileUploader {
    client: reqwest::Client,
    token: String,
    endpoint: String,
}

impl SlackFileUploader {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_endpoint(token, SLACK_UPLOAD_URL)
    }

    pub fn with_endpoint(token: &str, endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build upload HTTP client")?;
        Ok(Self {
            client,
            token: token.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl FileUploader for SlackFileUploader {
    async fn upload(&self, file: &FileUpload) -> Result<()> {
        debug!(filename = %file.filename, bytes = file.content.len(), "Uploading order export");

        let params = [
            ("channels", file.channel.as_str()),
            ("title", file.title.as_str()),
            ("filename", file.filename.as_str()),
            ("filetype", "text"),
            ("content", file.content.as_str()),
        ];

        let response: UploadResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .form(&params)
            .send()
            .await
            .context("File upload request failed")?
            .error_for_status()
            .context("File upload rejected")?
            .json()
            .await
            .context("Unreadable file upload response")?;

        if !response.ok {
            return Err(anyhow!(
                "File upload refused: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        info!(filename = %file.filename, channel = %file.channel, "Order export uploaded");
        Ok(())
    }
}
