// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

//! Drives both diagnosis steps against a running server, the way an admin
//! would by clicking through them.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, info};

use crate::diagnosis::PERMISSION_DENIED;

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub started_at: DateTime<Utc>,
    /// Backend label as reported by the server.
    pub backend: Option<String>,
    /// The start step wrote the sentinel and offered the next step.
    pub armed: bool,
    /// The end step read the sentinel back.
    pub verified: bool,
    pub next_url: Option<String>,
}

impl ProbeReport {
    pub fn works(&self) -> bool {
        self.armed && self.verified
    }
}

/// Target of the next step link, if the page has one.
pub fn extract_next_url(body: &str) -> Option<String> {
    let start = body.find("<h1><a href=\"")? + "<h1><a href=\"".len();
    let end = body[start..].find('"')?;
    Some(body[start..start + end].to_string())
}

/// Backend label from the `Object cache type is:` line.
pub fn extract_backend(body: &str) -> Option<String> {
    let line = body.find("Object cache type is: ")?;
    let start = body[line..].find("<strong>")? + line + "<strong>".len();
    let end = body[start..].find("</strong>")?;
    Some(body[start..start + end].to_string())
}

/// Backend label from the end step report, e.g. `Cache exists（Redis)`.
fn extract_result_backend(body: &str) -> Option<String> {
    let (marker, open) = if let Some(pos) = body.find("Cache exists（") {
        (pos, "Cache exists（")
    } else {
        (body.find("Cache not found (")?, "Cache not found (")
    };
    let start = marker + open.len();
    let end = body[start..].find(')')?;
    Some(body[start..start + end].to_string())
}

async fn fetch(client: &Client, url: &str, token: Option<&str>) -> Result<String> {
    let mut req = client.get(url);
    if let Some(token) = token {
        req = req.header("X-Admin-Token", token);
    }
    let resp = req
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        bail!("{} answered {}: {}", url, status, body.trim());
    }
    if body.trim() == PERMISSION_DENIED {
        bail!("Not allowed to run the diagnosis, check the admin token");
    }
    Ok(body)
}

pub async fn probe(url: &str, token: Option<&str>) -> Result<ProbeReport> {
    let start_url = Url::parse(url).with_context(|| format!("Invalid url {}", url))?;
    let client = Client::new();
    let mut report = ProbeReport {
        url: start_url.to_string(),
        started_at: Utc::now(),
        backend: None,
        armed: false,
        verified: false,
        next_url: None,
    };

    info!("Starting diagnosis at {}", start_url);
    let body = fetch(&client, start_url.as_str(), token).await?;
    debug!("Start step answered: {}", body);
    report.backend = extract_backend(&body);
    let Some(next_url) = extract_next_url(&body) else {
        info!("Start step did not arm the probe");
        return Ok(report);
    };
    report.armed = true;
    report.next_url = Some(next_url.clone());

    info!("Following next step {}", next_url);
    let body = fetch(&client, &next_url, token).await?;
    debug!("End step answered: {}", body);
    report.verified = body.contains("Cache exists（");
    if let Some(backend) = extract_result_backend(&body) {
        report.backend = Some(backend);
    }

    Ok(report)
}
