// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{is_truthy, ObjectCache};
use crate::diagnosis::classify::{classify, Backend};
use crate::diagnosis::collaborators::{Authorizer, ConfigSource, Sink, ADMIN_CAPABILITY};
use crate::diagnosis::messages;
use crate::diagnosis::output::{status_line, Bilingual, Renderer, Status, PERMISSION_DENIED};
use crate::diagnosis::url::with_query_arg;
use crate::types::DiagnosisError;

/// Identifies the tool; also the cache group of the sentinel.
pub const TOOL_ID: &str = "objectCacheDiagnosis";
/// Key of the sentinel entry.
pub const TOOL_VERSION: &str = "1.0.1";
pub const SENTINEL_VALUE: &str = "1";
pub const SENTINEL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    End,
}

impl Step {
    /// Only `end` selects the second step.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("end") => Step::End,
            _ => Step::Start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Sentinel written, waiting for the end step.
    Armed { backend: Backend, next_url: String },
    /// Sentinel read back and removed.
    Verified { backend: Backend },
    /// Sentinel missing: the cache does not persist between requests.
    ProbeFailed { backend: Backend },
}

/// The two step object cache probe. Output goes to the sink as it is
/// produced; guard failures end the run with an error after their message.
pub struct Diagnosis {
    authorizer: Arc<dyn Authorizer>,
    source: Arc<dyn ConfigSource>,
    cache: Arc<dyn ObjectCache>,
    renderer: Arc<Renderer>,
    rearm_on_end: bool,
}

impl Diagnosis {
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        source: Arc<dyn ConfigSource>,
        cache: Arc<dyn ObjectCache>,
        renderer: Arc<Renderer>,
    ) -> Self {
        Self {
            authorizer,
            source,
            cache,
            renderer,
            rearm_on_end: false,
        }
    }

    pub fn with_rearm_on_end(mut self, rearm_on_end: bool) -> Self {
        self.rearm_on_end = rearm_on_end;
        self
    }

    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), step = ?step))]
    pub async fn run(
        &self,
        step: Step,
        current_url: &Url,
        out: &mut dyn Sink,
    ) -> Result<Outcome, DiagnosisError> {
        match step {
            Step::Start => self.start(current_url, out).await,
            Step::End => {
                let outcome = self.end(out).await?;
                if self.rearm_on_end {
                    info!("Re-arming the probe after reporting");
                    self.start(current_url, out).await?;
                }
                Ok(outcome)
            }
        }
    }

    async fn start(&self, current_url: &Url, out: &mut dyn Sink) -> Result<Outcome, DiagnosisError> {
        self.check_user(out)?;
        say(out, messages::starting(), Status::Pending);
        say(out, messages::checking_readable(), Status::Pending);
        self.check_readable(out)?;
        say(out, messages::readable(), Status::Ok);
        say(out, messages::checking_type(), Status::Pending);

        let backend = self.backend();
        let type_status = if backend.is_known() {
            Status::Ok
        } else {
            Status::Fail
        };
        say(out, messages::backend_type(backend), type_status);
        if !backend.is_known() {
            say(out, messages::unknown_terminated(), Status::Fail);
            return Err(DiagnosisError::UnknownBackend);
        }

        say(out, messages::starting_test(), Status::Pending);
        say(out, messages::trying_set(), Status::Pending);
        let stored = self
            .cache
            .set(TOOL_VERSION, SENTINEL_VALUE, TOOL_ID, SENTINEL_TTL)
            .await;
        if !stored {
            // reported by the end step
            warn!(cache = self.cache.name(), "Object cache refused the sentinel");
        }
        say(out, messages::created(), Status::Pending);

        let next_url = with_query_arg(current_url, "step", "end");
        out.emit(self.renderer.next_step(&next_url)?);
        info!(%backend, "Probe armed");

        Ok(Outcome::Armed {
            backend,
            next_url: next_url.to_string(),
        })
    }

    async fn end(&self, out: &mut dyn Sink) -> Result<Outcome, DiagnosisError> {
        self.check_user(out)?;
        say(out, messages::checking_previous(), Status::Pending);
        let exists = is_truthy(self.cache.get(TOOL_VERSION, TOOL_ID).await.as_deref());

        // classified again: start may have run in another process
        let backend = self.backend();

        let outcome = if exists {
            say(out, messages::exists(backend), Status::Ok);
            self.cache.delete(TOOL_VERSION, TOOL_ID).await;
            info!(%backend, "Sentinel found, object cache persists");
            Outcome::Verified { backend }
        } else {
            say(out, messages::not_found(backend), Status::Fail);
            warn!(%backend, cache = self.cache.name(), "Sentinel not found");
            Outcome::ProbeFailed { backend }
        };

        out.emit(self.renderer.close_control()?);
        Ok(outcome)
    }

    fn check_user(&self, out: &mut dyn Sink) -> Result<(), DiagnosisError> {
        if self.authorizer.current_user_can(ADMIN_CAPABILITY) {
            return Ok(());
        }
        out.emit(PERMISSION_DENIED.to_string());
        Err(DiagnosisError::Unauthorized)
    }

    fn check_readable(&self, out: &mut dyn Sink) -> Result<(), DiagnosisError> {
        if self.source.is_readable() {
            return Ok(());
        }
        let path = self.source.path().to_string();
        say(out, messages::unreadable(&path), Status::Fail);
        Err(DiagnosisError::ConfigUnreadable { path })
    }

    fn backend(&self) -> Backend {
        match self.source.read_to_string() {
            Ok(content) => {
                let backend = classify(&content);
                debug!(path = self.source.path(), %backend, "Classified object cache");
                backend
            }
            Err(e) => {
                warn!("Failed to read object cache file {}: {}", self.source.path(), e);
                Backend::Unknown
            }
        }
    }
}

fn say(out: &mut dyn Sink, message: Bilingual, status: Status) {
    for line in message.lines() {
        out.emit(status_line(line, status));
    }
}
