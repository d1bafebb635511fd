// transfer module: folder push orchestration (scan -> classify -> group -> archive -> upload)
mod archive;
mod classify;
mod enumeration;
mod grouping;
pub(crate) mod helpers;
mod status;
mod transport;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::UploadError;
use crate::config::Config;
use crate::parse::{parse_form_action, parse_hidden_input, resolve_action, resolve_csrf_token};

pub use archive::{ARCHIVE_CONTENT_TYPE, ArchiveArtifact, ArchiveBuilder};
pub use classify::{
    Classification, ClassifiedFile, MEDIA_EXTENSIONS, MediaCandidate, classify, is_media_name, tag,
};
pub use enumeration::{SelectedFile, SelectedFileSet, scan_folder};
pub use grouping::{SubfolderGroup, UploadPlan, directory_map, group_by_subfolder, plan_upload};
pub use helpers::normalize_path;
pub use status::{ConsoleReporter, LogReporter, StatusReporter};
pub use transport::{
    HttpTransport, ProgressReader, TransferProgress, UploadOutcome, UploadRequest,
    UploadTransport, interpret_response,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BatchVerdict {
    AllSuccess,
    PartialSuccess,
    AllFailure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushState {
    Idle,
    Scanning,
    PerGroupUpload(usize),
    Aggregating,
    Done(BatchVerdict),
}

/// What the caller should do once the batch is over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TerminalAction {
    Reload,
    Redirect(String),
    EnableRetry,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub completed: usize,
    pub succeeded: usize,
    pub total: usize,
}

impl UploadSummary {
    pub fn new(total: usize) -> Self {
        Self { completed: 0, succeeded: 0, total }
    }

    pub fn record(&mut self, success: bool) {
        self.completed += 1;
        if success {
            self.succeeded += 1;
        }
    }

    pub fn verdict(&self) -> BatchVerdict {
        if self.total > 0 && self.succeeded == self.total {
            BatchVerdict::AllSuccess
        } else if self.succeeded > 0 {
            BatchVerdict::PartialSuccess
        } else {
            BatchVerdict::AllFailure
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupOutcome {
    pub group: String,
    pub files: usize,
    pub archive_bytes: u64,
    pub outcome: UploadOutcome,
}

#[derive(Clone, Debug)]
pub struct PushReport {
    pub summary: UploadSummary,
    pub outcomes: Vec<GroupOutcome>,
    pub verdict: BatchVerdict,
    pub action: TerminalAction,
    /// Structured per-group failures, in processing order.
    pub failures: Vec<UploadError>,
}

impl PushReport {
    pub fn message(&self) -> String {
        let s = &self.summary;
        match self.verdict {
            BatchVerdict::AllSuccess => format!("All {} folder(s) uploaded successfully.", s.total),
            BatchVerdict::PartialSuccess => format!(
                "{} of {} folder(s) uploaded; failed: {}.",
                s.succeeded,
                s.total,
                self.failed_groups().join(", ")
            ),
            BatchVerdict::AllFailure => {
                format!("Upload failed for all {} folder(s). Fix the problem and retry.", s.total)
            }
        }
    }

    pub fn failed_groups(&self) -> Vec<&str> {
        self.outcomes.iter().filter(|o| !o.outcome.success).map(|o| o.group.as_str()).collect()
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.outcome.success).map(|o| o.archive_bytes).sum()
    }
}

// Within one group's share: archive build, then upload.
const BUILD_SHARE: f64 = 0.5;

/// Drives one push. Owns the state and the summary; groups run strictly one
/// after another in plan order.
pub struct Orchestrator {
    builder: ArchiveBuilder,
    reporter: Arc<dyn StatusReporter>,
    state: PushState,
    summary: UploadSummary,
}

impl Orchestrator {
    pub fn new(builder: ArchiveBuilder, reporter: Arc<dyn StatusReporter>) -> Self {
        Self { builder, reporter, state: PushState::Idle, summary: UploadSummary::default() }
    }

    pub fn state(&self) -> &PushState {
        &self.state
    }

    pub fn summary(&self) -> UploadSummary {
        self.summary
    }

    fn transition(&mut self, next: PushState) {
        tracing::debug!("push state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Scan `root` and turn it into a plan. No eligible file anywhere is
    /// returned as `SelectionEmpty` and nothing else happens.
    pub fn prepare(&mut self, root: &Path, include_loose: bool) -> Result<UploadPlan, UploadError> {
        self.transition(PushState::Scanning);
        self.reporter.status(&format!("Scanning {}...", root.display()));
        let plan = scan_folder(root).and_then(|set| plan_upload(&set, include_loose));
        if plan.is_err() {
            self.transition(PushState::Idle);
        }
        plan
    }

    pub fn run(
        &mut self,
        transport: &dyn UploadTransport,
        plan: &UploadPlan,
        csrf_token: &str,
    ) -> PushReport {
        let n = plan.groups.len();
        self.summary = UploadSummary::new(n);
        let share = if n == 0 { 100.0 } else { 100.0 / n as f64 };
        let mut outcomes = Vec::with_capacity(n);
        let mut failures = Vec::new();
        let mut redirect: Option<String> = None;

        for (i, group) in plan.groups.iter().enumerate() {
            self.transition(PushState::PerGroupUpload(i));
            let base = share * i as f64;
            self.reporter.status(&format!("[{}/{}] Compressing {}...", i + 1, n, group.name));
            self.reporter.progress(base);

            let reporter = self.reporter.clone();
            let built = self
                .builder
                .build(group, &mut |p: f64| reporter.progress(base + share * BUILD_SHARE * p / 100.0));

            let (outcome, archive_bytes) = match built {
                Ok(Some(artifact)) => {
                    let size = artifact.len();
                    self.reporter.status(&format!(
                        "[{}/{}] Uploading {} ({})...",
                        i + 1,
                        n,
                        artifact.file_name,
                        crate::util::human_bytes(size)
                    ));
                    let reporter = self.reporter.clone();
                    let progress: TransferProgress = Arc::new(move |loaded: u64, total: u64| {
                        if total > 0 {
                            let frac = loaded as f64 / total as f64;
                            reporter.progress(
                                base + share * BUILD_SHARE + share * (1.0 - BUILD_SHARE) * frac,
                            );
                        }
                    });
                    let metadata = serde_json::to_string(&directory_map(group)).ok();
                    let request = UploadRequest {
                        artifact,
                        group_name: group.name.clone(),
                        csrf_token: csrf_token.to_string(),
                        metadata,
                    };
                    let outcome = transport.upload(request, &progress);
                    if let Some(msg) = outcome.error_message.as_ref().filter(|_| !outcome.success) {
                        failures.push(UploadError::TransportFailed(group.name.clone(), msg.clone()));
                    }
                    (outcome, size)
                }
                Ok(None) => {
                    let msg = "nothing to archive".to_string();
                    failures.push(UploadError::ArchiveBuildFailed(group.name.clone(), msg.clone()));
                    (UploadOutcome::failed(msg), 0)
                }
                Err(e) => {
                    tracing::warn!("archive for '{}' failed: {}", group.name, e);
                    failures.push(UploadError::ArchiveBuildFailed(group.name.clone(), e.to_string()));
                    (UploadOutcome::failed(e.to_string()), 0)
                }
            };

            if outcome.success && outcome.redirect_url.is_some() {
                redirect = outcome.redirect_url.clone();
            }
            self.summary.record(outcome.success);
            let verdict_word = if outcome.success { "uploaded" } else { "failed" };
            self.reporter.status(&format!(
                "[{}/{}] {} {} ({} of {} succeeded)",
                i + 1,
                n,
                group.name,
                verdict_word,
                self.summary.succeeded,
                self.summary.completed
            ));
            self.reporter.progress(base + share);
            outcomes.push(GroupOutcome {
                group: group.name.clone(),
                files: group.files.len(),
                archive_bytes,
                outcome,
            });
        }

        self.transition(PushState::Aggregating);
        let verdict = self.summary.verdict();
        let action = match verdict {
            BatchVerdict::AllFailure => TerminalAction::EnableRetry,
            _ => redirect.map(TerminalAction::Redirect).unwrap_or(TerminalAction::Reload),
        };
        self.transition(PushState::Done(verdict));
        let report = PushReport { summary: self.summary, outcomes, verdict, action, failures };
        self.reporter.status(&report.message());
        report
    }
}

/// Arguments for `handle_push` grouped to avoid too-many-arguments lint.
#[derive(Clone, Debug, Default)]
pub struct PushArgs {
    pub folder: PathBuf,
    pub endpoint: Option<String>,
    pub cookie: Option<String>,
    pub csrf_token: Option<String>,
    /// Saved copy of the upload page; supplies the form action and hidden token.
    pub form_html: Option<PathBuf>,
    pub include_loose: bool,
    pub max_retries: Option<usize>,
    pub verbose: bool,
    pub json: bool,
    pub quiet: bool,
}

/// Push subcommand entry point.
///
/// Order of checks: the folder must hold at least one eligible video, then an
/// endpoint and anti-forgery token must resolve, then `confirm` must accept
/// the plan. Only after that is anything compressed or sent. Per-group
/// failures never surface as `Err`; they are in the returned report.
pub fn handle_push(
    config: &Config,
    args: PushArgs,
    confirm: &dyn Fn(&UploadPlan) -> bool,
) -> Result<PushReport> {
    let PushArgs {
        folder,
        endpoint,
        cookie,
        csrf_token,
        form_html,
        include_loose,
        max_retries,
        verbose,
        json,
        quiet,
    } = args;
    let silent = json || quiet;

    let mut orchestrator = Orchestrator::new(
        ArchiveBuilder::new(config.effective_compression_level()),
        Arc::new(LogReporter),
    );
    let plan = orchestrator.prepare(&folder, include_loose)?;
    if !silent && !plan.loose.is_empty() {
        println!(
            "Skipping {} file(s) directly under the root; use --include-loose to upload them.",
            plan.loose.len()
        );
    }

    let form_html = match form_html {
        Some(p) => Some(
            std::fs::read_to_string(&p)
                .with_context(|| format!("cannot read form page {}", p.display()))?,
        ),
        None => None,
    };
    let endpoint = endpoint
        .or_else(|| config.endpoint.clone())
        .or_else(|| {
            let action = parse_form_action(form_html.as_deref()?)?;
            resolve_action(&action, config.base_url.as_deref())
        })
        .ok_or(UploadError::MissingEndpoint)?;
    let cookie = cookie.or_else(|| config.cookie.clone());
    let hidden = form_html.as_deref().and_then(|h| parse_hidden_input(h, &config.csrf_form_field));
    let token = resolve_csrf_token(
        cookie.as_deref(),
        &config.csrf_cookie_name,
        csrf_token.as_deref(),
        hidden.as_deref(),
    )
    .ok_or_else(|| UploadError::MissingCsrfToken(config.csrf_cookie_name.clone()))?;
    tracing::debug!("anti-forgery token from {:?}", token.source);

    if !confirm(&plan) {
        return Err(UploadError::Cancelled.into());
    }

    let mut transport_config = config.clone();
    if let Some(r) = max_retries {
        transport_config.max_retries = r;
    }
    let transport = HttpTransport::from_config(&transport_config, endpoint, cookie)?;
    tracing::info!("pushing {} group(s) to {}", plan.groups.len(), transport.endpoint());

    if !silent {
        println!(
            "{}",
            crate::util::startup_header(
                "Push",
                plan.groups.len(),
                plan.accepted_count(),
                plan.total_size()
            )
        );
    }
    let console = if silent {
        None
    } else {
        let (mp, header, bar) = crate::util::init_progress_and_mp(verbose)?;
        Some(Arc::new(ConsoleReporter::new(mp, header, bar)))
    };
    if let Some(c) = &console {
        orchestrator.reporter = c.clone() as Arc<dyn StatusReporter>;
    }

    let start = Instant::now();
    let report = orchestrator.run(&transport, &plan, &token.value);
    if let Some(c) = &console {
        c.finish();
    }
    finalize_push(&report, start, json, quiet);
    Ok(report)
}

// Module-private helper: print the summary, write the failure list and emit
// the optional JSON line.
fn finalize_push(report: &PushReport, start: Instant, json_mode: bool, quiet_mode: bool) {
    let elapsed = start.elapsed().as_secs_f64();
    if !quiet_mode && !json_mode {
        crate::util::print_summary(
            report.summary.succeeded,
            report.summary.total,
            report.uploaded_bytes(),
            elapsed,
        );
        for o in report.outcomes.iter().filter(|o| !o.outcome.success) {
            println!(
                "  ✗ {}: {}",
                o.group,
                o.outcome.error_message.as_deref().unwrap_or("Upload failed")
            );
        }
    }

    // Always written to the canonical logs directory; no CLI path accepted.
    let failures_path = crate::util::write_failures_jsonl(None, &report.failures);
    if !quiet_mode
        && !json_mode
        && let Some(ref p) = failures_path
    {
        println!("Failure list written to: {}", p.display());
    }

    if json_mode {
        let summary_obj = serde_json::json!({
            "completed": report.summary.completed,
            "succeeded": report.summary.succeeded,
            "total": report.summary.total,
            "verdict": report.verdict,
            "action": report.action,
            "uploaded_bytes": report.uploaded_bytes(),
            "elapsed_secs": elapsed,
            "groups": report.outcomes,
            "failures_path": failures_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        });
        if let Ok(line) = serde_json::to_string(&summary_obj) {
            println!("{}", line);
        }
    }
}
