//! Application kernel: owns the mediators and the view coordination graph,
//! dispatches collaborator calls to background tasks, and applies their
//! results on the owning thread.
//!
//! Background tasks only ever see owned snapshots. Each reports exactly one
//! [`Completion`] through the completion channel; [`AppKernel::tick`] drains it
//! without blocking and [`AppKernel::settle`] waits for everything in flight.

use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use reqstudio_core::{
    AnalysisResult, MergeReport, Requirement, RequirementItem, TestCase, Workspace,
};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channel::SubscriptionId;
use crate::domain::AppSettings;
use crate::mediator::{
    BroadcastBus, ProjectClosed, RequirementEdit, SessionId, TestCaseGenerationMediator,
    WorkspaceError, WorkspaceMediator,
};
use crate::navigation::{NavigationContext, NavigationMediator, Section};
use crate::notifications::{NotificationCenter, Severity};
use crate::ports::{
    AnalysisPort, ImportPort, Operation, PersistencePort, PortError, PortResult, SettingsRepo,
};
use crate::view::{ViewAreaCoordinator, ViewConfigurationFactory};

/// Construction failed because a required collaborator was not supplied.
/// Indicates a wiring defect; never recovered at runtime.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("failed to start background runtime: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("no save location has been chosen for this project")]
    NoSavePath,
    #[error("the project has unsaved changes")]
    UnsavedChanges,
    #[error("nothing to generate test cases for")]
    NothingSelected,
}

/// How the most recent import ended, for callers that act on it rather than
/// on the notification it raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Merged(MergeReport),
    Failed(String),
}

/// Result of one background collaborator call.
#[derive(Debug)]
pub enum Completion {
    Loaded {
        ticket: Uuid,
        path: Utf8PathBuf,
        result: PortResult<Workspace>,
    },
    Saved {
        session: SessionId,
        path: Utf8PathBuf,
        revision: u64,
        saved_at: DateTime<Utc>,
        result: PortResult<()>,
    },
    Imported {
        session: SessionId,
        path: Utf8PathBuf,
        result: PortResult<Vec<Requirement>>,
    },
    Analyzed {
        session: SessionId,
        item: RequirementItem,
        result: PortResult<AnalysisResult>,
    },
    Generated {
        session: SessionId,
        items: Vec<RequirementItem>,
        result: PortResult<Vec<TestCase>>,
    },
    /// The task itself died (panic or runtime shutdown).
    Crashed {
        op: Operation,
        message: String,
    },
}

impl Completion {
    fn operation(&self) -> Operation {
        match self {
            Completion::Loaded { .. } => Operation::Load,
            Completion::Saved { .. } => Operation::Save,
            Completion::Imported { .. } => Operation::Import,
            Completion::Analyzed { .. } => Operation::Analyze,
            Completion::Generated { .. } => Operation::Generate,
            Completion::Crashed { op, .. } => *op,
        }
    }
}

#[derive(Default)]
pub struct KernelBuilder {
    persistence: Option<Arc<dyn PersistencePort>>,
    importer: Option<Arc<dyn ImportPort>>,
    analysis: Option<Arc<dyn AnalysisPort>>,
    settings: Option<Arc<dyn SettingsRepo>>,
    runtime: Option<Handle>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persistence(mut self, port: impl PersistencePort) -> Self {
        self.persistence = Some(Arc::new(port));
        self
    }

    pub fn importer(mut self, port: impl ImportPort) -> Self {
        self.importer = Some(Arc::new(port));
        self
    }

    pub fn analysis(mut self, port: impl AnalysisPort) -> Self {
        self.analysis = Some(Arc::new(port));
        self
    }

    pub fn settings(mut self, repo: impl SettingsRepo) -> Self {
        self.settings = Some(Arc::new(repo));
        self
    }

    /// Runtime for background work. Defaults to the ambient runtime, or a
    /// process-wide one when called outside any runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<AppKernel, WiringError> {
        let persistence = self
            .persistence
            .ok_or(WiringError::MissingCollaborator("persistence"))?;
        let importer = self
            .importer
            .ok_or(WiringError::MissingCollaborator("importer"))?;
        let analysis = self
            .analysis
            .ok_or(WiringError::MissingCollaborator("analysis"))?;
        let settings_repo = self
            .settings
            .ok_or(WiringError::MissingCollaborator("settings"))?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => crate::async_runtime::background_handle()
                .map_err(|e| WiringError::Runtime(e.to_string()))?,
        };

        let settings = settings_repo.load().unwrap_or_else(|e| {
            warn!("failed to load settings, using defaults: {e:#}");
            AppSettings::default()
        });

        Ok(AppKernel::assemble(
            Ports {
                persistence,
                importer,
                analysis,
                settings: settings_repo,
            },
            settings,
            runtime,
        ))
    }
}

struct Ports {
    persistence: Arc<dyn PersistencePort>,
    importer: Arc<dyn ImportPort>,
    analysis: Arc<dyn AnalysisPort>,
    settings: Arc<dyn SettingsRepo>,
}

#[derive(Debug, Clone, Copy)]
struct LoadTicket {
    id: Uuid,
    discard: bool,
}

pub struct AppKernel {
    broadcast: Rc<BroadcastBus>,
    workspace: Rc<WorkspaceMediator>,
    generation: Rc<TestCaseGenerationMediator>,
    navigation: Rc<NavigationMediator>,
    factory: Rc<ViewConfigurationFactory>,
    coordinator: Rc<ViewAreaCoordinator>,
    notifications: NotificationCenter,
    settings: AppSettings,
    ports: Ports,
    runtime: Handle,

    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    pending: usize,
    busy_jobs: usize,
    load_ticket: Option<LoadTicket>,
    last_import: Option<ImportOutcome>,
    save_in_flight: bool,
    queued_save: Option<(SessionId, Utf8PathBuf)>,
    cancel: CancellationToken,
    on_closed: SubscriptionId,
}

impl AppKernel {
    fn assemble(ports: Ports, settings: AppSettings, runtime: Handle) -> Self {
        let broadcast = Rc::new(BroadcastBus::new());
        let workspace = Rc::new(WorkspaceMediator::new(broadcast.clone()));
        let generation =
            TestCaseGenerationMediator::new(broadcast.clone(), workspace.requirements_view());
        let navigation = Rc::new(NavigationMediator::new());
        let factory = Rc::new(ViewConfigurationFactory::new(generation.clone()));
        let coordinator = ViewAreaCoordinator::new(navigation.clone(), factory.clone());

        // Closing a project forgets every per-section view and returns
        // navigation to its initial state.
        let on_closed = {
            let factory = Rc::downgrade(&factory);
            let navigation = Rc::downgrade(&navigation);
            broadcast.subscribe(move |_: &ProjectClosed| {
                if let Some(factory) = factory.upgrade() {
                    factory.invalidate_caches();
                }
                if let Some(navigation) = navigation.upgrade() {
                    navigation.clear_navigation_state();
                }
                Ok(())
            })
        };

        let (tx, rx) = mpsc::channel(reqstudio_config::COMPLETION_CHANNEL_CAPACITY);
        Self {
            broadcast,
            workspace,
            generation,
            navigation,
            factory,
            coordinator,
            notifications: NotificationCenter::default(),
            settings,
            ports,
            runtime,
            tx,
            rx,
            pending: 0,
            busy_jobs: 0,
            load_ticket: None,
            last_import: None,
            save_in_flight: false,
            queued_save: None,
            cancel: CancellationToken::new(),
            on_closed,
        }
    }

    // --- Accessors ---

    pub fn broadcast(&self) -> &BroadcastBus {
        &self.broadcast
    }

    pub fn workspace(&self) -> &WorkspaceMediator {
        &self.workspace
    }

    pub fn generation(&self) -> &TestCaseGenerationMediator {
        &self.generation
    }

    pub fn navigation(&self) -> &NavigationMediator {
        &self.navigation
    }

    pub fn factory(&self) -> &ViewConfigurationFactory {
        &self.factory
    }

    pub fn coordinator(&self) -> &ViewAreaCoordinator {
        &self.coordinator
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut AppSettings {
        &mut self.settings
    }

    /// Number of background calls whose completion has not been applied yet.
    pub fn pending_jobs(&self) -> usize {
        self.pending
    }

    /// Outcome of the latest import whose completion has been applied.
    pub fn last_import(&self) -> Option<&ImportOutcome> {
        self.last_import.as_ref()
    }

    /// Test and diagnostics hook: lets callers inject completions.
    pub fn sender(&self) -> mpsc::Sender<Completion> {
        self.tx.clone()
    }

    // --- Navigation ---

    /// Restores the section persisted in settings.
    pub fn start(&mut self) -> Section {
        let section = self.settings.last_section();
        info!(section = section.as_str(), "starting");
        self.navigate_to(section, None);
        section
    }

    pub fn navigate(&mut self, name: &str, context: Option<NavigationContext>) -> Section {
        let section = Section::parse(name);
        self.navigate_to(section, context);
        section
    }

    pub fn navigate_to(&mut self, section: Section, context: Option<NavigationContext>) {
        self.navigation.navigate_to_section(section, context);
        if section != Section::Default {
            self.settings.set_last_section(section);
        }
    }

    pub fn request_step(&self, step_id: u32) {
        self.navigation.request_step(step_id);
    }

    pub fn save_settings(&self) -> anyhow::Result<()> {
        self.ports.settings.save(&self.settings)
    }

    // --- Project lifecycle ---

    /// Starts an empty project in place of the current one. Like
    /// [`close_project`](Self::close_project), refuses to drop unsaved
    /// changes unless `discard` is set.
    pub fn new_project(&mut self, name: &str, discard: bool) -> Result<SessionId, KernelError> {
        if self.workspace.is_dirty() && !discard {
            return Err(KernelError::UnsavedChanges);
        }
        self.cancel_background_work();
        let session = self.workspace.open_workspace(Workspace::new(name.trim()));
        self.navigate_to(Section::Project, None);
        Ok(session)
    }

    /// Starts loading `path`. The current project stays visible until the
    /// load completes; a later open supersedes an earlier one still in flight.
    /// Unsaved changes are only replaced when `discard` is set, checked both
    /// now and when the load completes.
    pub fn open_project(&mut self, path: &Utf8Path, discard: bool) -> Result<(), KernelError> {
        if self.workspace.is_dirty() && !discard {
            return Err(KernelError::UnsavedChanges);
        }
        let ticket = Uuid::new_v4();
        self.load_ticket = Some(LoadTicket { id: ticket, discard });
        let port = self.ports.persistence.clone();
        let path = path.to_path_buf();
        debug!(%path, "loading workspace");
        self.spawn_job(Operation::Load, async move {
            let result = port.load(&path).await;
            Completion::Loaded {
                ticket,
                path,
                result,
            }
        });
        Ok(())
    }

    /// Writes a snapshot of the workspace. The dirty flag is only cleared once
    /// the write is confirmed, and only if nothing changed in the meantime.
    ///
    /// One write runs at a time. A save requested while another is running is
    /// queued and started, with a fresh snapshot, once the running one
    /// completes; repeated requests collapse into one.
    pub fn save_project(&mut self, path: Option<&Utf8Path>) -> Result<(), KernelError> {
        let session = self.workspace.session().ok_or(WorkspaceError::NoProject)?;
        let path = path
            .map(Utf8Path::to_path_buf)
            .or_else(|| self.workspace.file_path())
            .ok_or(KernelError::NoSavePath)?;

        if self.save_in_flight {
            debug!(%path, "save already running; queued");
            self.queued_save = Some((session, path));
            return Ok(());
        }
        self.start_save(session, path)
    }

    fn start_save(&mut self, session: SessionId, path: Utf8PathBuf) -> Result<(), KernelError> {
        let revision = self.workspace.revision();
        let saved_at = Utc::now();
        let mut snapshot = self.workspace.snapshot().ok_or(WorkspaceError::NoProject)?;
        snapshot.saved_at = Some(saved_at);

        let port = self.ports.persistence.clone();
        debug!(%path, revision, "saving workspace");
        self.save_in_flight = true;
        self.spawn_job(Operation::Save, async move {
            let result = port.save(&path, &snapshot).await;
            Completion::Saved {
                session,
                path,
                revision,
                saved_at,
                result,
            }
        });
        Ok(())
    }

    fn finish_save(&mut self) {
        self.save_in_flight = false;
        let Some((session, path)) = self.queued_save.take() else {
            return;
        };
        if !self.is_current(session) {
            debug!(%path, "queued save for closed session dropped");
            return;
        }
        if let Err(e) = self.start_save(session, path) {
            warn!("queued save could not start: {e}");
        }
    }

    /// Closes the project. Refuses while there are unsaved changes unless
    /// `discard` is set. Returns whether a project was closed.
    pub fn close_project(&mut self, discard: bool) -> Result<bool, KernelError> {
        if self.workspace.is_dirty() && !discard {
            return Err(KernelError::UnsavedChanges);
        }
        self.cancel_background_work();
        Ok(self.workspace.close_workspace().is_some())
    }

    // --- Collaborator-backed commands ---

    pub fn import_requirements(&mut self, path: &Utf8Path) -> Result<(), KernelError> {
        let session = self.workspace.session().ok_or(WorkspaceError::NoProject)?;
        let port = self.ports.importer.clone();
        let path = path.to_path_buf();
        debug!(%path, "importing requirements");
        self.last_import = None;
        self.spawn_job(Operation::Import, async move {
            let result = port.import(&path).await;
            Completion::Imported {
                session,
                path,
                result,
            }
        });
        Ok(())
    }

    pub fn analyze_requirement(&mut self, item: &str) -> Result<(), KernelError> {
        let session = self.workspace.session().ok_or(WorkspaceError::NoProject)?;
        let requirement = self
            .workspace
            .requirements_view()
            .get(item)
            .ok_or_else(|| WorkspaceError::UnknownRequirement(item.to_string()))?;

        let port = self.ports.analysis.clone();
        let token = self.cancel.clone();
        let limit = self.settings.analysis_timeout();
        let text = requirement.analysis_text().to_string();
        let item = requirement.item;
        self.begin_busy();
        self.spawn_job(Operation::Analyze, async move {
            let result = guarded(token, limit, port.analyze_requirement(&text)).await;
            Completion::Analyzed {
                session,
                item,
                result,
            }
        });
        Ok(())
    }

    /// Generates test cases for `items`, or for the current requirement when
    /// `items` is empty.
    pub fn generate_test_cases(&mut self, items: &[RequirementItem]) -> Result<(), KernelError> {
        let session = self.workspace.session().ok_or(WorkspaceError::NoProject)?;
        let targets: Vec<RequirementItem> = if items.is_empty() {
            self.generation
                .current_requirement()
                .into_iter()
                .collect()
        } else {
            items.to_vec()
        };
        if targets.is_empty() {
            return Err(KernelError::NothingSelected);
        }

        let view = self.workspace.requirements_view();
        let requirements = targets
            .iter()
            .map(|item| {
                view.get(item)
                    .ok_or_else(|| WorkspaceError::UnknownRequirement(item.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let port = self.ports.analysis.clone();
        let token = self.cancel.clone();
        let limit = self.settings.generation_timeout();
        self.begin_busy();
        self.spawn_job(Operation::Generate, async move {
            let result = guarded(token, limit, port.generate_test_cases(&requirements)).await;
            Completion::Generated {
                session,
                items: targets,
                result,
            }
        });
        Ok(())
    }

    /// Cancels analysis and generation in flight. Their completions still
    /// arrive (as cancelled) and are drained normally.
    pub fn cancel_background_work(&mut self) {
        if self.busy_jobs > 0 {
            info!(jobs = self.busy_jobs, "cancelling background work");
        }
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    // --- Direct domain commands ---

    pub fn select_requirement(&self, item: &str) -> Result<bool, KernelError> {
        Ok(self.generation.select_requirement(item)?)
    }

    pub fn add_requirement(&self, requirement: Requirement) -> Result<(), KernelError> {
        Ok(self.workspace.add_requirement(requirement)?)
    }

    pub fn edit_requirement(&self, item: &str, edit: RequirementEdit) -> Result<bool, KernelError> {
        Ok(self.workspace.edit_requirement(item, edit)?)
    }

    pub fn remove_requirement(&self, item: &str) -> Result<Requirement, KernelError> {
        Ok(self.workspace.remove_requirement(item)?)
    }

    pub fn apply_suggested_rewrite(&self, item: &str) -> Result<(), KernelError> {
        Ok(self.workspace.apply_suggested_rewrite(item)?)
    }

    // --- Completion handling ---

    /// Applies every completion that has already arrived. Never blocks.
    pub fn tick(&mut self) {
        while let Ok(completion) = self.rx.try_recv() {
            self.apply_completion(completion);
        }
    }

    /// Waits until every background call started so far has been applied.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            match self.rx.recv().await {
                Some(completion) => self.apply_completion(completion),
                None => break,
            }
        }
        self.tick();
    }

    fn spawn_job<F>(&mut self, op: Operation, job: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let work = self.runtime.spawn(job);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let completion = match work.await {
                Ok(completion) => completion,
                Err(e) => Completion::Crashed {
                    op,
                    message: e.to_string(),
                },
            };
            if tx.send(completion).await.is_err() {
                debug!(operation = op.as_str(), "kernel gone; completion dropped");
            }
        });
        self.pending += 1;
    }

    fn begin_busy(&mut self) {
        self.busy_jobs += 1;
        self.generation.set_is_busy(true);
    }

    fn end_busy(&mut self) {
        self.busy_jobs = self.busy_jobs.saturating_sub(1);
        if self.busy_jobs == 0 {
            self.generation.set_is_busy(false);
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.workspace.session() == Some(session)
    }

    fn apply_completion(&mut self, completion: Completion) {
        self.pending = self.pending.saturating_sub(1);
        if matches!(
            completion.operation(),
            Operation::Analyze | Operation::Generate
        ) {
            self.end_busy();
        }

        match completion {
            Completion::Loaded {
                ticket,
                path,
                result,
            } => {
                let Some(load) = self.load_ticket.filter(|t| t.id == ticket) else {
                    debug!(%path, "superseded load ignored");
                    return;
                };
                self.load_ticket = None;
                self.on_loaded(path, load.discard, result);
            }
            Completion::Saved {
                session,
                path,
                revision,
                saved_at,
                result,
            } => {
                if self.is_current(session) {
                    self.on_saved(path, revision, saved_at, result);
                } else {
                    debug!(%session, "save completion for closed session ignored");
                }
                self.finish_save();
            }
            Completion::Imported {
                session,
                path,
                result,
            } => {
                if !self.is_current(session) {
                    debug!(%session, "import completion for closed session ignored");
                    return;
                }
                self.on_imported(path, result);
            }
            Completion::Analyzed {
                session,
                item,
                result,
            } => {
                if !self.is_current(session) {
                    debug!(%session, "analysis completion for closed session ignored");
                    return;
                }
                self.on_analyzed(item, result);
            }
            Completion::Generated {
                session,
                items,
                result,
            } => {
                if !self.is_current(session) {
                    debug!(%session, "generation completion for closed session ignored");
                    return;
                }
                self.on_generated(items, result);
            }
            Completion::Crashed { op, message } => {
                error!(operation = op.as_str(), "background task died: {message}");
                self.notifications.push(
                    Severity::Error,
                    format!("The {} failed unexpectedly. See the log for details.", op.as_str()),
                );
                if op == Operation::Save {
                    self.finish_save();
                }
            }
        }
    }

    fn on_loaded(&mut self, path: Utf8PathBuf, discard: bool, result: PortResult<Workspace>) {
        match result {
            Ok(_) if self.workspace.is_dirty() && !discard => {
                info!(%path, "load finished after new edits; keeping them");
                self.notifications.push(
                    Severity::Warning,
                    format!("{path} was not opened because the current project has unsaved changes."),
                );
            }
            Ok(mut document) => {
                document.file_path = Some(path.clone());
                let name = document.project_name.clone();
                self.cancel_background_work();
                self.workspace.open_workspace(document);
                self.settings.record_recent(path);
                self.navigate_to(Section::Requirements, None);
                self.notifications
                    .push(Severity::Success, format!("Opened project '{name}'."));
            }
            Err(e) => {
                self.notifications.report_failure(Operation::Load, &e);
            }
        }
    }

    fn on_saved(
        &mut self,
        path: Utf8PathBuf,
        revision: u64,
        saved_at: DateTime<Utc>,
        result: PortResult<()>,
    ) {
        match result {
            Ok(()) => {
                let clean = self.workspace.mark_saved(&path, saved_at, revision);
                self.settings.record_recent(path.clone());
                if clean {
                    self.notifications
                        .push(Severity::Success, format!("Saved to {path}."));
                } else {
                    self.notifications.push(
                        Severity::Info,
                        format!("Saved to {path}; newer changes are not saved yet."),
                    );
                }
            }
            Err(e) => {
                self.notifications.report_failure(Operation::Save, &e);
            }
        }
    }

    fn on_imported(&mut self, path: Utf8PathBuf, result: PortResult<Vec<Requirement>>) {
        let imported = match result {
            Ok(imported) => imported,
            Err(e) => {
                self.last_import = Some(ImportOutcome::Failed(e.user_message(Operation::Import)));
                self.notifications.report_failure(Operation::Import, &e);
                return;
            }
        };

        match self.workspace.merge_imported(imported) {
            Ok(report) => {
                if report.is_empty() {
                    self.notifications.push(
                        Severity::Info,
                        format!("{path} contained no new or changed requirements."),
                    );
                } else {
                    info!(
                        %path,
                        added = report.added.len(),
                        updated = report.updated.len(),
                        "requirements imported"
                    );
                    self.notifications.push(
                        Severity::Success,
                        format!(
                            "Imported {} new and {} updated requirements.",
                            report.added.len(),
                            report.updated.len()
                        ),
                    );
                    self.navigate_to(Section::Requirements, None);
                }
                if !report.duplicates.is_empty() {
                    self.notifications.push(
                        Severity::Warning,
                        format!(
                            "Skipped duplicate identifiers in import: {}",
                            report.duplicates.join(", ")
                        ),
                    );
                }
                self.last_import = Some(ImportOutcome::Merged(report));
            }
            Err(e) => {
                warn!("import could not be applied: {e}");
                self.notifications.push(Severity::Warning, e.to_string());
                self.last_import = Some(ImportOutcome::Failed(e.to_string()));
            }
        }
    }

    fn on_analyzed(&mut self, item: RequirementItem, result: PortResult<AnalysisResult>) {
        match result {
            Ok(analysis) => {
                let score = analysis.quality_score;
                match self.workspace.apply_analysis(&item, analysis) {
                    Ok(()) => {
                        self.notifications.push(
                            Severity::Success,
                            format!("Analysis of {item} complete (quality {score}/10)."),
                        );
                    }
                    Err(e) => {
                        debug!(%item, "analysis result discarded: {e}");
                        self.notifications.push(
                            Severity::Warning,
                            format!("{item} was removed before its analysis finished."),
                        );
                    }
                }
            }
            Err(e) => {
                self.notifications.report_failure(Operation::Analyze, &e);
            }
        }
    }

    fn on_generated(&mut self, items: Vec<RequirementItem>, result: PortResult<Vec<TestCase>>) {
        let cases = match result {
            Ok(cases) => cases,
            Err(e) => {
                self.notifications.report_failure(Operation::Generate, &e);
                return;
            }
        };

        let mut by_item: BTreeMap<RequirementItem, Vec<TestCase>> = BTreeMap::new();
        for case in cases {
            if items.contains(&case.requirement_item) {
                by_item
                    .entry(case.requirement_item.clone())
                    .or_default()
                    .push(case);
            } else {
                debug!(item = %case.requirement_item, "test case for unrequested requirement dropped");
            }
        }

        let mut attached = 0;
        for (item, cases) in by_item {
            let count = cases.len();
            match self.workspace.attach_test_cases(&item, cases) {
                Ok(()) => attached += count,
                Err(e) => debug!(%item, "generated test cases discarded: {e}"),
            }
        }

        if attached == 0 {
            self.notifications
                .push(Severity::Warning, "No test cases were generated.");
        } else {
            self.notifications.push(
                Severity::Success,
                format!("Generated {attached} test cases."),
            );
        }
    }
}

impl Drop for AppKernel {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.broadcast.unsubscribe(self.on_closed);
    }
}

/// Runs a collaborator call under the kernel's cancellation token and a
/// deadline.
async fn guarded<T, F>(token: CancellationToken, limit: Duration, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    tokio::select! {
        _ = token.cancelled() => Err(PortError::Cancelled),
        outcome = tokio::time::timeout(limit, call) => {
            outcome.unwrap_or_else(|_| Err(PortError::Timeout(limit.as_secs())))
        }
    }
}
