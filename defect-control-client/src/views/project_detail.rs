//! Project detail screen: defect list and defect reporting
//!
//! On mount the project, its defects and the user list are fetched
//! concurrently; each lands in its own piece of state as it arrives. The user
//! list only feeds assignee suggestions, so its failure is silent.
//!
//! Reporting a defect sends exactly one creation request and then, when files
//! are selected, exactly one multipart upload referencing the new defect.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use defect_control_shared::auth::{require_capability, Capability};
use defect_control_shared::models::{
    Attachment, CreateDefect, Defect, DefectId, Identity, Priority, Project, ProjectId, UserId,
};
use defect_control_shared::validation::{validate_form, FieldError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{Loadable, Notice, ViewScope, LOAD_FAILED};
use crate::api::ApiClient;
use crate::debounce::{Debouncer, Ticket};
use crate::preview::{Preview, PreviewRegistry};
use crate::upload::{progress_channel, FileUpload, MultipartForm, ProgressReporter, UploadProgress};

/// Message shown when defect creation fails without a server explanation
pub const CREATE_DEFECT_FAILED: &str = "Failed to create defect";

/// Message shown when the defect was created but its files were not
pub const UPLOAD_FAILED: &str = "Defect created, but attachments failed to upload";

/// Debounced assignee lookup
///
/// Clones share results, so several in-flight searches can race and only the
/// newest input's response is kept.
#[derive(Debug, Clone)]
pub struct AssigneeSearch {
    client: ApiClient,
    debouncer: Debouncer,
    state: Arc<Mutex<SearchState>>,
}

#[derive(Debug, Default)]
struct SearchState {
    query: String,
    results: Vec<Identity>,
}

impl AssigneeSearch {
    /// Creates a search with the given quiescence delay
    pub fn new(client: ApiClient, delay: Duration) -> Self {
        Self {
            client,
            debouncer: Debouncer::new(delay),
            state: Arc::new(Mutex::new(SearchState::default())),
        }
    }

    /// Handles one input change
    ///
    /// Returns `true` if this input's results were applied. Blank input clears
    /// the results without a request.
    pub async fn input(&self, text: &str) -> bool {
        match self.claim(text) {
            Some((ticket, query)) => self.search(ticket, query).await,
            None => true,
        }
    }

    /// Handles one input change without waiting for the lookup
    ///
    /// The input takes its place in line immediately, so a burst of calls
    /// coalesces into one request for the last of them.
    pub fn input_in_background(&self, text: &str) -> JoinHandle<bool> {
        let claimed = self.claim(text);
        let search = self.clone();

        tokio::spawn(async move {
            match claimed {
                Some((ticket, query)) => search.search(ticket, query).await,
                None => true,
            }
        })
    }

    fn claim(&self, text: &str) -> Option<(Ticket, String)> {
        let query = text.trim().to_string();

        if query.is_empty() {
            self.debouncer.cancel();
            self.update(query, Vec::new());
            return None;
        }

        Some((self.debouncer.issue(), query))
    }

    async fn search(&self, ticket: Ticket, query: String) -> bool {
        let client = self.client.clone();
        let q = query.clone();
        let outcome = ticket
            .run(|| async move { client.get_list::<Identity>("/users", &[("q", q.as_str())]).await })
            .await;

        match outcome {
            None => false,
            Some(Ok(users)) => {
                tracing::debug!(query = %query, count = users.len(), "Assignee search applied");
                self.update(query, users);
                true
            }
            Some(Err(e)) => {
                tracing::debug!(query = %query, error = %e, "Assignee search failed");
                false
            }
        }
    }

    /// Query whose results are currently shown
    pub fn query(&self) -> String {
        self.with_state(|s| s.query.clone())
    }

    /// Current results
    pub fn results(&self) -> Vec<Identity> {
        self.with_state(|s| s.results.clone())
    }

    /// Supersedes any pending search
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    fn update(&self, query: String, results: Vec<Identity>) {
        self.with_state(|s| {
            s.query = query;
            s.results = results;
        });
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SearchState) -> R) -> R {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }
}

/// Defect report form inputs
#[derive(Debug, Clone, Default)]
pub struct DefectDraft {
    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// Priority
    pub priority: Priority,

    /// Assignee as typed: a user id, name or email
    pub assignee: String,

    /// Due date
    pub due_date: Option<NaiveDate>,
}

/// Project detail state
#[derive(Debug)]
pub struct ProjectDetailView {
    scope: ViewScope,

    /// Project being shown
    pub project_id: ProjectId,

    /// Project record
    pub project: Loadable<Project>,

    /// Defects, newest first after local creation
    pub defects: Loadable<Vec<Defect>>,

    /// Known users, for assignee suggestions
    pub users: Vec<Identity>,

    /// Defect report form
    pub draft: DefectDraft,

    /// Per-field validation errors from the last attempt
    pub field_errors: Vec<FieldError>,

    /// Feedback from the last action
    pub notice: Option<Notice>,

    /// Debounced assignee lookup
    pub search: AssigneeSearch,

    selected: Vec<FileUpload>,
    previews: Vec<Preview>,
    progress: ProgressReporter,
    progress_rx: watch::Receiver<UploadProgress>,
}

impl ProjectDetailView {
    /// Creates the view for a project
    pub fn new(project_id: ProjectId, client: &ApiClient, search_delay: Duration) -> Self {
        let (progress, progress_rx) = progress_channel();

        Self {
            scope: ViewScope::new(),
            project_id,
            project: Loadable::Loading,
            defects: Loadable::Loading,
            users: Vec::new(),
            draft: DefectDraft::default(),
            field_errors: Vec::new(),
            notice: None,
            search: AssigneeSearch::new(client.clone(), search_delay),
            selected: Vec::new(),
            previews: Vec::new(),
            progress,
            progress_rx,
        }
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Fetches project, defects and users concurrently
    pub async fn load(&mut self, client: &ApiClient) {
        let project_path = format!("/projects/{}", self.project_id);
        let defects_path = format!("/projects/{}/defects", self.project_id);

        let fetches = async {
            tokio::join!(
                client.get::<Project>(&project_path),
                client.get_list::<Defect>(&defects_path, &[]),
                client.get_list::<Identity>("/users", &[]),
            )
        };

        let Some((project, defects, users)) = self.scope.run(fetches).await else {
            return;
        };

        self.project = match project {
            Ok(project) => Loadable::Ready(project),
            Err(e) => {
                tracing::warn!(project_id = self.project_id, error = %e, "Failed to load project");
                Loadable::Failed(LOAD_FAILED.to_string())
            }
        };

        self.defects = match defects {
            Ok(defects) => Loadable::Ready(defects),
            Err(e) => {
                tracing::warn!(project_id = self.project_id, error = %e, "Failed to load defects");
                Loadable::Failed(LOAD_FAILED.to_string())
            }
        };

        match users {
            Ok(users) => self.users = users,
            Err(e) => tracing::debug!(error = %e, "User list unavailable"),
        }
    }

    /// Replaces the file selection; previews of the old selection are released
    pub fn select_files(&mut self, files: Vec<FileUpload>, registry: &PreviewRegistry) {
        self.previews = files
            .iter()
            .filter(|f| f.is_image())
            .map(|f| registry.create(f.content_type.clone(), f.data.clone()))
            .collect();
        self.selected = files;
    }

    /// Files selected for the next report
    pub fn selected_files(&self) -> &[FileUpload] {
        &self.selected
    }

    /// Previews of selected images
    pub fn previews(&self) -> &[Preview] {
        &self.previews
    }

    /// Receiver following the current upload's progress
    pub fn upload_progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress_rx.clone()
    }

    /// Resolves the typed assignee against known users
    ///
    /// A numeric input is taken as a user id; otherwise the name or email must
    /// match a known user, ignoring case.
    pub fn resolve_assignee(&self, input: &str) -> Result<Option<UserId>, FieldError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        if let Ok(id) = input.parse::<UserId>() {
            return Ok(Some(id));
        }

        let searched = self.search.results();
        self.users
            .iter()
            .chain(searched.iter())
            .find(|u| u.name.eq_ignore_ascii_case(input) || u.email.eq_ignore_ascii_case(input))
            .map(|u| Some(u.id))
            .ok_or_else(|| FieldError {
                field: "assignee".to_string(),
                message: "Unknown assignee".to_string(),
            })
    }

    /// Reports a defect from the draft, then uploads selected files
    ///
    /// Returns the new defect's id when it was created, even if the upload
    /// failed afterwards.
    pub async fn create_defect(&mut self, client: &ApiClient, user: Option<&Identity>) -> Option<DefectId> {
        self.notice = None;
        self.field_errors.clear();

        if let Err(e) = require_capability(user, Capability::ReportDefect) {
            self.notice = Some(Notice::Error(e.to_string()));
            return None;
        }

        let assignee_id = match self.resolve_assignee(&self.draft.assignee) {
            Ok(id) => id,
            Err(error) => {
                self.field_errors.push(error);
                return None;
            }
        };

        let form = CreateDefect {
            title: self.draft.title.trim().to_string(),
            description: self.draft.description.trim().to_string(),
            priority: self.draft.priority,
            assignee_id,
            due_date: self.draft.due_date,
        };

        if let Err(errors) = validate_form(&form) {
            self.field_errors = errors;
            return None;
        }

        let path = format!("/projects/{}/defects", self.project_id);
        let created = match self.scope.run(client.post::<_, Defect>(&path, &form)).await {
            None => return None,
            Some(Ok(defect)) => defect,
            Some(Err(e)) => {
                tracing::warn!(project_id = self.project_id, error = %e, "Defect creation failed");
                self.notice = Some(Notice::Error(e.user_message(CREATE_DEFECT_FAILED)));
                return None;
            }
        };

        let defect_id = created.id;
        tracing::info!(project_id = self.project_id, defect_id, "Defect created");

        match self.defects.ready_mut() {
            Some(defects) => defects.insert(0, created),
            None => self.defects = Loadable::Ready(vec![created]),
        }

        if !self.selected.is_empty() {
            let form = MultipartForm::files(std::mem::take(&mut self.selected));
            match self.upload(client, defect_id, form).await {
                Some(Ok(attachments)) => {
                    if let Some(defect) = self
                        .defects
                        .ready_mut()
                        .and_then(|d| d.iter_mut().find(|d| d.id == defect_id))
                    {
                        defect.attachments.extend(attachments);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(defect_id, error = %e, "Attachment upload failed");
                    self.notice = Some(Notice::Error(UPLOAD_FAILED.to_string()));
                }
                None => return Some(defect_id),
            }
        }

        self.draft = DefectDraft::default();
        self.selected.clear();
        self.previews.clear();

        Some(defect_id)
    }

    async fn upload(
        &self,
        client: &ApiClient,
        defect_id: DefectId,
        form: MultipartForm,
    ) -> Option<crate::error::ClientResult<Vec<Attachment>>> {
        let path = format!("/projects/{}/attachments", self.project_id);
        let defect_id = defect_id.to_string();

        self.scope
            .run(client.upload::<Attachment>(
                &path,
                &[("defect_id", defect_id.as_str())],
                form,
                Some(self.progress.clone()),
            ))
            .await
    }

    /// Unmounts the view, releasing previews and pending searches
    pub fn unmount(&mut self) {
        self.scope.unmount();
        self.search.cancel();
        self.previews.clear();
    }
}
