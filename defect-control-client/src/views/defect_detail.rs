//! Defect detail screen: attachments, previews and comments
//!
//! On mount the defect, its attachments and its comments are fetched
//! concurrently. The attachment listing has a second home on some
//! deployments, so a failed primary probe falls back to the generic listing;
//! if both fail, whatever the defect record embeds is shown.

use defect_control_shared::auth::{require_capability, Capability};
use defect_control_shared::models::{
    Attachment, AttachmentId, Comment, CreateComment, Defect, DefectId, Identity, ProjectId,
};
use defect_control_shared::validation::validate_form;
use tokio::sync::watch;

use super::{Loadable, Notice, ViewScope, LOAD_FAILED};
use crate::api::ApiClient;
use crate::preview::{Preview, PreviewRegistry, PreviewSlot};
use crate::upload::{progress_channel, FileUpload, MultipartForm, ProgressReporter, UploadProgress};

/// Message shown when a comment cannot be posted
pub const COMMENT_FAILED: &str = "Failed to add comment";

/// Message shown when files cannot be uploaded
pub const ATTACH_FAILED: &str = "Failed to upload attachments";

/// Defect detail state
#[derive(Debug)]
pub struct DefectDetailView {
    scope: ViewScope,

    /// Owning project
    pub project_id: ProjectId,

    /// Defect being shown
    pub defect_id: DefectId,

    /// Defect record
    pub defect: Loadable<Defect>,

    /// Attachment metadata
    pub attachments: Vec<Attachment>,

    /// Comments, oldest first
    pub comments: Vec<Comment>,

    /// Comment input
    pub comment_draft: String,

    /// Feedback from the last action
    pub notice: Option<Notice>,

    preview: PreviewSlot,
    previewed: Option<AttachmentId>,
    progress: ProgressReporter,
    progress_rx: watch::Receiver<UploadProgress>,
}

impl DefectDetailView {
    /// Creates the view for a defect
    pub fn new(project_id: ProjectId, defect_id: DefectId) -> Self {
        let (progress, progress_rx) = progress_channel();

        Self {
            scope: ViewScope::new(),
            project_id,
            defect_id,
            defect: Loadable::Loading,
            attachments: Vec::new(),
            comments: Vec::new(),
            comment_draft: String::new(),
            notice: None,
            preview: PreviewSlot::default(),
            previewed: None,
            progress,
            progress_rx,
        }
    }

    /// Handle for unmounting from elsewhere
    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    fn defect_path(&self) -> String {
        format!("/projects/{}/defects/{}", self.project_id, self.defect_id)
    }

    /// Fetches the defect, attachments and comments concurrently
    pub async fn load(&mut self, client: &ApiClient) {
        let defect_path = self.defect_path();
        let comments_path = format!("{}/comments", defect_path);

        let fetches = async {
            tokio::join!(
                client.get::<Defect>(&defect_path),
                self.fetch_attachments(client),
                client.get_list::<Comment>(&comments_path, &[]),
            )
        };

        let Some((defect, attachments, comments)) = self.scope.run(fetches).await else {
            return;
        };

        let (embedded_attachments, embedded_comments) = match &defect {
            Ok(defect) => (defect.attachments.clone(), defect.comments.clone()),
            Err(_) => (Vec::new(), Vec::new()),
        };

        self.defect = match defect {
            Ok(defect) => Loadable::Ready(defect),
            Err(e) => {
                tracing::warn!(defect_id = self.defect_id, error = %e, "Failed to load defect");
                Loadable::Failed(LOAD_FAILED.to_string())
            }
        };

        self.attachments = attachments.unwrap_or(embedded_attachments);

        self.comments = match comments {
            Ok(comments) => comments,
            Err(e) => {
                tracing::debug!(defect_id = self.defect_id, error = %e, "Comments unavailable");
                embedded_comments
            }
        };
    }

    async fn fetch_attachments(&self, client: &ApiClient) -> Option<Vec<Attachment>> {
        let primary = format!("{}/attachments", self.defect_path());

        match client.get_list::<Attachment>(&primary, &[]).await {
            Ok(attachments) => return Some(attachments),
            Err(e) => tracing::debug!(error = %e, "Attachment listing unavailable, trying fallback"),
        }

        let defect_id = self.defect_id.to_string();
        match client
            .get_list::<Attachment>("/attachments", &[("defect_id", defect_id.as_str())])
            .await
        {
            Ok(attachments) => Some(attachments),
            Err(e) => {
                tracing::debug!(error = %e, "Fallback attachment listing unavailable");
                None
            }
        }
    }

    /// Posts the comment draft and appends the result
    pub async fn add_comment(&mut self, client: &ApiClient, user: Option<&Identity>) -> bool {
        self.notice = None;

        if let Err(e) = require_capability(user, Capability::Comment) {
            self.notice = Some(Notice::Error(e.to_string()));
            return false;
        }

        let form = CreateComment {
            body: self.comment_draft.trim().to_string(),
        };
        if let Err(errors) = validate_form(&form) {
            self.notice = Some(Notice::Error(errors[0].message.clone()));
            return false;
        }

        let path = format!("{}/comments", self.defect_path());
        match self.scope.run(client.post::<_, Comment>(&path, &form)).await {
            None => false,
            Some(Ok(comment)) => {
                tracing::info!(defect_id = self.defect_id, comment_id = comment.id, "Comment added");
                self.comments.push(comment);
                self.comment_draft.clear();
                true
            }
            Some(Err(e)) => {
                tracing::warn!(defect_id = self.defect_id, error = %e, "Comment failed");
                self.notice = Some(Notice::Error(e.user_message(COMMENT_FAILED)));
                false
            }
        }
    }

    /// Uploads more files to this defect
    pub async fn upload_files(&mut self, client: &ApiClient, user: Option<&Identity>, files: Vec<FileUpload>) -> bool {
        self.notice = None;

        if let Err(e) = require_capability(user, Capability::UploadAttachment) {
            self.notice = Some(Notice::Error(e.to_string()));
            return false;
        }
        if files.is_empty() {
            return false;
        }

        let path = format!("/projects/{}/attachments", self.project_id);
        let defect_id = self.defect_id.to_string();
        let query = [("defect_id", defect_id.as_str())];
        let upload = client.upload::<Attachment>(
            &path,
            &query,
            MultipartForm::files(files),
            Some(self.progress.clone()),
        );

        match self.scope.run(upload).await {
            None => false,
            Some(Ok(attachments)) => {
                self.attachments.extend(attachments);
                true
            }
            Some(Err(e)) => {
                tracing::warn!(defect_id = self.defect_id, error = %e, "Attachment upload failed");
                self.notice = Some(Notice::Error(e.user_message(ATTACH_FAILED)));
                false
            }
        }
    }

    /// Receiver following the current upload's progress
    pub fn upload_progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress_rx.clone()
    }

    /// Fetches an attachment's content and shows it, replacing any previous preview
    ///
    /// Best effort: failures are logged and leave the current preview alone.
    pub async fn preview(&mut self, client: &ApiClient, attachment_id: AttachmentId, registry: &PreviewRegistry) -> bool {
        let path = format!("/attachments/{}", attachment_id);

        match self.scope.run(client.get_bytes(&path)).await {
            Some(Ok(payload)) => {
                self.preview.replace(registry.create(payload.content_type, payload.data));
                self.previewed = Some(attachment_id);
                true
            }
            Some(Err(e)) => {
                tracing::debug!(attachment_id, error = %e, "Preview unavailable");
                false
            }
            None => false,
        }
    }

    /// Preview currently shown, with the attachment it belongs to
    pub fn current_preview(&self) -> Option<(AttachmentId, &Preview)> {
        self.previewed.zip(self.preview.get())
    }

    /// Unmounts the view, releasing the preview
    pub fn unmount(&mut self) {
        self.scope.unmount();
        self.preview.clear();
        self.previewed = None;
    }
}
