//! Navigation shell
//!
//! The shell owns the session, the mounted screen and the current route.
//! Every navigation re-evaluates the route guard, follows redirects, unmounts
//! the previous screen and then mounts and loads the next one.
//!
//! ```text
//! navigate(route)
//!   ├─> guard: Allow | Pending (wait for session) | Redirect(next) -> loop
//!   ├─> previous screen unmounted (late results dropped, previews released)
//!   └─> next screen mounted and loaded
//! ```

use std::path::PathBuf;
use std::time::Duration;

use defect_control_client::guard::{self, GuardDecision};
use defect_control_client::preview::PreviewRegistry;
use defect_control_client::routes::Route;
use defect_control_client::session::Session;
use defect_control_client::upload::{FileUpload, UploadProgress};
use defect_control_client::views::project_detail::DefectDraft;
use defect_control_client::views::{
    AdminUsersView, CreateProjectView, DefectDetailView, LoginView, ProfileView, ProjectDetailView,
    ProjectListView, RegisterView, RoleChangeStep,
};
use defect_control_shared::models::{
    AttachmentId, CreateProject, ProjectId, RegisterUser, Role, UpdateProfile, UserId,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use crate::commands::{Command, ReportFields, HELP};
use crate::render::{progress_line, search_lines};

/// Mounted view
#[derive(Debug)]
pub enum Screen {
    Login(LoginView),
    Register(RegisterView),
    Projects(ProjectListView),
    NewProject(CreateProjectView),
    Project(ProjectDetailView),
    Defect(DefectDetailView),
    Profile(ProfileView),
    AdminUsers(AdminUsersView),
}

impl Screen {
    fn for_route(route: Route, session: &Session, search_delay: Duration) -> Self {
        match route {
            Route::Login => Screen::Login(LoginView::new()),
            Route::Register => Screen::Register(RegisterView::new()),
            Route::Projects => Screen::Projects(ProjectListView::new(session.user().as_ref())),
            Route::NewProject => Screen::NewProject(CreateProjectView::new()),
            Route::Project(id) => Screen::Project(ProjectDetailView::new(id, session.client(), search_delay)),
            Route::Defect {
                project_id,
                defect_id,
            } => Screen::Defect(DefectDetailView::new(project_id, defect_id)),
            Route::Profile => Screen::Profile(ProfileView::new()),
            Route::AdminUsers => Screen::AdminUsers(AdminUsersView::new()),
        }
    }

    async fn load(&mut self, session: &Session) {
        let client = session.client();
        match self {
            Screen::Projects(view) => view.load(client).await,
            Screen::Project(view) => view.load(client).await,
            Screen::Defect(view) => view.load(client).await,
            Screen::Profile(view) => view.load(client).await,
            Screen::AdminUsers(view) => view.load(client).await,
            Screen::Login(_) | Screen::Register(_) | Screen::NewProject(_) => {}
        }
    }

    fn unmount(&mut self) {
        match self {
            Screen::Projects(view) => view.unmount(),
            Screen::Project(view) => view.unmount(),
            Screen::Defect(view) => view.unmount(),
            Screen::Profile(view) => view.unmount(),
            Screen::AdminUsers(view) => view.unmount(),
            Screen::Login(view) => view.unmount(),
            Screen::Register(view) => view.unmount(),
            Screen::NewProject(view) => view.unmount(),
        }
    }
}

/// Whether the input loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive shell state
#[derive(Debug)]
pub struct Shell {
    session: Session,
    previews: PreviewRegistry,
    search_delay: Duration,
    route: Option<Route>,
    screen: Option<Screen>,
    status: Option<String>,
}

impl Shell {
    /// Creates a shell with nothing mounted
    pub fn new(session: Session, search_delay: Duration) -> Self {
        Self {
            session,
            previews: PreviewRegistry::new(),
            search_delay,
            route: None,
            screen: None,
            status: None,
        }
    }

    /// Creates a shell and mounts the home route
    pub async fn start(session: Session, search_delay: Duration) -> Self {
        let mut shell = Self::new(session, search_delay);
        shell.navigate(Route::HOME).await;
        shell
    }

    /// Session shared with the views
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Route of the mounted screen
    pub fn route(&self) -> Option<Route> {
        self.route
    }

    /// Mounted screen
    pub fn screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    /// Shell-level message from the last command
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Registry tracking live previews
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Navigates through the guards and mounts the resulting screen
    ///
    /// Returns the route actually mounted.
    pub async fn navigate(&mut self, requested: Route) -> Route {
        let route = self.resolve(requested).await;

        if let Some(mut previous) = self.screen.take() {
            previous.unmount();
        }

        let mut screen = Screen::for_route(route, &self.session, self.search_delay);
        screen.load(&self.session).await;

        self.screen = Some(screen);
        self.route = Some(route);
        tracing::info!(requested = %requested, route = %route, "Navigated");

        route
    }

    async fn resolve(&self, mut route: Route) -> Route {
        loop {
            match guard::evaluate(route, &self.session.state()) {
                GuardDecision::Allow => return route,
                GuardDecision::Redirect(next) => {
                    tracing::debug!(from = %route, to = %next, "Redirected");
                    route = next;
                }
                GuardDecision::Pending => {
                    let mut rx = self.session.subscribe();
                    let resolved = rx.wait_for(|state| !state.loading).await.is_ok();
                    if !resolved {
                        return Route::Login;
                    }
                }
            }
        }
    }

    /// Runs one command against the mounted screen
    pub async fn execute(&mut self, command: Command) -> Flow {
        self.status = None;

        match command {
            Command::Go(route) => {
                self.navigate(route).await;
            }
            Command::OpenDefect(defect_id) => match self.current_project() {
                Some(project_id) => {
                    self.navigate(Route::Defect {
                        project_id,
                        defect_id,
                    })
                    .await;
                }
                None => self.status = Some("Open a project first".to_string()),
            },
            Command::Refresh => {
                if let Some(route) = self.route {
                    self.navigate(route).await;
                }
            }
            Command::Login { email, password } => self.login(email, password).await,
            Command::Register { name, email, password } => self.register(RegisterUser { name, email, password }).await,
            Command::Logout => {
                self.session.logout();
                self.navigate(Route::Login).await;
            }
            Command::CreateProject { name, address } => self.create_project(CreateProject { name, address }).await,
            Command::Report(fields) => self.report(fields).await,
            Command::Attach(paths) => self.attach(paths).await,
            Command::Comment(text) => self.comment(text).await,
            Command::Preview(id) => self.preview(id).await,
            Command::Search(text) => self.search(text),
            Command::SaveProfile { name, email } => self.save_profile(UpdateProfile { name, email }).await,
            Command::Role { user_id, role } => self.request_role(user_id, role),
            Command::Confirm => self.confirm_role().await,
            Command::Cancel => self.cancel_role(),
            Command::Help => self.status = Some(HELP.to_string()),
            Command::Quit => return Flow::Quit,
        }

        Flow::Continue
    }

    fn current_project(&self) -> Option<ProjectId> {
        match self.route? {
            Route::Project(id) => Some(id),
            Route::Defect { project_id, .. } => Some(project_id),
            _ => None,
        }
    }

    async fn login(&mut self, email: String, password: String) {
        if !matches!(self.screen, Some(Screen::Login(_))) {
            self.navigate(Route::Login).await;
        }
        let Some(Screen::Login(view)) = self.screen.as_mut() else {
            return;
        };

        view.email = email;
        view.password = password;
        let next = view.submit(&self.session).await;

        if let Some(route) = next {
            self.navigate(route).await;
        }
    }

    async fn register(&mut self, form: RegisterUser) {
        if !matches!(self.screen, Some(Screen::Register(_))) {
            self.navigate(Route::Register).await;
        }
        let Some(Screen::Register(view)) = self.screen.as_mut() else {
            return;
        };

        view.form = form;
        let next = view.submit(self.session.client()).await;

        if let Some(route) = next {
            self.navigate(route).await;
            self.status = Some("Account created; sign in to continue".to_string());
        }
    }

    async fn create_project(&mut self, form: CreateProject) {
        if !matches!(self.screen, Some(Screen::NewProject(_))) {
            self.navigate(Route::NewProject).await;
        }
        let Some(Screen::NewProject(view)) = self.screen.as_mut() else {
            self.status = unavailable("new-project");
            return;
        };

        view.form = form;
        let user = self.session.user();
        let next = view.submit(self.session.client(), user.as_ref()).await;

        if let Some(route) = next {
            self.navigate(route).await;
        }
    }

    async fn report(&mut self, fields: ReportFields) {
        let Some(Screen::Project(view)) = self.screen.as_mut() else {
            self.status = unavailable("report");
            return;
        };

        view.draft = DefectDraft {
            title: fields.title,
            description: fields.description,
            priority: fields.priority,
            assignee: fields.assignee,
            due_date: fields.due_date,
        };

        let follower = follow_progress(view.upload_progress());
        let user = self.session.user();
        let created = view.create_defect(self.session.client(), user.as_ref()).await;
        follower.abort();

        if let Some(id) = created {
            self.status = Some(format!("Reported defect #{}", id));
        }
    }

    async fn attach(&mut self, paths: Vec<PathBuf>) {
        if !matches!(self.screen, Some(Screen::Project(_)) | Some(Screen::Defect(_))) {
            self.status = unavailable("attach");
            return;
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            match FileUpload::from_path(path).await {
                Ok(file) => files.push(file),
                Err(e) => {
                    self.status = Some(e.to_string());
                    return;
                }
            }
        }
        let count = files.len();

        match self.screen.as_mut() {
            Some(Screen::Project(view)) => {
                view.select_files(files, &self.previews);
                self.status = Some(format!("{} file(s) selected for the next report", count));
            }
            Some(Screen::Defect(view)) => {
                let follower = follow_progress(view.upload_progress());
                let user = self.session.user();
                let uploaded = view.upload_files(self.session.client(), user.as_ref(), files).await;
                follower.abort();

                if uploaded {
                    self.status = Some(format!("Uploaded {} file(s)", count));
                }
            }
            _ => {}
        }
    }

    async fn comment(&mut self, text: String) {
        let Some(Screen::Defect(view)) = self.screen.as_mut() else {
            self.status = unavailable("comment");
            return;
        };

        view.comment_draft = text;
        let user = self.session.user();
        view.add_comment(self.session.client(), user.as_ref()).await;
    }

    async fn preview(&mut self, attachment_id: AttachmentId) {
        let Some(Screen::Defect(view)) = self.screen.as_mut() else {
            self.status = unavailable("preview");
            return;
        };

        let shown = view.preview(self.session.client(), attachment_id, &self.previews).await;
        if !shown {
            self.status = Some(format!("No preview for attachment #{}", attachment_id));
        }
    }

    fn search(&mut self, text: String) {
        let Some(Screen::Project(view)) = self.screen.as_mut() else {
            self.status = unavailable("search");
            return;
        };

        let search = view.search.clone();
        let lookup = view.search.input_in_background(&text);
        tokio::spawn(async move {
            if let Ok(true) = lookup.await {
                eprintln!("{}", search_lines(&search).join("\n"));
            }
        });
    }

    async fn save_profile(&mut self, form: UpdateProfile) {
        let Some(Screen::Profile(view)) = self.screen.as_mut() else {
            self.status = unavailable("save-profile");
            return;
        };

        view.form = form;
        view.save(&self.session).await;
    }

    fn request_role(&mut self, user_id: UserId, role: Role) {
        let Some(actor) = self.session.user() else {
            self.status = unavailable("role");
            return;
        };
        let Some(Screen::AdminUsers(view)) = self.screen.as_mut() else {
            self.status = unavailable("role");
            return;
        };

        if let RoleChangeStep::AwaitingConfirmation(pending) = view.request_role_change(&actor, user_id, role) {
            self.status = Some(format!("{} (confirm / cancel)", pending.prompt()));
        }
    }

    async fn confirm_role(&mut self) {
        let Some(actor) = self.session.user() else {
            self.status = unavailable("confirm");
            return;
        };
        let Some(Screen::AdminUsers(view)) = self.screen.as_mut() else {
            self.status = unavailable("confirm");
            return;
        };

        if view.pending.is_none() {
            self.status = Some("Nothing to confirm".to_string());
            return;
        }
        if view.confirm(self.session.client(), &actor).await {
            self.status = Some("Role updated".to_string());
        }
    }

    fn cancel_role(&mut self) {
        let Some(Screen::AdminUsers(view)) = self.screen.as_mut() else {
            self.status = unavailable("cancel");
            return;
        };

        view.cancel();
        self.status = Some("Cancelled".to_string());
    }
}

fn unavailable(command: &str) -> Option<String> {
    Some(format!("`{}` is not available on this screen", command))
}

/// Prints upload progress to stderr until aborted
fn follow_progress(rx: watch::Receiver<UploadProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut updates = WatchStream::from_changes(rx);
        while let Some(progress) = updates.next().await {
            if progress.total > 0 {
                eprintln!("{}", progress_line(&progress));
            }
        }
    })
}
