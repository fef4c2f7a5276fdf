//! Text rendering of the shell

use defect_control_client::session::SessionState;
use defect_control_client::upload::UploadProgress;
use defect_control_client::views::{AssigneeSearch, Loadable, Notice};
use defect_control_shared::models::Role;
use defect_control_shared::validation::FieldError;

use crate::app::{Screen, Shell};

/// Renders the header, the mounted screen and the shell status
pub fn render(shell: &Shell) -> String {
    let mut lines = vec![header(&shell.session().state())];

    if let (Some(route), Some(screen)) = (shell.route(), shell.screen()) {
        lines.push(format!("== {} ({}) ==", route.title(), route.path()));
        lines.extend(screen_lines(screen));
    }

    if let Some(status) = shell.status() {
        lines.push(String::new());
        lines.push(status.to_string());
    }

    lines.join("\n")
}

/// Navigation links and the signed-in identity
pub fn header(state: &SessionState) -> String {
    if state.loading {
        return "Defect Control | resolving session...".to_string();
    }

    match &state.user {
        None => "Defect Control | [login] [register]".to_string(),
        Some(user) => {
            let admin = if user.role == Role::Admin { " [users]" } else { "" };
            format!(
                "Defect Control | [projects] [profile]{} | {} ({}) [logout]",
                admin,
                user.label(),
                user.role
            )
        }
    }
}

/// One progress line for an upload
pub fn progress_line(progress: &UploadProgress) -> String {
    format!(
        "Uploading... {}% ({}/{} bytes)",
        progress.percent(),
        progress.sent,
        progress.total
    )
}

/// Assignee lookup results, empty when nothing matched
pub fn search_lines(search: &AssigneeSearch) -> Vec<String> {
    let results = search.results();
    if results.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("Assignees matching \"{}\":", search.query())];
    lines.extend(results.iter().map(|u| format!("  #{} {} <{}>", u.id, u.label(), u.email)));
    lines
}

/// Body of a mounted screen
pub fn screen_lines(screen: &Screen) -> Vec<String> {
    let mut lines = Vec::new();

    match screen {
        Screen::Login(view) => {
            lines.push(format!("Email: {}", view.email));
            lines.extend(view.error.iter().map(|e| format!("! {}", e)));
            lines.push("login <email> <password> | register".to_string());
        }
        Screen::Register(view) => {
            lines.push(format!("Name: {}", view.form.name));
            lines.push(format!("Email: {}", view.form.email));
            lines.extend(field_error_lines(&view.field_errors));
            lines.extend(view.error.iter().map(|e| format!("! {}", e)));
        }
        Screen::Projects(view) => {
            lines.extend(loadable_lines(&view.projects, |projects| {
                if projects.is_empty() {
                    return vec!["No projects yet".to_string()];
                }
                projects
                    .iter()
                    .map(|p| format!("  #{} {} - {}", p.id, p.name, display_or_dash(&p.address)))
                    .collect()
            }));
            if view.can_create {
                lines.push("[new-project]".to_string());
            }
        }
        Screen::NewProject(view) => {
            lines.push(format!("Name: {}", view.form.name));
            lines.push(format!("Address: {}", view.form.address));
            lines.extend(field_error_lines(&view.field_errors));
            lines.extend(view.error.iter().map(|e| format!("! {}", e)));
        }
        Screen::Project(view) => {
            lines.extend(loadable_lines(&view.project, |p| {
                vec![format!("{} - {}", p.name, display_or_dash(&p.address))]
            }));
            lines.push("Defects:".to_string());
            lines.extend(loadable_lines(&view.defects, |defects| {
                if defects.is_empty() {
                    return vec!["  none reported".to_string()];
                }
                defects
                    .iter()
                    .map(|d| {
                        format!(
                            "  #{} [{}] {} (assignee: {}, due: {}, attachments: {})",
                            d.id,
                            d.priority.as_str(),
                            d.title,
                            d.assignee_label(),
                            d.due_date.map(|date| date.to_string()).unwrap_or_else(|| "-".to_string()),
                            d.attachments.len()
                        )
                    })
                    .collect()
            }));

            let selected = view.selected_files();
            if !selected.is_empty() {
                let names: Vec<&str> = selected.iter().map(|f| f.file_name.as_str()).collect();
                lines.push(format!(
                    "Selected: {} ({} preview(s))",
                    names.join(", "),
                    view.previews().len()
                ));
            }

            lines.extend(search_lines(&view.search));

            lines.extend(field_error_lines(&view.field_errors));
            lines.extend(view.notice.iter().map(notice_line));
        }
        Screen::Defect(view) => {
            lines.extend(loadable_lines(&view.defect, |d| {
                vec![
                    format!("{} [{}]", d.title, d.priority.as_str()),
                    format!("Status: {}", d.status.as_deref().unwrap_or("-")),
                    format!("Assignee: {}", d.assignee_label()),
                    format!(
                        "Due: {}",
                        d.due_date.map(|date| date.to_string()).unwrap_or_else(|| "-".to_string())
                    ),
                    display_or_dash(&d.description).to_string(),
                ]
            }));

            lines.push("Attachments:".to_string());
            if view.attachments.is_empty() {
                lines.push("  none".to_string());
            }
            lines.extend(view.attachments.iter().map(|a| {
                format!("  #{} {} ({}, {} bytes)", a.id, a.display_name(), a.content_type, a.size)
            }));
            if let Some((id, preview)) = view.current_preview() {
                lines.push(format!(
                    "Preview of #{}: {} {} ({} bytes)",
                    id,
                    preview.reference(),
                    preview.content_type(),
                    preview.len()
                ));
            }

            lines.push("Comments:".to_string());
            if view.comments.is_empty() {
                lines.push("  none".to_string());
            }
            lines.extend(
                view.comments
                    .iter()
                    .map(|c| format!("  {}: {}", c.author_label(), c.body)),
            );
            lines.extend(view.notice.iter().map(notice_line));
        }
        Screen::Profile(view) => {
            lines.extend(loadable_lines(&view.profile, |p| vec![format!("Role: {}", p.role)]));
            lines.push(format!("Name: {}", view.form.name));
            lines.push(format!("Email: {}", view.form.email));
            lines.extend(field_error_lines(&view.field_errors));
            lines.extend(view.notice.iter().map(notice_line));
        }
        Screen::AdminUsers(view) => {
            lines.extend(loadable_lines(&view.users, |users| {
                users
                    .iter()
                    .map(|u| format!("  #{} {} <{}> {}", u.id, u.label(), u.email, u.role))
                    .collect()
            }));
            if let Some(pending) = &view.pending {
                lines.push(format!("? {} (confirm / cancel)", pending.prompt()));
            }
            lines.extend(view.notice.iter().map(notice_line));
        }
    }

    lines
}

fn loadable_lines<T>(value: &Loadable<T>, ready: impl FnOnce(&T) -> Vec<String>) -> Vec<String> {
    match value {
        Loadable::Loading => vec!["Loading...".to_string()],
        Loadable::Failed(message) => vec![format!("! {}", message)],
        Loadable::Ready(data) => ready(data),
    }
}

fn field_error_lines(errors: &[FieldError]) -> impl Iterator<Item = String> + '_ {
    errors.iter().map(|e| format!("  {}: {}", e.field, e.message))
}

fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::Info(message) => message.clone(),
        Notice::Error(message) => format!("! {}", message),
        Notice::Alert(message) => format!("!! {}", message),
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}
