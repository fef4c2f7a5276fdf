/// Integration tests for the navigation shell
///
/// The shell runs against a scripted transport:
/// - Guard redirects on startup and navigation
/// - Login and logout through commands
/// - Role changes with confirmation and the self-change refusal
/// - Defect reporting with a selected attachment
/// - Preview release when a view unmounts
/// - Assignee searches coalescing into one lookup
use std::sync::Arc;
use std::time::Duration;

use defect_control_client::api::ApiClient;
use defect_control_client::routes::Route;
use defect_control_client::session::Session;
use defect_control_client::token_store::MemoryTokenStore;
use defect_control_client::transport::{Method, MockTransport};
use defect_control_shared::models::Role;
use defect_control_shell::app::{Flow, Shell};
use defect_control_shell::commands::{parse, Command};
use defect_control_shell::render::render;
use serde_json::{json, Value};

fn identity(id: u64, name: &str, role: &str) -> Value {
    json!({"id": id, "name": name, "email": format!("{}@site.com", name.to_lowercase()), "role": role})
}

async fn shell_for(mock: &MockTransport, user: Option<Value>) -> Shell {
    let tokens = match user {
        Some(user) => {
            mock.on_json(Method::GET, "/auth/me", 200, json!({"status": "ok", "data": user}));
            MemoryTokenStore::with_token("T1")
        }
        None => MemoryTokenStore::new(),
    };

    let client = ApiClient::new(Arc::new(mock.clone()), Arc::new(tokens));
    let session = Session::start(client).await;
    Shell::start(session, Duration::from_millis(300)).await
}

async fn run(shell: &mut Shell, line: &str) -> Flow {
    let command = parse(line).unwrap().unwrap();
    shell.execute(command).await
}

/// Signed-out start is redirected to the sign-in screen
#[tokio::test]
async fn test_signed_out_start_shows_login() {
    let mock = MockTransport::new();
    let shell = shell_for(&mock, None).await;

    assert_eq!(shell.route(), Some(Route::Login));
    assert!(render(&shell).starts_with("Defect Control | [login] [register]"));
    assert!(mock.requests().is_empty());
}

/// Login navigates home and the header shows the identity
#[tokio::test]
async fn test_login_and_logout_commands() {
    let mock = MockTransport::new();
    mock.on_json(
        Method::POST,
        "/auth/login",
        200,
        json!({"token": "T1", "user": identity(3, "Anna", "engineer")}),
    );
    mock.on_json(Method::GET, "/projects", 200, json!({"status": "ok", "data": null}));

    let mut shell = shell_for(&mock, None).await;
    run(&mut shell, "login anna@site.com secret-password").await;

    assert_eq!(shell.route(), Some(Route::Projects));
    let screen = render(&shell);
    assert!(screen.contains("Anna (engineer) [logout]"));
    assert!(screen.contains("No projects yet"));
    assert!(!screen.contains("[new-project]"));

    run(&mut shell, "logout").await;
    assert_eq!(shell.route(), Some(Route::Login));
    assert!(shell.session().user().is_none());

    assert_eq!(run(&mut shell, "quit").await, Flow::Quit);
}

/// Non-admins never reach the user administration screen
#[tokio::test]
async fn test_engineer_redirected_from_users() {
    let mock = MockTransport::new();
    let mut shell = shell_for(&mock, Some(identity(3, "Anna", "engineer"))).await;

    shell.execute(Command::Go(Route::AdminUsers)).await;

    assert_eq!(shell.route(), Some(Route::Projects));
    assert_eq!(mock.count(Method::GET, "/users"), 0);
}

/// Role change asks first, sends one PATCH, and refuses self-changes
#[tokio::test]
async fn test_admin_role_change() {
    let mock = MockTransport::new();
    mock.on_json(
        Method::GET,
        "/users",
        200,
        json!({"status": "ok", "data": [identity(2, "Ivan", "engineer"), identity(1, "Root", "admin")]}),
    );
    mock.on_json(Method::PATCH, "/users/2", 200, json!({"status": "ok", "data": identity(2, "Ivan", "manager")}));

    let mut shell = shell_for(&mock, Some(identity(1, "Root", "admin"))).await;
    run(&mut shell, "users").await;
    assert_eq!(shell.route(), Some(Route::AdminUsers));

    run(&mut shell, "role 2 manager").await;
    assert_eq!(shell.status(), Some("Change role of Ivan to manager? (confirm / cancel)"));
    assert_eq!(mock.count(Method::PATCH, "/users/2"), 0);

    run(&mut shell, "confirm").await;
    let patches = mock.requests_to(Method::PATCH, "/users/2");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].json, Some(json!({"role": "manager"})));
    assert!(render(&shell).contains("#2 Ivan <ivan@site.com> manager"));

    run(&mut shell, "role 1 engineer").await;
    assert!(render(&shell).contains("!! You cannot change your own role"));
    run(&mut shell, "confirm").await;
    assert_eq!(shell.status(), Some("Nothing to confirm"));
    assert_eq!(mock.count(Method::PATCH, "/users/1"), 0);
    assert_eq!(shell.session().user().map(|u| u.role), Some(Role::Admin));
}

/// Reporting with a selected file sends one POST and one upload
#[tokio::test]
async fn test_report_with_attachment() {
    let mock = MockTransport::new();
    mock.on_json(Method::GET, "/projects/3", 200, json!({"status": "ok", "data": {"id": 3, "name": "Depot"}}));
    mock.on_json(Method::GET, "/projects/3/defects", 200, json!({"status": "ok", "data": null}));
    mock.on_json(Method::GET, "/users", 200, json!({"status": "ok", "data": [identity(3, "Anna", "engineer")]}));
    mock.on_json(
        Method::POST,
        "/projects/3/defects",
        201,
        json!({"status": "ok", "data": {"id": 9, "title": "Leak", "priority": "high"}}),
    );
    mock.on_json(
        Method::POST,
        "/projects/3/attachments",
        201,
        json!({"status": "ok", "data": [{"id": 1, "filename": "crack.png", "content_type": "image/png", "size": 4}]}),
    );

    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("crack.png");
    std::fs::write(&photo, [137u8, 80, 78, 71]).unwrap();

    let mut shell = shell_for(&mock, Some(identity(3, "Anna", "engineer"))).await;
    run(&mut shell, "open 3").await;

    shell.execute(Command::Attach(vec![photo])).await;
    assert_eq!(shell.previews().live(), 1);
    assert!(render(&shell).contains("Selected: crack.png (1 preview(s))"));

    run(&mut shell, "report Leak | Basement wall | high | Anna").await;

    assert_eq!(shell.status(), Some("Reported defect #9"));
    let posts = mock.requests_to(Method::POST, "/projects/3/defects");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].json.as_ref().unwrap()["assignee_id"], json!(3));

    let uploads = mock.requests_to(Method::POST, "/projects/3/attachments");
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].query_value("defect_id"), Some("9"));
    assert_eq!(uploads[0].files, vec!["crack.png".to_string()]);

    assert_eq!(shell.previews().live(), 0);
    assert!(render(&shell).contains("#9 [high] Leak"));
}

/// Navigating away unmounts the view and releases its previews
#[tokio::test]
async fn test_navigation_releases_previews() {
    let mock = MockTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("tile.jpg");
    std::fs::write(&photo, [1u8, 2, 3]).unwrap();

    let mut shell = shell_for(&mock, Some(identity(3, "Anna", "engineer"))).await;
    run(&mut shell, "open 5").await;
    shell.execute(Command::Attach(vec![photo])).await;
    assert_eq!(shell.previews().live(), 1);

    run(&mut shell, "projects").await;
    assert_eq!(shell.previews().live(), 0);
    assert_eq!(mock.count(Method::POST, "/projects/5/attachments"), 0);
}

/// Screen-specific commands are refused elsewhere
#[tokio::test]
async fn test_commands_outside_their_screen() {
    let mock = MockTransport::new();
    let mut shell = shell_for(&mock, Some(identity(3, "Anna", "engineer"))).await;

    run(&mut shell, "comment Looks fine").await;
    assert_eq!(shell.status(), Some("`comment` is not available on this screen"));

    run(&mut shell, "defect 4").await;
    assert_eq!(shell.status(), Some("Open a project first"));
    assert_eq!(shell.route(), Some(Route::Projects));

    run(&mut shell, "open 2").await;
    run(&mut shell, "defect 4").await;
    assert_eq!(
        shell.route(),
        Some(Route::Defect {
            project_id: 2,
            defect_id: 4
        })
    );
}

/// A burst of searches sends one lookup for the last input
#[tokio::test(start_paused = true)]
async fn test_search_burst_sends_one_lookup() {
    let mock = MockTransport::new();
    mock.on_json(Method::GET, "/users", 200, json!({"status": "ok", "data": [identity(7, "Ivan", "engineer")]}));

    let mut shell = shell_for(&mock, Some(identity(3, "Anna", "engineer"))).await;
    run(&mut shell, "open 3").await;

    for line in ["search i", "search iv", "search iva"] {
        run(&mut shell, line).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    let lookups: Vec<_> = mock
        .requests_to(Method::GET, "/users")
        .into_iter()
        .filter(|r| r.query_value("q").is_some())
        .collect();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].query_value("q"), Some("iva"));
    assert!(render(&shell).contains("Assignees matching \"iva\":"));
}
