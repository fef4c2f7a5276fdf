//! Shell command parsing
//!
//! One command per line. Multi-field commands separate their fields with `|`
//! so titles and descriptions can contain spaces:
//!
//! ```text
//! report Cracked tile | Lobby floor, row 3 | high | anna@site.com | 2024-06-01
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use defect_control_client::routes::{Route, UnknownRoute};
use defect_control_shared::models::{AttachmentId, DefectId, Priority, Role, UserId};

/// Help text listing every command
pub const HELP: &str = "\
Navigation:
  go <path>                         open a path, e.g. go /projects/3
  projects | open <id> | defect <id> | profile | users
  refresh                           reload the current screen
Account:
  login <email> <password>
  register <name> | <email> | <password>
  logout
Projects:
  new-project [<name> | <address>]
  report <title> [| <description> | <priority> | <assignee> | <YYYY-MM-DD>]
  attach <file>...                  select files for the next report, or upload to a defect
  search <text>                     look up assignees
Defects:
  comment <text>
  preview <attachment id>
Profile:
  save-profile <name> | <email>
Users (admin):
  role <user id> <engineer|manager|admin>
  confirm | cancel
Other:
  help | quit";

/// Parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Navigate to a route
    Go(Route),

    /// Open a defect of the current project
    OpenDefect(DefectId),

    /// Re-mount the current screen
    Refresh,

    /// Sign in
    Login { email: String, password: String },

    /// Create an account
    Register {
        name: String,
        email: String,
        password: String,
    },

    /// Sign out
    Logout,

    /// Submit the project creation form
    CreateProject { name: String, address: String },

    /// Report a defect in the current project
    Report(ReportFields),

    /// Select files or upload them to the current defect
    Attach(Vec<PathBuf>),

    /// Comment on the current defect
    Comment(String),

    /// Preview an attachment of the current defect
    Preview(AttachmentId),

    /// Assignee lookup
    Search(String),

    /// Save the profile form
    SaveProfile { name: String, email: String },

    /// Ask to change a user's role
    Role { user_id: UserId, role: Role },

    /// Confirm the pending role change
    Confirm,

    /// Drop the pending role change
    Cancel,

    /// Show help
    Help,

    /// Leave the shell
    Quit,
}

/// Fields of a defect report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub assignee: String,
    pub due_date: Option<NaiveDate>,
}

/// Error type for command parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },

    #[error(transparent)]
    Route(#[from] UnknownRoute),
}

/// Parses one input line; blank lines yield `None`
///
/// # Errors
///
/// Returns `CommandError` for unknown verbs and malformed arguments.
///
/// # Example
///
/// ```
/// use defect_control_client::routes::Route;
/// use defect_control_shell::commands::{parse, Command};
///
/// assert_eq!(parse("open 3").unwrap(), Some(Command::Go(Route::Project(3))));
/// assert_eq!(parse("   ").unwrap(), None);
/// ```
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "go" => Command::Go(required(rest, "go <path>")?.parse()?),
        "projects" => Command::Go(Route::Projects),
        "open" => Command::Go(Route::Project(number(rest, "project id", "open <project id>")?)),
        "defect" => Command::OpenDefect(number(rest, "defect id", "defect <defect id>")?),
        "profile" => Command::Go(Route::Profile),
        "users" => Command::Go(Route::AdminUsers),
        "refresh" | "reload" => Command::Refresh,
        "login" => {
            const USAGE: &str = "login <email> <password>";
            match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(CommandError::Usage(USAGE)),
            }
        }
        "register" => {
            let f = fields(rest, 3, 3, "register <name> | <email> | <password>")?;
            Command::Register {
                name: f[0].clone(),
                email: f[1].clone(),
                password: f[2].clone(),
            }
        }
        "logout" => Command::Logout,
        "new-project" if rest.is_empty() => Command::Go(Route::NewProject),
        "new-project" => {
            let f = fields(rest, 1, 2, "new-project <name> | <address>")?;
            Command::CreateProject {
                name: f[0].clone(),
                address: f.get(1).cloned().unwrap_or_default(),
            }
        }
        "report" => Command::Report(report(rest)?),
        "attach" => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(CommandError::Usage("attach <file>..."));
            }
            Command::Attach(paths)
        }
        "comment" => Command::Comment(required(rest, "comment <text>")?.to_string()),
        "preview" => Command::Preview(number(rest, "attachment id", "preview <attachment id>")?),
        "search" => Command::Search(rest.to_string()),
        "save-profile" => {
            let f = fields(rest, 2, 2, "save-profile <name> | <email>")?;
            Command::SaveProfile {
                name: f[0].clone(),
                email: f[1].clone(),
            }
        }
        "role" => {
            const USAGE: &str = "role <user id> <engineer|manager|admin>";
            match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [user_id, role] => Command::Role {
                    user_id: number(user_id, "user id", USAGE)?,
                    role: role.parse().map_err(|_| CommandError::Invalid {
                        field: "role",
                        value: role.to_string(),
                    })?,
                },
                _ => return Err(CommandError::Usage(USAGE)),
            }
        }
        "confirm" | "yes" => Command::Confirm,
        "cancel" | "no" => Command::Cancel,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(rest)
}

fn number(value: &str, field: &'static str, usage: &'static str) -> Result<u64, CommandError> {
    let value = required(value.trim(), usage)?;
    value.parse().map_err(|_| CommandError::Invalid {
        field,
        value: value.to_string(),
    })
}

/// Splits `|`-separated fields, requiring a non-empty first field
fn fields(rest: &str, min: usize, max: usize, usage: &'static str) -> Result<Vec<String>, CommandError> {
    let parts: Vec<String> = rest.split('|').map(|p| p.trim().to_string()).collect();

    if parts.len() < min || parts.len() > max || parts[0].is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(parts)
}

fn report(rest: &str) -> Result<ReportFields, CommandError> {
    let f = fields(
        rest,
        1,
        5,
        "report <title> [| <description> | <priority> | <assignee> | <YYYY-MM-DD>]",
    )?;
    let field = |i: usize| f.get(i).map(String::as_str).unwrap_or_default();

    let priority = match field(2) {
        "" => Priority::default(),
        value => value.parse().map_err(|_| CommandError::Invalid {
            field: "priority",
            value: value.to_string(),
        })?,
    };

    let due_date = match field(4) {
        "" => None,
        value => Some(NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CommandError::Invalid {
            field: "due date",
            value: value.to_string(),
        })?),
    };

    Ok(ReportFields {
        title: field(0).to_string(),
        description: field(1).to_string(),
        priority,
        assignee: field(3).to_string(),
        due_date,
    })
}
