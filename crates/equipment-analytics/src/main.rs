mod bootstrap;
mod render;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use equipment_core::models::SessionId;
use equipment_core::settings::{Command, Settings};
use equipment_core::time_utils::TimezoneHandler;
use equipment_data::report::{render_report, report_file_name};
use equipment_runtime::file_store::JsonFileStore;
use equipment_runtime::store::SessionStore;
use equipment_runtime::upload::UploadService;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories(&settings.data_dir())?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Equipment Analytics v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data dir: {}, Timezone: {}",
        settings.data_dir().display(),
        settings.timezone()
    );

    let store_path = settings.store_path();
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("failed to open store at {}", store_path.display()))?;
    let mut service = UploadService::new(store);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&settings, &mut service, &mut out)
}

/// Execute the parsed subcommand against `service`, writing to `out`.
fn run<S: SessionStore, W: Write>(
    settings: &Settings,
    service: &mut UploadService<S>,
    out: &mut W,
) -> Result<()> {
    let tz = TimezoneHandler::new(settings.timezone());

    match &settings.command {
        Command::Register { username, email } => {
            let user = service.register(username, email)?;
            writeln!(out, "Registered user {} (id {})", user.username, user.id)?;
        }

        Command::Upload { file, name } => {
            let user = settings.require_user()?;
            let session = service.upload_path(user, file, name.as_deref())?;
            write!(out, "{}", render::session_summary(&session, &tz))?;
        }

        Command::History { json } => {
            let user = settings.require_user()?;
            let sessions = service.history(user)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&sessions)?)?;
            } else {
                write!(out, "{}", render::history_table(&sessions, &tz))?;
            }
        }

        Command::Show { id } => {
            let user = settings.require_user()?;
            let session = service.session(user, SessionId(*id))?;
            write!(out, "{}", render::session_detail(&session, &tz))?;
        }

        Command::Report { id, format, output } => {
            let user = settings.require_user()?;
            let session = service.session(user, SessionId(*id))?;
            let content = render_report(&session, *format)?;
            match output {
                Some(path) => {
                    let target = if path.is_dir() {
                        path.join(report_file_name(&session, *format))
                    } else {
                        path.clone()
                    };
                    write_report(&target, &content)?;
                    tracing::info!(
                        session = %session.id,
                        path = %target.display(),
                        "report written"
                    );
                    writeln!(out, "Report written to {}", target.display())?;
                }
                None => write!(out, "{content}")?,
            }
        }

        Command::DeleteUser { username } => {
            let removed = service.delete_user(username)?;
            writeln!(out, "Deleted user {username} and {removed} session(s)")?;
        }

        Command::ClearDefaults => {
            writeln!(out, "Remembered defaults cleared")?;
        }
    }

    Ok(())
}

fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write report to {}", path.display()))
}
