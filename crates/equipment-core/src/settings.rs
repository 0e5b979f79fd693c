use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EquipmentError, Result};
use crate::time_utils::TimezoneHandler;

/// Name of the per-user application directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".equipment-analytics";

/// File name of the session store inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Validate, summarise and browse chemical equipment data files
#[derive(Parser, Debug, Clone)]
#[command(
    name = "equipment-analytics",
    about = "Validate, summarise and browse chemical equipment data files",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Acting user (defaults to the last user given)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Directory holding the session store
    #[arg(long, global = true, env = "EQUIPMENT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Display timezone, or "auto" for the system timezone
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Logging level
    #[arg(
        long,
        global = true,
        default_value = "INFO",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    )]
    pub log_level: String,

    /// Log file path (stderr when omitted)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Output format of `report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Summary, column statistics and rows as a JSON document.
    Json,
    /// Rows only, with the upload header, ready to be uploaded again.
    Csv,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a new user
    Register {
        username: String,
        /// Contact address stored with the account
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Upload an equipment CSV file and store its summary
    Upload {
        file: PathBuf,
        /// File name to record instead of the path's own
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the five most recent uploads
    History {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one session with its equipment rows
    Show { id: u64 },
    /// Export a report for one session
    Report {
        id: u64,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a user together with all of their sessions
    DeleteUser { username: String },
    /// Forget the remembered user, timezone and data directory
    ClearDefaults,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Parameters remembered between runs in `~/.equipment-analytics/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Default location of the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params; `Default` when absent or unparsable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments, fill unset values from the last run and
    /// persist the merged values for the next one.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let mut settings = Settings::parse_from(args);

        if settings.command == Command::ClearDefaults {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not remove {}", config_path.display());
            }
            return settings.resolved();
        }

        let last = LastUsedParams::load_from(config_path);
        if settings.user.is_none() {
            settings.user = last.user;
        }
        if settings.timezone.is_none() {
            settings.timezone = last.timezone;
        }
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }

        let unknown_tz = settings.timezone.as_deref().is_some_and(|tz| {
            !tz.eq_ignore_ascii_case("auto") && !TimezoneHandler::validate_timezone(tz)
        });
        if unknown_tz {
            tracing::warn!(
                timezone = settings.timezone.as_deref().unwrap_or_default(),
                "unknown timezone, using the system timezone"
            );
            settings.timezone = None;
        }

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::warn!(error = %e, "could not persist last-used parameters");
        }

        settings.resolved()
    }

    /// Resolve `"auto"` and apply `--debug`.
    fn resolved(mut self) -> Self {
        let tz = self.timezone.take().unwrap_or_else(|| "auto".to_string());
        self.timezone = Some(crate::time_utils::resolve_timezone(&tz));
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// The acting username, or a configuration error when none is known.
    pub fn require_user(&self) -> Result<&str> {
        self.user.as_deref().ok_or_else(|| {
            EquipmentError::Config("no user selected; pass --user <name>".to_string())
        })
    }

    /// Directory holding the store, defaulting to `~/.equipment-analytics/`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR_NAME))
    }

    /// Full path of the JSON session store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE_NAME)
    }

    /// Display timezone name; `"UTC"` before resolution.
    pub fn timezone(&self) -> &str {
        self.timezone.as_deref().unwrap_or("UTC")
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            user: s.user.clone(),
            timezone: s.timezone.clone(),
            data_dir: s.data_dir.clone(),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
