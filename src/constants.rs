// src/constants.rs

/// The name of the psenv configuration directory (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "psenv";

/// The name of the engine configuration file (inside the psenv config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that overrides the configured PowerShell executable.
pub const EXECUTABLE_ENV_VAR: &str = "PSENV_EXECUTABLE";

/// Executables probed on `PATH`, in order, when none is configured.
pub const PWSH_CANDIDATES: &[&str] = &["pwsh", "powershell"];

/// Arguments that start a PowerShell host reading one script line at a time from stdin.
pub const DEFAULT_HOST_ARGS: &[&str] = &["-NoLogo", "-NoProfile", "-NonInteractive", "-Command", "-"];

/// Hosts spawned when the pool opens.
pub const DEFAULT_MIN_RUNSPACES: usize = 1;
/// Upper bound on live hosts per pool.
pub const DEFAULT_MAX_RUNSPACES: usize = 5;

/// Nesting depth used when serializing result records to JSON.
pub const DEFAULT_JSON_DEPTH: u32 = 2;

/// Cmdlet used for the existence check of a dynamic call.
pub const GET_COMMAND: &str = "Get-Command";
/// Command types a dynamic call may resolve to. Native applications are left out:
/// they would inherit the host's stdin, which carries the script lines.
pub const CALLABLE_COMMAND_TYPES: &[&str] = &["Alias", "Function", "Filter", "Cmdlet"];
/// Cmdlet used to list installed modules.
pub const GET_MODULE: &str = "Get-Module";
/// Cmdlet that loads a module into the session.
pub const IMPORT_MODULE: &str = "Import-Module";
/// Cmdlet that installs a module from the gallery.
pub const INSTALL_MODULE: &str = "Install-Module";
/// Trims query results down to the properties that matter.
pub const SELECT_OBJECT: &str = "Select-Object";

/// Scope passed to `Install-Module`.
pub const INSTALL_SCOPE: &str = "CurrentUser";
