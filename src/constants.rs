//! Reserved tokens and well-known names used throughout embkit.
//!
//! The selection grammar relies on a handful of reserved strings. Defining
//! them centrally keeps the selector, the binder and the configuration
//! validator in agreement about what each token means.

/// Hint used when a component is declared or looked up without one.
///
/// A `None` or blank hint and this value are treated as the same binding slot
/// by the binder and the container.
pub const DEFAULT_HINT: &str = "default";

/// Hint value meaning "select nothing for this role/hint".
///
/// Passing it as a lookup hint, or configuring it as a selection value,
/// suppresses the component entirely.
pub const BLANK_ROLE_HINT_PLACEHOLDER: &str = "#";

/// Delimiter that marks a hint as literal (`_remote_`).
///
/// Literal hints are returned verbatim with the delimiters stripped and are
/// never substituted by a selection.
pub const LITERAL_HINT_DELIMITER: char = '_';

/// Separator between role and hint in a formatted selection key (`role#hint`).
pub const ROLE_HINT_SEPARATOR: char = '#';

/// Suffix appended to the hint of a component whose slot has been taken over
/// by an override. Nothing looks these keys up by their nominal hint; they are
/// reachable through literal hints only.
pub const RAW_HINT_SUFFIX: &str = "_";

/// Environment variable that points at an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "EMBKIT_CONFIG";

/// File name of the project-level configuration.
pub const CONFIG_FILE_NAME: &str = "embkit.toml";

/// Directory (under the user's home) that holds the user-level configuration.
pub const USER_CONFIG_DIR: &str = ".embkit";
