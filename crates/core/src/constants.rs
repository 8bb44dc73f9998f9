//! Constants used throughout the companion core crate.

use companion_types::LanguageId;

/// Caravan language id for English, the language consents are captured in by default.
pub const ENGLISH_LANGUAGE_ID: LanguageId = LanguageId(1);

/// Default listen address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Default per-request timeout for upstream HTTP clients.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Directory name for companion link storage under the data directory.
pub const COMPANION_DIR_NAME: &str = "companion";

/// Filename for a link's YAML document.
pub const LINK_FILENAME: &str = "link.yaml";

/// Filename for a link's tasks YAML document.
pub const TASKS_FILENAME: &str = "tasks.yaml";
