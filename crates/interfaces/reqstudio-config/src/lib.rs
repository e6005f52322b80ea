//! Central configuration constants for runtime limits and defaults.

/// Capacity of the channel carrying background completions to the UI thread.
pub const COMPLETION_CHANNEL_CAPACITY: usize = 100;

/// Default time allowed for a single requirement analysis call.
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Default time allowed for a test-case generation call.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 300;

/// Lower bound for user-configured service timeouts.
pub const MIN_SERVICE_TIMEOUT_SECS: u64 = 5;

/// Upper bound for user-configured service timeouts.
pub const MAX_SERVICE_TIMEOUT_SECS: u64 = 1800;

/// Number of notifications kept in the notification area.
pub const NOTIFICATION_HISTORY: usize = 20;

/// Number of entries kept in the recent-workspaces list.
pub const RECENT_WORKSPACES: usize = 10;

/// Default local LLM endpoint (Ollama).
pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434";

/// Default model used for analysis and generation.
pub const DEFAULT_LLM_MODEL: &str = "llama3.1:8b";

/// Section shown when nothing else has been requested.
pub const DEFAULT_SECTION: &str = "project";

/// Current on-disk workspace format.
pub const WORKSPACE_FORMAT_VERSION: u32 = 1;

/// Convenience function to clamp a timeout into the allowed range.
pub fn clamp_timeout_secs(v: u64) -> u64 {
    v.clamp(MIN_SERVICE_TIMEOUT_SECS, MAX_SERVICE_TIMEOUT_SECS)
}
