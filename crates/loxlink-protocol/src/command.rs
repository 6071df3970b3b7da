//! Builders for outgoing command strings.
//!
//! Commands are plain text paths. Values are percent-encoded so they can
//! carry spaces and slashes.

/// Enables binary status updates (value/text/daytimer/weather tables).
pub const ENABLE_STATUS_UPDATES: &str = "jdev/sps/enablebinstatusupdate";

/// Requests the structure file describing every control.
pub const STRUCTURE_FILE: &str = "data/LoxAPP3.json";

/// Requests the structure file modification date.
pub const STRUCTURE_FILE_VERSION: &str = "jdev/sps/LoxAPPversion3";

/// Builds a command that sets `value` on the control `control`.
///
/// ```
/// use loxlink_protocol::command;
///
/// assert_eq!(command::io("0f1e8a3d-02c4-11e4-ba7a8b9c2e6b6a11", "on"),
///            "jdev/sps/io/0f1e8a3d-02c4-11e4-ba7a8b9c2e6b6a11/on");
/// ```
pub fn io(control: &str, value: &str) -> String {
    format!(
        "jdev/sps/io/{}/{}",
        urlencoding::encode(control),
        urlencoding::encode(value)
    )
}
