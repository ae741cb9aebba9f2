pub mod config;
pub mod exec;
pub mod learning;
pub mod plan;
pub mod project;
pub mod run;
pub mod session;

use serde::Serialize;

/// Print `value` as pretty JSON when `json` is set, otherwise fall back to
/// its `Display`/debug rendering via the caller-supplied `plain` closure.
pub fn render<T: Serialize>(value: &T, json: bool, plain: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", plain(value));
    }
    Ok(())
}
