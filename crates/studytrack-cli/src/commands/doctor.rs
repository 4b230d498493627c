//! Consistency check between subject chapter lists and exam chapters.

use serde_json::json;

use super::{activate, open_store, print_json, CmdResult, Context};

pub fn run(fix: bool, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let (mut tracker, report) = activate(&store, ctx)?;
    let violations = tracker.violations();

    let repaired = if fix && !violations.is_empty() {
        Some(tracker.repair()?)
    } else {
        None
    };
    let remaining = tracker.violations();

    print_json(&json!({
        "ok": remaining.is_empty(),
        "activation": report,
        "violations": violations,
        "repaired": repaired,
    }))?;
    if !remaining.is_empty() {
        return Err(format!("{} chapter mismatch(es) found; run `doctor --fix`", remaining.len()).into());
    }
    Ok(())
}
