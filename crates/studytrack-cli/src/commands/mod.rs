//! Subcommand implementations. Every command prints JSON on stdout.

pub mod chapter;
pub mod config;
pub mod doctor;
pub mod exam;
pub mod profile;
pub mod reminder;
pub mod stats;
pub mod subject;
pub mod task;

use chrono::NaiveDate;
use serde::Serialize;
use studytrack_core::{
    ActivationGuard, ActivationReport, Config, ProfileTracker, SqliteStore, TrackerOptions,
};

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// kv key holding the id of the profile commands act on.
pub const ACTIVE_PROFILE_KEY: &str = "active_profile";

/// Per-invocation settings.
pub struct Context {
    pub today: NaiveDate,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn open_store() -> CmdResult<SqliteStore> {
    Ok(SqliteStore::open()?)
}

pub fn active_profile_id(store: &SqliteStore) -> CmdResult<String> {
    store
        .kv_get(ACTIVE_PROFILE_KEY)?
        .ok_or_else(|| "no active profile; run `studytrack-cli profile use <id>`".into())
}

/// Activate the current profile with options from the config file.
pub fn activate<'a>(
    store: &'a SqliteStore,
    ctx: &Context,
) -> CmdResult<(ProfileTracker<&'a SqliteStore>, ActivationReport)> {
    let profile_id = active_profile_id(store)?;
    let config = Config::load_or_default();
    let (tracker, report) =
        ProfileTracker::activate(store, &profile_id, ctx.today, &ActivationGuard::new())?;
    Ok((tracker.with_options(TrackerOptions::from(&config)), report))
}

pub fn open_tracker<'a>(
    store: &'a SqliteStore,
    ctx: &Context,
) -> CmdResult<ProfileTracker<&'a SqliteStore>> {
    Ok(activate(store, ctx)?.0)
}
