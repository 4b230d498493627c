use clap::Subcommand;
use serde_json::json;
use studytrack_core::{create_profile, list_profiles, Config, TrackingMode};

use super::{activate, open_store, open_tracker, print_json, CmdResult, Context, ACTIVE_PROFILE_KEY};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create a profile (becomes active if none is)
    Create {
        /// Child's name
        name: String,
        /// School class or grade
        #[arg(long, default_value = "")]
        class: String,
        /// Tracking mode: simple or comprehensive (default from config)
        #[arg(long)]
        mode: Option<TrackingMode>,
    },
    /// List all profiles
    List,
    /// Make a profile the active one
    Use {
        /// Profile ID
        id: String,
    },
    /// Activate the current profile and show its data
    Show,
    /// Switch the active profile's tracking mode
    Mode {
        /// simple or comprehensive
        mode: TrackingMode,
    },
}

pub fn run(action: ProfileAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    match action {
        ProfileAction::Create { name, class, mode } => {
            let mode = mode.unwrap_or(Config::load_or_default().tracking.default_mode);
            let profile = create_profile(&store, &name, &class, mode)?;
            if store.kv_get(ACTIVE_PROFILE_KEY)?.is_none() {
                store.kv_set(ACTIVE_PROFILE_KEY, &profile.id)?;
            }
            print_json(&profile)?;
        }
        ProfileAction::List => {
            let active = store.kv_get(ACTIVE_PROFILE_KEY)?;
            let rows: Vec<_> = list_profiles(&store)?
                .into_iter()
                .map(|p| json!({ "active": active.as_deref() == Some(p.id.as_str()), "profile": p }))
                .collect();
            print_json(&rows)?;
        }
        ProfileAction::Use { id } => {
            if !list_profiles(&store)?.iter().any(|p| p.id == id) {
                return Err(format!("profile not found: {id}").into());
            }
            store.kv_set(ACTIVE_PROFILE_KEY, &id)?;
            print_json(&json!({ "active": id }))?;
        }
        ProfileAction::Show => {
            let (tracker, report) = activate(&store, ctx)?;
            print_json(&json!({
                "activation": report,
                "workingSet": tracker.working_set(),
            }))?;
        }
        ProfileAction::Mode { mode } => {
            let mut tracker = open_tracker(&store, ctx)?;
            let changes = tracker.switch_mode(mode)?;
            print_json(&json!({ "mode": mode, "changes": changes }))?;
        }
    }
    Ok(())
}
