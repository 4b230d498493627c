use clap::Subcommand;

use super::{open_store, open_tracker, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Show stats, streak, unlocked badges and points
    Show,
}

pub fn run(action: StatsAction, ctx: &Context) -> CmdResult {
    let store = open_store()?;
    let tracker = open_tracker(&store, ctx)?;
    match action {
        StatsAction::Show => print_json(&tracker.scoreboard()),
    }
}
