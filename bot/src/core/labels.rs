//! Names of the UI templates the locator is asked to find.
//!
//! Indexed families (echelons, chapters, maps) are built by helpers next to
//! the code that scrolls them.

pub const HOME: &str = "home";
pub const COMBAT_MENU: &str = "combat_menu";
pub const COMBAT_SCREEN: &str = "combat_screen";
pub const NORMAL_BATTLE: &str = "normal_battle";
pub const BACK: &str = "back";
pub const RETURN_HOME: &str = "return_home";

pub const START_OPERATION: &str = "start_operation";
pub const CHOOSE_ECHELON_OK: &str = "choose_echelon_ok";
pub const PLANNING_MODE: &str = "planning_mode";
pub const EXECUTE_PLAN: &str = "planning_mode_execute_plan";
pub const RESUPPLY: &str = "resupply";
pub const END_ROUND: &str = "end_round";
pub const END_ROUND_CONFIRM: &str = "end_round_confirm";
pub const COMBAT_PAUSE: &str = "combat_pause";
pub const RESOURCES_WARNING: &str = "resources_warning";

pub const RETREAT: &str = "retreat";
pub const RETREAT_CONFIRM: &str = "retreat_confirm";
pub const TERMINATE_MISSION: &str = "terminate_mission";
pub const TERMINATE_MISSION_CONFIRM: &str = "terminate_mission_confirm";

pub const SETTLEMENT: &str = "settlement";
pub const TDOLL_SHARE: &str = "tdoll_share";

pub const INSUFFICIENT_SLOTS: &str = "insufficient_slots";
pub const MOVE_TO: &str = "move_to";
pub const DIALOG_CLOSE: &str = "dialog_close";

pub const FACTORY: &str = "factory";
pub const DISMANTLE_RETIREMENT: &str = "dismantle_retirement";
pub const DISMANTLE_SELECT_TDOLL: &str = "dismantle_select_tdoll";
pub const DISMANTLE_SMART_SELECT: &str = "dismantle_smart_select";
pub const DISMANTLE_OK: &str = "dismantle_ok";
pub const DISMANTLE: &str = "dismantle";

pub const REPAIR: &str = "repair";
pub const REPAIR_QUICK: &str = "repair_quick";
pub const REPAIR_CONFIRM: &str = "repair_confirm";

pub const FORMATION: &str = "formation";
pub const FORMATION_HP: &str = "formation_hp";
pub const FORMATION_CAPTAIN: &str = "formation_captain";
pub const FILTER: &str = "filter";
pub const FILTER_CONFIRM: &str = "filter_confirm";

/// Echelon slot button in the deployment list.
pub fn echelon(slot: u32) -> String {
    format!("echelon{slot}")
}

/// Category toggle in the formation filter, e.g. `filter_ar`.
pub fn filter_category(category: &str) -> String {
    format!("filter_{}", category.to_ascii_lowercase())
}

/// Rarity toggle in the formation filter, e.g. `filter_5star`.
pub fn filter_rarity(rarity: u8) -> String {
    format!("filter_{rarity}star")
}
