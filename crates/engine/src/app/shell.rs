use crate::zones::{ZoneDefinition, ZoneId};

use super::scene::Vec3;

/// Everything the streaming core needs from the surrounding game: user
/// notices, the loading overlay, zone-scoped gameplay collections, and the
/// player queries used by warp gates.
pub trait GameShell {
    fn show_message(&mut self, message: &str);
    fn show_loading(&mut self, zone: &ZoneId);
    fn hide_loading(&mut self);
    fn refresh_zone_ui(&mut self, zone: &ZoneDefinition);
    fn zone_changed(&mut self, zone: &ZoneId);
    /// Drop planets, stations and asteroid fields the game tracks for `zone`.
    fn clear_zone_collections(&mut self, zone: &ZoneId);
    fn player_position(&self) -> Vec3;
    fn warp_confirm_pressed(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCall {
    Message(String),
    ShowLoading(ZoneId),
    HideLoading,
    RefreshUi(ZoneId),
    ZoneChanged(ZoneId),
    ClearCollections(ZoneId),
}

/// Shell that records every call, with scriptable player state.
#[derive(Debug, Default)]
pub struct RecordingShell {
    calls: Vec<ShellCall>,
    loading_visible: bool,
    player_position: Vec3,
    warp_confirm: bool,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[ShellCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn loading_visible(&self) -> bool {
        self.loading_visible
    }

    pub fn messages(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ShellCall::Message(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&ShellCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn set_player_position(&mut self, position: Vec3) {
        self.player_position = position;
    }

    pub fn set_warp_confirm(&mut self, pressed: bool) {
        self.warp_confirm = pressed;
    }
}

impl GameShell for RecordingShell {
    fn show_message(&mut self, message: &str) {
        self.calls.push(ShellCall::Message(message.to_string()));
    }

    fn show_loading(&mut self, zone: &ZoneId) {
        self.loading_visible = true;
        self.calls.push(ShellCall::ShowLoading(zone.clone()));
    }

    fn hide_loading(&mut self) {
        self.loading_visible = false;
        self.calls.push(ShellCall::HideLoading);
    }

    fn refresh_zone_ui(&mut self, zone: &ZoneDefinition) {
        self.calls.push(ShellCall::RefreshUi(zone.id.clone()));
    }

    fn zone_changed(&mut self, zone: &ZoneId) {
        self.calls.push(ShellCall::ZoneChanged(zone.clone()));
    }

    fn clear_zone_collections(&mut self, zone: &ZoneId) {
        self.calls.push(ShellCall::ClearCollections(zone.clone()));
    }

    fn player_position(&self) -> Vec3 {
        self.player_position
    }

    fn warp_confirm_pressed(&self) -> bool {
        self.warp_confirm
    }
}
