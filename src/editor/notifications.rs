//! Short-lived user-facing messages.

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::config::ConfigResetNotification;
use crate::constants::NOTIFICATION_LIFETIME_SECS;

const MAX_NOTIFICATIONS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub remaining_secs: f32,
}

#[derive(Resource, Default, Debug)]
pub struct Notifications {
    entries: VecDeque<Notification>,
}

impl Notifications {
    pub fn notify(&mut self, message: impl Into<String>, is_error: bool) {
        self.entries.push_back(Notification {
            message: message.into(),
            is_error,
            remaining_secs: NOTIFICATION_LIFETIME_SECS,
        });
        while self.entries.len() > MAX_NOTIFICATIONS {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Age all notifications and drop expired ones
    pub fn tick(&mut self, delta_secs: f32) {
        for entry in self.entries.iter_mut() {
            entry.remaining_secs -= delta_secs;
        }
        self.entries.retain(|entry| entry.remaining_secs > 0.0);
    }
}

/// Show a message to the user and log it
pub fn notify(world: &mut World, message: impl Into<String>, is_error: bool) {
    let message = message.into();
    if is_error {
        warn!("{}", message);
    } else {
        info!("{}", message);
    }
    if let Some(mut notifications) = world.get_resource_mut::<Notifications>() {
        notifications.notify(message, is_error);
    }
}

pub fn tick_notifications(time: Res<Time>, mut notifications: ResMut<Notifications>) {
    if !notifications.is_empty() {
        notifications.tick(time.delta_secs());
    }
}

/// Surface a config reset once the config has been loaded
pub fn announce_config_reset(
    mut reset: ResMut<ConfigResetNotification>,
    mut notifications: ResMut<Notifications>,
) {
    if !reset.show {
        return;
    }
    reset.show = false;
    let reason = reset
        .reason
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());
    notifications.notify(format!("Configuration reset to defaults: {}", reason), true);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_expire() {
        let mut notifications = Notifications::default();
        notifications.notify("Undo: Move building", false);
        notifications.tick(NOTIFICATION_LIFETIME_SECS / 2.0);
        assert_eq!(
            notifications.latest().map(|n| n.message.as_str()),
            Some("Undo: Move building")
        );
        notifications.tick(NOTIFICATION_LIFETIME_SECS);
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_notifications_are_bounded() {
        let mut notifications = Notifications::default();
        for i in 0..(MAX_NOTIFICATIONS + 3) {
            notifications.notify(format!("message {}", i), false);
        }
        assert_eq!(notifications.iter().count(), MAX_NOTIFICATIONS);
        assert_eq!(
            notifications.iter().next().map(|n| n.message.as_str()),
            Some("message 3")
        );
    }
}
