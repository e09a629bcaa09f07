//! Transient notifications
//!
//! Only one alert is displayed at a time; showing a new one replaces it.
//! Expiry is keyed by id so a timer started for an old alert cannot remove
//! its replacement.

use uuid::Uuid;

/// Unique identifier for alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertId(Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Error,
}

impl AlertLevel {
    /// Icon shown next to the message
    pub fn icon_name(&self) -> &'static str {
        match self {
            AlertLevel::Success => "emblem-ok-symbolic",
            AlertLevel::Info => "dialog-information-symbolic",
            AlertLevel::Error => "dialog-error-symbolic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: AlertId,
    pub level: AlertLevel,
    pub message: String,
}

/// Depth-one alert queue
#[derive(Debug, Default)]
pub struct AlertState {
    current: Option<Alert>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display an alert, replacing whatever is shown
    pub fn show(&mut self, level: AlertLevel, message: impl Into<String>) -> AlertId {
        let alert = Alert {
            id: AlertId::new(),
            level,
            message: message.into(),
        };
        let id = alert.id;
        match level {
            AlertLevel::Error => log::warn!("alert: {}", alert.message),
            _ => log::info!("alert: {}", alert.message),
        }
        self.current = Some(alert);
        id
    }

    /// Remove the alert if it is still the one displayed
    pub fn expire(&mut self, id: AlertId) -> bool {
        if self.current.as_ref().is_some_and(|a| a.id == id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alert_replaces_old() {
        let mut alerts = AlertState::new();
        alerts.show(AlertLevel::Info, "first");
        alerts.show(AlertLevel::Error, "second");
        let current = alerts.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.level, AlertLevel::Error);
    }

    #[test]
    fn test_stale_expiry_keeps_replacement() {
        let mut alerts = AlertState::new();
        let first = alerts.show(AlertLevel::Info, "first");
        let second = alerts.show(AlertLevel::Success, "second");
        assert!(!alerts.expire(first));
        assert_eq!(alerts.current().unwrap().message, "second");
        assert!(alerts.expire(second));
        assert!(alerts.current().is_none());
    }
}
