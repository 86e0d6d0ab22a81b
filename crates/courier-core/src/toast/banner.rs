// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Toast banner presentation contract
//
// Frontends draw whatever `ToastBanner::from_state` hands them and route the
// close button back through `ToastController::handle_action`.

use super::{Severity, ToastController, ToastState};

/// Vertical offset of a banner that has slid out of view
pub const HIDDEN_OFFSET: f32 = -100.0;

/// Icon drawn on the close button
pub const CLOSE_ICON: &str = "close";

impl Severity {
    /// Banner background colour
    pub fn color(&self) -> &'static str {
        match self {
            Self::Success => "#4CAF50",
            Self::Warning => "#FF9800",
            Self::Error => "#F44336",
        }
    }

    /// Get icon name for this severity
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Success => "checkmark-circle",
            Self::Warning => "alert-circle",
            Self::Error => "close-circle",
        }
    }

    /// Short label for text frontends
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// What a renderer should draw for the current toast state
#[derive(Debug, Clone, PartialEq)]
pub struct ToastBanner {
    pub message: String,
    pub severity: Severity,
    /// False while the banner is sliding out (or fully out)
    pub visible: bool,
}

impl ToastBanner {
    /// Project a toast state into a banner, `None` when nothing was ever shown
    pub fn from_state(state: &ToastState) -> Option<Self> {
        let severity = state.severity?;
        Some(Self {
            message: state.message.clone(),
            severity,
            visible: state.visible,
        })
    }

    pub fn background_color(&self) -> &'static str {
        self.severity.color()
    }

    pub fn icon_name(&self) -> &'static str {
        self.severity.icon_name()
    }

    /// Target vertical offset for the slide animation
    pub fn offset_y(&self) -> f32 {
        if self.visible {
            0.0
        } else {
            HIDDEN_OFFSET
        }
    }
}

/// User interactions a banner can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerAction {
    Close,
}

impl ToastController {
    /// Banner for the current state
    pub fn banner(&self) -> Option<ToastBanner> {
        ToastBanner::from_state(&self.current_state())
    }

    /// Apply a banner interaction
    pub fn handle_action(&self, action: BannerAction) {
        match action {
            BannerAction::Close => self.hide(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Handle;

    #[test]
    fn no_banner_before_first_toast() {
        assert_eq!(ToastBanner::from_state(&ToastState::default()), None);
    }

    #[test]
    fn hidden_banner_keeps_last_message() {
        let state = ToastState {
            visible: false,
            message: "Delivery saved".to_string(),
            severity: Some(Severity::Success),
        };

        let banner = ToastBanner::from_state(&state).unwrap();
        assert!(!banner.visible);
        assert_eq!(banner.message, "Delivery saved");
        assert_eq!(banner.offset_y(), HIDDEN_OFFSET);
    }

    #[test]
    fn styling_follows_severity() {
        let state = ToastState {
            visible: true,
            message: "Login failed".to_string(),
            severity: Some(Severity::Error),
        };

        let banner = ToastBanner::from_state(&state).unwrap();
        assert_eq!(banner.background_color(), "#F44336");
        assert_eq!(banner.icon_name(), "close-circle");
        assert_eq!(banner.offset_y(), 0.0);
        assert_eq!(Severity::Warning.color(), "#FF9800");
        assert_eq!(Severity::Success.icon_name(), "checkmark-circle");
    }

    #[tokio::test(start_paused = true)]
    async fn close_action_hides_toast() {
        let toast = ToastController::new(Handle::current());
        toast.warning("Low battery");
        assert!(toast.banner().unwrap().visible);

        toast.handle_action(BannerAction::Close);
        let banner = toast.banner().unwrap();
        assert!(!banner.visible);
        assert_eq!(banner.message, "Low battery");
        assert!(!toast.timer_armed());
    }
}
