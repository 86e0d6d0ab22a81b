// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Avatar menu

use crate::auth::User;

/// Initials shown in the avatar bubble
pub fn initials(name: Option<&str>) -> String {
    let mut words = name.unwrap_or_default().split_whitespace();

    let Some(first) = words.next() else {
        return "U".to_string();
    };

    let mut out: String = first.chars().take(1).collect();
    if let Some(last) = words.last() {
        out.extend(last.chars().take(1));
    }
    out.to_uppercase()
}

/// Entries of the avatar dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarMenuItem {
    Notifications,
    Profile,
    Logout,
}

impl AvatarMenuItem {
    pub const ALL: [AvatarMenuItem; 3] = [Self::Notifications, Self::Profile, Self::Logout];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Notifications => "Notifications",
            Self::Profile => "Profile",
            Self::Logout => "Log out",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Notifications => "notifications-outline",
            Self::Profile => "person-outline",
            Self::Logout => "log-out-outline",
        }
    }

    /// Destructive entries are drawn in the error colour
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Logout)
    }
}

/// Open/closed avatar dropdown for the current user
#[derive(Debug, Clone, Default)]
pub struct AvatarMenu {
    initials: String,
    open: bool,
}

impl AvatarMenu {
    pub fn new(user: Option<&User>) -> Self {
        Self {
            initials: initials(user.map(|u| u.name.as_str())),
            open: false,
        }
    }

    pub fn initials(&self) -> &str {
        &self.initials
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Choosing an entry always closes the menu
    pub fn select(&mut self, item: AvatarMenuItem) -> AvatarMenuItem {
        self.open = false;
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initials_from_first_and_last_name() {
        assert_eq!(initials(Some("ana maria souza")), "AS");
        assert_eq!(initials(Some("Diego")), "D");
        assert_eq!(initials(Some("  ")), "U");
        assert_eq!(initials(None), "U");
    }

    #[test]
    fn selecting_closes_menu() {
        let user = User {
            name: "Ana Souza".into(),
            ..Default::default()
        };
        let mut menu = AvatarMenu::new(Some(&user));
        assert_eq!(menu.initials(), "AS");

        menu.open();
        assert!(menu.is_open());
        assert_eq!(menu.select(AvatarMenuItem::Profile), AvatarMenuItem::Profile);
        assert!(!menu.is_open());
    }

    #[test]
    fn only_logout_is_destructive() {
        let destructive: Vec<_> = AvatarMenuItem::ALL
            .iter()
            .filter(|item| item.is_destructive())
            .collect();
        assert_eq!(destructive, vec![&AvatarMenuItem::Logout]);
    }
}
