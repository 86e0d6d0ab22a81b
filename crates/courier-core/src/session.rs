// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Session composition root
//
// Builds the toast controller once and hands clones of it to every
// context that needs to report back to the user.

use crate::auth::{AuthProvider, AuthService, User};
use crate::avatar::AvatarMenu;
use crate::delivery::{DeliveryFeed, DeliveryStore};
use crate::inbox::{Inbox, InboxApi};
use crate::memory::MemoryBackend;
use crate::toast::ToastController;
use crate::types::{AppError, AppSettings};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Handles to the hosted backend services
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub deliveries: Arc<dyn DeliveryStore>,
    pub inbox: Arc<dyn InboxApi>,
}

impl Backend {
    /// Route every service to one in-memory backend
    pub fn in_memory(backend: Arc<MemoryBackend>) -> Self {
        Self {
            auth: backend.clone(),
            deliveries: backend.clone(),
            inbox: backend,
        }
    }
}

/// Everything a signed-in (or signed-out) app session holds
pub struct Session {
    settings: AppSettings,
    toast: ToastController,
    auth: AuthService,
    deliveries: DeliveryFeed,
    inbox: Inbox,
}

impl Session {
    pub fn new(settings: AppSettings, backend: Backend, runtime: Handle) -> Self {
        tracing::info!(
            "Starting session, toast duration {}ms",
            settings.toast_duration_ms
        );

        let toast = ToastController::with_default_duration(runtime.clone(), settings.toast_duration());
        let auth = AuthService::new(backend.auth, toast.clone(), &runtime);
        let deliveries = DeliveryFeed::new(backend.deliveries, toast.clone(), &runtime);
        let inbox = Inbox::new(backend.inbox);

        Self {
            settings,
            toast,
            auth,
            deliveries,
            inbox,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn toast(&self) -> &ToastController {
        &self.toast
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn deliveries(&self) -> &DeliveryFeed {
        &self.deliveries
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    pub fn avatar_menu(&self) -> AvatarMenu {
        AvatarMenu::new(self.current_user().as_ref())
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.auth.signup(name, email, password).await?;
        self.refresh_inbox().await;
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.auth.login(email, password).await?;
        self.refresh_inbox().await;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.auth.logout().await?;
        self.refresh_inbox().await;
        Ok(())
    }

    /// Logout from the avatar menu; failures were already toasted
    pub async fn logout_from_menu(&self) {
        if let Err(e) = self.logout().await {
            tracing::error!("Logout from menu failed: {}", e);
        }
    }

    /// Reload the inbox for the current user, keeping the old list on failure
    pub async fn refresh_inbox(&self) {
        if !self.settings.notifications_enabled {
            return;
        }
        let user = self.current_user();
        // Errors are logged by the inbox itself
        let _ = self.inbox.refresh(user.as_ref()).await;
    }

    /// Hide any toast and stop its timer before the frontend goes away
    pub fn shutdown(self) {
        tracing::info!("Ending session");
        self.toast.hide();
    }
}
