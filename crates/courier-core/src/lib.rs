// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Shared logic for all frontends
//
// This crate provides:
// - ToastController, the session's single transient-message slot
// - AuthService, DeliveryFeed and Inbox over the backend service traits
// - Session, which wires them together
// - SettingsStore for persistent settings
// - MemoryBackend for running without the hosted backend
//
// Frontend-specific code lives in separate crates.

pub mod auth;
pub mod avatar;
pub mod delivery;
pub mod inbox;
pub mod memory;
pub mod session;
pub mod settings;
pub mod toast;
pub mod types;

// Re-export commonly used items
pub use auth::{AuthProvider, AuthService, ProfileUpdate, User};
pub use avatar::{AvatarMenu, AvatarMenuItem};
pub use delivery::{
    Delivery, DeliveryFeed, DeliveryPatch, DeliveryStatus, DeliveryStore, DeliverySummary,
    NewDelivery,
};
pub use inbox::{Inbox, InboxApi, InboxNotification};
pub use memory::MemoryBackend;
pub use session::{Backend, Session};
pub use settings::SettingsStore;
pub use toast::{BannerAction, Severity, ToastBanner, ToastController, ToastOptions, ToastState};
pub use types::{AppError, AppSettings};
