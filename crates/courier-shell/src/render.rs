// SPDX-License-Identifier: AGPL-3.0
// Courier Shell - Text rendering

use courier_core::toast::banner::CLOSE_ICON;
use courier_core::{
    AvatarMenu, AvatarMenuItem, Delivery, DeliverySummary, InboxNotification, Severity,
    ToastBanner,
};

/// Glyph standing in for the severity icon
fn severity_glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "✔",
        Severity::Warning => "!",
        Severity::Error => "✖",
    }
}

/// One-line toast banner, or `None` when the banner has slid out
pub fn toast_line(banner: Option<&ToastBanner>) -> Option<String> {
    let banner = banner.filter(|b| b.visible)?;
    Some(format!(
        "[{} {}] {}   [{}]",
        severity_glyph(banner.severity),
        banner.severity.label(),
        banner.message,
        CLOSE_ICON
    ))
}

pub fn summary(summary: &DeliverySummary) -> String {
    format!(
        "Summary: {} deliveries, {:.1} km",
        summary.total_deliveries, summary.total_distance
    )
}

pub fn delivery_line(delivery: &Delivery) -> String {
    let short_id: String = delivery.id.chars().take(8).collect();
    let distance = delivery
        .total_distance
        .map(|km| format!("{:.1} km", km))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}  {:<12} {:<20} {:<24} {:<10} {}",
        short_id,
        delivery.status.label(),
        delivery.recipient_name,
        delivery.delivery_address,
        distance,
        delivery.created_at.format("%Y-%m-%d %H:%M"),
    )
}

pub fn notification_line(notification: &InboxNotification) -> String {
    let marker = if notification.read { " " } else { "*" };
    format!(
        "{} {}  {} - {}  ({})",
        marker,
        notification.id,
        notification.title,
        notification.body,
        notification.timestamp.format("%d/%m %H:%M"),
    )
}

pub fn avatar_menu(menu: &AvatarMenu) -> String {
    let mut out = format!("({})\n", menu.initials());
    for item in AvatarMenuItem::ALL {
        let suffix = if item.is_destructive() { "  !" } else { "" };
        out.push_str(&format!("  - {}{}\n", item.label(), suffix));
    }
    out
}
