// SPDX-License-Identifier: AGPL-3.0
// Courier Shell - Terminal frontend

mod commands;
mod render;

use commands::Command;
use courier_core::{
    AppSettings, AvatarMenuItem, Backend, BannerAction, DeliveryPatch, MemoryBackend, Session,
    SettingsStore, ToastBanner, ToastState,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Toast producers and the renderer must share one thread so a show
// immediately followed by a hide is never printed
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("courier_shell=info".parse().unwrap())
                .add_directive("courier_core=info".parse().unwrap()),
        )
        .init();

    tracing::info!("Starting Courier Shell v{}", env!("CARGO_PKG_VERSION"));

    let settings = match SettingsStore::new() {
        Ok(store) => store.get(),
        Err(e) => {
            tracing::warn!("Settings unavailable, using defaults: {}", e);
            AppSettings::default()
        }
    };

    let backend = Backend::in_memory(Arc::new(MemoryBackend::new()));
    let session = Session::new(settings, backend, Handle::current());

    let renderer = spawn_toast_renderer(&session);

    println!("Courier - type `help` for commands");
    run(&session).await;

    renderer.abort();
    session.shutdown();
    tracing::info!("Courier Shell exited");
}

/// Print the banner every time the toast slot changes
fn spawn_toast_renderer(session: &Session) -> JoinHandle<()> {
    render_toasts(session.toast().subscribe(), |line| println!("\n{}", line))
}

fn render_toasts(
    mut rx: watch::Receiver<ToastState>,
    mut emit: impl FnMut(String) + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let banner = ToastBanner::from_state(&rx.borrow_and_update());
            if let Some(line) = render::toast_line(banner.as_ref()) {
                emit(line);
            }
        }
    })
}

async fn run(session: &Session) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(session);
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        };

        match commands::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(session, command).await,
            Ok(None) => {}
            Err(usage) => println!("{}", usage),
        }
    }
}

fn prompt(session: &Session) {
    let who = session
        .current_user()
        .map(|u| u.name)
        .unwrap_or_else(|| session.settings().driver_name.clone());
    print!("{}> ", who);
    let _ = std::io::stdout().flush();
}

async fn execute(session: &Session, command: Command) {
    // Failures were already surfaced as error toasts
    match command {
        Command::Signup {
            email,
            password,
            name,
        } => {
            let _ = session.signup(&name, &email, &password).await;
        }
        Command::Login { email, password } => {
            let _ = session.login(&email, &password).await;
        }
        Command::Logout => {
            let _ = session.logout().await;
        }
        Command::Reset { email } => {
            let _ = session.auth().reset_password(&email).await;
        }
        Command::Profile(update) => {
            let _ = session.auth().update_profile(update).await;
        }
        Command::Deliveries => {
            let feed = session.deliveries();
            if feed.is_loading() {
                println!("Loading deliveries...");
                return;
            }
            for delivery in feed.deliveries() {
                println!("{}", render::delivery_line(&delivery));
            }
            println!("{}", render::summary(&feed.summary()));
        }
        Command::Add(delivery) => {
            let _ = session.deliveries().add_delivery(delivery).await;
        }
        Command::Status { id, status } => {
            let matches: Vec<String> = session
                .deliveries()
                .deliveries()
                .into_iter()
                .map(|d| d.id)
                .filter(|full| full.starts_with(&id))
                .collect();

            // Unknown ids go to the store so the failure is reported like any other
            let id = match matches.as_slice() {
                [only] => only.clone(),
                [] => id,
                _ => {
                    session.toast().warning(format!("`{}` matches several deliveries", id));
                    return;
                }
            };
            let _ = session
                .deliveries()
                .update_delivery(&id, DeliveryPatch::status(status))
                .await;
        }
        Command::Inbox => show_inbox(session).await,
        Command::Read { id } => report(session.inbox().mark_as_read(&id).await),
        Command::ReadAll => {
            let user = session.current_user();
            report(session.inbox().mark_all_as_read(user.as_ref()).await);
        }
        Command::Delete { id } => report(session.inbox().delete(&id).await),
        Command::Menu { choice } => show_menu(session, choice).await,
        Command::Close => session.toast().handle_action(BannerAction::Close),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
}

/// Inbox calls only log failures; echo them on the terminal too
fn report(result: Result<(), courier_core::AppError>) {
    if let Err(e) = result {
        println!("{}", e.user_message());
    }
}

async fn show_inbox(session: &Session) {
    session.refresh_inbox().await;
    let inbox = session.inbox();
    for notification in inbox.notifications() {
        println!("{}", render::notification_line(&notification));
    }
    println!("{} unread", inbox.unread_count());
}

async fn show_menu(session: &Session, choice: Option<AvatarMenuItem>) {
    let mut menu = session.avatar_menu();
    menu.open();

    let Some(item) = choice else {
        print!("{}", render::avatar_menu(&menu));
        println!("choose with `menu notifications|profile|logout`");
        menu.close();
        return;
    };

    match menu.select(item) {
        AvatarMenuItem::Notifications => show_inbox(session).await,
        AvatarMenuItem::Profile => match session.current_user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email.unwrap_or_default());
                println!(
                    "vehicle: {}  plate: {}  license: {} (expires {})",
                    user.vehicle.unwrap_or_default(),
                    user.plate.unwrap_or_default(),
                    user.license.unwrap_or_default(),
                    user.license_expiry.unwrap_or_default(),
                );
            }
            None => println!("Not signed in"),
        },
        AvatarMenuItem::Logout => session.logout_from_menu().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn show_then_hide_is_never_printed() {
        let backend = Backend::in_memory(Arc::new(MemoryBackend::new()));
        let session = Session::new(AppSettings::default(), backend, Handle::current());

        let printed = Arc::new(Mutex::new(Vec::new()));
        let sink = printed.clone();
        let renderer = render_toasts(session.toast().subscribe(), move |line| {
            sink.lock().unwrap().push(line)
        });

        for i in 0..1000 {
            session.toast().show(format!("flash {}", i));
            session.toast().hide();
            tokio::task::yield_now().await;
        }

        session.toast().success("Delivery added");
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        renderer.abort();

        let printed = printed.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert!(printed[0].contains("Delivery added"));
    }
}
