// SPDX-License-Identifier: AGPL-3.0
// Courier Shell - Command parsing

use courier_core::{AvatarMenuItem, DeliveryStatus, NewDelivery, ProfileUpdate};

/// Commands typed at the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Signup {
        email: String,
        password: String,
        name: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Reset {
        email: String,
    },
    Profile(ProfileUpdate),
    Deliveries,
    Add(NewDelivery),
    Status {
        id: String,
        status: DeliveryStatus,
    },
    Inbox,
    Read {
        id: String,
    },
    ReadAll,
    Delete {
        id: String,
    },
    Menu {
        choice: Option<AvatarMenuItem>,
    },
    Close,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  signup <email> <password> <name...>   create an account
  login <email> <password>              sign in
  logout                                sign out
  reset <email>                         send a password reset email
  profile <field>=<value> ...           edit profile (name, email, phone, license,
                                        expiry, vehicle, plate, image)
  deliveries                            list deliveries and totals
  add <recipient> | <address> | <city> [| <km>]
                                        register a delivery
  status <id> <pending|in-progress|completed>
                                        update a delivery
  inbox                                 list notifications
  read <id> | read-all | delete <id>    manage notifications
  menu [notifications|profile|logout]   avatar menu
  close                                 dismiss the toast
  help | quit";

/// Parse one input line; `Ok(None)` for a blank line
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let Some((verb, rest)) = split_verb(line) else {
        return Ok(None);
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb {
        "signup" => match args.as_slice() {
            [email, password, name @ ..] if !name.is_empty() => Command::Signup {
                email: email.to_string(),
                password: password.to_string(),
                name: name.join(" "),
            },
            _ => return Err("usage: signup <email> <password> <name...>".to_string()),
        },
        "login" => match args.as_slice() {
            [email, password] => Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            _ => return Err("usage: login <email> <password>".to_string()),
        },
        "logout" => Command::Logout,
        "reset" => Command::Reset {
            email: rest.trim().to_string(),
        },
        "profile" => Command::Profile(parse_profile(&args)?),
        "deliveries" | "ls" => Command::Deliveries,
        "add" => Command::Add(parse_delivery(rest)?),
        "status" => match args.as_slice() {
            [id, status] => Command::Status {
                id: id.to_string(),
                status: status.parse().map_err(|e: courier_core::AppError| e.to_string())?,
            },
            _ => return Err("usage: status <id> <status>".to_string()),
        },
        "inbox" => Command::Inbox,
        "read" => match args.as_slice() {
            [id] => Command::Read { id: id.to_string() },
            _ => return Err("usage: read <id>".to_string()),
        },
        "read-all" => Command::ReadAll,
        "delete" => match args.as_slice() {
            [id] => Command::Delete { id: id.to_string() },
            _ => return Err("usage: delete <id>".to_string()),
        },
        "menu" => match args.as_slice() {
            [] => Command::Menu { choice: None },
            [choice] => Command::Menu {
                choice: Some(parse_menu_choice(choice)?),
            },
            _ => return Err("usage: menu [notifications|profile|logout]".to_string()),
        },
        "close" => Command::Close,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };

    Ok(Some(command))
}

fn split_verb(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(line.split_once(char::is_whitespace).unwrap_or((line, "")))
}

fn parse_menu_choice(choice: &str) -> Result<AvatarMenuItem, String> {
    match choice {
        "n" | "notifications" => Ok(AvatarMenuItem::Notifications),
        "p" | "profile" => Ok(AvatarMenuItem::Profile),
        "l" | "logout" => Ok(AvatarMenuItem::Logout),
        other => Err(format!("unknown menu entry: {}", other)),
    }
}

fn parse_profile(args: &[&str]) -> Result<ProfileUpdate, String> {
    let mut update = ProfileUpdate::default();

    for arg in args {
        let (field, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected <field>=<value>, got `{}`", arg))?;
        let value = Some(value.replace('_', " "));

        match field {
            "name" => update.name = value,
            "email" => update.email = value,
            "phone" => update.phone = value,
            "license" => update.license = value,
            "expiry" => update.license_expiry = value,
            "vehicle" => update.vehicle = value,
            "plate" => update.plate = value,
            "image" => update.profile_image = value,
            other => return Err(format!("unknown profile field: {}", other)),
        }
    }

    if update.is_empty() {
        return Err("usage: profile <field>=<value> ...".to_string());
    }
    Ok(update)
}

fn parse_delivery(rest: &str) -> Result<NewDelivery, String> {
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();

    let (recipient, address, city, distance) = match parts.as_slice() {
        [recipient, address, city] => (recipient, address, city, None),
        [recipient, address, city, km] => {
            let km: f64 = km
                .parse()
                .map_err(|_| format!("distance must be a number, got `{}`", km))?;
            (recipient, address, city, Some(km))
        }
        _ => return Err("usage: add <recipient> | <address> | <city> [| <km>]".to_string()),
    };

    Ok(NewDelivery {
        recipient_name: recipient.to_string(),
        delivery_address: address.to_string(),
        delivery_city: city.to_string(),
        total_distance: distance,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn signup_joins_name() {
        assert_eq!(
            parse("signup ana@example.com secret1 Ana Maria Souza"),
            Ok(Some(Command::Signup {
                email: "ana@example.com".into(),
                password: "secret1".into(),
                name: "Ana Maria Souza".into(),
            }))
        );
        assert!(parse("signup ana@example.com").is_err());
    }

    #[test]
    fn add_with_distance() {
        let Ok(Some(Command::Add(delivery))) =
            parse("add Carla Dias | Rua do Sol, 12 | Olinda | 7.5")
        else {
            panic!("expected add command");
        };
        assert_eq!(delivery.recipient_name, "Carla Dias");
        assert_eq!(delivery.delivery_address, "Rua do Sol, 12");
        assert_eq!(delivery.delivery_city, "Olinda");
        assert_eq!(delivery.total_distance, Some(7.5));
    }

    #[test]
    fn add_rejects_bad_distance() {
        assert!(parse("add A | B | C | far").is_err());
    }

    #[test]
    fn status_parses_value() {
        assert_eq!(
            parse("status 1a2b completed"),
            Ok(Some(Command::Status {
                id: "1a2b".into(),
                status: DeliveryStatus::Completed,
            }))
        );
        assert!(parse("status 1a2b lost").is_err());
    }

    #[test]
    fn profile_fields() {
        let Ok(Some(Command::Profile(update))) = parse("profile name=Ana_Lima plate=ABC1D23")
        else {
            panic!("expected profile command");
        };
        assert_eq!(update.name.as_deref(), Some("Ana Lima"));
        assert_eq!(update.plate.as_deref(), Some("ABC1D23"));
        assert!(parse("profile colour=blue").is_err());
        assert!(parse("profile").is_err());
    }

    #[test]
    fn menu_choice() {
        assert_eq!(parse("menu"), Ok(Some(Command::Menu { choice: None })));
        assert_eq!(
            parse("menu l"),
            Ok(Some(Command::Menu {
                choice: Some(AvatarMenuItem::Logout)
            }))
        );
        assert!(parse("menu settings").is_err());
    }

    #[test]
    fn unknown_command() {
        assert!(parse("fly away").is_err());
    }
}
