use std::str::FromStr;

use shopdesk_application::ResourceKind;
use shopdesk_core::AppError;
use shopdesk_domain::Theme;

pub const USAGE: &str = "usage: shopdesk-console <login <email> <password> | logout | whoami | \
list <resource> [search] | show <resource> <id> | open <path> | audit | \
theme [light|dark|toggle]>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChange {
    Set(Theme),
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    List {
        kind: ResourceKind,
        search: Option<String>,
    },
    Show {
        kind: ResourceKind,
        id: String,
    },
    Open { path: String },
    Audit,
    Theme(Option<ThemeChange>),
}

impl ConsoleCommand {
    pub fn parse(args: &[String]) -> Result<Self, AppError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["login", email, password] => Self::Login {
                email: (*email).to_owned(),
                password: (*password).to_owned(),
            },
            ["logout"] => Self::Logout,
            ["whoami"] => Self::WhoAmI,
            ["list", kind, rest @ ..] => Self::List {
                kind: ResourceKind::from_str(kind)?,
                search: Some(rest.join(" ")).filter(|search| !search.trim().is_empty()),
            },
            ["show", kind, id] => Self::Show {
                kind: ResourceKind::from_str(kind)?,
                id: (*id).to_owned(),
            },
            ["open", path] => Self::Open {
                path: (*path).to_owned(),
            },
            ["audit"] => Self::Audit,
            ["theme"] => Self::Theme(None),
            ["theme", "toggle"] => Self::Theme(Some(ThemeChange::Toggle)),
            ["theme", theme] => Self::Theme(Some(ThemeChange::Set(Theme::from_str(theme)?))),
            _ => return Err(AppError::Validation(USAGE.to_owned())),
        };

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_application::ResourceKind;
    use shopdesk_core::AppError;
    use shopdesk_domain::Theme;

    use super::{ConsoleCommand, ThemeChange};

    fn parse(args: &[&str]) -> Result<ConsoleCommand, AppError> {
        let args: Vec<String> = args.iter().map(|arg| (*arg).to_owned()).collect();
        ConsoleCommand::parse(&args)
    }

    #[test]
    fn list_joins_search_terms() {
        assert_eq!(
            parse(&["list", "Products", "green", "tea"]).ok(),
            Some(ConsoleCommand::List {
                kind: ResourceKind::Products,
                search: Some("green tea".to_owned()),
            })
        );
        assert_eq!(
            parse(&["list", "orders"]).ok(),
            Some(ConsoleCommand::List {
                kind: ResourceKind::Orders,
                search: None,
            })
        );
    }

    #[test]
    fn theme_variants_parse() {
        assert_eq!(parse(&["theme"]).ok(), Some(ConsoleCommand::Theme(None)));
        assert_eq!(
            parse(&["theme", "toggle"]).ok(),
            Some(ConsoleCommand::Theme(Some(ThemeChange::Toggle)))
        );
        assert_eq!(
            parse(&["theme", "dark"]).ok(),
            Some(ConsoleCommand::Theme(Some(ThemeChange::Set(Theme::Dark))))
        );
    }

    #[test]
    fn unknown_commands_report_usage() {
        assert!(matches!(parse(&[]), Err(AppError::Validation(_))));
        assert!(matches!(parse(&["login", "a@b.co"]), Err(AppError::Validation(_))));
        assert!(matches!(
            parse(&["show", "invoices", "1"]),
            Err(AppError::Validation(_))
        ));
    }
}
