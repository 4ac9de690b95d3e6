use super::*;
use clap::CommandFactory;

#[test]
fn command_tree_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn login_takes_password_flag() {
    let cli = Cli::try_parse_from(["concierge-cli", "login", "user@example.com", "--password", "validpass"]).unwrap();
    match cli.command {
        Command::Login { email, password } => {
            assert_eq!(email, "user@example.com");
            assert_eq!(password, "validpass");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn profile_update_maps_only_given_fields() {
    let cli = Cli::try_parse_from(["concierge-cli", "profile", "update", "--first-name", "X"]).unwrap();
    let Command::Profile(ProfileCommand { command: ProfileSubcommand::Update(args) }) = cli.command else {
        panic!("expected profile update");
    };
    let update = ProfileUpdate::from(args);
    assert_eq!(update.first_name.as_deref(), Some("X"));
    assert_eq!(update.last_name, None);
    assert!(!update.is_empty());
}

#[test]
fn booking_status_parses_case_insensitively() {
    assert_eq!(parse_booking_status("Confirmed").unwrap(), BookingStatus::Confirmed);
    assert_eq!(parse_booking_status(" cancelled ").unwrap(), BookingStatus::Cancelled);
    assert!(matches!(parse_booking_status("shipped"), Err(CliError::InvalidArg { .. })));
}

#[test]
fn documents_must_be_objects() {
    assert!(parse_document(r#"{"name":"Spa day"}"#).is_ok());
    assert!(matches!(parse_document("[1,2]"), Err(CliError::InvalidArg { .. })));
    assert!(matches!(parse_document("{"), Err(CliError::InvalidJson(_))));
}
