//! Tests for #[derive(Command)] and #[derive(DomainEvent)]

use fairdraw_macros::{Command, DomainEvent};

#[derive(Command, Clone, Debug, PartialEq)]
enum BoxOfficeCommand {
    #[privileged]
    OpenBoxOffice { seats: u32 },

    #[privileged]
    CloseBoxOffice,

    BuySeat(u32),

    RefundSeat { seat: u32 },
}

#[derive(Command, Clone, Debug)]
enum PublicOnly {
    Ping,
}

#[derive(DomainEvent, Clone, Debug)]
enum BoxOfficeEvent {
    BoxOfficeOpened { seats: u32 },

    #[event(version = 3)]
    SeatBought(u32),

    BoxOfficeClosed,
}

#[test]
fn command_names_are_snake_case() {
    assert_eq!(
        BoxOfficeCommand::OpenBoxOffice { seats: 10 }.name(),
        "open_box_office"
    );
    assert_eq!(BoxOfficeCommand::CloseBoxOffice.name(), "close_box_office");
    assert_eq!(BoxOfficeCommand::BuySeat(4).name(), "buy_seat");
    assert_eq!(PublicOnly::Ping.name(), "ping");
}

#[test]
fn privileged_marker_covers_all_field_shapes() {
    assert!(BoxOfficeCommand::OpenBoxOffice { seats: 10 }.is_privileged());
    assert!(BoxOfficeCommand::CloseBoxOffice.is_privileged());
    assert!(!BoxOfficeCommand::BuySeat(1).is_privileged());
    assert!(!BoxOfficeCommand::RefundSeat { seat: 1 }.is_privileged());
}

#[test]
fn enums_without_privileged_variants() {
    assert!(!PublicOnly::Ping.is_privileged());
}

#[test]
fn event_types_carry_version() {
    assert_eq!(
        BoxOfficeEvent::BoxOfficeOpened { seats: 1 }.event_type(),
        "BoxOfficeOpened.v1"
    );
    assert_eq!(BoxOfficeEvent::SeatBought(2).event_type(), "SeatBought.v3");
    assert_eq!(BoxOfficeEvent::BoxOfficeClosed.event_type(), "BoxOfficeClosed.v1");
}

#[test]
fn generated_methods_are_const() {
    const NAME: &str = BoxOfficeCommand::CloseBoxOffice.name();
    const TYPE: &str = BoxOfficeEvent::BoxOfficeClosed.event_type();
    assert_eq!(NAME, "close_box_office");
    assert_eq!(TYPE, "BoxOfficeClosed.v1");
}
