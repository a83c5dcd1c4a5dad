#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use muninn_bot::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = common::CONFIG.replace("  room_via:", "  room_viaa:");
    let err = config::load_from_str(&bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_full_config() {
    let cfg = config::load_from_str(common::CONFIG).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.bot.command_prefix, "!");
    assert_eq!(cfg.bot.ops_listen, "127.0.0.1:8090");
    assert_eq!(cfg.rooms.main_room.as_str(), common::MAIN);
    assert_eq!(cfg.application_pings.len(), 1);
}

#[test]
fn bot_section_overrides_defaults() {
    let with_bot = common::CONFIG.replace(
        "rooms:\n",
        "bot:\n  command_prefix: \"?\"\n  sync_timeout_ms: 5000\nrooms:\n",
    );
    let cfg = config::load_from_str(&with_bot).expect("must parse");
    assert_eq!(cfg.bot.command_prefix, "?");
    assert_eq!(cfg.bot.sync_timeout_ms, 5000);
    assert_eq!(cfg.bot.support_fetch_timeout_secs, 30);
}

#[test]
fn rejects_bad_identifiers() {
    let bad_room = common::CONFIG.replace("main_room: \"!main", "main_room: \"#main");
    let err = config::load_from_str(&bad_room).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
    assert!(err.to_string().contains("rooms.main_room"));

    let bad_ping = common::CONFIG.replace("[\"@mod:example.org\"]", "[\"mod\"]");
    let err = config::load_from_str(&bad_ping).expect_err("must fail");
    assert!(err.to_string().contains("application_pings"));
}

#[test]
fn rejects_out_of_range_timeouts() {
    let bad = common::CONFIG.replace("rooms:\n", "bot:\n  sync_timeout_ms: 10\nrooms:\n");
    let err = config::load_from_str(&bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn missing_messages_is_an_error() {
    let cut = common::CONFIG.split("messages:").next().unwrap();
    let err = config::load_from_str(cut).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}
