#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use muninn_bot::app_state::AppState;
use muninn_bot::directory::TldSet;

use common::*;

async fn started() -> (AppState, Arc<MockClient>, Arc<MockFetcher>) {
    let client = MockClient::new();
    client.set_members(SPACE, &[("@vetted:example.com", None)]);
    client.set_members(MAIN, &[("@vetted:example.com", Some("Vetted [example.com]"))]);
    let fetcher = MockFetcher::new();
    let tlds: TldSet = ["com", "org"].into_iter().collect();

    let app = AppState::with_tlds(cfg(), client.clone(), fetcher.clone(), tlds);
    app.start().await.unwrap().await.unwrap();
    (app, client, fetcher)
}

#[tokio::test]
async fn start_loads_rosters_but_waits_for_sync() {
    let (app, _client, _fetcher) = started().await;
    assert_eq!(app.space().len(), 1);
    assert_eq!(app.monitor().with_index(|idx| idx.len()), 1);
    assert!(!app.health().is_ready());

    app.health().mark_synced();
    assert!(app.health().is_ready());
}

#[tokio::test]
async fn start_fails_without_space_roster() {
    let client = MockClient::new();
    let app = AppState::with_tlds(cfg(), client, MockFetcher::new(), TldSet::default());
    let err = app.start().await.unwrap_err();
    assert_eq!(err.kind().as_str(), "HOMESERVER");
    assert!(!app.health().is_ready());
}

#[tokio::test]
async fn join_then_leave_in_the_screening_room() {
    let (app, client, _fetcher) = started().await;
    let d = app.dispatcher();

    d.dispatch_event(&timeline(SCREENING, member_event("$join", "@new:example.com", "join", None))).await;
    app.flush_screening().await.unwrap();
    assert_eq!(client.sent().len(), 1);

    // Backfilled state and profile changes are not arrivals.
    d.dispatch_event(&state(SCREENING, member_event("$s", "@old:example.com", "join", None))).await;
    d.dispatch_event(&timeline(
        SCREENING,
        member_change("$p", "@old2:example.com", "join", Some("New name"), "join"),
    ))
    .await;
    app.flush_screening().await.unwrap();
    assert_eq!(client.sent().len(), 1);

    // Kicks: the redaction follows the subject, not the sender.
    let mut kick = member_event("$kick", "@new:example.com", "leave", None);
    kick.sender = user("@mod:example.org");
    d.dispatch_event(&timeline(SCREENING, kick)).await;
    app.flush_screening().await.unwrap();
    let redactions = client.redactions();
    assert_eq!(redactions.len(), 1);
    assert_eq!(redactions[0].1, event_id("$sent1"));
}

#[tokio::test]
async fn users_joining_the_space_stop_being_screened() {
    let (app, client, _fetcher) = started().await;
    let d = app.dispatcher();

    d.dispatch_event(&timeline(SPACE, member_event("$sj", "@fresh:example.com", "join", None))).await;
    assert!(app.space().contains(&user("@fresh:example.com")));
    d.dispatch_event(&timeline(SCREENING, member_event("$j", "@fresh:example.com", "join", None))).await;
    app.flush_screening().await.unwrap();
    assert!(client.sent().is_empty());

    d.dispatch_event(&timeline(SPACE, member_event("$sl", "@vetted:example.com", "ban", None))).await;
    assert!(!app.space().contains(&user("@vetted:example.com")));
}

#[tokio::test]
async fn commands_reach_their_handlers() {
    let (app, client, _fetcher) = started().await;
    let d = app.dispatcher();

    d.dispatch_event(&timeline(MAIN, message_event("$c1", "@alice:example.com", "!member-directory"))).await;
    d.dispatch_event(&timeline(MAIN, message_event("$c2", "@alice:example.com", "!ping-users-without-server-in-name")))
        .await;
    d.dispatch_event(&timeline(SCREENING, message_event("$c3", "@alice:example.com", "!recheck"))).await;
    app.flush_screening().await.unwrap();
    d.dispatch_event(&timeline(SCREENING, message_event("$c4", "@alice:example.com", "!apply hello"))).await;

    let sent = client.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].1.body.starts_with("Member Directory"));
    assert!(sent[1].1.formatted_body.as_deref().unwrap().starts_with("<p>Rechecked "));
    assert!(sent[2].1.body.contains("Application received"));
    // Everyone in the main room has a server: ✅️ instead of a ping.
    assert_eq!(client.reactions().len(), 1);
}

#[tokio::test]
async fn reload_swaps_the_exclusion_list() {
    let (app, _client, _fetcher) = started().await;
    assert!(app.monitor().is_excluded(&user(BOT)));

    let mut cfg = cfg();
    cfg.excluded_members = vec![user("@quiet:example.com")];
    app.reload(&cfg);
    assert!(!app.monitor().is_excluded(&user(BOT)));
    assert!(app.monitor().is_excluded(&user("@quiet:example.com")));
}

#[tokio::test]
async fn metrics_render_counters_and_gauges() {
    let (app, _client, _fetcher) = started().await;
    app
        .dispatcher()
        .dispatch_event(&timeline(SCREENING, member_event("$join", "@new:example.com", "join", None)))
        .await;
    app.flush_screening().await.unwrap();

    let text = app.render_metrics().await;
    assert!(text.contains("muninn_screenings_total{join_type=\"new_well_known_missing\"} 1"));
    assert!(text.contains("muninn_space_members 1"));
    assert!(text.contains("muninn_indexed_members 1"));
    assert!(text.contains("muninn_welcomed_users 1"));
}

#[tokio::test]
async fn join_and_leave_in_one_batch_stay_ordered() {
    let (app, client, _fetcher) = started().await;
    let d = app.dispatcher();

    d.dispatch_event(&timeline(SCREENING, member_event("$join", "@brief:example.com", "join", None))).await;
    d.dispatch_event(&timeline(SCREENING, member_event("$leave", "@brief:example.com", "leave", None))).await;
    app.flush_screening().await.unwrap();

    assert_eq!(client.sent().len(), 1);
    assert_eq!(client.redactions().len(), 1);
}

#[tokio::test]
async fn other_rooms_keep_flowing_while_a_support_fetch_is_pending() {
    let (app, client, fetcher) = started().await;
    let gate = fetcher.hold_fetches();
    let d = app.dispatcher();

    d.dispatch_event(&timeline(SCREENING, member_event("$join", "@slow:example.com", "join", None))).await;
    while fetcher.in_flight.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    d.dispatch_event(&timeline(SPACE, member_event("$sj", "@alice:example.com", "join", None))).await;
    d.dispatch_event(&timeline(MAIN, member_event("$mj", "@bob:example.com", "join", Some("Bob [bob.org]")))).await;
    d.dispatch_event(&timeline(MAIN, message_event("$cmd", "@bob:example.com", "!member-directory"))).await;

    assert!(app.space().contains(&user("@alice:example.com")));
    assert!(app.monitor().with_index(|idx| idx.contains(&user("@bob:example.com"))));
    let sent = client.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.body.starts_with("Member Directory"));
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 1);

    gate.notify_one();
    app.flush_screening().await.unwrap();
    assert_eq!(client.sent().len(), 2);
    assert_eq!(app.engine().welcome_of(&user("@slow:example.com")).await, Some(Some(event_id("$sent2"))));
}
