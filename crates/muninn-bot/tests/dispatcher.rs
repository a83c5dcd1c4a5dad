#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use muninn_bot::dispatch::{Command, CommandHandler, Dispatcher, EventHandler};
use muninn_core::error::{BotError, Result};
use muninn_core::protocol::api::SyncedEvent;

use common::*;

#[derive(Default)]
struct Recorder {
    commands: Mutex<Vec<(String, String)>>,
    events: Mutex<Vec<String>>,
}

struct RecordingCommand(&'static str, Arc<Recorder>);

#[async_trait]
impl CommandHandler for RecordingCommand {
    fn command(&self) -> &'static str {
        self.0
    }

    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        self.1.commands.lock().unwrap().push((cmd.name.clone(), cmd.args.clone()));
        Ok(())
    }
}

struct RecordingEvents(Arc<Recorder>);

#[async_trait]
impl EventHandler for RecordingEvents {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn handle_event(&self, ev: &SyncedEvent) -> Result<()> {
        self.0.events.lock().unwrap().push(ev.event.event_id.to_string());
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl EventHandler for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn handle_event(&self, _ev: &SyncedEvent) -> Result<()> {
        Err(BotError::Internal("boom".into()))
    }
}

fn dispatcher(rec: &Arc<Recorder>) -> Dispatcher {
    let d = Dispatcher::new(user(BOT), "!");
    d.register_events(Arc::new(Failing));
    d.register_events(Arc::new(RecordingEvents(Arc::clone(rec))));
    d.register_command(Arc::new(RecordingCommand("apply", Arc::clone(rec))));
    d
}

fn parse(body: &str) -> Option<Command> {
    Command::parse("!", body, room(MAIN), event_id("$cmd"), user("@alice:example.com"))
}

#[test]
fn command_parsing() {
    let cmd = parse("!apply  I run example.com ").unwrap();
    assert_eq!(cmd.name, "apply");
    assert_eq!(cmd.args, "I run example.com");

    assert_eq!(parse("!Member-Directory").unwrap().name, "member-directory");
    assert_eq!(parse("  !recheck").unwrap().args, "");
    assert!(parse("apply").is_none());
    assert!(parse("! apply").is_none());
    assert!(parse("!").is_none());
}

#[tokio::test]
async fn events_reach_every_handler_despite_failures() {
    let rec = Arc::new(Recorder::default());
    let d = dispatcher(&rec);

    d.dispatch_event(&timeline(MAIN, member_event("$m1", "@a:x.org", "join", None))).await;
    d.dispatch_event(&state(MAIN, member_event("$m2", "@b:x.org", "join", None))).await;

    assert_eq!(*rec.events.lock().unwrap(), vec!["$m1".to_string(), "$m2".to_string()]);
}

#[tokio::test]
async fn timeline_messages_route_commands() {
    let rec = Arc::new(Recorder::default());
    let d = dispatcher(&rec);

    d.dispatch_event(&timeline(SCREENING, message_event("$c1", "@alice:example.com", "!apply please"))).await;
    d.dispatch_event(&timeline(SCREENING, message_event("$c2", "@alice:example.com", "!unknown"))).await;
    d.dispatch_event(&timeline(SCREENING, message_event("$c3", "@alice:example.com", "apply"))).await;

    assert_eq!(
        *rec.commands.lock().unwrap(),
        vec![("apply".to_string(), "please".to_string())]
    );
}

#[tokio::test]
async fn bot_messages_and_state_are_not_commands() {
    let rec = Arc::new(Recorder::default());
    let d = dispatcher(&rec);

    d.dispatch_event(&timeline(SCREENING, message_event("$c1", BOT, "!apply"))).await;
    d.dispatch_event(&state(SCREENING, message_event("$c2", "@alice:example.com", "!apply"))).await;

    assert!(rec.commands.lock().unwrap().is_empty());
    assert_eq!(rec.events.lock().unwrap().len(), 2);
}

#[test]
fn registry_lists_names() {
    let rec = Arc::new(Recorder::default());
    let d = dispatcher(&rec);
    let mut handlers = d.registered_event_handlers();
    handlers.sort_unstable();
    assert_eq!(handlers, vec!["failing", "recording"]);
    assert_eq!(d.registered_commands(), vec!["apply"]);
}
