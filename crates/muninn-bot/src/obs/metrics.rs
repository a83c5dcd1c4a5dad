//! Minimal counter registry rendered in Prometheus text format.
//!
//! Counters carry dynamic labels backed by `DashMap`. Label sets are stored
//! sorted so each series has exactly one key and rendering is stable.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

type LabelKey = Vec<(String, String)>;

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let mut key: LabelKey = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort();
        self.map
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(v, Ordering::Relaxed);
    }

    /// Current value of one series (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        let mut key: LabelKey = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort();
        self.map
            .get(&key)
            .map(|c| c.value().load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let mut series: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| {
                let labels = r
                    .key()
                    .iter()
                    .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                (labels, r.value().load(Ordering::Relaxed))
            })
            .collect();
        series.sort();
        for (labels, val) in series {
            if labels.is_empty() {
                let _ = writeln!(out, "{name} {val}");
            } else {
                let _ = writeln!(out, "{name}{{{labels}}} {val}");
            }
        }
    }
}

/// All counters the bot exports.
#[derive(Default)]
pub struct BotMetrics {
    /// label: join_type
    pub screenings: CounterVec,
    /// label: reason
    pub screenings_dropped: CounterVec,
    /// label: result (ok | failed)
    pub support_fetch: CounterVec,
    pub redactions: CounterVec,
    /// label: source (reaction | command)
    pub applications: CounterVec,
}

impl BotMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render counters plus point-in-time gauges supplied by the caller.
    pub fn render(&self, gauges: &[(&str, &str, u64)]) -> String {
        let mut out = String::new();
        self.screenings.render("muninn_screenings_total", "Join screenings that sent a message.", &mut out);
        self.screenings_dropped.render("muninn_screenings_dropped_total", "Joins not screened.", &mut out);
        self.support_fetch.render("muninn_support_fetch_total", "Support well-known fetches.", &mut out);
        self.redactions.render("muninn_welcome_redactions_total", "Welcome messages redacted on leave.", &mut out);
        self.applications.render("muninn_applications_total", "Application-received messages sent.", &mut out);
        for (name, help, value) in gauges {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} gauge");
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}
