//! Join screening: rate-limited support-contact checks on join, welcome
//! redaction on leave, and reaction-driven application hand-off.

pub mod applications;
pub mod engine;
pub mod limiter;
pub mod queue;

pub use applications::{ApplicationTarget, PendingApplications};
pub use engine::{JoinOutcome, JoinType, ScreeningEngine, ScreeningSettings, VERIFIED_APPLICATION_SENDER_KEY};
pub use limiter::JoinLimiter;
pub use queue::{ScreeningJob, ScreeningQueue};
