pub mod config;
pub mod error;
pub mod image;
pub mod image_prep;
pub mod json;
pub mod pool;
pub mod projection;
pub mod retry;
pub mod scheduler;
pub mod storyboard;
pub mod transport;

pub use crate::core::config::DispatchSettings;
pub use crate::core::error::{ErrorKind, SdkError, TransportError};
pub use crate::core::image::{EditRequest, PlanRequest, ShotModel};
pub use crate::core::pool::{Credential, CredentialPool};
pub use crate::core::projection::{failure_label, FailureContext, Locale, ShotBoard};
pub use crate::core::retry::{RetryConfig, RetryCoordinator, Retryable};
pub use crate::core::scheduler::{EventStream, Outcome, Scheduler, TaskEvent};
pub use crate::core::storyboard::{fit_plan, tasks_for, Storyboard};

// Convenience re-exports of common types
pub use crate::types::image::DataUri;
pub use crate::types::shot::{
    AspectRatio, GenerationMode, GenerationTask, GridSize, QualityLevel, Shot, ShotId, ShotSpec,
};

#[cfg(test)]
#[path = "../tests/pool_tests.rs"]
mod pool_tests;

#[cfg(test)]
#[path = "../tests/retry_tests.rs"]
mod retry_tests;

#[cfg(test)]
#[path = "../tests/scheduler_tests.rs"]
mod scheduler_tests;

#[cfg(test)]
#[path = "../tests/projection_tests.rs"]
mod projection_tests;

#[cfg(test)]
#[path = "../tests/storyboard_tests.rs"]
mod storyboard_tests;
