#[path = "../crates/sdk-types/src/lib.rs"]
pub mod types;
#[path = "../crates/core/src/lib.rs"]
pub mod core;
#[path = "../crates/provider/src/lib.rs"]
pub mod provider;
#[path = "../crates/transports/reqwest/src/lib.rs"]
pub mod transport_reqwest;

#[path = "../crates/providers/google/src/lib.rs"]
pub mod provider_google;

pub mod transports {
    pub use crate::transport_reqwest as reqwest;
}

pub mod providers {
    pub use crate::provider_google as google;
}

pub(crate) use crate::transport_reqwest as reqwest_transport;

pub use crate::core::{
    AspectRatio, DataUri, DispatchSettings, ErrorKind, GridSize, QualityLevel, SdkError, Shot,
    ShotBoard, ShotId, ShotSpec, Storyboard,
};
pub use crate::provider::{CredentialStore, ProviderSettings};
