pub mod auth;
pub mod client;
pub mod realtime;
pub mod store;

pub use auth::{AuthClient, Session, SessionContext};
pub use client::DataClient;
pub use realtime::{
    ChangeEvent, ChangeFeed, ChangeMarker, ChangeMarkerSource, ChangeSubscription, ChangeWatcher,
    Entity,
};
pub use store::ProblemStore;
