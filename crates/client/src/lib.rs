//! Client code for hearth.
//!
//! This crate provides the network seam, the cache orchestrator that routes
//! intercepted requests through versioned partitions, and the auth session
//! whose sign-out clears cached API responses.

pub mod fetch;
pub mod orchestrator;
pub mod session;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher, Method, Request, RequestMode, Url};
pub use orchestrator::{
    ControlMessage, Dispatch, MessageReply, Orchestrator, OrchestratorSettings, Served, Source, WorkerState,
};
pub use session::{AuthContext, AuthState};
