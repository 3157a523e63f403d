//! state
//!
//! Client-side state shared between the service and its callers.
//!
//! # Modules
//!
//! - [`cache`]: tag-aware query cache and live query handles
//! - [`loading`]: the observable loading flag
//! - `tags`: cache tags and the invalidation bus

pub mod cache;
pub mod loading;
mod tags;

pub use cache::{Fetcher, LiveQuery, QueryCache, QueryFuture, QueryOptions, QueryState};
pub use loading::{LoadingGuard, LoadingSignal};
pub use tags::{InvalidationBus, Tag};
