pub mod chain_builder;
pub mod providers;
pub mod resolver;
pub mod visit_tracker;
pub mod watch_next;

pub use chain_builder::ChainBuilder;
pub use resolver::{ResolveOptions, Resolver, ResolverOutput};
pub use visit_tracker::VisitTracker;
