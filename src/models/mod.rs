pub mod connection;
pub mod title;
pub mod watch_next;

pub use connection::{Chain, ChainEntry, Direction, DisclosureBatch};
pub use title::{ContentGroup, Title, TitleId, TitleType};
pub use watch_next::{ResolveStats, WatchNextRequest, WatchNextResponse, WatchNextRow};
