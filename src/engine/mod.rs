mod matcher;
pub mod remote;
pub mod state;
pub mod store;
mod traits;

pub use remote::{load_sources, HttpFetcher, RemoteSource};
pub use state::MonitorState;
pub use store::BlockStore;
pub use traits::{BlocklistMatcher, RemoteFetcher};
