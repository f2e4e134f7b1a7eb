pub mod schema;
pub mod store;

pub use store::{ProblemSummary, SeedAction, Store, StoreStats};
