pub mod policy;
pub mod rule;
pub mod slot;
pub mod target;

pub use policy::RetryPolicy;
pub use rule::{FeedEntry, Rule, RuleDefaults};
pub use slot::CacheSlot;
pub use target::{Credentials, FetchTarget};
