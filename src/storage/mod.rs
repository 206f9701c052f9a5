mod store;
mod types;

pub use store::ConfigStore;
pub use types::Config;
