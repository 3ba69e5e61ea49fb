pub mod data;
pub mod types;

pub use data::{load_credentials, load_scenarios, DataError};
pub use types::{Credential, CredentialMap, Scenario};
