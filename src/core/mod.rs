pub mod clock;
pub mod constants;
pub mod errors;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use errors::{ConfigError, LinkError, LinkWatchError, ProviderError};
