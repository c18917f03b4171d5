pub mod clock;
pub mod identity;
pub mod services;
pub mod session;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use identity::IdentityContext;
pub use session::LedgerSession;
