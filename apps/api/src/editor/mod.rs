// Editing sessions: section order/visibility, draft -> commit cycle,
// and the per-session store the UI reads from.

pub mod handlers;
pub mod highlight;
pub mod sections;
pub mod session;
pub mod store;

pub use session::SessionRegistry;
