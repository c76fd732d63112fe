// handlers/mod.rs - two tiers, split by the access gate
//
// Public (gate forwards without a session lookup) → Admin (/admin/*, session checked by the gate)
pub mod admin;
pub mod public;

pub use admin::{admin_index, admin_login, admin_session};
pub use public::{health, not_found, root};
