pub mod ads;
pub mod google_auth;
pub mod queue;
pub mod sheets;
