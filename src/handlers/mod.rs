pub mod alerts;
pub mod me;
pub mod realtime;
