pub mod alert_service;
pub mod area_directory;
pub mod auth;
pub mod push;
pub mod response_service;
pub mod status_service;
