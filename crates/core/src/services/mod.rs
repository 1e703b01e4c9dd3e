pub mod derivation_service;
pub mod poller;
pub mod sector_filter;
