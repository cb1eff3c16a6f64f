pub mod spin_service;
