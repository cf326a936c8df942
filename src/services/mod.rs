pub mod geocoding_service;
