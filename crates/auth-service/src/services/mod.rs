pub mod rotation_service;
pub mod token_authority;
