pub mod application_dto;
pub mod offer_dto;
