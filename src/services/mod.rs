pub mod autosave_service;
pub mod currency_service;
pub mod image_service;
pub mod import_service;
pub mod leg_service;
pub mod pricing_service;
pub mod selection_service;
pub mod share_link_service;
