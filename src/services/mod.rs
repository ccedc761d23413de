pub mod analytics_service;
pub mod auth_service;
pub mod bill_service;
pub mod billing;
pub mod cart_service;
pub mod export_service;
pub mod menu_service;
pub mod order_service;
pub mod qr_service;
pub mod settings_service;
pub mod table_service;
