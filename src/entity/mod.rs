pub mod cart_lines;
pub mod menu_items;
pub mod order_items;
pub mod orders;
pub mod settings;
pub mod users;

pub use cart_lines::Entity as CartLines;
pub use menu_items::Entity as MenuItems;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use settings::Entity as SettingsRow;
pub use users::Entity as Users;
