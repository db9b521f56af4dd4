pub mod clients;
pub mod companies;
pub mod feedback;
pub mod notes;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;
