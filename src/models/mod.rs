pub mod firestore;
pub mod home;
pub mod portfolio;
pub mod requests;
pub mod response;
pub mod session;
pub mod stock;
pub mod wallet;

pub use firestore::*;
pub use requests::*;
pub use response::*;
pub use session::*;
pub use stock::*;
pub use wallet::*;
