pub mod apps;
pub mod directory;
pub mod firebase;
pub mod gauth;
pub mod users;

pub use apps::WebAppsClient;
pub use firebase::FirebaseDirectory;
pub use gauth::TokenProvider;
pub use users::UserService;
