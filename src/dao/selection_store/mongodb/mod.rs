mod config;
mod connection;
mod error;
mod models;
/// [`MongoSelectionStore`] and its change-stream plumbing.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSelectionStore;

const CLUB_COLLECTION_NAME: &str = "clubs";
const SELECTION_COLLECTION_NAME: &str = "user_selections";
const CONFIG_COLLECTION_NAME: &str = "game_config";
