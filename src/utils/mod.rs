pub mod change_feed;
pub mod db_utils;
pub mod snapshot;
pub mod username_cache;
