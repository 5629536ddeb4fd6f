pub mod catalog_cache;
pub mod db_utils;
pub mod time;
pub mod validation;
