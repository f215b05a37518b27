pub mod db;
pub mod editor;
pub mod models;
pub mod storage;
pub mod store;
