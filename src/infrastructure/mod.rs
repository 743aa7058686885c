pub mod db;
pub mod platforms;
pub mod storage;
