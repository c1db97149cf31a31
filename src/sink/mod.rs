pub mod checkpoint;
pub mod csv;
pub mod db;
