pub mod altitude;
pub mod checkpoint;
pub mod cluster;
pub mod indicator;
pub mod meter;
