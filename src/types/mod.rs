pub mod context;
pub mod dto;
pub mod osm;
