pub mod chat;
pub mod geom;
pub mod gis;
