pub mod dataset;
pub mod derive;
pub mod legs;
pub mod normalize;
