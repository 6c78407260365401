pub mod gbm;
pub mod heston;
pub mod model;
