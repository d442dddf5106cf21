pub mod fill;
pub mod import;
pub mod reference;
pub mod selection;
