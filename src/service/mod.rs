pub mod engine;
pub mod locks;
pub mod origination;
pub mod payment;
