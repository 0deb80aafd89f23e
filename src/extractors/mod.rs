mod principal;
pub use principal::Principal;
