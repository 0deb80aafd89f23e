//! CrudService: generic CRUD over the storage collaborator.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::PayloadValidator;
