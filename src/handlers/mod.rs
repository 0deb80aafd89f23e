//! HTTP handlers for generated resource routes and the token endpoint.

pub mod resource;
pub mod token;
pub use token::{create_token, LoginData, TokenResponse};
