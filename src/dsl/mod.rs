//! The declarative task DSL
//!
//! Home of the template resolver that plumbs data between pipeline steps.

pub mod template;

pub use template::{is_template, resolve_inputs, resolve_path, resolve_str};

#[cfg(test)]
mod template_test;
