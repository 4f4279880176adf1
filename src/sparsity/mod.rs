//! Sparsity-pattern construction for multi-point-constrained bilinear forms.

pub mod build;
pub mod form;
pub mod pattern;

pub use build::{
    CouplingMode, build_standard_pattern, create_sparsity_pattern, create_sparsity_pattern_square,
};
pub use form::Form;
pub use pattern::SparsityPattern;
