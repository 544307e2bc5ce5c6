//! Core trait abstractions for the discovery pipeline.
//!
//! These traits define the collaborators a site adapter provides: a page
//! session to traverse listings and fetch details, and a classifier.

pub mod classifier;
pub mod session;
