//! posegraph: a typed, reactive object graph
//!
//! Nodes live in an arena-backed [`domain::Graph`]: typed through an explicit
//! registry, invalidated along ownership and link edges, and brought up to
//! date by `update`. Scalar and composite leaves validate their values, a
//! generic codec maps node trees to and from JSON payloads, and geodetic
//! positions derive Cartesian poses from their reference frame.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
