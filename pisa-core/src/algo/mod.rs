//! Algorithms built on top of the reachability core

pub mod isopolygon;
