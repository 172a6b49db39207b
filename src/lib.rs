//! aqtap - reproducible report on autistic traits, age and finger tapping
//!
//! The analysis is a single forward pipeline over one participant file:
//! load and clean, describe, compare hands, correlate, fit moderation
//! models, render. Every stage is a public module so it can be driven and
//! tested on its own; [`pipeline::run`] chains them.

pub mod cli;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod delimited;
pub mod descriptives;
pub mod hand_comparison;
pub mod moderation;
pub mod pipeline;
pub mod report;
pub mod stats;
