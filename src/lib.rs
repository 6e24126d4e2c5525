// Mellow: toxic message classification with positive rewrites
//
// This is the library root. Modules are listed leaves first: lexicon and
// scoring feed the decision engine, which feeds rewriting and storage.

pub mod batch;
pub mod config;
pub mod db;
pub mod decision;
pub mod lexicon;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod service;
pub mod status;
pub mod toxicity;

#[cfg(feature = "web")]
pub mod web;
