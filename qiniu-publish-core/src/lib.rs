#![doc = "qiniu-publish-core: incremental publish pipeline for qiniu-publish."]

//! This crate contains the publish pipeline and every piece of it that can be reasoned about
//! without a network: file discovery, Qiniu-compatible hashing, remote-state reconciliation,
//! selective upload and selective CDN refresh.
//!
//! The storage and CDN vendors are reached only through the traits in [`contract`]; the concrete
//! HTTP client lives in the `qiniu-publish` CLI crate.
//!
//! # Usage
//! Build a [`config::BucketTask`], provide a [`contract::StorageBackend`] and
//! [`contract::CdnBackend`], and call [`publish::publish_bucket`] (or [`publish::publish_all`] for
//! several buckets).

pub mod config;
pub mod contract;
pub mod enumerate;
pub mod error;
pub mod etag;
pub mod invalidate;
pub mod publish;
pub mod report;
pub mod resolve;
pub mod run;
pub mod upload;
