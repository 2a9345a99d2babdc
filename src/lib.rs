//! HTTP object detection over a YOLO ONNX model.
//!
//! `domain` holds plain types and rules, `application` the ports and use
//! cases, `adapters` the ONNX detector, the annotator and the axum surface.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
