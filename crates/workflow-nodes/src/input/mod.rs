//! Input nodes
//!
//! Nodes that bring external data into a workflow.

mod image_input;

pub use image_input::ImageInputNode;
