// Resume text extraction: reference resolution, document reading, and the upload trigger.
// Vision calls go through llm_client; downloads go through the BlobStore seam.

pub mod handlers;
pub mod resolver;
pub mod upload;
