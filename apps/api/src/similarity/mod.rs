// Vector-similarity matching between resumes and jobs.
// Embedding calls go through the `Embedder` trait; the math and caching live in matcher.rs.

pub mod embedder;
pub mod matcher;
