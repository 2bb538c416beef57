// Resume/job match analysis: AI scoring, auto-report gate, and the evaluation pipeline.
// All LLM calls go through llm_client. No direct Anthropic calls here.

pub mod engine;
pub mod gate;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
