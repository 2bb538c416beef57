// Interview session records: idempotent merge of completion events.

pub mod handlers;
pub mod merge;
