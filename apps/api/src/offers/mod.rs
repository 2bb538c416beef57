// Offer letters sent for e-signature, and reconciliation of provider status events.
// All provider calls go through the SignatureProvider trait in docusign.rs.

pub mod docusign;
pub mod handlers;
pub mod letter;
pub mod lifecycle;
