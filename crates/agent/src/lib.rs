//! Agent runtime: from a voice note or photo to a ledger update and a reply.
//!
//! The flow for one inbound message:
//! 1. **Extraction** (`extraction`) - a multimodal model turns media into JSON text
//! 2. **Decoding** (`intent`) - the JSON becomes a closed `ExtractedIntent`
//! 3. **Routing** (`router`) - the intent is applied to the `InventoryLedger`
//! 4. **Confirmation** (`reply`) - the outcome becomes a short message for the trader
//!
//! # Safety Principle
//!
//! The model is strictly a translator. It never decides quantities on hand or
//! totals; those are computed by the ledger from validated inputs.

pub mod extraction;
pub mod intent;
pub mod reply;
pub mod router;
pub mod runtime;

pub use extraction::{ExtractionError, IntentExtractor, MediaAttachment, EXTRACTION_PROMPT};
pub use intent::{ExtractedIntent, IntentEnvelope, IntentParseError};
pub use reply::compose_reply;
pub use router::{IntentRouter, RouteStatus, RouterResult};
pub use runtime::{AgentRuntime, ProcessedMessage};
