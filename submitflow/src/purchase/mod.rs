//! Authenticated purchase: token validation, just-in-time login, the
//! purchase call and post-purchase webhooks.

mod flow;
mod identity;
mod placement;

pub use flow::{PurchaseAuthFlow, PurchaseReceipt, PurchaseRequest};
pub use identity::IdentityClient;
pub use placement::{resolve_item_id, unwrap_answer};
