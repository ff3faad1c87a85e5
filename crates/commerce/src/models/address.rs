//! Shipping address model.

use serde::{Deserialize, Serialize};

use pomelo_core::AddressId;

/// A shipping address attached to orders at placement time.
///
/// Address CRUD is a collaborator concern; the engine only resolves an
/// address by id when placing an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub building_name: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
}
