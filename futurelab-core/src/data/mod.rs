//! Data ingestion: schema validation, typed contract panel, price lookup

pub mod panel;
pub mod prices;
pub mod schema;

pub use panel::{ContractHistory, ContractPanel};
pub use prices::{Multipliers, PricePanel};
pub use schema::{PanelSchema, SchemaError};
